// In-memory ChainReader for unit and integration tests.
// Responses are keyed by (target, selector); every request is recorded in order.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};

use crate::chain::reader::{classify_failure, ChainReader, ReadCall};
use crate::chain::retry::TransportFailure;
use crate::error::{PlannerError, PlannerResult};
use crate::models::BlockInfo;

#[derive(Debug, Clone)]
pub enum MockResponse {
    Return(Bytes),
    /// Node diagnostic text for a reverted call.
    Revert(String),
    /// Transport failure text, as left after retries.
    Fail(String),
}

type Key = (Address, [u8; 4]);

pub struct MockReader {
    chain_id: u64,
    block: BlockInfo,
    gas_price: U256,
    calls: Mutex<HashMap<Key, MockResponse>>,
    gas: Mutex<HashMap<Key, Result<U256, String>>>,
    log: Mutex<Vec<ReadCall>>,
}

/// ABI words from big-endian integers.
pub fn words(values: &[U256]) -> Bytes {
    let mut out = Vec::with_capacity(values.len() * 32);
    for v in values {
        let mut w = [0u8; 32];
        v.to_big_endian(&mut w);
        out.extend_from_slice(&w);
    }
    Bytes::from(out)
}

pub fn address_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

/// Two's-complement word for a negative or positive tick.
pub fn int_word(value: i32) -> U256 {
    if value >= 0 {
        U256::from(value as u32)
    } else {
        U256::MAX - U256::from(value.unsigned_abs() - 1)
    }
}

impl MockReader {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            block: BlockInfo { number: 1, timestamp: 1_700_000_000 },
            gas_price: U256::from(1_000_000_000u64),
            calls: Mutex::new(HashMap::new()),
            gas: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_block(mut self, number: u64, timestamp: u64) -> Self {
        self.block = BlockInfo { number, timestamp };
        self
    }

    pub fn with_gas_price(mut self, wei: U256) -> Self {
        self.gas_price = wei;
        self
    }

    pub fn on_call(&self, to: Address, selector: [u8; 4], response: MockResponse) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.insert((to, selector), response);
        }
    }

    pub fn returns(&self, to: Address, selector: [u8; 4], values: &[U256]) {
        self.on_call(to, selector, MockResponse::Return(words(values)));
    }

    pub fn reverts(&self, to: Address, selector: [u8; 4], diagnostic: &str) {
        self.on_call(to, selector, MockResponse::Revert(diagnostic.to_string()));
    }

    pub fn on_estimate(&self, to: Address, selector: [u8; 4], result: Result<U256, String>) {
        if let Ok(mut gas) = self.gas.lock() {
            gas.insert((to, selector), result);
        }
    }

    pub fn recorded(&self) -> Vec<ReadCall> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn record(&self, request: &ReadCall) {
        if let Ok(mut log) = self.log.lock() {
            log.push(request.clone());
        }
    }

    fn key(request: &ReadCall) -> PlannerResult<Key> {
        request.selector().map(|s| (request.to, s)).ok_or(PlannerError::ExternalCallFailure {
            operation: request.operation,
            message: "calldata shorter than a selector".to_string(),
        })
    }

    fn unmocked(request: &ReadCall) -> PlannerError {
        PlannerError::ExternalCallFailure {
            operation: request.operation,
            message: format!("no mock response for {:?}", request.to),
        }
    }
}

#[async_trait]
impl ChainReader for MockReader {
    async fn call(&self, request: &ReadCall) -> PlannerResult<Bytes> {
        self.record(request);
        let key = Self::key(request)?;
        let response = self.calls.lock().ok().and_then(|c| c.get(&key).cloned());
        match response {
            Some(MockResponse::Return(bytes)) => Ok(bytes),
            Some(MockResponse::Revert(message)) | Some(MockResponse::Fail(message)) => {
                Err(classify_failure(request.operation, TransportFailure { message, attempts: 1 }))
            }
            None => Err(Self::unmocked(request)),
        }
    }

    async fn estimate_gas(&self, request: &ReadCall, _value: U256) -> PlannerResult<U256> {
        self.record(request);
        let key = Self::key(request)?;
        let result = self.gas.lock().ok().and_then(|g| g.get(&key).cloned());
        match result {
            Some(Ok(gas)) => Ok(gas),
            Some(Err(message)) => {
                Err(classify_failure(request.operation, TransportFailure { message, attempts: 1 }))
            }
            None => Err(Self::unmocked(request)),
        }
    }

    async fn chain_id(&self) -> PlannerResult<u64> {
        Ok(self.chain_id)
    }

    async fn latest_block(&self) -> PlannerResult<BlockInfo> {
        Ok(self.block)
    }

    async fn gas_price(&self) -> PlannerResult<U256> {
        Ok(self.gas_price)
    }
}
