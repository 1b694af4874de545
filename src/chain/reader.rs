// Read-only chain access
// ----------------------
// Everything the planner learns about the chain goes through `ChainReader`:
// eth_call, eth_estimateGas and a few metadata reads. Nothing here signs or sends.
// Transport failures are retried by the ethers-backed implementation and then
// classified exactly once into `PlannerError`.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;

use crate::chain::decode::{extract_revert_reason, looks_like_revert};
use crate::chain::retry::{with_retry, RetryPolicy, TransportFailure};
use crate::error::{PlannerError, PlannerResult};
use crate::models::{format_address, BlockInfo};

/// A simulated call: `data` sent to `to`, optionally as `from`, at `block` (latest when None).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    pub operation: &'static str,
    pub to: Address,
    pub from: Option<Address>,
    pub data: Bytes,
    pub block: Option<u64>,
}

impl ReadCall {
    pub fn new(operation: &'static str, to: Address, data: Bytes) -> Self {
        Self { operation, to, from: None, data, block: None }
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.from = Some(sender);
        self
    }

    pub fn at_block(mut self, block: Option<u64>) -> Self {
        self.block = block;
        self
    }

    fn block_id(&self) -> Option<BlockId> {
        self.block.map(|n| BlockId::Number(BlockNumber::Number(n.into())))
    }

    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, request: &ReadCall) -> PlannerResult<Bytes>;
    async fn estimate_gas(&self, request: &ReadCall, value: U256) -> PlannerResult<U256>;
    async fn chain_id(&self) -> PlannerResult<u64>;
    async fn latest_block(&self) -> PlannerResult<BlockInfo>;
    async fn gas_price(&self) -> PlannerResult<U256>;
}

pub async fn ensure_chain_id(reader: &dyn ChainReader, expected: u64, operation: &'static str) -> PlannerResult<()> {
    let actual = reader.chain_id().await?;
    if actual != expected {
        log::error!("{}: chain id mismatch: expected {}, node reports {}", operation, expected, actual);
        return Err(PlannerError::ChainIdMismatch { operation, expected, actual });
    }
    Ok(())
}

/// Revert-looking diagnostics become `SimulationRevert`, the rest `ExternalCallFailure`.
pub fn classify_failure(operation: &'static str, failure: TransportFailure) -> PlannerError {
    if looks_like_revert(&failure.message) {
        PlannerError::SimulationRevert {
            operation,
            reason: extract_revert_reason(&failure.message),
        }
    } else {
        PlannerError::ExternalCallFailure {
            operation,
            message: format!("{} (after {} attempt(s))", failure.message, failure.attempts),
        }
    }
}

/// `ChainReader` over any ethers middleware stack.
pub struct EthersChainReader<M> {
    client: Arc<M>,
    retry: RetryPolicy,
}

impl<M: Middleware + 'static> EthersChainReader<M> {
    pub fn new(client: Arc<M>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

fn typed_transaction(request: &ReadCall, value: Option<U256>) -> TypedTransaction {
    let mut tx = TransactionRequest::new().to(request.to).data(request.data.clone());
    if let Some(from) = request.from {
        tx = tx.from(from);
    }
    if let Some(value) = value {
        tx = tx.value(value);
    }
    tx.into()
}

#[async_trait]
impl<M: Middleware + 'static> ChainReader for EthersChainReader<M> {
    async fn call(&self, request: &ReadCall) -> PlannerResult<Bytes> {
        let started = Instant::now();
        let tx = typed_transaction(request, None);
        let block = request.block_id();
        let out = with_retry(&self.retry, request.operation, || {
            let client = self.client.clone();
            let tx = tx.clone();
            async move { client.call(&tx, block).await.map_err(|e| e.to_string()) }
        })
        .await
        .map_err(|f| classify_failure(request.operation, f))?;

        log::debug!(
            "eth_call {} -> {} at {:?} returned {} bytes in {:?}",
            request.operation,
            format_address(&request.to),
            request.block,
            out.len(),
            started.elapsed()
        );
        Ok(out)
    }

    async fn estimate_gas(&self, request: &ReadCall, value: U256) -> PlannerResult<U256> {
        let tx = typed_transaction(request, Some(value));
        let block = request.block_id();
        with_retry(&self.retry, request.operation, || {
            let client = self.client.clone();
            let tx = tx.clone();
            async move { client.estimate_gas(&tx, block).await.map_err(|e| e.to_string()) }
        })
        .await
        .map_err(|f| classify_failure(request.operation, f))
    }

    async fn chain_id(&self) -> PlannerResult<u64> {
        let id = with_retry(&self.retry, "eth_chainId", || {
            let client = self.client.clone();
            async move { client.get_chainid().await.map_err(|e| e.to_string()) }
        })
        .await
        .map_err(|f| classify_failure("eth_chainId", f))?;

        if id > U256::from(u64::MAX) {
            return Err(PlannerError::MalformedReturnData {
                operation: "eth_chainId",
                detail: format!("chain id {} does not fit u64", id),
            });
        }
        Ok(id.as_u64())
    }

    async fn latest_block(&self) -> PlannerResult<BlockInfo> {
        let block = with_retry(&self.retry, "eth_getBlockByNumber", || {
            let client = self.client.clone();
            async move { client.get_block(BlockNumber::Latest).await.map_err(|e| e.to_string()) }
        })
        .await
        .map_err(|f| classify_failure("eth_getBlockByNumber", f))?;

        let block = block.ok_or(PlannerError::ExternalCallFailure {
            operation: "eth_getBlockByNumber",
            message: "node returned no latest block".to_string(),
        })?;
        let number = block.number.ok_or(PlannerError::MalformedReturnData {
            operation: "eth_getBlockByNumber",
            detail: "latest block has no number".to_string(),
        })?;
        if block.timestamp > U256::from(u64::MAX) {
            return Err(PlannerError::MalformedReturnData {
                operation: "eth_getBlockByNumber",
                detail: format!("timestamp {} does not fit u64", block.timestamp),
            });
        }
        Ok(BlockInfo { number: number.as_u64(), timestamp: block.timestamp.as_u64() })
    }

    async fn gas_price(&self) -> PlannerResult<U256> {
        with_retry(&self.retry, "eth_gasPrice", || {
            let client = self.client.clone();
            async move { client.get_gas_price().await.map_err(|e| e.to_string()) }
        })
        .await
        .map_err(|f| classify_failure("eth_gasPrice", f))
    }
}
