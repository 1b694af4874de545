use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{PlannerError, PlannerResult};

/// Parses `0x` + 40 hex digits. Anything else (missing prefix, wrong length, ENS
/// names, stray whitespace) is rejected so that no partial address reaches the codec.
pub fn parse_address(input: &str) -> PlannerResult<Address> {
    let invalid = || PlannerError::InvalidAddress { input: input.to_string() };
    let hex_part = input.strip_prefix("0x").ok_or_else(invalid)?;
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let raw = hex::decode(hex_part).map_err(|_| invalid())?;
    Ok(Address::from_slice(&raw))
}

/// Full lowercase `0x…` rendering. `Address`'s Display abbreviates, so never use it
/// for anything a caller will read.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

pub fn serialize_u256_dec<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

pub fn serialize_u128_dec<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn serialize_address<S: Serializer>(value: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_address(value))
}

/// NonfungiblePositionManager position, as returned by `positions(tokenId)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    #[serde(serialize_with = "serialize_u256_dec")]
    pub token_id: U256,
    #[serde(serialize_with = "serialize_address")]
    pub token0: Address,
    #[serde(serialize_with = "serialize_address")]
    pub token1: Address,
    /// Pool deployer salt; zero for pools created by the base factory.
    #[serde(serialize_with = "serialize_address")]
    pub deployer: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    #[serde(serialize_with = "serialize_u128_dec")]
    pub liquidity: u128,
    #[serde(serialize_with = "serialize_u128_dec")]
    pub tokens_owed0: u128,
    #[serde(serialize_with = "serialize_u128_dec")]
    pub tokens_owed1: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolState {
    #[serde(serialize_with = "serialize_address")]
    pub address: Address,
    pub tick: i32,
    pub tick_spacing: i32,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub sqrt_price_x96: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMeta {
    #[serde(serialize_with = "serialize_address")]
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// Point estimate of a single-hop exact-input swap at `block_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    #[serde(serialize_with = "serialize_u256_dec")]
    pub amount_out: U256,
    /// Pool fee in hundredths of a basis point at the time of the quote.
    pub fee_tier: u32,
    pub initialized_ticks_crossed: u32,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub gas_estimate: U256,
    pub block_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

/// FarmingCenter incentive identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncentiveKey {
    #[serde(serialize_with = "serialize_address")]
    pub reward_token: Address,
    #[serde(serialize_with = "serialize_address")]
    pub bonus_reward_token: Address,
    #[serde(serialize_with = "serialize_address")]
    pub pool: Address,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub nonce: U256,
}

/// Contract addresses and chain identity every planning operation runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub chain_id: u64,
    pub position_manager: Address,
    pub swap_router: Address,
    pub quoter: Address,
    pub factory: Address,
    pub farming_center: Option<Address>,
    pub incentive: Option<IncentiveKey>,
}

impl Deployment {
    pub fn require_farming_center(&self, operation: &'static str) -> PlannerResult<Address> {
        self.farming_center
            .ok_or(PlannerError::MissingConfiguration { operation, field: "farming_center" })
    }

    pub fn require_incentive(&self, operation: &'static str) -> PlannerResult<IncentiveKey> {
        self.incentive
            .ok_or(PlannerError::MissingConfiguration { operation, field: "incentive" })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancePolicy {
    pub edge_bps: u16,
    pub slippage_bps: u16,
    pub deadline_seconds: u64,
}

/// Per-request policy fields; unset ones fall through to the caller policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOverrides {
    pub edge_bps: Option<u16>,
    pub slippage_bps: Option<u16>,
    pub deadline_seconds: Option<u64>,
}

impl PolicyOverrides {
    pub fn is_empty(&self) -> bool {
        self.edge_bps.is_none() && self.slippage_bps.is_none() && self.deadline_seconds.is_none()
    }
}

impl RebalancePolicy {
    pub const SYSTEM_DEFAULT: RebalancePolicy = RebalancePolicy {
        edge_bps: 1_000,
        slippage_bps: 50,
        deadline_seconds: 1_200,
    };

    pub fn validate(&self) -> PlannerResult<()> {
        if self.edge_bps > 10_000 {
            return Err(PlannerError::InvalidPolicy { field: "edge_bps", value: self.edge_bps.to_string() });
        }
        if self.slippage_bps > 10_000 {
            return Err(PlannerError::InvalidPolicy {
                field: "slippage_bps",
                value: self.slippage_bps.to_string(),
            });
        }
        if self.deadline_seconds == 0 {
            return Err(PlannerError::InvalidPolicy { field: "deadline_seconds", value: "0".to_string() });
        }
        Ok(())
    }

    /// request -> caller policy -> system default, field by field, then validated.
    pub fn resolve(request: &PolicyOverrides, caller: Option<&RebalancePolicy>) -> PlannerResult<Self> {
        let base = caller.copied().unwrap_or(Self::SYSTEM_DEFAULT);
        let policy = RebalancePolicy {
            edge_bps: request.edge_bps.unwrap_or(base.edge_bps),
            slippage_bps: request.slippage_bps.unwrap_or(base.slippage_bps),
            deadline_seconds: request.deadline_seconds.unwrap_or(base.deadline_seconds),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// `amount * (10000 - slippage_bps) / 10000`, rounded down.
    pub fn min_amount(&self, amount: U256) -> U256 {
        let keep = U256::from(10_000u16.saturating_sub(self.slippage_bps));
        let denom = U256::from(10_000u16);
        // split so the product never exceeds 256 bits
        let (q, r) = amount.div_mod(denom);
        q * keep + r * keep / denom
    }

    pub fn deadline_from(&self, block_timestamp: u64) -> U256 {
        U256::from(block_timestamp) + U256::from(self.deadline_seconds)
    }
}

/// One contract call of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallStep {
    pub name: &'static str,
    #[serde(serialize_with = "serialize_address")]
    pub target: Address,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub value: U256,
    pub calldata: Bytes,
}

impl CallStep {
    pub fn new(name: &'static str, target: Address, calldata: Bytes) -> Self {
        Self { name, target, value: U256::zero(), calldata }
    }

    pub fn selector(&self) -> Option<[u8; 4]> {
        self.calldata.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// Ordered calls to be submitted one after another, never concurrently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallPlan {
    pub steps: Vec<CallStep>,
}

impl CallPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: CallStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
