use rocket::serde::{Deserialize, Serialize};

use crate::chain::abi::FunctionEntry;
use crate::engine::planner::FarmingAction;
use crate::math::range::TickRange;
use crate::math::rebalance::RebalanceEvaluation;
use crate::models::PolicyOverrides;

#[derive(Deserialize, rocket::FromForm)]
pub struct PositionQuery {
    pub edge_bps: Option<u16>,
    pub slippage_bps: Option<u16>,
    pub deadline_seconds: Option<u64>,
    pub width_bump_ticks: Option<u32>,
}

impl PositionQuery {
    pub fn overrides(&self) -> PolicyOverrides {
        PolicyOverrides {
            edge_bps: self.edge_bps,
            slippage_bps: self.slippage_bps,
            deadline_seconds: self.deadline_seconds,
        }
    }
}

/// Pure evaluation of a tick window; no chain access.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub current_tick: i32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    #[serde(default)]
    pub policy: PolicyOverrides,
    /// When set, a range is suggested for windows that need rebalancing.
    pub tick_spacing: Option<i32>,
    #[serde(default)]
    pub width_bump_ticks: u32,
    /// When both are set, the price at `current_tick` is rendered.
    pub decimals0: Option<u8>,
    pub decimals1: Option<u8>,
}

#[derive(Serialize)]
pub struct EvaluateResponse {
    pub timestamp_utc: String,
    pub edge_bps: u16,
    pub evaluation: RebalanceEvaluation,
    pub suggested_range: Option<TickRange>,
    pub price: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub token_in: String,
    pub token_out: String,
    pub account: String,
    /// Decimal amount of token_in, e.g. "1.5".
    pub amount_in: String,
    pub deployer: Option<String>,
    /// Decimal uint160; zero or absent means no limit.
    pub limit_sqrt_price: Option<String>,
    #[serde(default)]
    pub policy: PolicyOverrides,
    #[serde(default)]
    pub estimate_gas: bool,
}

#[derive(Debug, Deserialize)]
pub struct RebalanceRequest {
    pub token_id: String,
    #[serde(default)]
    pub width_bump_ticks: u32,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub policy: PolicyOverrides,
    #[serde(default)]
    pub estimate_gas: bool,
}

#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    pub token_id: String,
    pub recipient: Option<String>,
    #[serde(default)]
    pub estimate_gas: bool,
}

#[derive(Debug, Deserialize)]
pub struct FarmingRequest {
    pub token_id: String,
    pub action: FarmingAction,
    pub recipient: Option<String>,
    #[serde(default)]
    pub estimate_gas: bool,
}

#[derive(Serialize)]
pub struct CatalogueEntry {
    #[serde(flatten)]
    pub function: &'static FunctionEntry,
    pub kind: &'static str,
    pub calldata_len: usize,
}

#[derive(Serialize)]
pub struct CatalogueResponse {
    pub chain_id: u64,
    pub functions: Vec<CatalogueEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub timestamp_utc: String,
    pub kind: &'static str,
    pub message: String,
}
