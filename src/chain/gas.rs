// src/chain/gas.rs
//
// Gas estimation for a CallPlan.
// - One eth_estimateGas per step, strictly in plan order
// - Later steps often depend on state from earlier ones (allowance, burned NFT),
//   so their estimates are reported as unavailable, never as zero
// - Totals exist only when every step was estimated

use ethers::types::{Address, U256};
use num_traits::ToPrimitive;
use serde::Serialize;

use crate::chain::reader::{ChainReader, ReadCall};
use crate::error::{PlannerError, PlannerResult};
use crate::math::fixed_point::u256_to_biguint;
use crate::models::{serialize_u256_dec, CallPlan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepGas {
    Estimated {
        #[serde(serialize_with = "serialize_u256_dec")]
        gas: U256,
    },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepGasEstimate {
    pub name: &'static str,
    #[serde(flatten)]
    pub gas: StepGas,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanGasEstimate {
    pub steps: Vec<StepGasEstimate>,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub gas_price: U256,
    #[serde(serialize_with = "serialize_opt_u256_dec")]
    pub total_gas: Option<U256>,
    #[serde(serialize_with = "serialize_opt_u256_dec")]
    pub total_cost_wei: Option<U256>,
    /// Lossy native-token rendering of `total_cost_wei`, for reporting only.
    pub total_cost_native: Option<f64>,
}

fn serialize_opt_u256_dec<S: serde::Serializer>(v: &Option<U256>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => s.serialize_str(&v.to_string()),
        None => s.serialize_none(),
    }
}

/// Lossy wei -> native token (18 decimals) conversion for reporting.
#[inline]
pub fn wei_to_native_f64(v: U256) -> f64 {
    u256_to_biguint(v).to_f64().unwrap_or(f64::INFINITY) / 1e18
}

/// Estimates each step as sent by `from`. A failure of the first step aborts the
/// estimate; later reverts are recorded per step.
pub async fn estimate_plan_gas(
    reader: &dyn ChainReader,
    plan: &CallPlan,
    from: Address,
) -> PlannerResult<PlanGasEstimate> {
    let gas_price = reader.gas_price().await?;
    let mut steps = Vec::with_capacity(plan.len());

    for (index, step) in plan.steps.iter().enumerate() {
        let request = ReadCall::new(step.name, step.target, step.calldata.clone()).with_sender(from);
        let gas = match reader.estimate_gas(&request, step.value).await {
            Ok(gas) => StepGas::Estimated { gas },
            Err(PlannerError::SimulationRevert { reason, .. }) if index > 0 => {
                log::warn!("gas for step {} ({}) not estimable: {}", index, step.name, reason);
                StepGas::Unavailable {
                    reason: format!("not estimable before earlier steps execute ({})", reason),
                }
            }
            Err(e) => return Err(e),
        };
        steps.push(StepGasEstimate { name: step.name, gas });
    }

    let total_gas = steps.iter().try_fold(U256::zero(), |acc, s| match &s.gas {
        StepGas::Estimated { gas } => acc.checked_add(*gas),
        StepGas::Unavailable { .. } => None,
    });
    let total_cost_wei = total_gas.and_then(|g| g.checked_mul(gas_price));

    Ok(PlanGasEstimate {
        steps,
        gas_price,
        total_gas,
        total_cost_wei,
        total_cost_native: total_cost_wei.map(wei_to_native_f64),
    })
}
