use std::time::Instant;

use ethers::types::{Address, U256};
use serde::Serialize;

use crate::chain::abi;
use crate::chain::gas::{estimate_plan_gas, PlanGasEstimate};
use crate::chain::position_client::{
    load_owner, load_position_snapshot, load_token_meta, quote_exact_input_single, PositionSnapshot,
};
use crate::chain::reader::{ensure_chain_id, ChainReader};
use crate::engine::planner::{
    plan_collect_fees, plan_farming, plan_rebalance, plan_swap, FarmingAction, RebalanceAmounts, RebalancePlan,
    SwapPlanInput,
};
use crate::engine::valuation::{simulate_fee_collection, simulate_withdrawal, value_position, PositionValuation, QuoteSide};
use crate::error::PlannerResult;
use crate::math::fixed_point::{to_positive_units, TokenUnits};
use crate::math::range::{suggest_range, TickRange};
use crate::math::rebalance::{evaluate, RebalanceEvaluation};
use crate::math::tick_math::price_from_tick;
use crate::models::{CallPlan, Deployment, PolicyOverrides, Quote, RebalancePolicy, TokenMeta};

fn now_utc() -> String {
    chrono::Utc::now().to_rfc3339()
}

async fn maybe_estimate(
    reader: &dyn ChainReader,
    plan: &CallPlan,
    from: Address,
    wanted: bool,
) -> PlannerResult<Option<PlanGasEstimate>> {
    if !wanted {
        return Ok(None);
    }
    let started = Instant::now();
    let estimate = estimate_plan_gas(reader, plan, from).await?;
    log::debug!("gas estimation for {} step(s) completed in {:?}", plan.len(), started.elapsed());
    Ok(Some(estimate))
}

/// Caller-level knobs shared by every planning operation.
#[derive(Debug, Clone, Default)]
pub struct PlanningContext {
    pub caller_policy: Option<RebalancePolicy>,
    pub quote_token: Option<Address>,
}

impl PlanningContext {
    pub fn policy(&self, overrides: &PolicyOverrides) -> PlannerResult<RebalancePolicy> {
        RebalancePolicy::resolve(overrides, self.caller_policy.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Position analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PositionAnalysis {
    pub timestamp_utc: String,
    pub chain_id: u64,
    pub snapshot: PositionSnapshot,
    pub policy: RebalancePolicy,
    /// token1 per token0 at the pool tick.
    pub price: String,
    pub evaluation: RebalanceEvaluation,
    /// Only present when a rebalance is warranted.
    pub suggested_range: Option<TickRange>,
    pub valuation: PositionValuation,
}

pub async fn analyze_position(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    ctx: &PlanningContext,
    token_id: U256,
    overrides: &PolicyOverrides,
    width_bump_ticks: u32,
) -> PlannerResult<PositionAnalysis> {
    let started = Instant::now();
    log::info!("analyzing position {}", token_id);
    let policy = ctx.policy(overrides)?;

    let snapshot = load_position_snapshot(reader, deployment, token_id).await?;
    let position = &snapshot.position;
    let pool = &snapshot.pool;

    let evaluation = evaluate(pool.tick, position.tick_lower, position.tick_upper, policy.edge_bps)?;
    let suggested_range = if evaluation.should_rebalance {
        Some(suggest_range(
            pool.tick,
            position.tick_lower,
            position.tick_upper,
            pool.tick_spacing,
            width_bump_ticks,
        )?)
    } else {
        None
    };
    let price = price_from_tick(pool.tick, snapshot.token0.decimals, snapshot.token1.decimals)?;

    let side = QuoteSide::for_position(&snapshot, ctx.quote_token);
    let valuation = value_position(reader, deployment, &snapshot, side, policy.deadline_from(snapshot.block.timestamp)).await?;

    log::info!(
        "position {} analyzed in {:?}: {:?}, rebalance={}",
        token_id,
        started.elapsed(),
        evaluation.reason,
        evaluation.should_rebalance
    );

    Ok(PositionAnalysis {
        timestamp_utc: now_utc(),
        chain_id: deployment.chain_id,
        price: price.to_decimal_string(18),
        snapshot,
        policy,
        evaluation,
        suggested_range,
        valuation,
    })
}

// ---------------------------------------------------------------------------
// Swap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
    pub token_in: Address,
    pub token_out: Address,
    /// Zero for base factory pools.
    pub deployer: Address,
    /// Sender of the plan and recipient of the output.
    pub account: Address,
    /// Human decimal amount of `token_in`.
    pub amount_in: String,
    pub limit_sqrt_price: U256,
    pub policy: PolicyOverrides,
    pub estimate_gas: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapPlanReport {
    pub timestamp_utc: String,
    pub token_in: TokenMeta,
    pub token_out: TokenMeta,
    pub amount_in: TokenUnits,
    pub quote: Quote,
    pub expected_amount_out: TokenUnits,
    pub min_amount_out: TokenUnits,
    pub policy: RebalancePolicy,
    pub plan: CallPlan,
    pub gas: Option<PlanGasEstimate>,
}

pub async fn plan_swap_intent(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    ctx: &PlanningContext,
    intent: &SwapIntent,
) -> PlannerResult<SwapPlanReport> {
    let started = Instant::now();
    let policy = ctx.policy(&intent.policy)?;
    ensure_chain_id(reader, deployment.chain_id, abi::EXACT_INPUT_SINGLE.name).await?;

    let block = reader.latest_block().await?;
    let at = Some(block.number);
    let (token_in, token_out) = tokio::try_join!(
        load_token_meta(reader, intent.token_in, at),
        load_token_meta(reader, intent.token_out, at),
    )?;
    let amount_in = to_positive_units("exactInputSingle", &intent.amount_in, token_in.decimals)?
        .to_u256("exactInputSingle", "amountIn")?;
    log::debug!("swap inputs read in {:?}", started.elapsed());

    let quote = quote_exact_input_single(
        reader,
        deployment,
        intent.token_in,
        intent.token_out,
        intent.deployer,
        amount_in,
        block.number,
    )
    .await?;
    log::info!(
        "quoted {} {} -> {} {} (fee {}, {} tick(s) crossed)",
        amount_in,
        token_in.symbol,
        quote.amount_out,
        token_out.symbol,
        quote.fee_tier,
        quote.initialized_ticks_crossed
    );

    let plan = plan_swap(
        deployment,
        &SwapPlanInput {
            token_in: intent.token_in,
            token_out: intent.token_out,
            deployer: intent.deployer,
            recipient: intent.account,
            amount_in,
            expected_amount_out: quote.amount_out,
            limit_sqrt_price: intent.limit_sqrt_price,
        },
        &policy,
        &block,
    )?;
    let gas = maybe_estimate(reader, &plan, intent.account, intent.estimate_gas).await?;

    Ok(SwapPlanReport {
        timestamp_utc: now_utc(),
        amount_in: TokenUnits::from_u256(amount_in, token_in.decimals),
        expected_amount_out: TokenUnits::from_u256(quote.amount_out, token_out.decimals),
        min_amount_out: TokenUnits::from_u256(policy.min_amount(quote.amount_out), token_out.decimals),
        token_in,
        token_out,
        quote,
        policy,
        plan,
        gas,
    })
}

// ---------------------------------------------------------------------------
// Rebalance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceIntent {
    pub token_id: U256,
    pub width_bump_ticks: u32,
    /// Plan even when the position is healthy.
    pub force: bool,
    pub policy: PolicyOverrides,
    pub estimate_gas: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceReport {
    pub timestamp_utc: String,
    pub snapshot: PositionSnapshot,
    pub policy: RebalancePolicy,
    pub evaluation: RebalanceEvaluation,
    /// None when the position is healthy and the rebalance was not forced.
    pub rebalance: Option<RebalancePlan>,
    pub gas: Option<PlanGasEstimate>,
}

pub async fn plan_rebalance_intent(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    ctx: &PlanningContext,
    intent: &RebalanceIntent,
) -> PlannerResult<RebalanceReport> {
    let started = Instant::now();
    let policy = ctx.policy(&intent.policy)?;
    let snapshot = load_position_snapshot(reader, deployment, intent.token_id).await?;
    let (position, pool) = (&snapshot.position, &snapshot.pool);

    let evaluation = evaluate(pool.tick, position.tick_lower, position.tick_upper, policy.edge_bps)?;
    if !evaluation.should_rebalance && !intent.force {
        log::info!("position {} is healthy ({:?}), no rebalance planned", intent.token_id, evaluation.reason);
        return Ok(RebalanceReport {
            timestamp_utc: now_utc(),
            snapshot,
            policy,
            evaluation,
            rebalance: None,
            gas: None,
        });
    }

    let new_range = suggest_range(
        pool.tick,
        position.tick_lower,
        position.tick_upper,
        pool.tick_spacing,
        intent.width_bump_ticks,
    )?;
    let deadline = policy.deadline_from(snapshot.block.timestamp);

    // both amounts size the mint, so either failing aborts the plan
    let (principal, fees) = tokio::try_join!(
        simulate_withdrawal(reader, deployment, &snapshot, deadline),
        simulate_fee_collection(reader, deployment, &snapshot),
    )?;
    log::debug!(
        "simulated withdrawal ({}, {}) and fees ({}, {}) for position {}",
        principal.0,
        principal.1,
        fees.0,
        fees.1,
        intent.token_id
    );

    let rebalance = plan_rebalance(deployment, &snapshot, new_range, &RebalanceAmounts { principal, fees }, &policy)?;
    let gas = maybe_estimate(reader, &rebalance.plan, snapshot.owner, intent.estimate_gas).await?;

    log::info!(
        "rebalance of position {} planned in {:?}: [{}, {}) -> [{}, {})",
        intent.token_id,
        started.elapsed(),
        position.tick_lower,
        position.tick_upper,
        new_range.lower,
        new_range.upper
    );

    Ok(RebalanceReport {
        timestamp_utc: now_utc(),
        snapshot,
        policy,
        evaluation,
        rebalance: Some(rebalance),
        gas,
    })
}

// ---------------------------------------------------------------------------
// Fees and farming
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OwnerPlanReport {
    pub timestamp_utc: String,
    #[serde(serialize_with = "crate::models::serialize_u256_dec")]
    pub token_id: U256,
    #[serde(serialize_with = "serialize_address")]
    pub owner: Address,
    pub plan: CallPlan,
    pub gas: Option<PlanGasEstimate>,
}

fn serialize_address<S: serde::Serializer>(a: &Address, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&crate::models::format_address(a))
}

/// Collect of all owed tokens to `recipient` (the owner when None).
pub async fn plan_collect_intent(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    token_id: U256,
    recipient: Option<Address>,
    estimate_gas: bool,
) -> PlannerResult<OwnerPlanReport> {
    ensure_chain_id(reader, deployment.chain_id, abi::COLLECT.name).await?;
    let owner = load_owner(reader, deployment, token_id, None).await?;
    let plan = plan_collect_fees(deployment, token_id, recipient.unwrap_or(owner));
    let gas = maybe_estimate(reader, &plan, owner, estimate_gas).await?;
    Ok(OwnerPlanReport { timestamp_utc: now_utc(), token_id, owner, plan, gas })
}

pub async fn plan_farming_intent(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    action: FarmingAction,
    token_id: U256,
    recipient: Option<Address>,
    estimate_gas: bool,
) -> PlannerResult<OwnerPlanReport> {
    ensure_chain_id(reader, deployment.chain_id, action.operation()).await?;
    let owner = load_owner(reader, deployment, token_id, None).await?;
    let plan = plan_farming(deployment, action, token_id, recipient.unwrap_or(owner))?;
    log::info!("farming {:?} for position {} planned as {:?}", action, token_id, plan.step_names());
    let gas = maybe_estimate(reader, &plan, owner, estimate_gas).await?;
    Ok(OwnerPlanReport { timestamp_utc: now_utc(), token_id, owner, plan, gas })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{address_word, int_word, MockReader};
    use crate::models::IncentiveKey;

    const CHAIN: u64 = 8453;

    fn npm() -> Address {
        Address::repeat_byte(0xa1)
    }

    fn deployment() -> Deployment {
        Deployment {
            chain_id: CHAIN,
            position_manager: npm(),
            swap_router: Address::repeat_byte(0xa2),
            quoter: Address::repeat_byte(0xa3),
            factory: Address::repeat_byte(0xa4),
            farming_center: Some(Address::repeat_byte(0xa5)),
            incentive: Some(IncentiveKey {
                reward_token: Address::repeat_byte(0x11),
                bonus_reward_token: Address::zero(),
                pool: Address::repeat_byte(0x33),
                nonce: U256::zero(),
            }),
        }
    }

    // position [-600, 600) in a spacing-60 pool at `tick`
    fn seed_position(reader: &MockReader, tick: i32) {
        let d = deployment();
        let (t0, t1, pool, owner) =
            (Address::repeat_byte(0x11), Address::repeat_byte(0x22), Address::repeat_byte(0x33), Address::repeat_byte(0x44));
        reader.returns(
            npm(),
            abi::POSITIONS.selector,
            &[
                U256::zero(),
                U256::zero(),
                address_word(t0),
                address_word(t1),
                U256::zero(),
                int_word(-600),
                int_word(600),
                U256::from(1_000_000_000u64),
                U256::zero(),
                U256::zero(),
                U256::zero(),
                U256::zero(),
            ],
        );
        reader.returns(npm(), abi::OWNER_OF.selector, &[address_word(owner)]);
        reader.returns(d.factory, abi::POOL_BY_PAIR.selector, &[address_word(pool)]);
        let sqrt = crate::math::fixed_point::biguint_to_u256(
            &crate::math::tick_math::sqrt_ratio_at_tick(tick).expect("in domain"),
        )
        .expect("fits");
        reader.returns(
            pool,
            abi::GLOBAL_STATE.selector,
            &[sqrt, int_word(tick), U256::from(500), U256::zero(), U256::zero(), U256::one()],
        );
        reader.returns(pool, abi::TICK_SPACING.selector, &[int_word(60)]);
        for t in [t0, t1] {
            reader.returns(t, abi::DECIMALS.selector, &[U256::from(18)]);
            reader.returns(t, abi::SYMBOL.selector, &[U256::from_big_endian(&[b'T'; 32])]);
        }
    }

    #[tokio::test]
    async fn test_healthy_position_is_not_rebalanced() {
        let reader = MockReader::new(CHAIN);
        seed_position(&reader, 0);
        let intent = RebalanceIntent {
            token_id: U256::from(7),
            width_bump_ticks: 0,
            force: false,
            policy: PolicyOverrides::default(),
            estimate_gas: false,
        };
        let report = plan_rebalance_intent(&reader, &deployment(), &PlanningContext::default(), &intent)
            .await
            .expect("report");
        assert!(!report.evaluation.should_rebalance);
        assert!(report.rebalance.is_none());
        assert!(reader.recorded().iter().all(|c| c.operation != abi::DECREASE_LIQUIDITY.name));
    }

    #[tokio::test]
    async fn test_out_of_range_position_gets_a_plan() {
        let reader = MockReader::new(CHAIN);
        seed_position(&reader, 900);
        reader.returns(npm(), abi::DECREASE_LIQUIDITY.selector, &[U256::zero(), U256::from(60_000_000u64)]);
        reader.returns(npm(), abi::COLLECT.selector, &[U256::from(10), U256::from(20)]);
        let intent = RebalanceIntent {
            token_id: U256::from(7),
            width_bump_ticks: 0,
            force: false,
            policy: PolicyOverrides::default(),
            estimate_gas: false,
        };
        let report = plan_rebalance_intent(&reader, &deployment(), &PlanningContext::default(), &intent)
            .await
            .expect("report");
        let rebalance = report.rebalance.expect("planned");
        assert!(rebalance.new_range.contains(900));
        assert_eq!(rebalance.new_range.width(), 1200);
        assert_eq!(
            rebalance.plan.step_names(),
            vec!["decreaseLiquidity", "collect", "burn", "approve", "approve", "mint"]
        );
        assert_eq!(rebalance.amount1_desired, U256::from(60_000_020u64));
    }

    #[tokio::test]
    async fn test_rebalance_aborts_when_withdrawal_reverts() {
        let reader = MockReader::new(CHAIN);
        seed_position(&reader, 900);
        reader.reverts(npm(), abi::DECREASE_LIQUIDITY.selector, "execution reverted: Not approved");
        reader.returns(npm(), abi::COLLECT.selector, &[U256::zero(), U256::zero()]);
        let intent = RebalanceIntent {
            token_id: U256::from(7),
            width_bump_ticks: 0,
            force: true,
            policy: PolicyOverrides::default(),
            estimate_gas: false,
        };
        let err = plan_rebalance_intent(&reader, &deployment(), &PlanningContext::default(), &intent)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "simulation_revert");
    }

    #[tokio::test]
    async fn test_farming_defaults_recipient_to_owner() {
        let reader = MockReader::new(CHAIN);
        reader.returns(npm(), abi::OWNER_OF.selector, &[address_word(Address::repeat_byte(0x44))]);
        let report = plan_farming_intent(&reader, &deployment(), FarmingAction::Exit, U256::from(7), None, false)
            .await
            .expect("plan");
        assert_eq!(report.owner, Address::repeat_byte(0x44));
        assert_eq!(report.plan.step_names(), vec!["exitFarming", "claimReward"]);
        let claim = &report.plan.steps[1].calldata;
        assert_eq!(&claim[4 + 32 + 12..4 + 64], Address::repeat_byte(0x44).as_bytes());
    }

    #[tokio::test]
    async fn test_wrong_chain_is_fatal_before_any_call() {
        let reader = MockReader::new(1);
        let err = plan_collect_intent(&reader, &deployment(), U256::from(7), None, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "chain_id_mismatch");
        assert!(reader.recorded().is_empty());
    }
}
