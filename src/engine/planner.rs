// CallPlan builders
// -----------------
// Pure functions from typed intents (plus freshly read state handed in by the
// caller) to ordered call sequences. No I/O happens here; every amount is already
// in integer units and every address already parsed.

use ethers::types::{Address, U256};
use num_bigint::BigUint;
use serde::Serialize;

use crate::chain::abi::{self, CollectParams, DecreaseLiquidityParams, ExactInputSingleParams, MintParams};
use crate::chain::position_client::PositionSnapshot;
use crate::error::{PlannerError, PlannerResult};
use crate::math::fixed_point::{biguint_to_u256, u256_to_biguint};
use crate::math::range::TickRange;
use crate::math::tick_math::{amounts_for_liquidity, is_aligned, liquidity_for_amounts, sqrt_ratio_at_tick};
use crate::models::{serialize_u256_dec, BlockInfo, CallPlan, CallStep, Deployment, RebalancePolicy};

/// Single-hop exact-input swap, amounts in raw units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlanInput {
    pub token_in: Address,
    pub token_out: Address,
    pub deployer: Address,
    pub recipient: Address,
    pub amount_in: U256,
    /// Quoted output the slippage floor is derived from.
    pub expected_amount_out: U256,
    pub limit_sqrt_price: U256,
}

/// approve(router, amountIn) -> exactInputSingle
pub fn plan_swap(
    deployment: &Deployment,
    input: &SwapPlanInput,
    policy: &RebalancePolicy,
    block: &BlockInfo,
) -> PlannerResult<CallPlan> {
    if input.amount_in.is_zero() {
        return Err(PlannerError::NonPositiveAmount {
            operation: abi::EXACT_INPUT_SINGLE.name,
            input: input.amount_in.to_string(),
        });
    }
    let swap = abi::encode_exact_input_single(&ExactInputSingleParams {
        token_in: input.token_in,
        token_out: input.token_out,
        deployer: input.deployer,
        recipient: input.recipient,
        deadline: policy.deadline_from(block.timestamp),
        amount_in: input.amount_in,
        amount_out_minimum: policy.min_amount(input.expected_amount_out),
        limit_sqrt_price: input.limit_sqrt_price,
    })?;

    let mut plan = CallPlan::new();
    plan.push(CallStep::new(
        abi::APPROVE.name,
        input.token_in,
        abi::encode_approve(deployment.swap_router, input.amount_in),
    ))
    .push(CallStep::new(abi::EXACT_INPUT_SINGLE.name, deployment.swap_router, swap));
    Ok(plan)
}

/// Single collect of everything owed to `recipient`.
pub fn plan_collect_fees(deployment: &Deployment, token_id: U256, recipient: Address) -> CallPlan {
    let mut plan = CallPlan::new();
    plan.push(CallStep::new(
        abi::COLLECT.name,
        deployment.position_manager,
        abi::encode_collect(&CollectParams::all(token_id, recipient)),
    ));
    plan
}

/// Simulated amounts a rebalance is sized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceAmounts {
    /// decreaseLiquidity(full) result.
    pub principal: (U256, U256),
    /// collect(max) result before the withdrawal.
    pub fees: (U256, U256),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebalancePlan {
    pub plan: CallPlan,
    pub new_range: TickRange,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub amount0_desired: U256,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub amount1_desired: U256,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub amount0_min: U256,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub amount1_min: U256,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub expected_liquidity: U256,
}

fn overflow(operation: &'static str, field: &'static str, value: &BigUint) -> PlannerError {
    PlannerError::EncodingOverflow { operation, field, value: value.to_string(), bits: 256 }
}

fn checked_sum(field: &'static str, a: U256, b: U256) -> PlannerResult<U256> {
    a.checked_add(b).ok_or_else(|| overflow(abi::MINT.name, field, &(u256_to_biguint(a) + u256_to_biguint(b))))
}

/// decreaseLiquidity -> collect -> burn -> approve token0 -> approve token1 -> mint
///
/// Withdrawn principal plus fees are re-deposited into `new_range` at the current
/// price. Mint minimums come from the amounts the expected liquidity would consume,
/// reduced by the slippage policy.
pub fn plan_rebalance(
    deployment: &Deployment,
    snapshot: &PositionSnapshot,
    new_range: TickRange,
    amounts: &RebalanceAmounts,
    policy: &RebalancePolicy,
) -> PlannerResult<RebalancePlan> {
    let position = &snapshot.position;
    let spacing = snapshot.pool.tick_spacing;
    if !is_aligned(new_range.lower, spacing) || !is_aligned(new_range.upper, spacing) {
        return Err(PlannerError::InvalidRange { lower: new_range.lower, upper: new_range.upper });
    }

    let owner = snapshot.owner;
    let npm = deployment.position_manager;
    let deadline = policy.deadline_from(snapshot.block.timestamp);

    let amount0_desired = checked_sum("amount0Desired", amounts.principal.0, amounts.fees.0)?;
    let amount1_desired = checked_sum("amount1Desired", amounts.principal.1, amounts.fees.1)?;
    if amount0_desired.is_zero() && amount1_desired.is_zero() {
        return Err(PlannerError::NonPositiveAmount { operation: abi::MINT.name, input: "0".to_string() });
    }

    let sp = u256_to_biguint(snapshot.pool.sqrt_price_x96);
    let sa = sqrt_ratio_at_tick(new_range.lower)?;
    let sb = sqrt_ratio_at_tick(new_range.upper)?;
    let liquidity = liquidity_for_amounts(
        &sp,
        &sa,
        &sb,
        &u256_to_biguint(amount0_desired),
        &u256_to_biguint(amount1_desired),
    );
    let (used0, used1) = amounts_for_liquidity(&sp, &sa, &sb, &liquidity);
    let to_u256 = |field, v: &BigUint| biguint_to_u256(v).ok_or_else(|| overflow(abi::MINT.name, field, v));
    let amount0_min = policy.min_amount(to_u256("amount0Min", &used0)?);
    let amount1_min = policy.min_amount(to_u256("amount1Min", &used1)?);
    let expected_liquidity = to_u256("liquidity", &liquidity)?;

    let mut plan = CallPlan::new();
    if position.liquidity > 0 {
        plan.push(CallStep::new(
            abi::DECREASE_LIQUIDITY.name,
            npm,
            abi::encode_decrease_liquidity(&DecreaseLiquidityParams {
                token_id: position.token_id,
                liquidity: position.liquidity,
                amount0_min: policy.min_amount(amounts.principal.0),
                amount1_min: policy.min_amount(amounts.principal.1),
                deadline,
            }),
        ));
    }
    plan.push(CallStep::new(
        abi::COLLECT.name,
        npm,
        abi::encode_collect(&CollectParams::all(position.token_id, owner)),
    ))
    .push(CallStep::new(abi::BURN.name, npm, abi::encode_burn(position.token_id)))
    .push(CallStep::new(abi::APPROVE.name, position.token0, abi::encode_approve(npm, amount0_desired)))
    .push(CallStep::new(abi::APPROVE.name, position.token1, abi::encode_approve(npm, amount1_desired)))
    .push(CallStep::new(
        abi::MINT.name,
        npm,
        abi::encode_mint(&MintParams {
            token0: position.token0,
            token1: position.token1,
            deployer: position.deployer,
            tick_lower: new_range.lower,
            tick_upper: new_range.upper,
            amount0_desired,
            amount1_desired,
            amount0_min,
            amount1_min,
            recipient: owner,
            deadline,
        })?,
    ));

    Ok(RebalancePlan {
        plan,
        new_range,
        amount0_desired,
        amount1_desired,
        amount0_min,
        amount1_min,
        expected_liquidity,
    })
}

/// Farming lifecycle step requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmingAction {
    Enter,
    CollectRewards,
    Exit,
}

impl FarmingAction {
    /// Farming center function that carries the action.
    pub fn operation(self) -> &'static str {
        match self {
            FarmingAction::Enter => abi::ENTER_FARMING.name,
            FarmingAction::CollectRewards => abi::COLLECT_REWARDS.name,
            FarmingAction::Exit => abi::EXIT_FARMING.name,
        }
    }
}

/// approveForFarming -> enterFarming
pub fn plan_enter_farming(deployment: &Deployment, token_id: U256) -> PlannerResult<CallPlan> {
    let op = abi::ENTER_FARMING.name;
    let center = deployment.require_farming_center(op)?;
    let key = deployment.require_incentive(op)?;

    let mut plan = CallPlan::new();
    plan.push(CallStep::new(
        abi::APPROVE_FOR_FARMING.name,
        deployment.position_manager,
        abi::encode_approve_for_farming(token_id, true, center),
    ))
    .push(CallStep::new(op, center, abi::encode_enter_farming(&key, token_id)));
    Ok(plan)
}

fn push_claims(plan: &mut CallPlan, center: Address, reward_token: Address, bonus_token: Address, to: Address) {
    // amountRequested = 0 claims the whole accrued balance
    plan.push(CallStep::new(
        abi::CLAIM_REWARD.name,
        center,
        abi::encode_claim_reward(reward_token, to, U256::zero()),
    ));
    if !bonus_token.is_zero() && bonus_token != reward_token {
        plan.push(CallStep::new(
            abi::CLAIM_REWARD.name,
            center,
            abi::encode_claim_reward(bonus_token, to, U256::zero()),
        ));
    }
}

/// exitFarming -> claimReward(reward) [-> claimReward(bonus)]
pub fn plan_exit_farming(deployment: &Deployment, token_id: U256, recipient: Address) -> PlannerResult<CallPlan> {
    let op = abi::EXIT_FARMING.name;
    let center = deployment.require_farming_center(op)?;
    let key = deployment.require_incentive(op)?;

    let mut plan = CallPlan::new();
    plan.push(CallStep::new(op, center, abi::encode_exit_farming(&key, token_id)));
    push_claims(&mut plan, center, key.reward_token, key.bonus_reward_token, recipient);
    Ok(plan)
}

/// collectRewards -> claimReward(reward) [-> claimReward(bonus)]
pub fn plan_collect_rewards(deployment: &Deployment, token_id: U256, recipient: Address) -> PlannerResult<CallPlan> {
    let op = abi::COLLECT_REWARDS.name;
    let center = deployment.require_farming_center(op)?;
    let key = deployment.require_incentive(op)?;

    let mut plan = CallPlan::new();
    plan.push(CallStep::new(op, center, abi::encode_collect_rewards(&key, token_id)));
    push_claims(&mut plan, center, key.reward_token, key.bonus_reward_token, recipient);
    Ok(plan)
}

pub fn plan_farming(
    deployment: &Deployment,
    action: FarmingAction,
    token_id: U256,
    recipient: Address,
) -> PlannerResult<CallPlan> {
    match action {
        FarmingAction::Enter => plan_enter_farming(deployment, token_id),
        FarmingAction::CollectRewards => plan_collect_rewards(deployment, token_id, recipient),
        FarmingAction::Exit => plan_exit_farming(deployment, token_id, recipient),
    }
}
