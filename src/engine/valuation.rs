// Position valuation from simulated calls.
//
// Principal, uncollected fees and farming rewards are each read by simulating the
// owner's own call (eth_call with `from = owner`), concurrently. A failed simulation
// makes that component unavailable; it is never reported as zero, and a total only
// exists when every component behind it is available.

use std::time::Instant;

use ethers::types::{Address, U256};
use serde::Serialize;

use crate::chain::abi::{self, CollectParams, DecreaseLiquidityParams};
use crate::chain::decode::decode_amount_pair;
use crate::chain::position_client::{load_token_meta, PositionSnapshot};
use crate::chain::reader::{ChainReader, ReadCall};
use crate::error::PlannerResult;
use crate::math::fixed_point::TokenUnits;
use crate::math::tick_math::{price_from_tick, TickPrice};
use crate::models::{Deployment, IncentiveKey, TokenMeta};

/// Which side of the pair values are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSide {
    Token0,
    Token1,
}

impl QuoteSide {
    /// Token1 unless `quote_token` names token0 of the position.
    pub fn for_position(snapshot: &PositionSnapshot, quote_token: Option<Address>) -> Self {
        match quote_token {
            Some(t) if t == snapshot.position.token0 => QuoteSide::Token0,
            _ => QuoteSide::Token1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Estimate<T> {
    Available { value: T },
    Unavailable { reason: String },
}

impl<T> Estimate<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Estimate::Available { value } => Some(value),
            Estimate::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Estimate::Available { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairAmounts {
    pub amount0: TokenUnits,
    pub amount1: TokenUnits,
    pub quote_value: TokenUnits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardAmounts {
    pub reward_token: TokenMeta,
    pub reward: TokenUnits,
    pub bonus_reward_token: Option<TokenMeta>,
    pub bonus_reward: Option<TokenUnits>,
    /// Only rewards paid in one of the pair's tokens can be priced from the pool.
    pub quote_value: Estimate<TokenUnits>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionValuation {
    pub quote_side: QuoteSide,
    pub quote_token: TokenMeta,
    pub tick: i32,
    /// token1 per token0 at the pool tick.
    pub price: String,
    pub principal: Estimate<PairAmounts>,
    pub fees: Estimate<PairAmounts>,
    /// None when the deployment has no incentive configured.
    pub rewards: Option<Estimate<RewardAmounts>>,
    pub total_quote_value: Estimate<TokenUnits>,
}

/// Value of raw token0/token1 amounts in quote-side raw units, rounded down.
pub fn quote_value(price: &TickPrice, side: QuoteSide, amount0: &TokenUnits, amount1: &TokenUnits) -> TokenUnits {
    match side {
        QuoteSide::Token1 => TokenUnits::new(
            amount1.raw() + price.token0_to_token1(amount0.raw()),
            amount1.decimals(),
        ),
        QuoteSide::Token0 => TokenUnits::new(
            amount0.raw() + price.token1_to_token0(amount1.raw()),
            amount0.decimals(),
        ),
    }
}

/// decreaseLiquidity(all) as the owner. Zero liquidity is zero principal without a call.
pub async fn simulate_withdrawal(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    snapshot: &PositionSnapshot,
    deadline: U256,
) -> PlannerResult<(U256, U256)> {
    let position = &snapshot.position;
    if position.liquidity == 0 {
        return Ok((U256::zero(), U256::zero()));
    }
    let data = abi::encode_decrease_liquidity(&DecreaseLiquidityParams {
        token_id: position.token_id,
        liquidity: position.liquidity,
        amount0_min: U256::zero(),
        amount1_min: U256::zero(),
        deadline,
    });
    let request = ReadCall::new(abi::DECREASE_LIQUIDITY.name, deployment.position_manager, data)
        .with_sender(snapshot.owner)
        .at_block(Some(snapshot.block.number));
    let out = reader.call(&request).await?;
    decode_amount_pair(abi::DECREASE_LIQUIDITY.name, &out)
}

/// collect(max, max) as the owner: owed tokens plus fees accrued so far.
pub async fn simulate_fee_collection(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    snapshot: &PositionSnapshot,
) -> PlannerResult<(U256, U256)> {
    let data = abi::encode_collect(&CollectParams::all(snapshot.position.token_id, snapshot.owner));
    let request = ReadCall::new(abi::COLLECT.name, deployment.position_manager, data)
        .with_sender(snapshot.owner)
        .at_block(Some(snapshot.block.number));
    let out = reader.call(&request).await?;
    decode_amount_pair(abi::COLLECT.name, &out)
}

/// collectRewards(key, tokenId) as the owner: (reward, bonusReward).
pub async fn simulate_rewards(
    reader: &dyn ChainReader,
    center: Address,
    key: &IncentiveKey,
    snapshot: &PositionSnapshot,
) -> PlannerResult<(U256, U256)> {
    let data = abi::encode_collect_rewards(key, snapshot.position.token_id);
    let request = ReadCall::new(abi::COLLECT_REWARDS.name, center, data)
        .with_sender(snapshot.owner)
        .at_block(Some(snapshot.block.number));
    let out = reader.call(&request).await?;
    decode_amount_pair(abi::COLLECT_REWARDS.name, &out)
}

fn unavailable<T>(component: &str, token_id: U256, reason: impl std::fmt::Display) -> Estimate<T> {
    log::warn!("valuation of position {}: {} unavailable: {}", token_id, component, reason);
    Estimate::Unavailable { reason: reason.to_string() }
}

fn pair_estimate(
    component: &str,
    snapshot: &PositionSnapshot,
    price: &TickPrice,
    side: QuoteSide,
    result: PlannerResult<(U256, U256)>,
) -> Estimate<PairAmounts> {
    match result {
        Ok((a0, a1)) => {
            let amount0 = TokenUnits::from_u256(a0, snapshot.token0.decimals);
            let amount1 = TokenUnits::from_u256(a1, snapshot.token1.decimals);
            let quote_value = quote_value(price, side, &amount0, &amount1);
            Estimate::Available { value: PairAmounts { amount0, amount1, quote_value } }
        }
        Err(e) => unavailable(component, snapshot.position.token_id, e),
    }
}

// Reward token metadata: reuse the pair's, otherwise read it.
async fn reward_meta(reader: &dyn ChainReader, snapshot: &PositionSnapshot, token: Address) -> PlannerResult<TokenMeta> {
    if token == snapshot.token0.address {
        Ok(snapshot.token0.clone())
    } else if token == snapshot.token1.address {
        Ok(snapshot.token1.clone())
    } else {
        load_token_meta(reader, token, Some(snapshot.block.number)).await
    }
}

fn reward_in_quote(
    snapshot: &PositionSnapshot,
    price: &TickPrice,
    side: QuoteSide,
    meta: &TokenMeta,
    amount: &TokenUnits,
) -> Option<TokenUnits> {
    let zero0 = TokenUnits::zero(snapshot.token0.decimals);
    let zero1 = TokenUnits::zero(snapshot.token1.decimals);
    if meta.address == snapshot.token0.address {
        Some(quote_value(price, side, amount, &zero1))
    } else if meta.address == snapshot.token1.address {
        Some(quote_value(price, side, &zero0, amount))
    } else {
        None
    }
}

async fn reward_estimate(
    reader: &dyn ChainReader,
    center: Address,
    key: IncentiveKey,
    snapshot: &PositionSnapshot,
    price: &TickPrice,
    side: QuoteSide,
) -> Estimate<RewardAmounts> {
    let token_id = snapshot.position.token_id;
    let (reward, bonus) = match simulate_rewards(reader, center, &key, snapshot).await {
        Ok(amounts) => amounts,
        Err(e) => return unavailable("rewards", token_id, e),
    };
    let reward_token = match reward_meta(reader, snapshot, key.reward_token).await {
        Ok(meta) => meta,
        Err(e) => return unavailable("rewards", token_id, e),
    };
    let bonus_reward_token = if key.bonus_reward_token.is_zero() {
        None
    } else {
        match reward_meta(reader, snapshot, key.bonus_reward_token).await {
            Ok(meta) => Some(meta),
            Err(e) => return unavailable("rewards", token_id, e),
        }
    };

    let reward = TokenUnits::from_u256(reward, reward_token.decimals);
    let bonus_reward = bonus_reward_token.as_ref().map(|m| TokenUnits::from_u256(bonus, m.decimals));

    let main_value = reward_in_quote(snapshot, price, side, &reward_token, &reward);
    let bonus_value = match (&bonus_reward_token, &bonus_reward) {
        (Some(meta), Some(amount)) if !amount.is_zero() => reward_in_quote(snapshot, price, side, meta, amount),
        _ => main_value.as_ref().map(|v| TokenUnits::zero(v.decimals())),
    };
    let quote_value = match main_value.zip(bonus_value).and_then(|(a, b)| a.checked_add(&b)) {
        Some(value) => Estimate::Available { value },
        None => Estimate::Unavailable {
            reason: "reward token is not one of the position's tokens".to_string(),
        },
    };

    Estimate::Available {
        value: RewardAmounts { reward_token, reward, bonus_reward_token, bonus_reward, quote_value },
    }
}

/// Values principal, fees and (when an incentive is configured) rewards in the quote token.
pub async fn value_position(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    snapshot: &PositionSnapshot,
    side: QuoteSide,
    deadline: U256,
) -> PlannerResult<PositionValuation> {
    let started = Instant::now();
    let price = price_from_tick(snapshot.pool.tick, snapshot.token0.decimals, snapshot.token1.decimals)?;

    let principal_fut = simulate_withdrawal(reader, deployment, snapshot, deadline);
    let fees_fut = simulate_fee_collection(reader, deployment, snapshot);
    let rewards_fut = async {
        match (deployment.farming_center, deployment.incentive) {
            (Some(center), Some(key)) => Some(reward_estimate(reader, center, key, snapshot, &price, side).await),
            _ => None,
        }
    };
    let (principal, fees, rewards) = futures::future::join3(principal_fut, fees_fut, rewards_fut).await;

    let principal = pair_estimate("principal", snapshot, &price, side, principal);
    let fees = pair_estimate("fees", snapshot, &price, side, fees);

    let reward_value = match &rewards {
        None => Some(None),
        Some(Estimate::Available { value }) => value.quote_value.value().map(|v| Some(v.clone())),
        Some(Estimate::Unavailable { .. }) => None,
    };
    let total_quote_value = match (principal.value(), fees.value(), reward_value) {
        (Some(p), Some(f), Some(r)) => {
            let sum = p.quote_value.checked_add(&f.quote_value);
            match (sum, r) {
                (Some(s), Some(r)) => s.checked_add(&r),
                (s, None) => s,
                (None, Some(_)) => None,
            }
            .map(|value| Estimate::Available { value })
            .unwrap_or(Estimate::Unavailable { reason: "component decimals differ".to_string() })
        }
        _ => Estimate::Unavailable {
            reason: "one or more components are unavailable".to_string(),
        },
    };

    let quote_token = match side {
        QuoteSide::Token0 => snapshot.token0.clone(),
        QuoteSide::Token1 => snapshot.token1.clone(),
    };
    log::debug!(
        "valued position {} in {:?} (total available: {})",
        snapshot.position.token_id,
        started.elapsed(),
        total_quote_value.is_available()
    );

    Ok(PositionValuation {
        quote_side: side,
        quote_token,
        tick: snapshot.pool.tick,
        price: price.to_decimal_string(18),
        principal,
        fees,
        rewards,
        total_quote_value,
    })
}
