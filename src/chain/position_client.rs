// Fresh on-chain state for one planning operation: position, owner, pool, tokens
// and quotes. Independent reads run concurrently; nothing is cached between calls.

use std::time::Instant;

use ethers::types::{Address, U256};
use serde::Serialize;

use crate::chain::abi;
use crate::chain::decode;
use crate::chain::reader::{ensure_chain_id, ChainReader, ReadCall};
use crate::error::{PlannerError, PlannerResult};
use crate::math::tick_math::is_aligned;
use crate::models::{format_address, BlockInfo, Deployment, PoolState, Position, Quote, TokenMeta};

/// Everything the analytics need about one position, read at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionSnapshot {
    pub position: Position,
    #[serde(serialize_with = "serialize_owner")]
    pub owner: Address,
    pub pool: PoolState,
    pub token0: TokenMeta,
    pub token1: TokenMeta,
    pub block: BlockInfo,
}

fn serialize_owner<S: serde::Serializer>(owner: &Address, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_address(owner))
}

pub async fn load_position(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    token_id: U256,
    block: Option<u64>,
) -> PlannerResult<Position> {
    let request = ReadCall::new(abi::POSITIONS.name, deployment.position_manager, abi::encode_positions(token_id))
        .at_block(block);
    let data = reader.call(&request).await?;
    let position = decode::decode_position(token_id, &data)?;
    if position.tick_upper <= position.tick_lower {
        return Err(PlannerError::InvalidRange { lower: position.tick_lower, upper: position.tick_upper });
    }
    Ok(position)
}

pub async fn load_owner(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    token_id: U256,
    block: Option<u64>,
) -> PlannerResult<Address> {
    let request = ReadCall::new(abi::OWNER_OF.name, deployment.position_manager, abi::encode_owner_of(token_id))
        .at_block(block);
    let data = reader.call(&request).await?;
    decode::decode_address(abi::OWNER_OF.name, &data, 0)
}

/// Pool for the position's pair: the base factory pool, or the custom one for a deployer.
pub async fn resolve_pool(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    token0: Address,
    token1: Address,
    deployer: Address,
    block: Option<u64>,
) -> PlannerResult<Address> {
    let (function, data) = if deployer.is_zero() {
        (abi::POOL_BY_PAIR, abi::encode_pool_by_pair(token0, token1))
    } else {
        (abi::CUSTOM_POOL_BY_PAIR, abi::encode_custom_pool_by_pair(deployer, token0, token1))
    };
    let request = ReadCall::new(function.name, deployment.factory, data).at_block(block);
    let out = reader.call(&request).await?;
    let pool = decode::decode_address(function.name, &out, 0)?;
    if pool.is_zero() {
        return Err(PlannerError::MalformedReturnData {
            operation: function.name,
            detail: format!(
                "factory has no pool for {} / {} (deployer {})",
                format_address(&token0),
                format_address(&token1),
                format_address(&deployer)
            ),
        });
    }
    Ok(pool)
}

pub async fn load_pool_state(reader: &dyn ChainReader, pool: Address, block: Option<u64>) -> PlannerResult<PoolState> {
    let state_request = ReadCall::new(abi::GLOBAL_STATE.name, pool, abi::encode_global_state()).at_block(block);
    let spacing_request = ReadCall::new(abi::TICK_SPACING.name, pool, abi::encode_tick_spacing()).at_block(block);
    let (state, spacing) = tokio::try_join!(reader.call(&state_request), reader.call(&spacing_request))?;
    let state = decode::decode_global_state(&state)?;
    Ok(PoolState {
        address: pool,
        tick: state.tick,
        tick_spacing: decode::decode_tick_spacing(&spacing)?,
        sqrt_price_x96: state.sqrt_price_x96,
    })
}

pub async fn load_token_meta(reader: &dyn ChainReader, token: Address, block: Option<u64>) -> PlannerResult<TokenMeta> {
    let symbol_request = ReadCall::new(abi::SYMBOL.name, token, abi::encode_symbol()).at_block(block);
    let decimals_request = ReadCall::new(abi::DECIMALS.name, token, abi::encode_decimals()).at_block(block);
    let (symbol, decimals) = tokio::try_join!(reader.call(&symbol_request), reader.call(&decimals_request))?;
    Ok(TokenMeta {
        address: token,
        symbol: decode::decode_symbol(&symbol)?,
        decimals: decode::decode_decimals(&decimals)?,
    })
}

/// Reads position, owner, pool state and token metadata after checking the chain id.
/// Every read is pinned to the block fetched first.
pub async fn load_position_snapshot(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    token_id: U256,
) -> PlannerResult<PositionSnapshot> {
    let started = Instant::now();
    ensure_chain_id(reader, deployment.chain_id, abi::POSITIONS.name).await?;
    let block = reader.latest_block().await?;
    let at = Some(block.number);

    let (position, owner) = tokio::try_join!(
        load_position(reader, deployment, token_id, at),
        load_owner(reader, deployment, token_id, at),
    )?;
    log::debug!("position {} loaded in {:?}", token_id, started.elapsed());

    let pool_address = resolve_pool(reader, deployment, position.token0, position.token1, position.deployer, at).await?;
    let (pool, token0, token1) = tokio::try_join!(
        load_pool_state(reader, pool_address, at),
        load_token_meta(reader, position.token0, at),
        load_token_meta(reader, position.token1, at),
    )?;

    if !is_aligned(position.tick_lower, pool.tick_spacing) || !is_aligned(position.tick_upper, pool.tick_spacing) {
        return Err(PlannerError::InvalidRange { lower: position.tick_lower, upper: position.tick_upper });
    }

    log::info!(
        "snapshot of position {} (pool {}, tick {}) at block {} in {:?}",
        token_id,
        format_address(&pool.address),
        pool.tick,
        block.number,
        started.elapsed()
    );
    Ok(PositionSnapshot { position, owner, pool, token0, token1, block })
}

/// Simulated single-hop exact-input quote against the QuoterV2 contract, computed at `block`.
pub async fn quote_exact_input_single(
    reader: &dyn ChainReader,
    deployment: &Deployment,
    token_in: Address,
    token_out: Address,
    deployer: Address,
    amount_in: U256,
    block: u64,
) -> PlannerResult<Quote> {
    let data = abi::encode_quote_exact_input_single(token_in, token_out, deployer, amount_in, U256::zero())?;
    let request = ReadCall::new(abi::QUOTE_EXACT_INPUT_SINGLE.name, deployment.quoter, data).at_block(Some(block));
    let out = reader.call(&request).await?;
    decode::decode_quote(&out, block)
}
