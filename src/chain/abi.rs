// Calldata catalogue and encoders
// -------------------------------
// Every supported call has one canonical signature and a literal selector. All
// parameters in this catalogue are static, so a tuple argument is laid out inline
// and the calldata length is fixed per function: 4 + 32 * words.
//
// Integer fields narrower than 256 bits are range-checked before any bytes are
// produced; nothing is truncated or wrapped.

use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, U256};
use serde::{Serialize, Serializer};

use crate::error::{PlannerError, PlannerResult};
use crate::models::IncentiveKey;

pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

const INT24_MIN: i32 = -(1 << 23);
const INT24_MAX: i32 = (1 << 23) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunctionEntry {
    pub name: &'static str,
    pub signature: &'static str,
    #[serde(serialize_with = "serialize_selector")]
    pub selector: [u8; 4],
    /// Number of 32-byte argument words.
    pub words: usize,
}

fn serialize_selector<S: Serializer>(selector: &[u8; 4], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(selector)))
}

impl FunctionEntry {
    pub const fn calldata_len(&self) -> usize {
        4 + 32 * self.words
    }
}

// ---- write calls ----

pub const APPROVE: FunctionEntry = FunctionEntry {
    name: "approve",
    signature: "approve(address,uint256)",
    selector: [0x09, 0x5e, 0xa7, 0xb3],
    words: 2,
};

pub const EXACT_INPUT_SINGLE: FunctionEntry = FunctionEntry {
    name: "exactInputSingle",
    signature: "exactInputSingle((address,address,address,address,uint256,uint256,uint256,uint160))",
    selector: [0x16, 0x79, 0xc7, 0x92],
    words: 8,
};

pub const COLLECT: FunctionEntry = FunctionEntry {
    name: "collect",
    signature: "collect((uint256,address,uint128,uint128))",
    selector: [0xfc, 0x6f, 0x78, 0x65],
    words: 4,
};

pub const DECREASE_LIQUIDITY: FunctionEntry = FunctionEntry {
    name: "decreaseLiquidity",
    signature: "decreaseLiquidity((uint256,uint128,uint256,uint256,uint256))",
    selector: [0x0c, 0x49, 0xcc, 0xbe],
    words: 5,
};

pub const BURN: FunctionEntry = FunctionEntry {
    name: "burn",
    signature: "burn(uint256)",
    selector: [0x42, 0x96, 0x6c, 0x68],
    words: 1,
};

pub const MINT: FunctionEntry = FunctionEntry {
    name: "mint",
    signature: "mint((address,address,address,int24,int24,uint256,uint256,uint256,uint256,address,uint256))",
    selector: [0xfe, 0x3f, 0x3b, 0xe7],
    words: 11,
};

pub const APPROVE_FOR_FARMING: FunctionEntry = FunctionEntry {
    name: "approveForFarming",
    signature: "approveForFarming(uint256,bool,address)",
    selector: [0x83, 0x2f, 0x63, 0x0a],
    words: 3,
};

pub const ENTER_FARMING: FunctionEntry = FunctionEntry {
    name: "enterFarming",
    signature: "enterFarming((address,address,address,uint256),uint256)",
    selector: [0x57, 0x39, 0xf0, 0xb9],
    words: 5,
};

pub const EXIT_FARMING: FunctionEntry = FunctionEntry {
    name: "exitFarming",
    signature: "exitFarming((address,address,address,uint256),uint256)",
    selector: [0x44, 0x73, 0xec, 0xa6],
    words: 5,
};

pub const COLLECT_REWARDS: FunctionEntry = FunctionEntry {
    name: "collectRewards",
    signature: "collectRewards((address,address,address,uint256),uint256)",
    selector: [0x6a, 0xf0, 0x0a, 0xee],
    words: 5,
};

pub const CLAIM_REWARD: FunctionEntry = FunctionEntry {
    name: "claimReward",
    signature: "claimReward(address,address,uint256)",
    selector: [0x2f, 0x2d, 0x78, 0x3d],
    words: 3,
};

// ---- read calls ----

pub const POSITIONS: FunctionEntry = FunctionEntry {
    name: "positions",
    signature: "positions(uint256)",
    selector: [0x99, 0xfb, 0xab, 0x88],
    words: 1,
};

pub const OWNER_OF: FunctionEntry = FunctionEntry {
    name: "ownerOf",
    signature: "ownerOf(uint256)",
    selector: [0x63, 0x52, 0x21, 0x1e],
    words: 1,
};

pub const GLOBAL_STATE: FunctionEntry = FunctionEntry {
    name: "globalState",
    signature: "globalState()",
    selector: [0xe7, 0x6c, 0x01, 0xe4],
    words: 0,
};

pub const TICK_SPACING: FunctionEntry = FunctionEntry {
    name: "tickSpacing",
    signature: "tickSpacing()",
    selector: [0xd0, 0xc9, 0x3a, 0x7c],
    words: 0,
};

pub const DECIMALS: FunctionEntry = FunctionEntry {
    name: "decimals",
    signature: "decimals()",
    selector: [0x31, 0x3c, 0xe5, 0x67],
    words: 0,
};

pub const SYMBOL: FunctionEntry = FunctionEntry {
    name: "symbol",
    signature: "symbol()",
    selector: [0x95, 0xd8, 0x9b, 0x41],
    words: 0,
};

pub const POOL_BY_PAIR: FunctionEntry = FunctionEntry {
    name: "poolByPair",
    signature: "poolByPair(address,address)",
    selector: [0xd9, 0xa6, 0x41, 0xe1],
    words: 2,
};

pub const CUSTOM_POOL_BY_PAIR: FunctionEntry = FunctionEntry {
    name: "customPoolByPair",
    signature: "customPoolByPair(address,address,address)",
    selector: [0x23, 0xda, 0x36, 0xcc],
    words: 3,
};

pub const QUOTE_EXACT_INPUT_SINGLE: FunctionEntry = FunctionEntry {
    name: "quoteExactInputSingle",
    signature: "quoteExactInputSingle((address,address,address,uint256,uint160))",
    selector: [0xe9, 0x47, 0x64, 0xc4],
    words: 5,
};

pub const WRITE_CATALOGUE: &[FunctionEntry] = &[
    APPROVE,
    EXACT_INPUT_SINGLE,
    COLLECT,
    DECREASE_LIQUIDITY,
    BURN,
    MINT,
    APPROVE_FOR_FARMING,
    ENTER_FARMING,
    EXIT_FARMING,
    COLLECT_REWARDS,
    CLAIM_REWARD,
];

pub const READ_CATALOGUE: &[FunctionEntry] = &[
    POSITIONS,
    OWNER_OF,
    GLOBAL_STATE,
    TICK_SPACING,
    DECIMALS,
    SYMBOL,
    POOL_BY_PAIR,
    CUSTOM_POOL_BY_PAIR,
    QUOTE_EXACT_INPUT_SINGLE,
];

pub fn lookup(name: &str) -> Option<&'static FunctionEntry> {
    WRITE_CATALOGUE.iter().chain(READ_CATALOGUE).find(|f| f.name == name)
}

// ---- argument tokens ----

/// Unsigned field that must fit in `bits`.
pub fn uint_token(operation: &'static str, field: &'static str, value: U256, bits: u16) -> PlannerResult<Token> {
    if value.bits() > usize::from(bits) {
        return Err(PlannerError::EncodingOverflow {
            operation,
            field,
            value: value.to_string(),
            bits,
        });
    }
    Ok(Token::Uint(value))
}

/// Two's-complement int24 word.
pub fn int24_token(operation: &'static str, field: &'static str, value: i32) -> PlannerResult<Token> {
    if !(INT24_MIN..=INT24_MAX).contains(&value) {
        return Err(PlannerError::EncodingOverflow {
            operation,
            field,
            value: value.to_string(),
            bits: 24,
        });
    }
    let word = if value >= 0 {
        U256::from(value as u32)
    } else {
        U256::MAX - U256::from(value.unsigned_abs() - 1)
    };
    Ok(Token::Int(word))
}

fn incentive_token(key: &IncentiveKey) -> Token {
    Token::Tuple(vec![
        Token::Address(key.reward_token),
        Token::Address(key.bonus_reward_token),
        Token::Address(key.pool),
        Token::Uint(key.nonce),
    ])
}

fn encode_call(function: &FunctionEntry, args: &[Token]) -> Bytes {
    let mut out = Vec::with_capacity(function.calldata_len());
    out.extend_from_slice(&function.selector);
    out.extend_from_slice(&abi::encode(args));
    debug_assert_eq!(out.len(), function.calldata_len(), "{} calldata length", function.name);
    Bytes::from(out)
}

// ---- typed parameter sets ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactInputSingleParams {
    pub token_in: Address,
    pub token_out: Address,
    pub deployer: Address,
    pub recipient: Address,
    pub deadline: U256,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
    /// uint160 on-chain; zero means no limit.
    pub limit_sqrt_price: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintParams {
    pub token0: Address,
    pub token1: Address,
    pub deployer: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0_desired: U256,
    pub amount1_desired: U256,
    pub amount0_min: U256,
    pub amount1_min: U256,
    pub recipient: Address,
    pub deadline: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecreaseLiquidityParams {
    pub token_id: U256,
    pub liquidity: u128,
    pub amount0_min: U256,
    pub amount1_min: U256,
    pub deadline: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectParams {
    pub token_id: U256,
    pub recipient: Address,
    pub amount0_max: u128,
    pub amount1_max: u128,
}

impl CollectParams {
    /// Collect everything owed to the position.
    pub fn all(token_id: U256, recipient: Address) -> Self {
        Self { token_id, recipient, amount0_max: u128::MAX, amount1_max: u128::MAX }
    }
}

// ---- write encoders ----

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    encode_call(&APPROVE, &[Token::Address(spender), Token::Uint(amount)])
}

pub fn encode_exact_input_single(p: &ExactInputSingleParams) -> PlannerResult<Bytes> {
    let op = EXACT_INPUT_SINGLE.name;
    let limit = uint_token(op, "limitSqrtPrice", p.limit_sqrt_price, 160)?;
    Ok(encode_call(
        &EXACT_INPUT_SINGLE,
        &[Token::Tuple(vec![
            Token::Address(p.token_in),
            Token::Address(p.token_out),
            Token::Address(p.deployer),
            Token::Address(p.recipient),
            Token::Uint(p.deadline),
            Token::Uint(p.amount_in),
            Token::Uint(p.amount_out_minimum),
            limit,
        ])],
    ))
}

pub fn encode_collect(p: &CollectParams) -> Bytes {
    encode_call(
        &COLLECT,
        &[Token::Tuple(vec![
            Token::Uint(p.token_id),
            Token::Address(p.recipient),
            Token::Uint(U256::from(p.amount0_max)),
            Token::Uint(U256::from(p.amount1_max)),
        ])],
    )
}

pub fn encode_decrease_liquidity(p: &DecreaseLiquidityParams) -> Bytes {
    encode_call(
        &DECREASE_LIQUIDITY,
        &[Token::Tuple(vec![
            Token::Uint(p.token_id),
            Token::Uint(U256::from(p.liquidity)),
            Token::Uint(p.amount0_min),
            Token::Uint(p.amount1_min),
            Token::Uint(p.deadline),
        ])],
    )
}

pub fn encode_burn(token_id: U256) -> Bytes {
    encode_call(&BURN, &[Token::Uint(token_id)])
}

pub fn encode_mint(p: &MintParams) -> PlannerResult<Bytes> {
    let op = MINT.name;
    if p.tick_upper <= p.tick_lower {
        return Err(PlannerError::InvalidRange { lower: p.tick_lower, upper: p.tick_upper });
    }
    let lower = int24_token(op, "tickLower", p.tick_lower)?;
    let upper = int24_token(op, "tickUpper", p.tick_upper)?;
    Ok(encode_call(
        &MINT,
        &[Token::Tuple(vec![
            Token::Address(p.token0),
            Token::Address(p.token1),
            Token::Address(p.deployer),
            lower,
            upper,
            Token::Uint(p.amount0_desired),
            Token::Uint(p.amount1_desired),
            Token::Uint(p.amount0_min),
            Token::Uint(p.amount1_min),
            Token::Address(p.recipient),
            Token::Uint(p.deadline),
        ])],
    ))
}

pub fn encode_approve_for_farming(token_id: U256, approve: bool, farming_address: Address) -> Bytes {
    encode_call(
        &APPROVE_FOR_FARMING,
        &[Token::Uint(token_id), Token::Bool(approve), Token::Address(farming_address)],
    )
}

pub fn encode_enter_farming(key: &IncentiveKey, token_id: U256) -> Bytes {
    encode_call(&ENTER_FARMING, &[incentive_token(key), Token::Uint(token_id)])
}

pub fn encode_exit_farming(key: &IncentiveKey, token_id: U256) -> Bytes {
    encode_call(&EXIT_FARMING, &[incentive_token(key), Token::Uint(token_id)])
}

pub fn encode_collect_rewards(key: &IncentiveKey, token_id: U256) -> Bytes {
    encode_call(&COLLECT_REWARDS, &[incentive_token(key), Token::Uint(token_id)])
}

/// `amount_requested` of zero claims the whole accrued balance.
pub fn encode_claim_reward(reward_token: Address, to: Address, amount_requested: U256) -> Bytes {
    encode_call(
        &CLAIM_REWARD,
        &[Token::Address(reward_token), Token::Address(to), Token::Uint(amount_requested)],
    )
}

// ---- read encoders ----

pub fn encode_positions(token_id: U256) -> Bytes {
    encode_call(&POSITIONS, &[Token::Uint(token_id)])
}

pub fn encode_owner_of(token_id: U256) -> Bytes {
    encode_call(&OWNER_OF, &[Token::Uint(token_id)])
}

pub fn encode_global_state() -> Bytes {
    encode_call(&GLOBAL_STATE, &[])
}

pub fn encode_tick_spacing() -> Bytes {
    encode_call(&TICK_SPACING, &[])
}

pub fn encode_decimals() -> Bytes {
    encode_call(&DECIMALS, &[])
}

pub fn encode_symbol() -> Bytes {
    encode_call(&SYMBOL, &[])
}

pub fn encode_pool_by_pair(token_a: Address, token_b: Address) -> Bytes {
    encode_call(&POOL_BY_PAIR, &[Token::Address(token_a), Token::Address(token_b)])
}

pub fn encode_custom_pool_by_pair(deployer: Address, token_a: Address, token_b: Address) -> Bytes {
    encode_call(
        &CUSTOM_POOL_BY_PAIR,
        &[Token::Address(deployer), Token::Address(token_a), Token::Address(token_b)],
    )
}

pub fn encode_quote_exact_input_single(
    token_in: Address,
    token_out: Address,
    deployer: Address,
    amount_in: U256,
    limit_sqrt_price: U256,
) -> PlannerResult<Bytes> {
    let limit = uint_token(QUOTE_EXACT_INPUT_SINGLE.name, "limitSqrtPrice", limit_sqrt_price, 160)?;
    Ok(encode_call(
        &QUOTE_EXACT_INPUT_SINGLE,
        &[Token::Tuple(vec![
            Token::Address(token_in),
            Token::Address(token_out),
            Token::Address(deployer),
            Token::Uint(amount_in),
            limit,
        ])],
    ))
}
