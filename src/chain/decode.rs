// Return-data decoding and revert-reason extraction.
//
// Return values are read word by word: every fixed-width field is checked against
// its ABI width instead of being truncated, and short input fails before any field
// is produced.

use std::fmt;

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, U256};
use serde::Serialize;

use crate::chain::abi::{ERROR_STRING_SELECTOR, PANIC_SELECTOR};
use crate::error::{PlannerError, PlannerResult};
use crate::models::{Position, Quote};

const WORD: usize = 32;

/// Best-effort explanation for a reverted simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum RevertReason {
    /// `Error(string)` payload or a textual "execution reverted: ..." message.
    Message(String),
    /// `Panic(uint256)` code.
    Panic(u64),
    Known { marker: String, meaning: &'static str },
    Unavailable,
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::Message(m) => f.write_str(m),
            RevertReason::Panic(code) => write!(f, "panic 0x{:02x} ({})", code, panic_meaning(*code)),
            RevertReason::Known { marker, meaning } => write!(f, "{} ({})", marker, meaning),
            RevertReason::Unavailable => f.write_str("reverted, no reason available"),
        }
    }
}

fn panic_meaning(code: u64) -> &'static str {
    match code {
        0x01 => "assertion failed",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division by zero",
        0x21 => "invalid enum value",
        0x22 => "corrupt storage byte array",
        0x31 => "pop on empty array",
        0x32 => "array index out of bounds",
        0x41 => "out of memory",
        0x51 => "call to zero-initialized function",
        _ => "unknown panic code",
    }
}

// ERC-20 and TransferHelper failure markers, longest first so the OpenZeppelin
// messages win over the short codes they contain.
const KNOWN_MARKERS: &[(&str, &str)] = &[
    ("transfer amount exceeds allowance", "token allowance is too low"),
    ("transfer amount exceeds balance", "token balance is too low"),
    ("insufficient allowance", "token allowance is too low"),
    ("insufficient balance", "token balance is too low"),
    ("TRANSFER_FROM_FAILED", "transferFrom failed: balance or allowance too low"),
    ("STF", "safeTransferFrom failed: balance or allowance too low"),
    ("ST", "safeTransfer failed"),
    ("SA", "safeApprove failed"),
    ("TF", "token transfer failed"),
];

fn known_marker(text: &str) -> Option<RevertReason> {
    let lowered = text.to_ascii_lowercase();
    KNOWN_MARKERS.iter().find_map(|(marker, meaning)| {
        let hit = if marker.len() <= 3 {
            contains_token(text, marker)
        } else {
            lowered.contains(&marker.to_ascii_lowercase())
        };
        hit.then(|| RevertReason::Known { marker: marker.to_string(), meaning })
    })
}

// `needle` delimited by non-identifier characters on both sides.
fn contains_token(haystack: &str, needle: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.map_or(false, is_ident) && !after.map_or(false, is_ident)
    })
}

fn hex_run_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    let end = rest.find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(rest.len());
    Some(&rest[..end - (end % 2)])
}

fn decode_error_string(text: &str) -> Option<String> {
    let payload = hex::decode(hex_run_after(text, &hex::encode(ERROR_STRING_SELECTOR))?).ok()?;
    match abi::decode(&[ParamType::String], &payload).ok()?.pop()? {
        Token::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn decode_panic_code(text: &str) -> Option<u64> {
    let run = hex_run_after(text, &hex::encode(PANIC_SELECTOR))?;
    if run.len() < 2 * WORD {
        return None;
    }
    let code = U256::from_big_endian(&hex::decode(&run[..2 * WORD]).ok()?);
    (code <= U256::from(u64::MAX)).then(|| code.as_u64())
}

fn textual_reason(text: &str) -> Option<String> {
    for (prefix, terminators) in [
        ("execution reverted: ", &[", data:", "\"", ")", "\n"][..]),
        ("reverted with reason string '", &["'"][..]),
    ] {
        if let Some(idx) = text.find(prefix) {
            let rest = &text[idx + prefix.len()..];
            let end = terminators.iter().filter_map(|t| rest.find(*t)).min().unwrap_or(rest.len());
            let reason = rest[..end].trim();
            if !reason.is_empty() {
                return Some(reason.to_string());
            }
        }
    }
    None
}

/// Extracts a readable reason from a failed-call diagnostic: an `Error(string)` or
/// `Panic(uint256)` payload or a textual revert message first, then known ERC-20
/// markers, then [`RevertReason::Unavailable`].
pub fn extract_revert_reason(diagnostic: &str) -> RevertReason {
    // hex digits decode the same in either case, and ASCII lowering keeps offsets
    let lowered = diagnostic.to_ascii_lowercase();

    if let Some(message) = decode_error_string(&lowered).or_else(|| textual_reason(diagnostic)) {
        return known_marker_exact(&message).unwrap_or(RevertReason::Message(message));
    }
    if let Some(code) = decode_panic_code(&lowered) {
        return RevertReason::Panic(code);
    }
    known_marker(diagnostic).unwrap_or(RevertReason::Unavailable)
}

fn known_marker_exact(message: &str) -> Option<RevertReason> {
    KNOWN_MARKERS.iter().find_map(|(marker, meaning)| {
        (message == *marker).then(|| RevertReason::Known { marker: marker.to_string(), meaning })
    })
}

/// True when a transport error text describes a revert rather than a transport failure.
pub fn looks_like_revert(diagnostic: &str) -> bool {
    let lowered = diagnostic.to_ascii_lowercase();
    lowered.contains("revert")
        || lowered.contains(&hex::encode(ERROR_STRING_SELECTOR))
        || lowered.contains(&hex::encode(PANIC_SELECTOR))
}

// --------------------------- Return data ---------------------------

fn ensure_words(operation: &'static str, data: &[u8], words: usize) -> PlannerResult<()> {
    if data.len() < words * WORD {
        return Err(PlannerError::TruncatedReturnData {
            operation,
            expected: words * WORD,
            actual: data.len(),
        });
    }
    Ok(())
}

fn word(data: &[u8], index: usize) -> &[u8] {
    &data[index * WORD..(index + 1) * WORD]
}

pub fn decode_uint(operation: &'static str, data: &[u8], index: usize) -> PlannerResult<U256> {
    ensure_words(operation, data, index + 1)?;
    Ok(U256::from_big_endian(word(data, index)))
}

/// Unsigned word that must fit in `bits`.
pub fn decode_uint_bits(
    operation: &'static str,
    field: &'static str,
    data: &[u8],
    index: usize,
    bits: usize,
) -> PlannerResult<U256> {
    let value = decode_uint(operation, data, index)?;
    if value.bits() > bits {
        return Err(PlannerError::MalformedReturnData {
            operation,
            detail: format!("{} = {} does not fit uint{}", field, value, bits),
        });
    }
    Ok(value)
}

pub fn decode_u128(operation: &'static str, field: &'static str, data: &[u8], index: usize) -> PlannerResult<u128> {
    Ok(decode_uint_bits(operation, field, data, index, 128)?.as_u128())
}

fn decode_u64(operation: &'static str, field: &'static str, data: &[u8], index: usize, bits: usize) -> PlannerResult<u64> {
    Ok(decode_uint_bits(operation, field, data, index, bits)?.as_u64())
}

/// Two's-complement int24 word. The upper bytes must be a clean sign extension.
pub fn decode_int24(operation: &'static str, field: &'static str, data: &[u8], index: usize) -> PlannerResult<i32> {
    ensure_words(operation, data, index + 1)?;
    let w = word(data, index);
    let mut tail = [0u8; 4];
    tail.copy_from_slice(&w[28..32]);
    let value = i32::from_be_bytes(tail);
    let fill = if value < 0 { 0xff } else { 0x00 };
    let in_range = (-(1 << 23)..(1 << 23)).contains(&value);
    if !in_range || w[..28].iter().any(|b| *b != fill) {
        return Err(PlannerError::MalformedReturnData {
            operation,
            detail: format!("{} is not a valid int24 word: 0x{}", field, hex::encode(w)),
        });
    }
    Ok(value)
}

pub fn decode_address(operation: &'static str, data: &[u8], index: usize) -> PlannerResult<Address> {
    ensure_words(operation, data, index + 1)?;
    let w = word(data, index);
    if w[..12].iter().any(|b| *b != 0) {
        return Err(PlannerError::MalformedReturnData {
            operation,
            detail: format!("address word has dirty upper bytes: 0x{}", hex::encode(w)),
        });
    }
    Ok(Address::from_slice(&w[12..]))
}

/// `positions(uint256)` on the position manager.
pub fn decode_position(token_id: U256, data: &[u8]) -> PlannerResult<Position> {
    const OP: &str = "positions";
    ensure_words(OP, data, 12)?;
    // words: nonce, operator, token0, token1, deployer, tickLower, tickUpper,
    // liquidity, feeGrowthInside0LastX128, feeGrowthInside1LastX128, tokensOwed0, tokensOwed1
    Ok(Position {
        token_id,
        token0: decode_address(OP, data, 2)?,
        token1: decode_address(OP, data, 3)?,
        deployer: decode_address(OP, data, 4)?,
        tick_lower: decode_int24(OP, "tickLower", data, 5)?,
        tick_upper: decode_int24(OP, "tickUpper", data, 6)?,
        liquidity: decode_u128(OP, "liquidity", data, 7)?,
        tokens_owed0: decode_u128(OP, "tokensOwed0", data, 10)?,
        tokens_owed1: decode_u128(OP, "tokensOwed1", data, 11)?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalState {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub last_fee: u16,
    pub unlocked: bool,
}

/// `globalState()` on an Algebra pool: (price, tick, lastFee, pluginConfig, communityFee, unlocked).
pub fn decode_global_state(data: &[u8]) -> PlannerResult<GlobalState> {
    const OP: &str = "globalState";
    ensure_words(OP, data, 6)?;
    Ok(GlobalState {
        sqrt_price_x96: decode_uint_bits(OP, "price", data, 0, 160)?,
        tick: decode_int24(OP, "tick", data, 1)?,
        last_fee: decode_u64(OP, "lastFee", data, 2, 16)? as u16,
        unlocked: !decode_uint(OP, data, 5)?.is_zero(),
    })
}

pub fn decode_tick_spacing(data: &[u8]) -> PlannerResult<i32> {
    let spacing = decode_int24("tickSpacing", "tickSpacing", data, 0)?;
    if spacing <= 0 {
        return Err(PlannerError::MalformedReturnData {
            operation: "tickSpacing",
            detail: format!("non-positive tick spacing {}", spacing),
        });
    }
    Ok(spacing)
}

pub fn decode_decimals(data: &[u8]) -> PlannerResult<u8> {
    Ok(decode_u64("decimals", "decimals", data, 0, 8)? as u8)
}

/// ERC-20 `symbol()`: ABI string, or a right-padded bytes32 for older tokens.
pub fn decode_symbol(data: &[u8]) -> PlannerResult<String> {
    const OP: &str = "symbol";
    ensure_words(OP, data, 1)?;
    if data.len() == WORD {
        let end = data.iter().position(|b| *b == 0).unwrap_or(WORD);
        return Ok(String::from_utf8_lossy(&data[..end]).into_owned());
    }
    match abi::decode(&[ParamType::String], data) {
        Ok(mut tokens) => match tokens.pop() {
            Some(Token::String(s)) => Ok(s),
            _ => Err(PlannerError::MalformedReturnData { operation: OP, detail: "expected a string".to_string() }),
        },
        Err(e) => Err(PlannerError::MalformedReturnData { operation: OP, detail: e.to_string() }),
    }
}

/// Two leading uint256 words, as returned by decreaseLiquidity, collect and collectRewards.
pub fn decode_amount_pair(operation: &'static str, data: &[u8]) -> PlannerResult<(U256, U256)> {
    ensure_words(operation, data, 2)?;
    Ok((decode_uint(operation, data, 0)?, decode_uint(operation, data, 1)?))
}

/// QuoterV2 `quoteExactInputSingle`:
/// (amountOut, amountIn, sqrtPriceX96After, initializedTicksCrossed, gasEstimate, fee).
pub fn decode_quote(data: &[u8], block_number: u64) -> PlannerResult<Quote> {
    const OP: &str = "quoteExactInputSingle";
    ensure_words(OP, data, 6)?;
    Ok(Quote {
        amount_out: decode_uint(OP, data, 0)?,
        initialized_ticks_crossed: decode_u64(OP, "initializedTicksCrossed", data, 3, 32)? as u32,
        gas_estimate: decode_uint(OP, data, 4)?,
        fee_tier: decode_u64(OP, "fee", data, 5, 16)? as u32,
        block_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[U256]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in values {
            let mut w = [0u8; 32];
            v.to_big_endian(&mut w);
            out.extend_from_slice(&w);
        }
        out
    }

    fn neg(v: u64) -> U256 {
        U256::MAX - U256::from(v - 1)
    }

    fn error_string_payload(msg: &str) -> String {
        let body = abi::encode(&[Token::String(msg.to_string())]);
        format!("0x08c379a0{}", hex::encode(body))
    }

    #[test]
    fn test_error_string_in_rpc_data() {
        let diag = format!(
            "(code: 3, message: execution reverted, data: Some(String(\"{}\")))",
            error_string_payload("Price slippage check")
        );
        assert_eq!(extract_revert_reason(&diag), RevertReason::Message("Price slippage check".to_string()));
    }

    #[test]
    fn test_textual_reason() {
        let diag = "(code: 3, message: execution reverted: Not approved, data: None)";
        assert_eq!(extract_revert_reason(diag), RevertReason::Message("Not approved".to_string()));
    }

    #[test]
    fn test_textual_reason_keeps_inner_commas() {
        let diag = "(code: 3, message: execution reverted: Price slippage, check, data: None)";
        assert_eq!(extract_revert_reason(diag), RevertReason::Message("Price slippage, check".to_string()));
        let bare = "execution reverted: Price slippage, check";
        assert_eq!(extract_revert_reason(bare), RevertReason::Message("Price slippage, check".to_string()));
        let quoted = "server returned \"execution reverted: Too little received, sorry\" for eth_call";
        assert_eq!(extract_revert_reason(quoted), RevertReason::Message("Too little received, sorry".to_string()));
    }

    #[test]
    fn test_known_short_markers() {
        let diag = "(code: 3, message: execution reverted: STF, data: None)";
        assert!(matches!(
            extract_revert_reason(diag),
            RevertReason::Known { ref marker, .. } if marker == "STF"
        ));
        let diag = error_string_payload("ERC20: transfer amount exceeds balance");
        assert!(matches!(
            extract_revert_reason(&diag),
            RevertReason::Message(ref m) if m.contains("exceeds balance")
        ));
        let diag = "call failed: ERC20: transfer amount exceeds allowance";
        assert!(matches!(
            extract_revert_reason(diag),
            RevertReason::Known { ref marker, .. } if marker == "transfer amount exceeds allowance"
        ));
    }

    #[test]
    fn test_short_markers_need_word_boundaries() {
        assert_eq!(extract_revert_reason("STATUS: connection reset"), RevertReason::Unavailable);
        assert!(contains_token("reverted (SA)", "SA"));
        assert!(!contains_token("SAFE", "SA"));
    }

    #[test]
    fn test_panic_code() {
        let diag = format!("revert data 0x4e487b71{:064x}", 0x11);
        let reason = extract_revert_reason(&diag);
        assert_eq!(reason, RevertReason::Panic(0x11));
        assert_eq!(reason.to_string(), "panic 0x11 (arithmetic overflow or underflow)");
    }

    #[test]
    fn test_unavailable() {
        let reason = extract_revert_reason("(code: 3, message: execution reverted, data: None)");
        assert_eq!(reason, RevertReason::Unavailable);
        assert_eq!(reason.to_string(), "reverted, no reason available");
        assert!(looks_like_revert("execution reverted"));
        assert!(!looks_like_revert("error sending request: operation timed out"));
    }

    #[test]
    fn test_decode_position() {
        let token0 = Address::repeat_byte(0x11);
        let token1 = Address::repeat_byte(0x22);
        let data = words(&[
            U256::zero(),
            U256::zero(),
            U256::from_big_endian(token0.as_bytes()),
            U256::from_big_endian(token1.as_bytes()),
            U256::zero(),
            neg(600),
            U256::from(1_200),
            U256::from(123_456_789u64),
            U256::zero(),
            U256::zero(),
            U256::from(7),
            U256::from(8),
        ]);
        let p = decode_position(U256::from(42), &data).expect("well-formed position");
        assert_eq!((p.token0, p.token1, p.deployer), (token0, token1, Address::zero()));
        assert_eq!((p.tick_lower, p.tick_upper), (-600, 1_200));
        assert_eq!(p.liquidity, 123_456_789);
        assert_eq!((p.tokens_owed0, p.tokens_owed1), (7, 8));
    }

    #[test]
    fn test_truncated_position() {
        let data = vec![0u8; 32 * 11];
        assert_eq!(
            decode_position(U256::one(), &data),
            Err(PlannerError::TruncatedReturnData { operation: "positions", expected: 384, actual: 352 })
        );
    }

    #[test]
    fn test_int24_rejects_dirty_words() {
        let data = words(&[U256::from(1u64 << 23)]);
        assert!(decode_int24("t", "tick", &data, 0).is_err());
        let data = words(&[neg(1u64 << 23)]);
        assert_eq!(decode_int24("t", "tick", &data, 0), Ok(-(1 << 23)));
        let mut data = words(&[neg(5)]);
        data[0] = 0x00;
        assert!(decode_int24("t", "tick", &data, 0).is_err());
    }

    #[test]
    fn test_uint128_overflow_is_malformed() {
        let data = words(&[U256::one() << 128]);
        assert!(matches!(
            decode_u128("positions", "liquidity", &data, 0),
            Err(PlannerError::MalformedReturnData { .. })
        ));
    }

    #[test]
    fn test_global_state_and_spacing() {
        let data = words(&[
            U256::one() << 96,
            neg(3),
            U256::from(500),
            U256::zero(),
            U256::zero(),
            U256::one(),
        ]);
        let gs = decode_global_state(&data).expect("well-formed state");
        assert_eq!(gs.tick, -3);
        assert_eq!(gs.last_fee, 500);
        assert!(gs.unlocked);
        assert_eq!(decode_tick_spacing(&words(&[U256::from(60)])), Ok(60));
        assert!(decode_tick_spacing(&words(&[U256::zero()])).is_err());
    }

    #[test]
    fn test_symbol_variants() {
        let encoded = abi::encode(&[Token::String("WETH".to_string())]);
        assert_eq!(decode_symbol(&encoded), Ok("WETH".to_string()));
        let mut b32 = [0u8; 32];
        b32[..3].copy_from_slice(b"MKR");
        assert_eq!(decode_symbol(&b32), Ok("MKR".to_string()));
        assert!(decode_symbol(&[0u8; 5]).is_err());
    }

    #[test]
    fn test_decimals_must_fit_uint8() {
        assert_eq!(decode_decimals(&words(&[U256::from(18)])), Ok(18));
        assert!(decode_decimals(&words(&[U256::from(256)])).is_err());
    }

    #[test]
    fn test_quote() {
        let data = words(&[
            U256::from(995u64),
            U256::from(1_000u64),
            U256::one() << 96,
            U256::from(2),
            U256::from(90_000u64),
            U256::from(500),
        ]);
        let q = decode_quote(&data, 17).expect("well-formed quote");
        assert_eq!(q.amount_out, U256::from(995u64));
        assert_eq!(q.fee_tier, 500);
        assert_eq!(q.initialized_ticks_crossed, 2);
        assert_eq!(q.gas_estimate, U256::from(90_000u64));
        assert_eq!(q.block_number, 17);
    }
}
