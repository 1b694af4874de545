// Decimal string <-> integer token units.
// ----------------------------------------
// Amounts are arbitrary precision (BigUint) end to end. Parsing never rounds: a
// fractional digit that cannot be represented at the token's decimals is an error,
// while trailing zeros past the supported precision are accepted. Rendering
// truncates to the requested precision, it never rounds up.

use std::fmt;

use ethers::types::U256;
use num_bigint::BigUint;
use num_traits::{Pow, Zero};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::{PlannerError, PlannerResult};

/// An integer amount in a token's smallest denomination plus its decimal count.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenUnits {
    raw: BigUint,
    decimals: u8,
}

impl TokenUnits {
    pub fn new(raw: BigUint, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self { raw: BigUint::zero(), decimals }
    }

    pub fn from_u256(value: U256, decimals: u8) -> Self {
        Self { raw: u256_to_biguint(value), decimals }
    }

    pub fn from_u128(value: u128, decimals: u8) -> Self {
        Self { raw: BigUint::from(value), decimals }
    }

    pub fn raw(&self) -> &BigUint {
        &self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Sum of two amounts of the same token.
    pub fn checked_add(&self, other: &TokenUnits) -> Option<TokenUnits> {
        if self.decimals != other.decimals {
            return None;
        }
        Some(TokenUnits::new(&self.raw + &other.raw, self.decimals))
    }

    /// Converts to a 256-bit ABI word, failing instead of wrapping.
    pub fn to_u256(&self, operation: &'static str, field: &'static str) -> PlannerResult<U256> {
        biguint_to_u256(&self.raw).ok_or_else(|| PlannerError::EncodingOverflow {
            operation,
            field,
            value: self.raw.to_string(),
            bits: 256,
        })
    }

    pub fn to_decimal_string(&self, precision: u8) -> String {
        to_decimal_string(&self.raw, self.decimals, precision)
    }
}

impl fmt::Display for TokenUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string(self.decimals))
    }
}

impl Serialize for TokenUnits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TokenUnits", 3)?;
        state.serialize_field("raw", &self.raw.to_string())?;
        state.serialize_field("decimals", &self.decimals)?;
        state.serialize_field("formatted", &self.to_string())?;
        state.end()
    }
}

/// Parses a non-negative decimal literal (`"12"`, `"0.5"`, `"1.250"`) into units.
pub fn to_units(input: &str, decimals: u8) -> PlannerResult<TokenUnits> {
    let malformed = |detail: &'static str| PlannerError::MalformedDecimal {
        input: input.to_string(),
        decimals,
        detail,
    };

    if input.is_empty() {
        return Err(malformed("empty amount"));
    }
    if input.contains(['e', 'E']) {
        return Err(malformed("exponent notation is not accepted"));
    }

    let (int_part, frac_part) = match input.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (input, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("integer part must be one or more ASCII digits"));
    }

    let frac = match frac_part {
        None => "",
        Some(f) if f.is_empty() => return Err(malformed("decimal point must be followed by digits")),
        Some(f) if !f.bytes().all(|b| b.is_ascii_digit()) => {
            return Err(malformed("fractional part must be ASCII digits"))
        }
        Some(f) => f,
    };

    let keep = decimals as usize;
    let frac = if frac.len() > keep {
        let (kept, dropped) = frac.split_at(keep);
        if dropped.bytes().any(|b| b != b'0') {
            return Err(malformed("more fractional digits than the token supports"));
        }
        kept
    } else {
        frac
    };

    let mut digits = String::with_capacity(int_part.len() + keep);
    digits.push_str(int_part);
    digits.push_str(frac);
    digits.extend(std::iter::repeat('0').take(keep - frac.len()));

    let raw = BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| malformed("not a decimal number"))?;
    Ok(TokenUnits::new(raw, decimals))
}

/// Like [`to_units`] but rejects a zero amount for operations that move tokens.
pub fn to_positive_units(
    operation: &'static str,
    input: &str,
    decimals: u8,
) -> PlannerResult<TokenUnits> {
    let units = to_units(input, decimals)?;
    if units.is_zero() {
        return Err(PlannerError::NonPositiveAmount {
            operation,
            input: input.to_string(),
        });
    }
    Ok(units)
}

/// Renders `units` with at most `precision` fractional digits, truncating.
/// Trailing zeros of the fraction are dropped, and so is a bare decimal point.
pub fn to_decimal_string(units: &BigUint, decimals: u8, precision: u8) -> String {
    let digits = units.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);

    let shown = &frac_part[..(precision as usize).min(decimals)];
    let shown = shown.trim_end_matches('0');
    if shown.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, shown)
    }
}

/// 10^exp as a BigUint.
pub fn pow10(exp: u32) -> BigUint {
    Pow::pow(BigUint::from(10u8), exp)
}

pub fn u256_to_biguint(value: U256) -> BigUint {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigUint::from_bytes_be(&buf)
}

/// None when the value needs more than 256 bits.
pub fn biguint_to_u256(value: &BigUint) -> Option<U256> {
    if value.bits() > 256 {
        return None;
    }
    Some(U256::from_big_endian(&value.to_bytes_be()))
}
