// Tick <-> price math for concentrated-liquidity pools
// ----------------------------------------------------
// Inside the pool tick domain prices are exact fractions built from the canonical
// Q64.96 sqrt ratio. Beyond it, out to the full int24 range, 1.0001^tick is a binary
// scaled fraction with a 256-bit mantissa, so no power of 1.0001 is ever evaluated
// in floating point. The only lossy steps are `to_f64` and `log10` used for reporting.
//
// Liquidity helpers follow the usual rounding conventions: amounts a position would
// hand back round down, amounts a caller must supply round up.

use std::fmt;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

use crate::error::{PlannerError, PlannerResult};
use crate::math::fixed_point::{pow10, to_decimal_string};

pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;
pub const MIN_INT24_TICK: i32 = -(1 << 23);
pub const MAX_INT24_TICK: i32 = (1 << 23) - 1;
const Q96_BITS: usize = 96;
const EXTENDED_MANTISSA_BITS: u64 = 256;

// Q128.128 multipliers for each set bit of |tick|, bit 0x1 handled separately.
const SQRT_RATIO_FACTORS: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x09aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x05d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
    (0x80000, 0x48a170391f7dc42444e8fa2),
];

#[inline]
fn ceil_div(a: &BigUint, b: &BigUint) -> BigUint {
    let (q, r) = a.div_rem(b);
    if r.is_zero() { q } else { q + 1u8 }
}

pub fn ensure_tick_in_domain(tick: i32) -> PlannerResult<()> {
    if (MIN_TICK..=MAX_TICK).contains(&tick) {
        Ok(())
    } else {
        Err(PlannerError::TickOutOfBounds { tick })
    }
}

/// Exact sqrt(1.0001^tick) as a Q64.96 integer (TickMath.getSqrtRatioAtTick).
pub fn sqrt_ratio_at_tick(tick: i32) -> PlannerResult<BigUint> {
    ensure_tick_in_domain(tick)?;
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        BigUint::from(0xfffcb933bd6fad37aa2d162d1a594001u128)
    } else {
        BigUint::one() << 128
    };
    for (bit, factor) in SQRT_RATIO_FACTORS {
        if abs_tick & bit != 0 {
            ratio = (&ratio * BigUint::from(factor)) >> 128;
        }
    }

    if tick > 0 {
        let max = (BigUint::one() << 256) - 1u8;
        ratio = max / ratio;
    }
    // Q128.128 -> Q64.96, rounding up
    Ok((ratio + ((BigUint::one() << 32) - 1u8)) >> 32)
}

/// Price of token0 in token1 at a tick: 1.0001^tick scaled by 10^(decimals0 - decimals1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickPrice {
    tick: i32,
    /// Only for ticks inside the pool domain.
    sqrt_ratio_x96: Option<BigUint>,
    /// 1.0001^tick as raw_numerator / raw_denominator.
    raw_numerator: BigUint,
    raw_denominator: BigUint,
    decimals0: u8,
    decimals1: u8,
}

impl TickPrice {
    pub fn tick(&self) -> i32 {
        self.tick
    }

    pub fn sqrt_ratio_x96(&self) -> Option<&BigUint> {
        self.sqrt_ratio_x96.as_ref()
    }

    /// token1 per token0 in whole-token terms, as numerator / denominator.
    pub fn as_fraction(&self) -> (BigUint, BigUint) {
        let mut numerator = self.raw_numerator.clone();
        let mut denominator = self.raw_denominator.clone();
        if self.decimals0 >= self.decimals1 {
            numerator *= pow10(u32::from(self.decimals0 - self.decimals1));
        } else {
            denominator *= pow10(u32::from(self.decimals1 - self.decimals0));
        }
        (numerator, denominator)
    }

    /// Lossy view for reporting. Saturates to infinity or zero only when the exact
    /// value itself is outside f64 range.
    pub fn to_f64(&self) -> f64 {
        let (num, den) = self.as_fraction();
        let (n, n_shift) = leading_f64(&num);
        let (d, d_shift) = leading_f64(&den);
        let exponent = n_shift - d_shift;
        (n / d) * 2f64.powi(exponent.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    /// Base-10 logarithm of the price; finite across the whole int24 tick range.
    pub fn log10(&self) -> f64 {
        let (num, den) = self.as_fraction();
        log10_big(&num) - log10_big(&den)
    }

    /// Decimal rendering truncated to `precision` fractional digits.
    pub fn to_decimal_string(&self, precision: u8) -> String {
        let (num, den) = self.as_fraction();
        let scaled = num * pow10(u32::from(precision)) / den;
        to_decimal_string(&scaled, precision, precision)
    }

    /// Raw token0 units expressed in raw token1 units at this tick, rounded down.
    pub fn token0_to_token1(&self, amount0: &BigUint) -> BigUint {
        amount0 * &self.raw_numerator / &self.raw_denominator
    }

    /// Raw token1 units expressed in raw token0 units at this tick, rounded down.
    pub fn token1_to_token0(&self, amount1: &BigUint) -> BigUint {
        amount1 * &self.raw_denominator / &self.raw_numerator
    }
}

impl fmt::Display for TickPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string(18))
    }
}

/// mantissa * 2^exponent with the mantissa truncated to EXTENDED_MANTISSA_BITS.
struct BinaryScaled {
    mantissa: BigUint,
    exponent: i64,
}

impl BinaryScaled {
    fn normalized(mantissa: BigUint, exponent: i64) -> Self {
        let bits = mantissa.bits();
        if bits > EXTENDED_MANTISSA_BITS {
            let shift = bits - EXTENDED_MANTISSA_BITS;
            BinaryScaled { mantissa: mantissa >> shift, exponent: exponent + shift as i64 }
        } else {
            BinaryScaled { mantissa, exponent }
        }
    }

    fn mul(&self, other: &BinaryScaled) -> BinaryScaled {
        BinaryScaled::normalized(&self.mantissa * &other.mantissa, self.exponent + other.exponent)
    }

    fn recip(&self) -> BinaryScaled {
        let width = 2 * EXTENDED_MANTISSA_BITS;
        BinaryScaled::normalized((BigUint::one() << width) / &self.mantissa, -(width as i64) - self.exponent)
    }

    fn into_fraction(self) -> (BigUint, BigUint) {
        if self.exponent >= 0 {
            (self.mantissa << self.exponent as u64, BigUint::one())
        } else {
            (self.mantissa, BigUint::one() << self.exponent.unsigned_abs())
        }
    }
}

/// 1.0001^tick by square-and-multiply on 256-bit mantissas.
fn binary_scaled_power(tick: i32) -> (BigUint, BigUint) {
    let mut base = BinaryScaled::normalized(
        (BigUint::from(10_001u32) << EXTENDED_MANTISSA_BITS) / 10_000u32,
        -(EXTENDED_MANTISSA_BITS as i64),
    );
    let mut result = BinaryScaled { mantissa: BigUint::one(), exponent: 0 };
    let mut remaining = tick.unsigned_abs();
    while remaining != 0 {
        if remaining & 1 != 0 {
            result = result.mul(&base);
        }
        base = base.mul(&base);
        remaining >>= 1;
    }
    if tick < 0 {
        result = result.recip();
    }
    result.into_fraction()
}

fn leading_f64(v: &BigUint) -> (f64, i64) {
    let bits = v.bits();
    if bits <= 64 {
        (v.to_f64().unwrap_or(0.0), 0)
    } else {
        let shift = bits - 64;
        ((v >> shift).to_f64().unwrap_or(0.0), shift as i64)
    }
}

fn log10_big(v: &BigUint) -> f64 {
    let (leading, shift) = leading_f64(v);
    leading.log10() + shift as f64 * std::f64::consts::LOG10_2
}

/// Defined for every int24 tick; ticks past the pool domain use the binary scaled power.
pub fn price_from_tick(tick: i32, decimals0: u8, decimals1: u8) -> PlannerResult<TickPrice> {
    let (sqrt_ratio_x96, raw_numerator, raw_denominator) = if (MIN_TICK..=MAX_TICK).contains(&tick) {
        let sqrt_ratio_x96 = sqrt_ratio_at_tick(tick)?;
        let numerator = &sqrt_ratio_x96 * &sqrt_ratio_x96;
        (Some(sqrt_ratio_x96), numerator, BigUint::one() << (2 * Q96_BITS))
    } else if (MIN_INT24_TICK..=MAX_INT24_TICK).contains(&tick) {
        let (numerator, denominator) = binary_scaled_power(tick);
        (None, numerator, denominator)
    } else {
        return Err(PlannerError::TickOutOfBounds { tick });
    };
    Ok(TickPrice { tick, sqrt_ratio_x96, raw_numerator, raw_denominator, decimals0, decimals1 })
}

fn ensure_spacing(tick: i32, spacing: i32) -> PlannerResult<()> {
    if spacing <= 0 {
        return Err(PlannerError::DegenerateRange { tick, spacing });
    }
    Ok(())
}

/// Lowest tick that is a multiple of `spacing` inside the tick domain.
pub fn min_usable_tick(spacing: i32) -> i32 {
    -(MAX_TICK / spacing) * spacing
}

/// Highest tick that is a multiple of `spacing` inside the tick domain.
pub fn max_usable_tick(spacing: i32) -> i32 {
    (MAX_TICK / spacing) * spacing
}

/// Largest multiple of `spacing` that is <= `tick`.
pub fn floor_to_spacing(tick: i32, spacing: i32) -> PlannerResult<i32> {
    ensure_spacing(tick, spacing)?;
    Ok(tick.div_floor(&spacing) * spacing)
}

/// Nearest multiple of `spacing`; exact halves go toward negative infinity.
/// Results are kept inside the usable tick domain for that spacing.
pub fn tick_spacing_aligned(tick: i32, spacing: i32) -> PlannerResult<i32> {
    ensure_spacing(tick, spacing)?;
    let t = i64::from(tick);
    let s = i64::from(spacing);
    let down = t.div_floor(&s) * s;
    let rem = t - down;
    let nearest = if 2 * rem > s { down + s } else { down };
    let clamped = nearest.clamp(
        i64::from(min_usable_tick(spacing)),
        i64::from(max_usable_tick(spacing)),
    );
    Ok(clamped as i32)
}

pub fn is_aligned(tick: i32, spacing: i32) -> bool {
    spacing > 0 && tick.mod_floor(&spacing) == 0
}

// --------------------------- Liquidity amounts ---------------------------

fn ordered<'a>(a: &'a BigUint, b: &'a BigUint) -> (&'a BigUint, &'a BigUint) {
    if a < b { (a, b) } else { (b, a) }
}

/// amount0 = L * 2^96 * (sb - sa) / sb / sa
pub fn amount0_delta(
    sqrt_ratio_a_x96: &BigUint,
    sqrt_ratio_b_x96: &BigUint,
    liquidity: &BigUint,
    round_up: bool,
) -> BigUint {
    let (sa, sb) = ordered(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if liquidity.is_zero() || sa.is_zero() || sa == sb {
        return BigUint::zero();
    }
    let numerator = (liquidity << Q96_BITS) * (sb - sa);
    if round_up {
        ceil_div(&ceil_div(&numerator, sb), sa)
    } else {
        numerator / sb / sa
    }
}

/// amount1 = L * (sb - sa) / 2^96
pub fn amount1_delta(
    sqrt_ratio_a_x96: &BigUint,
    sqrt_ratio_b_x96: &BigUint,
    liquidity: &BigUint,
    round_up: bool,
) -> BigUint {
    let (sa, sb) = ordered(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if liquidity.is_zero() || sa == sb {
        return BigUint::zero();
    }
    let numerator = liquidity * (sb - sa);
    let q96 = BigUint::one() << Q96_BITS;
    if round_up {
        ceil_div(&numerator, &q96)
    } else {
        numerator / q96
    }
}

fn liquidity_for_amount0(sa: &BigUint, sb: &BigUint, amount0: &BigUint) -> BigUint {
    let (sa, sb) = ordered(sa, sb);
    if sa == sb {
        return BigUint::zero();
    }
    (amount0 * sa * sb) / ((sb - sa) << Q96_BITS)
}

fn liquidity_for_amount1(sa: &BigUint, sb: &BigUint, amount1: &BigUint) -> BigUint {
    let (sa, sb) = ordered(sa, sb);
    if sa == sb {
        return BigUint::zero();
    }
    (amount1 << Q96_BITS) / (sb - sa)
}

/// Largest liquidity the two budgets can fund for the range [sa, sb] at price sp.
pub fn liquidity_for_amounts(
    sqrt_price_x96: &BigUint,
    sqrt_ratio_a_x96: &BigUint,
    sqrt_ratio_b_x96: &BigUint,
    amount0: &BigUint,
    amount1: &BigUint,
) -> BigUint {
    let (sa, sb) = ordered(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if sqrt_price_x96 <= sa {
        liquidity_for_amount0(sa, sb, amount0)
    } else if sqrt_price_x96 < sb {
        let l0 = liquidity_for_amount0(sqrt_price_x96, sb, amount0);
        let l1 = liquidity_for_amount1(sa, sqrt_price_x96, amount1);
        l0.min(l1)
    } else {
        liquidity_for_amount1(sa, sb, amount1)
    }
}

/// Token amounts represented by `liquidity` over [sa, sb] at price sp, rounded down.
pub fn amounts_for_liquidity(
    sqrt_price_x96: &BigUint,
    sqrt_ratio_a_x96: &BigUint,
    sqrt_ratio_b_x96: &BigUint,
    liquidity: &BigUint,
) -> (BigUint, BigUint) {
    let (sa, sb) = ordered(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if sqrt_price_x96 <= sa {
        (amount0_delta(sa, sb, liquidity, false), BigUint::zero())
    } else if sqrt_price_x96 < sb {
        (
            amount0_delta(sqrt_price_x96, sb, liquidity, false),
            amount1_delta(sa, sqrt_price_x96, liquidity, false),
        )
    } else {
        (BigUint::zero(), amount1_delta(sa, sb, liquidity, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_ratio_known_values() {
        assert_eq!(sqrt_ratio_at_tick(0).expect("in domain"), BigUint::one() << 96);
        // TickMath.MIN_SQRT_RATIO / MAX_SQRT_RATIO
        assert_eq!(
            sqrt_ratio_at_tick(MIN_TICK).expect("in domain"),
            BigUint::from(4_295_128_739u64)
        );
        assert_eq!(
            sqrt_ratio_at_tick(MAX_TICK).expect("in domain"),
            BigUint::parse_bytes(b"1461446703485210103287273052203988822378723970342", 10)
                .expect("decimal literal")
        );
    }

    #[test]
    fn test_sqrt_ratio_rejects_out_of_domain() {
        assert_eq!(
            sqrt_ratio_at_tick(MAX_TICK + 1),
            Err(PlannerError::TickOutOfBounds { tick: MAX_TICK + 1 })
        );
        assert!(sqrt_ratio_at_tick(MIN_TICK - 1).is_err());
    }

    #[test]
    fn test_sqrt_ratio_is_monotonic() {
        let mut prev = sqrt_ratio_at_tick(-200).expect("in domain");
        for tick in -199..=200 {
            let next = sqrt_ratio_at_tick(tick).expect("in domain");
            assert!(next > prev, "tick {tick}");
            prev = next;
        }
    }

    #[test]
    fn test_price_tracks_float_power() {
        for tick in [-276_324, -50_000, -1, 1, 60, 12_345, 200_000] {
            let exact = price_from_tick(tick, 18, 18).expect("in domain").to_f64();
            let approx = 1.0001f64.powi(tick);
            let rel = (exact - approx).abs() / approx;
            assert!(rel < 1e-9, "tick {tick}: {exact} vs {approx}");
        }
    }

    #[test]
    fn test_price_decimal_adjustment() {
        let p = price_from_tick(0, 18, 6).expect("in domain");
        assert_eq!(p.to_decimal_string(6), "1000000000000");
        let q = price_from_tick(0, 6, 18).expect("in domain");
        assert_eq!(q.to_decimal_string(12), "0.000000000001");
        assert_eq!(price_from_tick(0, 8, 8).expect("in domain").to_decimal_string(4), "1");
    }

    #[test]
    fn test_price_extremes_stay_finite() {
        let hi = price_from_tick(MAX_TICK, 18, 18).expect("in domain").to_f64();
        let lo = price_from_tick(MIN_TICK, 18, 18).expect("in domain").to_f64();
        assert!(hi.is_finite() && hi > 1e38);
        assert!(lo > 0.0 && lo < 1e-38);
    }

    #[test]
    fn test_sqrt_ratio_across_high_ladder_bits() {
        // 0x40000 and 0x80000 set; checked against the Q64.96 value of sqrt(1.0001^tick)
        for tick in [262_144, -262_144, 276_324, -276_324, 524_288, 800_000] {
            let sqrt = sqrt_ratio_at_tick(tick).expect("in domain");
            let price = price_from_tick(tick, 18, 18).expect("in domain");
            let expected = tick as f64 * 1.0001f64.log10();
            assert!((price.log10() - expected).abs() < 1e-8, "tick {tick}");
            assert_eq!(price.sqrt_ratio_x96(), Some(&sqrt));
        }
    }

    #[test]
    fn test_price_beyond_pool_domain() {
        let edge = price_from_tick(MAX_TICK, 18, 18).expect("pool domain");
        let past = price_from_tick(MAX_TICK + 1, 18, 18).expect("int24 domain");
        assert!(past.sqrt_ratio_x96().is_none());
        let step = past.to_f64() / edge.to_f64();
        assert!((step - 1.0001).abs() < 1e-8, "step {step}");

        for tick in [MAX_INT24_TICK, MIN_INT24_TICK, 1_000_000, -1_000_000] {
            let price = price_from_tick(tick, 18, 18).expect("int24 domain");
            let expected = tick as f64 * 1.0001f64.log10();
            assert!((price.log10() - expected).abs() < 1e-9, "tick {tick}: {}", price.log10());
        }
        // 10^364 does not fit an f64 but still renders exactly
        let top = price_from_tick(MAX_INT24_TICK, 18, 18).expect("int24 domain");
        assert!(top.to_f64().is_infinite());
        assert_eq!(top.to_decimal_string(0).len(), 365);
        assert_eq!(price_from_tick(MIN_INT24_TICK, 18, 18).expect("int24 domain").to_decimal_string(18), "0");

        assert_eq!(
            price_from_tick(MAX_INT24_TICK + 1, 18, 18),
            Err(PlannerError::TickOutOfBounds { tick: MAX_INT24_TICK + 1 })
        );
        assert!(price_from_tick(MIN_INT24_TICK - 1, 18, 18).is_err());
    }

    #[test]
    fn test_alignment_nearest_with_ties_down() {
        assert_eq!(tick_spacing_aligned(14, 10), Ok(10));
        assert_eq!(tick_spacing_aligned(16, 10), Ok(20));
        assert_eq!(tick_spacing_aligned(15, 10), Ok(10));
        assert_eq!(tick_spacing_aligned(-15, 10), Ok(-20));
        assert_eq!(tick_spacing_aligned(-14, 10), Ok(-10));
        assert_eq!(tick_spacing_aligned(-16, 10), Ok(-20));
        assert_eq!(tick_spacing_aligned(30, 60), Ok(0));
        assert_eq!(tick_spacing_aligned(-30, 60), Ok(-60));
        assert_eq!(tick_spacing_aligned(7, 1), Ok(7));
    }

    #[test]
    fn test_alignment_stays_in_domain() {
        assert_eq!(tick_spacing_aligned(MAX_TICK, 60), Ok(max_usable_tick(60)));
        assert_eq!(tick_spacing_aligned(MIN_TICK, 60), Ok(min_usable_tick(60)));
        assert_eq!(max_usable_tick(60) % 60, 0);
        assert!(max_usable_tick(60) <= MAX_TICK);
    }

    #[test]
    fn test_alignment_rejects_bad_spacing() {
        assert_eq!(
            tick_spacing_aligned(5, 0),
            Err(PlannerError::DegenerateRange { tick: 5, spacing: 0 })
        );
        assert!(floor_to_spacing(5, -10).is_err());
    }

    #[test]
    fn test_floor_to_spacing_negative() {
        assert_eq!(floor_to_spacing(-1, 60), Ok(-60));
        assert_eq!(floor_to_spacing(59, 60), Ok(0));
        assert!(is_aligned(-120, 60));
        assert!(!is_aligned(-121, 60));
    }

    #[test]
    fn test_conversions_at_tick_zero_are_identity() {
        let p = price_from_tick(0, 18, 6).expect("in domain");
        let amount = BigUint::from(123_456_789u64);
        assert_eq!(p.token0_to_token1(&amount), amount);
        assert_eq!(p.token1_to_token0(&amount), amount);
    }

    #[test]
    fn test_liquidity_round_trip_in_range() {
        let sa = sqrt_ratio_at_tick(-600).expect("in domain");
        let sp = sqrt_ratio_at_tick(0).expect("in domain");
        let sb = sqrt_ratio_at_tick(600).expect("in domain");
        let a0 = BigUint::from(10u64.pow(18));
        let a1 = BigUint::from(10u64.pow(18));

        let l = liquidity_for_amounts(&sp, &sa, &sb, &a0, &a1);
        assert!(!l.is_zero());
        let (u0, u1) = amounts_for_liquidity(&sp, &sa, &sb, &l);
        assert!(u0 <= a0 && u1 <= a1);
        // the symmetric range consumes both budgets almost entirely
        assert!(&a0 - &u0 < BigUint::from(10u64.pow(6)));
        assert!(&a1 - &u1 < BigUint::from(10u64.pow(6)));
    }

    #[test]
    fn test_liquidity_out_of_range_is_single_sided() {
        let sa = sqrt_ratio_at_tick(600).expect("in domain");
        let sb = sqrt_ratio_at_tick(1200).expect("in domain");
        let sp = sqrt_ratio_at_tick(0).expect("in domain");
        let a0 = BigUint::from(5u64 * 10u64.pow(17));
        let l = liquidity_for_amounts(&sp, &sa, &sb, &a0, &BigUint::zero());
        let (u0, u1) = amounts_for_liquidity(&sp, &sa, &sb, &l);
        assert!(u1.is_zero());
        assert!(u0 <= a0);
    }

    #[test]
    fn test_round_up_never_below_round_down() {
        let sa = sqrt_ratio_at_tick(-10).expect("in domain");
        let sb = sqrt_ratio_at_tick(10).expect("in domain");
        let l = BigUint::from(1_000_000_007u64);
        assert!(amount0_delta(&sa, &sb, &l, true) >= amount0_delta(&sa, &sb, &l, false));
        assert!(amount1_delta(&sb, &sa, &l, true) >= amount1_delta(&sa, &sb, &l, false));
    }
}
