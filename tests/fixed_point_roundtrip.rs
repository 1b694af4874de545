// tests/fixed_point_roundtrip.rs
// ===============================
// Decimal string <-> integer units conversion.

use num_bigint::BigUint;

use lp_planner::math::fixed_point::{to_decimal_string, to_positive_units, to_units};

const AMOUNTS: &[&str] = &[
    "0",
    "1",
    "0.5",
    "10.25",
    "123.456",
    "0.000001",
    "1.000000000000000001",
    "999999999999.123456789012345678",
    "340282366920938463463374607431768211456",
];

fn fraction_digits(amount: &str) -> usize {
    amount
        .split_once('.')
        .map(|(_, f)| f.trim_end_matches('0').len())
        .unwrap_or(0)
}

#[test]
fn test_round_trip_grid() {
    for decimals in 0u8..=18 {
        for amount in AMOUNTS {
            let parsed = to_units(amount, decimals);
            if fraction_digits(amount) > usize::from(decimals) {
                let err = parsed.expect_err("precision loss must be rejected");
                assert_eq!(err.kind(), "malformed_decimal", "{} @ {}", amount, decimals);
                continue;
            }
            let units = parsed.expect("representable amount");
            let rendered = to_decimal_string(units.raw(), decimals, decimals);
            let reparsed = to_units(&rendered, decimals).expect("rendered amount parses");
            assert_eq!(reparsed, units, "{} @ {} rendered as {}", amount, decimals, rendered);
        }
    }
}

#[test]
fn test_end_to_end_scenario() {
    let units = to_units("1.234567", 18).expect("valid amount");
    assert_eq!(units.raw(), &BigUint::from(1_234_567_000_000_000_000u64));
    assert_eq!(to_decimal_string(units.raw(), 18, 6), "1.234567");
}

#[test]
fn test_display_truncates_instead_of_rounding() {
    let units = to_units("1.999999", 6).expect("valid amount");
    assert_eq!(to_decimal_string(units.raw(), 6, 2), "1.99");
    assert_eq!(to_decimal_string(units.raw(), 6, 0), "1");
}

#[test]
fn test_trailing_zero_truncation_is_allowed() {
    let a = to_units("1.50000000", 2).expect("zeros beyond precision are fine");
    assert_eq!(a.raw(), &BigUint::from(150u32));
    assert_eq!(to_units("1.501", 2).unwrap_err().kind(), "malformed_decimal");
}

#[test]
fn test_rejected_shapes() {
    for bad in ["", "-1", "1e18", "1E3", ".5", "1.", "0x10", "1,5", " 1"] {
        assert_eq!(to_units(bad, 18).unwrap_err().kind(), "malformed_decimal", "{:?}", bad);
    }
}

#[test]
fn test_positive_amount_required() {
    let err = to_positive_units("exactInputSingle", "0.000", 6).unwrap_err();
    assert_eq!(err.kind(), "non_positive_amount");
    assert!(err.to_string().contains("exactInputSingle"));
    assert!(to_positive_units("exactInputSingle", "0.000001", 6).is_ok());
}
