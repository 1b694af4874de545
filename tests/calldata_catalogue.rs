// tests/calldata_catalogue.rs
// ===========================
// Byte-level checks of the calldata catalogue against literal selectors and layouts.

use ethers::types::{Address, U256};
use ethers::utils::id;

use lp_planner::chain::abi::{self, ExactInputSingleParams, MintParams, READ_CATALOGUE, WRITE_CATALOGUE};
use lp_planner::models::parse_address;

fn swap_params(limit: U256) -> ExactInputSingleParams {
    ExactInputSingleParams {
        token_in: Address::repeat_byte(0x11),
        token_out: Address::repeat_byte(0x22),
        deployer: Address::zero(),
        recipient: Address::repeat_byte(0x44),
        deadline: U256::from(1_700_001_200u64),
        amount_in: U256::from(1_000_000u64),
        amount_out_minimum: U256::from(995_000u64),
        limit_sqrt_price: limit,
    }
}

#[test]
fn test_literal_selectors() {
    let expected = [
        ("approve(address,uint256)", "095ea7b3"),
        (
            "exactInputSingle((address,address,address,address,uint256,uint256,uint256,uint160))",
            "1679c792",
        ),
        ("collect((uint256,address,uint128,uint128))", "fc6f7865"),
        ("decreaseLiquidity((uint256,uint128,uint256,uint256,uint256))", "0c49ccbe"),
        ("burn(uint256)", "42966c68"),
        ("approveForFarming(uint256,bool,address)", "832f630a"),
    ];
    for (signature, selector) in expected {
        assert_eq!(hex::encode(id(signature)), selector, "{}", signature);
        let entry = WRITE_CATALOGUE
            .iter()
            .find(|f| f.signature == signature)
            .expect("signature is in the catalogue");
        assert_eq!(hex::encode(entry.selector), selector);
    }
}

#[test]
fn test_every_catalogue_selector_is_derived_from_its_signature() {
    for f in WRITE_CATALOGUE.iter().chain(READ_CATALOGUE) {
        assert_eq!(f.selector, id(f.signature), "{} ({})", f.name, f.signature);
    }
}

#[test]
fn test_approve_scenario() {
    let spender = parse_address("0x2222222222222222222222222222222222222222").expect("valid spender");
    let data = abi::encode_approve(spender, U256::from(1000));

    assert_eq!(data.len(), 4 + 64);
    assert!(format!("{}", data).starts_with("0x095ea7b3"));
    assert_eq!(&data[4 + 12..4 + 32], spender.as_bytes());
    assert_eq!(U256::from_big_endian(&data[36..68]), U256::from(1000));
}

#[test]
fn test_fixed_lengths_per_operation() {
    let key = lp_planner::models::IncentiveKey {
        reward_token: Address::repeat_byte(0x55),
        bonus_reward_token: Address::zero(),
        pool: Address::repeat_byte(0x33),
        nonce: U256::from(1),
    };
    let token_id = U256::from(42);
    let cases = [
        (abi::EXACT_INPUT_SINGLE.calldata_len(), abi::encode_exact_input_single(&swap_params(U256::zero())).expect("encodes").len()),
        (abi::COLLECT.calldata_len(), abi::encode_collect(&abi::CollectParams::all(token_id, Address::repeat_byte(1))).len()),
        (abi::BURN.calldata_len(), abi::encode_burn(token_id).len()),
        (abi::APPROVE_FOR_FARMING.calldata_len(), abi::encode_approve_for_farming(token_id, true, Address::repeat_byte(2)).len()),
        (abi::ENTER_FARMING.calldata_len(), abi::encode_enter_farming(&key, token_id).len()),
        (abi::EXIT_FARMING.calldata_len(), abi::encode_exit_farming(&key, token_id).len()),
        (abi::COLLECT_REWARDS.calldata_len(), abi::encode_collect_rewards(&key, token_id).len()),
    ];
    for (expected, actual) in cases {
        assert_eq!(expected, actual);
    }
    assert_eq!(abi::EXACT_INPUT_SINGLE.calldata_len(), 4 + 256);
    assert_eq!(abi::ENTER_FARMING.calldata_len(), 4 + 5 * 32);
}

#[test]
fn test_limit_sqrt_price_overflow_is_rejected() {
    let two_pow_160 = U256::one() << 160;
    let err = abi::encode_exact_input_single(&swap_params(two_pow_160)).unwrap_err();
    assert_eq!(err.kind(), "encoding_overflow");
    assert!(err.to_string().contains("limitSqrtPrice"));

    let max_ok = two_pow_160 - 1;
    let data = abi::encode_exact_input_single(&swap_params(max_ok)).expect("2^160 - 1 fits");
    assert_eq!(U256::from_big_endian(&data[4 + 7 * 32..]), max_ok);
}

#[test]
fn test_mint_encodes_negative_ticks_as_twos_complement() {
    let data = abi::encode_mint(&MintParams {
        token0: Address::repeat_byte(0x11),
        token1: Address::repeat_byte(0x22),
        deployer: Address::zero(),
        tick_lower: -887_220,
        tick_upper: 60,
        amount0_desired: U256::from(5),
        amount1_desired: U256::from(6),
        amount0_min: U256::zero(),
        amount1_min: U256::zero(),
        recipient: Address::repeat_byte(0x44),
        deadline: U256::from(1),
    })
    .expect("valid mint");

    assert_eq!(data.len(), 4 + 11 * 32);
    let lower_word = &data[4 + 3 * 32..4 + 4 * 32];
    assert!(lower_word[..29].iter().all(|b| *b == 0xff));
    let expected = U256::MAX - U256::from(887_220 - 1);
    assert_eq!(U256::from_big_endian(lower_word), expected);
    assert_eq!(U256::from_big_endian(&data[4 + 4 * 32..4 + 5 * 32]), U256::from(60));
}

#[test]
fn test_mint_rejects_inverted_range() {
    let err = abi::encode_mint(&MintParams {
        token0: Address::repeat_byte(0x11),
        token1: Address::repeat_byte(0x22),
        deployer: Address::zero(),
        tick_lower: 120,
        tick_upper: 60,
        amount0_desired: U256::from(5),
        amount1_desired: U256::from(6),
        amount0_min: U256::zero(),
        amount1_min: U256::zero(),
        recipient: Address::repeat_byte(0x44),
        deadline: U256::from(1),
    })
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_range");
}
