use thiserror::Error;

use crate::chain::decode::RevertReason;

/// Every failure a planning operation can end with. All of them are terminal for
/// the operation in progress: nothing is retried or partially applied past this point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("malformed decimal {input:?} for a {decimals}-decimal token: {detail}")]
    MalformedDecimal {
        input: String,
        decimals: u8,
        detail: &'static str,
    },

    #[error("{operation}: amount {input:?} must be greater than zero")]
    NonPositiveAmount {
        operation: &'static str,
        input: String,
    },

    #[error("{operation}: {field} = {value} does not fit in {bits} bits")]
    EncodingOverflow {
        operation: &'static str,
        field: &'static str,
        value: String,
        bits: u16,
    },

    #[error("{operation}: return data truncated, expected at least {expected} bytes but got {actual}")]
    TruncatedReturnData {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{operation}: malformed return data: {detail}")]
    MalformedReturnData {
        operation: &'static str,
        detail: String,
    },

    #[error("invalid address {input:?}: expected 0x followed by 40 hex digits")]
    InvalidAddress { input: String },

    #[error("invalid tick range [{lower}, {upper}): upper bound must exceed lower bound")]
    InvalidRange { lower: i32, upper: i32 },

    #[error("degenerate range around tick {tick}: tick spacing {spacing} must be positive")]
    DegenerateRange { tick: i32, spacing: i32 },

    #[error("tick {tick} is outside the supported tick domain")]
    TickOutOfBounds { tick: i32 },

    #[error("invalid policy: {field} = {value}")]
    InvalidPolicy { field: &'static str, value: String },

    #[error("{operation}: simulation reverted: {reason}")]
    SimulationRevert {
        operation: &'static str,
        reason: RevertReason,
    },

    #[error("{operation}: external call failed: {message}")]
    ExternalCallFailure {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: chain id mismatch: expected {expected}, node reports {actual}")]
    ChainIdMismatch {
        operation: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("{operation}: deployment has no {field} configured")]
    MissingConfiguration {
        operation: &'static str,
        field: &'static str,
    },
}

impl PlannerError {
    /// Stable tag used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            PlannerError::MalformedDecimal { .. } => "malformed_decimal",
            PlannerError::NonPositiveAmount { .. } => "non_positive_amount",
            PlannerError::EncodingOverflow { .. } => "encoding_overflow",
            PlannerError::TruncatedReturnData { .. } => "truncated_return_data",
            PlannerError::MalformedReturnData { .. } => "malformed_return_data",
            PlannerError::InvalidAddress { .. } => "invalid_address",
            PlannerError::InvalidRange { .. } => "invalid_range",
            PlannerError::DegenerateRange { .. } => "degenerate_range",
            PlannerError::TickOutOfBounds { .. } => "tick_out_of_bounds",
            PlannerError::InvalidPolicy { .. } => "invalid_policy",
            PlannerError::SimulationRevert { .. } => "simulation_revert",
            PlannerError::ExternalCallFailure { .. } => "external_call_failure",
            PlannerError::ChainIdMismatch { .. } => "chain_id_mismatch",
            PlannerError::MissingConfiguration { .. } => "missing_configuration",
        }
    }

    /// True for failures raised by caller input rather than by the chain.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PlannerError::MalformedDecimal { .. }
                | PlannerError::NonPositiveAmount { .. }
                | PlannerError::EncodingOverflow { .. }
                | PlannerError::InvalidAddress { .. }
                | PlannerError::InvalidRange { .. }
                | PlannerError::DegenerateRange { .. }
                | PlannerError::TickOutOfBounds { .. }
                | PlannerError::InvalidPolicy { .. }
        )
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
