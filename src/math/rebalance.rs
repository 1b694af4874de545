use serde::Serialize;

use crate::error::{PlannerError, PlannerResult};

const BPS_DENOMINATOR: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceReason {
    InRange,
    NearLowerEdge,
    NearUpperEdge,
    BelowRange,
    AboveRange,
}

/// Health of a position's window at one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebalanceEvaluation {
    pub current_tick: i32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub out_of_range: bool,
    pub near_edge: bool,
    pub should_rebalance: bool,
    /// current - lower; negative once below the range.
    pub lower_headroom_ticks: i64,
    /// upper - current; zero or negative once at or above the range.
    pub upper_headroom_ticks: i64,
    pub edge_buffer_ticks: i64,
    pub reason: RebalanceReason,
}

/// Classifies `current_tick` against `[tick_lower, tick_upper)`.
///
/// The edge buffer scales with the window: `floor(width * edge_bps / 10000)`.
pub fn evaluate(
    current_tick: i32,
    tick_lower: i32,
    tick_upper: i32,
    edge_bps: u16,
) -> PlannerResult<RebalanceEvaluation> {
    if tick_upper <= tick_lower {
        return Err(PlannerError::InvalidRange { lower: tick_lower, upper: tick_upper });
    }
    if i64::from(edge_bps) > BPS_DENOMINATOR {
        return Err(PlannerError::InvalidPolicy {
            field: "edge_bps",
            value: edge_bps.to_string(),
        });
    }

    let (current, lower, upper) = (i64::from(current_tick), i64::from(tick_lower), i64::from(tick_upper));
    let width = upper - lower;
    let edge_buffer_ticks = width * i64::from(edge_bps) / BPS_DENOMINATOR;
    let lower_headroom_ticks = current - lower;
    let upper_headroom_ticks = upper - current;

    let reason = if current < lower {
        RebalanceReason::BelowRange
    } else if current >= upper {
        RebalanceReason::AboveRange
    } else if lower_headroom_ticks <= edge_buffer_ticks {
        RebalanceReason::NearLowerEdge
    } else if upper_headroom_ticks <= edge_buffer_ticks {
        RebalanceReason::NearUpperEdge
    } else {
        RebalanceReason::InRange
    };

    let out_of_range = matches!(reason, RebalanceReason::BelowRange | RebalanceReason::AboveRange);
    let near_edge = matches!(reason, RebalanceReason::NearLowerEdge | RebalanceReason::NearUpperEdge);

    Ok(RebalanceEvaluation {
        current_tick,
        tick_lower,
        tick_upper,
        out_of_range,
        near_edge,
        should_rebalance: out_of_range || near_edge,
        lower_headroom_ticks,
        upper_headroom_ticks,
        edge_buffer_ticks,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centre_is_healthy() {
        let e = evaluate(500, 0, 1000, 500).expect("valid");
        assert_eq!(e.reason, RebalanceReason::InRange);
        assert!(!e.should_rebalance);
        assert_eq!(e.edge_buffer_ticks, 50);
        assert_eq!((e.lower_headroom_ticks, e.upper_headroom_ticks), (500, 500));
    }

    #[test]
    fn test_buffer_edges_are_inclusive() {
        assert_eq!(evaluate(50, 0, 1000, 500).expect("valid").reason, RebalanceReason::NearLowerEdge);
        assert_eq!(evaluate(51, 0, 1000, 500).expect("valid").reason, RebalanceReason::InRange);
        assert_eq!(evaluate(950, 0, 1000, 500).expect("valid").reason, RebalanceReason::NearUpperEdge);
        assert_eq!(evaluate(949, 0, 1000, 500).expect("valid").reason, RebalanceReason::InRange);
    }

    #[test]
    fn test_upper_bound_is_exclusive() {
        let e = evaluate(999, 0, 1000, 0).expect("valid");
        assert!(!e.out_of_range);
        let e = evaluate(1000, 0, 1000, 0).expect("valid");
        assert!(e.out_of_range && !e.near_edge);
        assert_eq!(e.reason, RebalanceReason::AboveRange);
        let e = evaluate(-1, 0, 1000, 0).expect("valid");
        assert_eq!(e.reason, RebalanceReason::BelowRange);
        assert_eq!(e.lower_headroom_ticks, -1);
    }

    #[test]
    fn test_zero_bps_only_flags_exact_lower_bound() {
        // headroom 0 <= buffer 0
        assert!(evaluate(0, 0, 1000, 0).expect("valid").near_edge);
        assert!(!evaluate(1, 0, 1000, 0).expect("valid").near_edge);
    }

    #[test]
    fn test_buffer_floors() {
        assert_eq!(evaluate(5, 0, 30, 500).expect("valid").edge_buffer_ticks, 1);
        assert_eq!(evaluate(5, 0, 19, 500).expect("valid").edge_buffer_ticks, 0);
    }

    #[test]
    fn test_full_bps_flags_everything_in_range() {
        let e = evaluate(500, 0, 1000, 10_000).expect("valid");
        assert!(e.near_edge && e.should_rebalance);
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            evaluate(0, 10, 10, 500),
            Err(PlannerError::InvalidRange { lower: 10, upper: 10 })
        );
        assert!(matches!(evaluate(0, -10, 10, 10_001), Err(PlannerError::InvalidPolicy { .. })));
    }

    #[test]
    fn test_extreme_ticks_do_not_overflow() {
        let e = evaluate(0, -887_272, 887_272, 10_000).expect("valid");
        assert_eq!(e.edge_buffer_ticks, 1_774_544);
    }
}
