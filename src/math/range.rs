// Range suggestion around the current tick.
// Keeps the width of the old range (plus an optional bump), recentres on the
// current tick and snaps to the pool's spacing.

use serde::Serialize;

use crate::error::{PlannerError, PlannerResult};
use crate::math::tick_math::{ensure_tick_in_domain, max_usable_tick, min_usable_tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickRange {
    pub lower: i32,
    pub upper: i32,
}

impl TickRange {
    pub fn new(lower: i32, upper: i32) -> PlannerResult<Self> {
        if upper <= lower {
            return Err(PlannerError::InvalidRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub fn width(&self) -> i32 {
        self.upper - self.lower
    }

    /// Upper bound is exclusive, like the pool's own active-range check.
    pub fn contains(&self, tick: i32) -> bool {
        self.lower <= tick && tick < self.upper
    }
}

/// Proposes a new spacing-aligned range of (at least) the old width containing `current_tick`.
pub fn suggest_range(
    current_tick: i32,
    old_lower: i32,
    old_upper: i32,
    spacing: i32,
    width_bump_ticks: u32,
) -> PlannerResult<TickRange> {
    if spacing <= 0 || max_usable_tick(spacing) == 0 {
        return Err(PlannerError::DegenerateRange { tick: current_tick, spacing });
    }
    ensure_tick_in_domain(current_tick)?;
    let old = TickRange::new(old_lower, old_upper)?;

    let s = i64::from(spacing);
    let min_tick = i64::from(min_usable_tick(spacing));
    let max_tick = i64::from(max_usable_tick(spacing));
    let current = i64::from(current_tick);

    let requested = i64::from(old.width()) + i64::from(width_bump_ticks);
    // round the width up to whole spacings, never below one spacing
    let width = ((requested + s - 1) / s * s).max(s).min(max_tick - min_tick);

    let mut lower = nearest_multiple(current - width / 2, s);
    while current < lower {
        lower -= s;
    }
    while current >= lower + width {
        lower += s;
    }

    if lower < min_tick {
        lower = min_tick;
    }
    if lower + width > max_tick {
        lower = max_tick - width;
    }

    let mut upper = lower + width;
    while upper <= lower {
        lower = (lower - s).max(min_tick);
        upper = (upper + s).min(max_tick);
    }

    log::debug!(
        "suggest_range: tick={} old=[{}, {}) spacing={} -> [{}, {})",
        current_tick, old_lower, old_upper, spacing, lower, upper
    );
    TickRange::new(lower as i32, upper as i32)
}

// ties go toward negative infinity
fn nearest_multiple(value: i64, s: i64) -> i64 {
    let down = value.div_euclid(s) * s;
    if 2 * (value - down) > s { down + s } else { down }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_math::MAX_TICK;

    #[test]
    fn test_recentres_keeping_width() {
        let r = suggest_range(1_250, 0, 600, 60, 0).expect("valid range");
        assert_eq!(r.width(), 600);
        assert!(r.contains(1_250));
        assert_eq!(r.lower % 60, 0);
        assert_eq!(r, TickRange { lower: 960, upper: 1_560 });
    }

    #[test]
    fn test_width_bump_rounds_up_to_spacing() {
        let r = suggest_range(0, -300, 300, 60, 1).expect("valid range");
        assert_eq!(r.width(), 660);
        assert!(r.contains(0));
    }

    #[test]
    fn test_narrow_old_range_widens_to_one_spacing() {
        let r = suggest_range(17, 10, 11, 10, 0).expect("valid range");
        assert_eq!(r, TickRange { lower: 10, upper: 20 });
    }

    #[test]
    fn test_negative_ticks() {
        let r = suggest_range(-1_001, -200, 200, 10, 0).expect("valid range");
        assert_eq!(r.width(), 400);
        assert!(r.contains(-1_001));
        assert_eq!(r.lower.rem_euclid(10), 0);
    }

    #[test]
    fn test_clamped_at_domain_edge() {
        let r = suggest_range(MAX_TICK - 5, 0, 1_200, 60, 0).expect("valid range");
        assert_eq!(r.upper, max_usable_tick(60));
        assert_eq!(r.width(), 1_200);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert_eq!(
            suggest_range(5, 0, 100, 0, 0),
            Err(PlannerError::DegenerateRange { tick: 5, spacing: 0 })
        );
        assert!(matches!(
            suggest_range(5, 0, 100, -60, 0),
            Err(PlannerError::DegenerateRange { .. })
        ));
        assert_eq!(
            suggest_range(5, 100, 100, 10, 0),
            Err(PlannerError::InvalidRange { lower: 100, upper: 100 })
        );
        assert!(matches!(
            suggest_range(MAX_TICK + 1, 0, 100, 10, 0),
            Err(PlannerError::TickOutOfBounds { .. })
        ));
    }
}
