pub mod fixed_point;
pub mod range;
pub mod rebalance;
pub mod tick_math;
