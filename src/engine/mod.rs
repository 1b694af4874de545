pub mod planner;
pub mod service;
pub mod valuation;
