#![allow(dead_code)]

pub use spillway_test_utils::init_tracing;

use spillway::plan::JobPlan;

/// Job ids of a plan, in order.
pub fn ids(plan: &[JobPlan]) -> Vec<&str> {
    plan.iter().map(|job| job.id.as_str()).collect()
}
