use std::collections::HashMap;

use super::config::ScoringConfig;
use super::rules::RuleResult;

/// Fit score awarded when a policy has no soft rules to score against.
pub const FULL_SCORE: f64 = 100.0;

/// Deduct points for every failed soft rule referenced by the scoring table.
///
/// Deductions naming rules that were not evaluated are ignored. The result never
/// drops below zero; there is no upper clamp.
pub fn compute_score(config: &ScoringConfig, soft_results: &[RuleResult]) -> f64 {
    let by_id: HashMap<&str, &RuleResult> = soft_results
        .iter()
        .map(|result| (result.rule_id.as_str(), result))
        .collect();

    let deducted: f64 = config
        .deductions
        .iter()
        .filter(|deduction| {
            by_id
                .get(deduction.rule_id.as_str())
                .is_some_and(|result| !result.passed)
        })
        .map(|deduction| deduction.points)
        .sum();

    (config.base_score - deducted).max(0.0)
}
