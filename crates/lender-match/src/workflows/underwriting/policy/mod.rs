mod config;
pub(crate) mod fields;
mod rules;
mod scoring;

pub use config::{Deduction, GroupLogic, Policy, Rule, RuleGroup, RuleKind, ScoringConfig, Severity};
pub use fields::{resolve, FieldPath, Namespace};
pub use rules::{evaluate_group, evaluate_rule, RuleResult, RuleSetEvaluator, RuleTreeEvaluator};
pub use scoring::{compute_score, FULL_SCORE};

use super::domain::{LenderId, LenderProgramId};
use super::profile::ApplicationProfile;
use serde::{Deserialize, Serialize};

/// Per-program verdict with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    pub lender_id: LenderId,
    pub lender_program_id: LenderProgramId,
    pub eligible: bool,
    /// `None` when a hard rule failed and soft rules were never scored.
    pub fit_score: Option<f64>,
    pub hard_rule_results: Vec<RuleResult>,
    pub soft_rule_results: Vec<RuleResult>,
    /// Failure messages: hard ones when gated out, soft ones otherwise.
    pub reasons: Vec<String>,
}

/// Stateless evaluator that applies lender policies to a profile.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine<E = RuleTreeEvaluator> {
    evaluator: E,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::with_evaluator(RuleTreeEvaluator)
    }
}

impl<E: RuleSetEvaluator> PolicyEngine<E> {
    pub fn with_evaluator(evaluator: E) -> Self {
        Self { evaluator }
    }

    /// Hard-rule gate first; soft rules are only evaluated and scored when it passes.
    pub fn evaluate(
        &self,
        policy: &Policy,
        lender_id: LenderId,
        lender_program_id: LenderProgramId,
        profile: &ApplicationProfile,
    ) -> PolicyEvaluation {
        let hard_rule_results = self.evaluator.evaluate_group(&policy.hard_rules, profile);
        let hard_fail = hard_rule_results.iter().any(RuleResult::is_hard_failure);

        let (soft_rule_results, fit_score) = if hard_fail {
            (Vec::new(), None)
        } else if let Some(soft_rules) = &policy.soft_rules {
            let soft = self.evaluator.evaluate_group(soft_rules, profile);
            let score = compute_score(&policy.scoring_config, &soft);
            (soft, Some(score))
        } else {
            (Vec::new(), Some(FULL_SCORE))
        };

        let eligible = !hard_fail
            && fit_score.map_or(true, |score| score >= policy.scoring_config.min_accept_score);

        let reasons = if hard_fail {
            failure_messages(&hard_rule_results)
        } else {
            failure_messages(&soft_rule_results)
        };

        PolicyEvaluation {
            lender_id,
            lender_program_id,
            eligible,
            fit_score,
            hard_rule_results,
            soft_rule_results,
            reasons,
        }
    }
}

/// Evaluate `policy` with the default tree evaluator.
pub fn evaluate_policy(
    policy: &Policy,
    lender_id: LenderId,
    lender_program_id: LenderProgramId,
    profile: &ApplicationProfile,
) -> PolicyEvaluation {
    PolicyEngine::new().evaluate(policy, lender_id, lender_program_id, profile)
}

fn failure_messages(results: &[RuleResult]) -> Vec<String> {
    results
        .iter()
        .filter(|result| !result.passed && !result.message.is_empty())
        .map(|result| result.message.clone())
        .collect()
}
