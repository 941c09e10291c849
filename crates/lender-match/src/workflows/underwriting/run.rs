use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{LenderId, LenderProgramId, LoanRequestId};
use super::policy::{PolicyEvaluation, RuleResult};

/// Identifier wrapper for underwriting runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchRunId(pub i64);

impl fmt::Display for MatchRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for persisted per-program results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchResultId(pub i64);

/// Lifecycle of an underwriting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl RunStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Complete => "COMPLETE",
            RunStatus::Failed => "FAILED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Failed)
    }

    const fn can_move_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Pending, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Complete)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("match run cannot move from {} to {}", from.label(), to.label())]
pub struct RunStateError {
    pub from: RunStatus,
    pub to: RunStatus,
}

/// Underwriting run state. Transitions are explicit and checked; terminal states are final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRun {
    pub id: MatchRunId,
    pub loan_request_id: LoanRequestId,
    status: RunStatus,
}

impl MatchRun {
    /// New run awaiting persistence. The repository assigns the real id on insert.
    pub fn pending(loan_request_id: LoanRequestId) -> Self {
        Self {
            id: MatchRunId(0),
            loan_request_id,
            status: RunStatus::Pending,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn start(&mut self) -> Result<(), RunStateError> {
        self.transition(RunStatus::Running)
    }

    pub fn complete(&mut self) -> Result<(), RunStateError> {
        self.transition(RunStatus::Complete)
    }

    pub fn fail(&mut self) -> Result<(), RunStateError> {
        self.transition(RunStatus::Failed)
    }

    fn transition(&mut self, next: RunStatus) -> Result<(), RunStateError> {
        if !self.status.can_move_to(next) {
            return Err(RunStateError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Full hard/soft rule evidence stored alongside a match result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleResultDetail {
    #[serde(default)]
    pub hard: Vec<RuleResult>,
    #[serde(default)]
    pub soft: Vec<RuleResult>,
}

/// Persisted outcome of evaluating one lender program within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: MatchResultId,
    pub match_run_id: MatchRunId,
    pub lender_id: LenderId,
    pub lender_program_id: LenderProgramId,
    pub eligible: bool,
    pub fit_score: Option<f64>,
    pub reasons: Vec<String>,
    pub rule_results: RuleResultDetail,
}

impl MatchResult {
    pub fn from_evaluation(match_run_id: MatchRunId, evaluation: &PolicyEvaluation) -> Self {
        Self {
            id: MatchResultId(0),
            match_run_id,
            lender_id: evaluation.lender_id,
            lender_program_id: evaluation.lender_program_id,
            eligible: evaluation.eligible,
            fit_score: evaluation.fit_score,
            reasons: evaluation.reasons.clone(),
            rule_results: RuleResultDetail {
                hard: evaluation.hard_rule_results.clone(),
                soft: evaluation.soft_rule_results.clone(),
            },
        }
    }

    pub fn to_evaluation(&self) -> PolicyEvaluation {
        PolicyEvaluation {
            lender_id: self.lender_id,
            lender_program_id: self.lender_program_id,
            eligible: self.eligible,
            fit_score: self.fit_score,
            hard_rule_results: self.rule_results.hard.clone(),
            soft_rule_results: self.rule_results.soft.clone(),
            reasons: self.reasons.clone(),
        }
    }
}

/// Run plus its results, as exposed to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRunView {
    pub id: MatchRunId,
    pub loan_request_id: LoanRequestId,
    pub status: &'static str,
    pub eligible_count: usize,
    pub results: Vec<MatchResult>,
}

impl MatchRunView {
    pub fn new(run: &MatchRun, results: Vec<MatchResult>) -> Self {
        Self {
            id: run.id,
            loan_request_id: run.loan_request_id,
            status: run.status().label(),
            eligible_count: results.iter().filter(|result| result.eligible).count(),
            results,
        }
    }

    /// Eligible programs, best fit first. Ties keep evaluation order.
    pub fn ranked_matches(&self) -> Vec<&MatchResult> {
        let mut eligible: Vec<&MatchResult> =
            self.results.iter().filter(|result| result.eligible).collect();
        eligible.sort_by(|left, right| {
            let left = left.fit_score.unwrap_or(0.0);
            let right = right.fit_score.unwrap_or(0.0);
            right.total_cmp(&left)
        });
        eligible
    }
}
