//! Lender matching: a declarative policy rule engine and the underwriting runs built on it.
//!
//! A loan application is flattened into an [`ApplicationProfile`], evaluated against every
//! active lender policy, and the per-program verdicts are persisted under a [`MatchRun`].

pub mod catalog;
pub mod domain;
pub mod memory;
pub mod policy;
pub mod profile;
pub mod repository;
pub mod router;
pub mod run;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, PolicyCatalog};
pub use domain::{
    Borrower, BusinessCredit, CatalogEntry, Guarantor, Lender, LenderId, LenderPolicy,
    LenderPolicyId, LenderProgram, LenderProgramId, LoanApplication, LoanRequest, LoanRequestId,
};
pub use memory::InMemoryUnderwritingRepository;
pub use policy::{
    evaluate_policy, Deduction, GroupLogic, Policy, PolicyEngine, PolicyEvaluation, Rule,
    RuleGroup, RuleKind, RuleResult, RuleSetEvaluator, RuleTreeEvaluator, ScoringConfig, Severity,
};
pub use profile::{ApplicationProfile, FieldValue, Record};
pub use repository::{RepositoryError, UnderwritingRepository};
pub use router::underwriting_router;
pub use run::{
    MatchResult, MatchResultId, MatchRun, MatchRunId, MatchRunView, RuleResultDetail,
    RunStateError, RunStatus,
};
pub use service::{UnderwritingError, UnderwritingService};
