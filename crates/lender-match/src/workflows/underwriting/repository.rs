use super::domain::{CatalogEntry, LoanApplication, LoanRequestId};
use super::run::{MatchResult, MatchRun, MatchRunId};

/// Storage abstraction over applications, the policy catalog and match runs.
///
/// Implementations assign ids on insert and return the stored record.
pub trait UnderwritingRepository: Send + Sync {
    fn load_application(
        &self,
        id: LoanRequestId,
    ) -> Result<Option<LoanApplication>, RepositoryError>;

    /// Every policy with its owning program and lender, in a stable retrieval order.
    fn policy_catalog(&self) -> Result<Vec<CatalogEntry>, RepositoryError>;

    fn insert_run(&self, run: MatchRun) -> Result<MatchRun, RepositoryError>;
    fn update_run(&self, run: &MatchRun) -> Result<(), RepositoryError>;
    fn fetch_run(&self, id: MatchRunId) -> Result<Option<MatchRun>, RepositoryError>;

    fn insert_result(&self, result: MatchResult) -> Result<MatchResult, RepositoryError>;
    fn results_for_run(&self, id: MatchRunId) -> Result<Vec<MatchResult>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
