use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, warn};

use super::domain::{CatalogEntry, LoanRequestId};
use super::policy::{PolicyEngine, PolicyEvaluation, RuleSetEvaluator, RuleTreeEvaluator};
use super::profile::ApplicationProfile;
use super::repository::{RepositoryError, UnderwritingRepository};
use super::run::{MatchResult, MatchRun, MatchRunId, MatchRunView, RunStateError};

/// Service composing the repository and the policy engine into underwriting runs.
pub struct UnderwritingService<R, E = RuleTreeEvaluator> {
    repository: Arc<R>,
    engine: Arc<PolicyEngine<E>>,
}

impl<R> UnderwritingService<R>
where
    R: UnderwritingRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_engine(repository, PolicyEngine::new())
    }
}

impl<R, E> UnderwritingService<R, E>
where
    R: UnderwritingRepository + 'static,
    E: RuleSetEvaluator + 'static,
{
    pub fn with_engine(repository: Arc<R>, engine: PolicyEngine<E>) -> Self {
        Self {
            repository,
            engine: Arc::new(engine),
        }
    }

    /// Underwrite a loan request against every active policy, as of today.
    pub fn run(&self, loan_request_id: LoanRequestId) -> Result<MatchRunView, UnderwritingError> {
        self.run_as_of(loan_request_id, Local::now().date_naive())
    }

    /// Underwrite with derived fields (equipment age) computed as of `as_of`.
    ///
    /// Once the run has been persisted, any failure marks it `FAILED` before the
    /// error is returned.
    pub fn run_as_of(
        &self,
        loan_request_id: LoanRequestId,
        as_of: NaiveDate,
    ) -> Result<MatchRunView, UnderwritingError> {
        let application = self
            .repository
            .load_application(loan_request_id)?
            .ok_or(UnderwritingError::LoanRequestNotFound(loan_request_id))?;

        let mut run = MatchRun::pending(loan_request_id);
        run.start()?;
        let mut run = self.repository.insert_run(run)?;
        info!(run_id = run.id.0, loan_request_id = loan_request_id.0, "underwriting run started");

        let profile = ApplicationProfile::build(&application, as_of);

        let outcome = self
            .evaluate_catalog(&run, &profile)
            .and_then(|results| {
                let mut completed = run.clone();
                completed.complete()?;
                self.repository.update_run(&completed)?;
                Ok((completed, results))
            });

        match outcome {
            Ok((completed, results)) => {
                info!(
                    run_id = completed.id.0,
                    evaluated = results.len(),
                    eligible = results.iter().filter(|result| result.eligible).count(),
                    "underwriting run complete"
                );
                Ok(MatchRunView::new(&completed, results))
            }
            Err(err) => {
                error!(run_id = run.id.0, error = %err, "underwriting run failed");
                self.mark_failed(&mut run);
                Err(err)
            }
        }
    }

    /// Fetch a run and its stored results.
    pub fn get_run(&self, run_id: MatchRunId) -> Result<MatchRunView, UnderwritingError> {
        let run = self
            .repository
            .fetch_run(run_id)?
            .ok_or(UnderwritingError::RunNotFound(run_id))?;
        let results = self.repository.results_for_run(run_id)?;
        Ok(MatchRunView::new(&run, results))
    }

    /// Rebuild the per-program evaluations stored for a run.
    pub fn evaluations_for_run(
        &self,
        run_id: MatchRunId,
    ) -> Result<Vec<PolicyEvaluation>, UnderwritingError> {
        let view = self.get_run(run_id)?;
        Ok(view.results.iter().map(MatchResult::to_evaluation).collect())
    }

    fn evaluate_catalog(
        &self,
        run: &MatchRun,
        profile: &ApplicationProfile,
    ) -> Result<Vec<MatchResult>, UnderwritingError> {
        let active: Vec<CatalogEntry> = self
            .repository
            .policy_catalog()?
            .into_iter()
            .filter(CatalogEntry::is_eligible_for_matching)
            .collect();

        let mut results = Vec::with_capacity(active.len());
        for entry in &active {
            let evaluation = self.engine.evaluate(
                &entry.policy.policy,
                entry.lender.id,
                entry.program.id,
                profile,
            );
            debug!(
                run_id = run.id.0,
                lender = %entry.lender.name,
                program = %entry.program.name,
                eligible = evaluation.eligible,
                fit_score = ?evaluation.fit_score,
                "policy evaluated"
            );

            let stored = self
                .repository
                .insert_result(MatchResult::from_evaluation(run.id, &evaluation))?;
            results.push(stored);
        }

        Ok(results)
    }

    fn mark_failed(&self, run: &mut MatchRun) {
        if let Err(err) = run.fail() {
            warn!(run_id = run.id.0, error = %err, "run already finalized");
            return;
        }
        if let Err(err) = self.repository.update_run(run) {
            warn!(run_id = run.id.0, error = %err, "could not persist failed run status");
        }
    }
}

/// Error raised by the underwriting service.
#[derive(Debug, thiserror::Error)]
pub enum UnderwritingError {
    #[error("loan request {0} not found")]
    LoanRequestNotFound(LoanRequestId),
    #[error("match run {0} not found")]
    RunNotFound(MatchRunId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    RunState(#[from] RunStateError),
}

impl UnderwritingError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            UnderwritingError::LoanRequestNotFound(_)
                | UnderwritingError::RunNotFound(_)
                | UnderwritingError::Repository(RepositoryError::NotFound)
        )
    }
}
