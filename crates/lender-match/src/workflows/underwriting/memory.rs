use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::catalog::PolicyCatalog;
use super::domain::{CatalogEntry, LoanApplication, LoanRequestId};
use super::repository::{RepositoryError, UnderwritingRepository};
use super::run::{MatchResult, MatchResultId, MatchRun, MatchRunId};

#[derive(Debug, Default)]
struct MemoryState {
    applications: BTreeMap<LoanRequestId, LoanApplication>,
    catalog: Vec<CatalogEntry>,
    runs: BTreeMap<MatchRunId, MatchRun>,
    results: Vec<MatchResult>,
    next_run_id: i64,
    next_result_id: i64,
}

/// Process-local repository for demos and tests. Ids are assigned sequentially from 1.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUnderwritingRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryUnderwritingRepository {
    pub fn with_catalog(catalog: PolicyCatalog) -> Self {
        let state = MemoryState {
            catalog: catalog.into_entries(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn add_application(&self, application: LoanApplication) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let id = application.loan_request.id;
        if state.applications.contains_key(&id) {
            return Err(RepositoryError::Conflict);
        }
        state.applications.insert(id, application);
        Ok(())
    }

    pub fn replace_catalog(&self, entries: Vec<CatalogEntry>) -> Result<(), RepositoryError> {
        self.lock()?.catalog = entries;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl UnderwritingRepository for InMemoryUnderwritingRepository {
    fn load_application(
        &self,
        id: LoanRequestId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    fn policy_catalog(&self) -> Result<Vec<CatalogEntry>, RepositoryError> {
        Ok(self.lock()?.catalog.clone())
    }

    fn insert_run(&self, mut run: MatchRun) -> Result<MatchRun, RepositoryError> {
        let mut state = self.lock()?;
        state.next_run_id += 1;
        run.id = MatchRunId(state.next_run_id);
        state.runs.insert(run.id, run.clone());
        Ok(run)
    }

    fn update_run(&self, run: &MatchRun) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.runs.get_mut(&run.id) {
            Some(stored) => {
                *stored = run.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_run(&self, id: MatchRunId) -> Result<Option<MatchRun>, RepositoryError> {
        Ok(self.lock()?.runs.get(&id).cloned())
    }

    fn insert_result(&self, mut result: MatchResult) -> Result<MatchResult, RepositoryError> {
        let mut state = self.lock()?;
        if !state.runs.contains_key(&result.match_run_id) {
            return Err(RepositoryError::NotFound);
        }
        state.next_result_id += 1;
        result.id = MatchResultId(state.next_result_id);
        state.results.push(result.clone());
        Ok(result)
    }

    fn results_for_run(&self, id: MatchRunId) -> Result<Vec<MatchResult>, RepositoryError> {
        Ok(self
            .lock()?
            .results
            .iter()
            .filter(|result| result.match_run_id == id)
            .cloned()
            .collect())
    }
}
