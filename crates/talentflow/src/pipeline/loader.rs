use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{Job, JobId, OperatorId};
use super::scope::AccessScope;
use super::store::{PipelineStore, StoreError};
use super::working_set::{JobOption, PipelineEntry, WorkingSet};

/// Monotonic key attached to each load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LoadToken(pub u64);

/// One keyed load, carrying the scope resolved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub token: LoadToken,
    pub operator: OperatorId,
    pub scope: AccessScope,
    /// Restricts the load to a single job's board.
    pub job: Option<JobId>,
}

#[derive(Debug, Clone)]
pub struct LoadedPipeline {
    pub token: LoadToken,
    pub working_set: WorkingSet,
    pub job_options: Vec<JobOption>,
    pub job: Option<Job>,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Current(LoadedPipeline),
    /// A newer request was issued while this one was in flight; its result is discarded.
    Superseded { token: LoadToken },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load pipeline data: {0}")]
    Store(#[from] StoreError),
    #[error("job {0} not found")]
    JobNotFound(JobId),
}

/// Fetches and joins the candidate working set for one operator session.
pub struct PipelineLoader<S: ?Sized> {
    store: Arc<S>,
    latest: AtomicU64,
}

impl<S> PipelineLoader<S>
where
    S: PipelineStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            latest: AtomicU64::new(0),
        }
    }

    /// Issues a new request token, superseding every request issued before it.
    pub fn begin(
        &self,
        operator: &OperatorId,
        scope: AccessScope,
        job: Option<JobId>,
    ) -> LoadRequest {
        LoadRequest {
            token: self.supersede(),
            operator: operator.clone(),
            scope,
            job,
        }
    }

    /// Invalidates every request issued so far and returns the token that replaces them.
    pub fn supersede(&self) -> LoadToken {
        LoadToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, token: LoadToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }

    pub async fn fetch(&self, request: &LoadRequest) -> Result<LoadOutcome, LoadError> {
        let result = self.query(request).await;

        if !self.is_current(request.token) {
            debug!(token = request.token.0, "discarding superseded pipeline load");
            return Ok(LoadOutcome::Superseded {
                token: request.token,
            });
        }

        result.map(LoadOutcome::Current)
    }

    async fn query(&self, request: &LoadRequest) -> Result<LoadedPipeline, LoadError> {
        let mut candidate_query = request.scope.candidate_query();
        candidate_query.job = request.job.clone();
        // Owner-restricted in owned scope; the join needs it for titles and foreign-job checks.
        let job_query = request.scope.job_query();

        let (candidates, jobs) = tokio::try_join!(
            self.store.list_candidates(&candidate_query),
            self.store.list_jobs(&job_query),
        )?;

        let by_id: HashMap<&JobId, &Job> = jobs.iter().map(|job| (&job.id, job)).collect();

        let focused = match &request.job {
            Some(job_id) => Some(
                by_id
                    .get(job_id)
                    .map(|job| (*job).clone())
                    .ok_or_else(|| LoadError::JobNotFound(job_id.clone()))?,
            ),
            None => None,
        };

        let mut entries = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let job = by_id.get(&candidate.job_id).copied();
            match (&request.scope, job) {
                (AccessScope::Owned(owner), Some(job)) if &job.owner != owner => {
                    warn!(candidate = %candidate.id, job = %job.id, "skipping candidate on foreign job");
                }
                (AccessScope::Owned(_), None) => {
                    warn!(candidate = %candidate.id, job = %candidate.job_id, "skipping candidate without visible job");
                }
                _ => entries.push(PipelineEntry::new(candidate, job)),
            }
        }

        let job_options = match request.scope {
            AccessScope::Global => jobs.iter().map(JobOption::from).collect(),
            AccessScope::Owned(_) => options_from_entries(&entries),
        };

        debug!(
            token = request.token.0,
            candidates = entries.len(),
            jobs = job_options.len(),
            "pipeline load complete"
        );

        Ok(LoadedPipeline {
            token: request.token,
            working_set: WorkingSet::new(entries),
            job_options,
            job: focused,
        })
    }
}

fn options_from_entries(entries: &[PipelineEntry]) -> Vec<JobOption> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| seen.insert(entry.job_id().clone()))
        .map(|entry| JobOption {
            id: entry.job_id().clone(),
            title: entry.job_title_label().to_string(),
        })
        .collect()
}
