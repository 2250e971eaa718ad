use std::cmp::Reverse;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    CandidatePatch, CandidateQuery, JobPatch, JobQuery, PipelineStore, SortOrder, StoreError,
};
use crate::pipeline::domain::{Candidate, CandidateId, Job, JobId};

/// Process-local store backing the demo service and the test-suite.
///
/// Tables keep insertion order so records sharing a timestamp list deterministically.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    jobs: Mutex<Vec<Job>>,
    candidates: Mutex<Vec<Candidate>>,
}

fn lock<'a, T>(table: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    table
        .lock()
        .map_err(|_| StoreError::Unreachable(format!("{name} table lock poisoned")))
}

fn sorted<T: Clone>(
    rows: impl Iterator<Item = T>,
    order: SortOrder,
    created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    match order {
        SortOrder::NewestFirst => rows.sort_by_key(|row| Reverse(created(row))),
        SortOrder::OldestFirst => rows.sort_by_key(|row| created(row)),
    }
    rows
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing records, bypassing the insert constraints.
    pub fn with_records(jobs: Vec<Job>, candidates: Vec<Candidate>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            candidates: Mutex::new(candidates),
        }
    }
}

#[async_trait]
impl PipelineStore for InMemoryStore {
    async fn list_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, StoreError> {
        let guard = lock(&self.candidates, "candidates")?;
        let rows = guard.iter().filter(|candidate| query.matches(candidate)).cloned();
        Ok(sorted(rows, query.order, |candidate| candidate.created_at))
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        let guard = lock(&self.jobs, "jobs")?;
        let rows = guard.iter().filter(|job| query.matches(job)).cloned();
        Ok(sorted(rows, query.order, |job| job.created_at))
    }

    async fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, StoreError> {
        let job_owner = {
            let jobs = lock(&self.jobs, "jobs")?;
            jobs.iter()
                .find(|job| job.id == candidate.job_id)
                .map(|job| job.owner.clone())
                .ok_or_else(|| {
                    StoreError::Constraint(format!(
                        "candidate references unknown job {}",
                        candidate.job_id
                    ))
                })?
        };

        if job_owner != candidate.owner {
            return Err(StoreError::Constraint(format!(
                "candidate owner {} does not match job owner {job_owner}",
                candidate.owner
            )));
        }

        let mut guard = lock(&self.candidates, "candidates")?;
        if guard.iter().any(|existing| existing.id == candidate.id) {
            return Err(StoreError::Constraint(format!(
                "candidate {} already exists",
                candidate.id
            )));
        }
        guard.push(candidate.clone());
        Ok(candidate)
    }

    async fn update_candidate(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError> {
        let mut guard = lock(&self.candidates, "candidates")?;
        let candidate = guard
            .iter_mut()
            .find(|candidate| &candidate.id == id)
            .ok_or_else(|| StoreError::candidate_not_found(id))?;

        match patch {
            CandidatePatch::Stage(stage) => candidate.stage = stage,
            CandidatePatch::Fields(fields) => candidate.apply_fields(fields),
        }
        Ok(candidate.clone())
    }

    async fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        let mut guard = lock(&self.jobs, "jobs")?;
        if guard.iter().any(|existing| existing.id == job.id) {
            return Err(StoreError::Constraint(format!("job {} already exists", job.id)));
        }
        guard.push(job.clone());
        Ok(job)
    }

    async fn update_job(&self, id: &JobId, patch: JobPatch) -> Result<Job, StoreError> {
        let mut guard = lock(&self.jobs, "jobs")?;
        let job = guard
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| StoreError::job_not_found(id))?;

        match patch {
            JobPatch::Fields(fields) => {
                job.title = fields.title;
                job.department = fields.department;
                job.location = fields.location;
                job.description = fields.description;
            }
            JobPatch::Status(status) => job.status = status,
        }
        Ok(job.clone())
    }
}
