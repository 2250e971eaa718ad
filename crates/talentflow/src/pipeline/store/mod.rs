//! Record store boundary for the candidate and job collections.
//!
//! The pipeline engine only talks to storage through [`PipelineStore`]; every mutation is a
//! single `insert_*` or `update_*` call so a failed write never leaves a partial record behind.

mod memory;

use std::fmt;

use async_trait::async_trait;

use super::domain::{
    Candidate, CandidateFields, CandidateId, Job, JobFields, JobId, JobStatus, OperatorId,
    PipelineStage,
};

pub use memory::InMemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Candidates,
    Jobs,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Candidates => f.write_str("candidate"),
            Collection::Jobs => f.write_str("job"),
        }
    }
}

/// Structured store failures; callers convert these at the operation boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} {id} not found")]
    NotFound { collection: Collection, id: String },
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("store unreachable: {0}")]
    Unreachable(String),
}

impl StoreError {
    pub fn candidate_not_found(id: &CandidateId) -> Self {
        Self::NotFound {
            collection: Collection::Candidates,
            id: id.0.clone(),
        }
    }

    pub fn job_not_found(id: &JobId) -> Self {
        Self::NotFound {
            collection: Collection::Jobs,
            id: id.0.clone(),
        }
    }
}

/// Ordering on the creation timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateQuery {
    pub owner: Option<OperatorId>,
    pub job: Option<JobId>,
    pub stage: Option<PipelineStage>,
    pub order: SortOrder,
}

impl CandidateQuery {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.owner
            .as_ref()
            .map_or(true, |owner| &candidate.owner == owner)
            && self.job.as_ref().map_or(true, |job| &candidate.job_id == job)
            && self.stage.map_or(true, |stage| candidate.stage == stage)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    pub id: Option<JobId>,
    pub owner: Option<OperatorId>,
    pub status: Option<JobStatus>,
    pub order: SortOrder,
}

impl JobQuery {
    pub fn by_id(id: JobId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.id.as_ref().map_or(true, |id| &job.id == id)
            && self.owner.as_ref().map_or(true, |owner| &job.owner == owner)
            && self.status.map_or(true, |status| job.status == status)
    }
}

/// Partial candidate write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidatePatch {
    Stage(PipelineStage),
    Fields(CandidateFields),
}

/// Partial job write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPatch {
    Fields(JobFields),
    Status(JobStatus),
}

/// Storage abstraction so the pipeline engine can be exercised in isolation.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn list_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, StoreError>;

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError>;

    async fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, StoreError>;

    async fn update_candidate(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError>;

    async fn insert_job(&self, job: Job) -> Result<Job, StoreError>;

    async fn update_job(&self, id: &JobId, patch: JobPatch) -> Result<Job, StoreError>;

    async fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let jobs = self.list_jobs(&JobQuery::by_id(id.clone())).await?;
        Ok(jobs.into_iter().next())
    }

    async fn count_candidates(&self, query: &CandidateQuery) -> Result<usize, StoreError> {
        Ok(self.list_candidates(query).await?.len())
    }
}
