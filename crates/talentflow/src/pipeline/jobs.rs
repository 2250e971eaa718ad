//! Job catalog: scoped listing with candidate counts plus the single-record job writes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{optional_text, Job, JobFields, JobId, JobStatus, Operator};
use super::scope::AccessScope;
use super::store::{JobPatch, PipelineStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobCatalogError {
    #[error("job title is required")]
    MissingTitle,
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("failed to load jobs: {0}")]
    Load(#[source] StoreError),
    #[error("failed to save job: {0}")]
    Write(#[source] StoreError),
}

/// A job row on the jobs page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    #[serde(flatten)]
    pub job: Job,
    pub candidate_count: usize,
}

/// Shareable public application URL for a job.
pub fn apply_link(base_url: &str, job_id: &JobId) -> String {
    format!("{}/apply/{}", base_url.trim_end_matches('/'), job_id)
}

fn validate_job(fields: JobFields) -> Result<JobFields, JobCatalogError> {
    let title = fields.title.trim().to_string();
    if title.is_empty() {
        return Err(JobCatalogError::MissingTitle);
    }
    Ok(JobFields {
        title,
        department: optional_text(fields.department),
        location: optional_text(fields.location),
        description: optional_text(fields.description),
    })
}

pub struct JobCatalog<S: ?Sized> {
    store: Arc<S>,
}

impl<S> JobCatalog<S>
where
    S: PipelineStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Jobs visible in `scope`, newest first, each with the number of candidates on it.
    pub async fn list(&self, scope: &AccessScope) -> Result<Vec<JobSummary>, JobCatalogError> {
        let job_query = scope.job_query();
        let candidate_query = scope.candidate_query();
        let (jobs, candidates) = tokio::try_join!(
            self.store.list_jobs(&job_query),
            self.store.list_candidates(&candidate_query),
        )
        .map_err(JobCatalogError::Load)?;

        let mut counts: HashMap<&JobId, usize> = HashMap::new();
        for candidate in &candidates {
            *counts.entry(&candidate.job_id).or_default() += 1;
        }

        Ok(jobs
            .iter()
            .map(|job| JobSummary {
                candidate_count: counts.get(&job.id).copied().unwrap_or(0),
                job: job.clone(),
            })
            .collect())
    }

    pub async fn create(
        &self,
        operator: &Operator,
        fields: JobFields,
    ) -> Result<Job, JobCatalogError> {
        let fields = validate_job(fields)?;
        let job = Job {
            id: JobId::generate(),
            owner: operator.id.clone(),
            title: fields.title,
            department: fields.department,
            location: fields.location,
            description: fields.description,
            status: JobStatus::Open,
            created_at: Utc::now(),
        };

        let job = self
            .store
            .insert_job(job)
            .await
            .map_err(JobCatalogError::Write)?;
        info!(job = %job.id, owner = %job.owner, "job created");
        Ok(job)
    }

    pub async fn update(
        &self,
        scope: &AccessScope,
        job_id: &JobId,
        fields: JobFields,
    ) -> Result<Job, JobCatalogError> {
        let fields = validate_job(fields)?;
        self.write(scope, job_id, JobPatch::Fields(fields)).await
    }

    pub async fn set_status(
        &self,
        scope: &AccessScope,
        job_id: &JobId,
        status: JobStatus,
    ) -> Result<Job, JobCatalogError> {
        self.write(scope, job_id, JobPatch::Status(status)).await
    }

    async fn write(
        &self,
        scope: &AccessScope,
        job_id: &JobId,
        patch: JobPatch,
    ) -> Result<Job, JobCatalogError> {
        // Foreign jobs are reported exactly like missing ones.
        let visible = self
            .store
            .job(job_id)
            .await
            .map_err(JobCatalogError::Load)?
            .is_some_and(|job| scope.permits(&job.owner));
        if !visible {
            return Err(JobCatalogError::JobNotFound(job_id.clone()));
        }

        match self.store.update_job(job_id, patch).await {
            Ok(job) => {
                info!(job = %job.id, status = job.status.label(), "job updated");
                Ok(job)
            }
            Err(StoreError::NotFound { .. }) => Err(JobCatalogError::JobNotFound(job_id.clone())),
            Err(source) => {
                warn!(job = %job_id, error = %source, "job update failed");
                Err(JobCatalogError::Write(source))
            }
        }
    }
}
