//! Unauthenticated application intake.
//!
//! The only write path that bypasses operator identity. Candidates it creates start in
//! `applied` and inherit the job owner's tenant, so once stored they are indistinguishable
//! from operator-created records.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Candidate, CandidateFields, Job, JobId, JobStatus};
use super::edit::{validate_contact, ValidationError};
use super::store::{PipelineStore, StoreError};

/// Public view of a job shown above the application form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPosting {
    pub job_id: JobId,
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: JobStatus,
}

impl From<Job> for JobPosting {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            title: job.title,
            department: job.department,
            location: job.location,
            description: job.description,
            status: job.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to look up job: {0}")]
    Lookup(#[source] StoreError),
    #[error("failed to submit application: {0}")]
    Write(#[source] StoreError),
}

/// Receipt returned to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationReceipt {
    pub job_title: String,
    pub candidate: Candidate,
}

pub struct ApplicationIntake<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ApplicationIntake<S>
where
    S: PipelineStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn find_job(&self, job_id: &JobId) -> Result<Job, IntakeError> {
        self.store
            .job(job_id)
            .await
            .map_err(IntakeError::Lookup)?
            .ok_or_else(|| IntakeError::JobNotFound(job_id.clone()))
    }

    pub async fn posting(&self, job_id: &JobId) -> Result<JobPosting, IntakeError> {
        self.find_job(job_id).await.map(JobPosting::from)
    }

    pub async fn submit(
        &self,
        job_id: &JobId,
        form: CandidateFields,
    ) -> Result<ApplicationReceipt, IntakeError> {
        let job = self.find_job(job_id).await?;
        let fields = validate_contact(form)?;

        let candidate = Candidate::for_job(&job, fields, Utc::now());
        match self.store.insert_candidate(candidate).await {
            Ok(candidate) => {
                info!(job = %job.id, candidate = %candidate.id, "application received");
                Ok(ApplicationReceipt {
                    job_title: job.title,
                    candidate,
                })
            }
            Err(source) => {
                warn!(job = %job.id, error = %source, "application insert failed");
                Err(IntakeError::Write(source))
            }
        }
    }
}
