use serde::Serialize;

use super::domain::{JobStatus, PipelineStage};
use super::scope::AccessScope;
use super::store::{PipelineStore, StoreError};

/// Headline counts for the dashboard landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_jobs: usize,
    pub open_jobs: usize,
    pub total_candidates: usize,
    pub hired_candidates: usize,
}

impl DashboardStats {
    pub async fn collect<S>(store: &S, scope: &AccessScope) -> Result<Self, StoreError>
    where
        S: PipelineStore + ?Sized,
    {
        let all_jobs = scope.job_query();
        let all_candidates = scope.candidate_query();
        let mut open = scope.job_query();
        open.status = Some(JobStatus::Open);
        let mut hired = scope.candidate_query();
        hired.stage = Some(PipelineStage::Hired);

        let (jobs, open_jobs, total_candidates, hired_candidates) = tokio::try_join!(
            store.list_jobs(&all_jobs),
            store.list_jobs(&open),
            store.count_candidates(&all_candidates),
            store.count_candidates(&hired),
        )?;

        Ok(Self {
            total_jobs: jobs.len(),
            open_jobs: open_jobs.len(),
            total_candidates,
            hired_candidates,
        })
    }
}
