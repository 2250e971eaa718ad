use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::pipeline::domain::{
    Candidate, CandidateFields, CandidateId, Job, JobId, JobStatus, Operator, OperatorId,
    OperatorRole, PipelineStage,
};
use crate::pipeline::store::{
    CandidatePatch, CandidateQuery, InMemoryStore, JobPatch, JobQuery, PipelineStore, StoreError,
};
use crate::pipeline::{pipeline_router, PipelineService, TransitionMode};

pub(super) const OWNER_A: &str = "owner-a";
pub(super) const OWNER_B: &str = "owner-b";

pub(super) fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn job(id: &str, owner: &str, title: &str, day: u32) -> Job {
    Job {
        id: JobId(id.to_string()),
        owner: OperatorId(owner.to_string()),
        title: title.to_string(),
        department: Some("Engineering".to_string()),
        location: Some("Stockholm".to_string()),
        description: None,
        status: JobStatus::Open,
        created_at: at(day),
    }
}

pub(super) fn candidate(
    id: &str,
    job: &Job,
    name: &str,
    email: &str,
    stage: PipelineStage,
    day: u32,
) -> Candidate {
    Candidate {
        id: CandidateId(id.to_string()),
        owner: job.owner.clone(),
        job_id: job.id.clone(),
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        profile_url: None,
        resume_url: None,
        notes: None,
        stage,
        created_at: at(day),
    }
}

pub(super) fn jobs() -> Vec<Job> {
    vec![
        job("job-a1", OWNER_A, "Backend Engineer", 1),
        job("job-a2", OWNER_A, "Product Designer", 2),
        job("job-b1", OWNER_B, "Data Analyst", 3),
        job("job-b2", OWNER_B, "Office Manager", 4),
    ]
}

/// Three candidates on owner A's two jobs, one on owner B's first job, none on `job-b2`.
pub(super) fn candidates(jobs: &[Job]) -> Vec<Candidate> {
    vec![
        candidate(
            "cand-erik",
            &jobs[0],
            "Erik Andersson",
            "erik.andersson@exempel.se",
            PipelineStage::Applied,
            10,
        ),
        candidate(
            "cand-anna",
            &jobs[1],
            "Anna Svensson",
            "anna.svensson@exempel.se",
            PipelineStage::Screening,
            9,
        ),
        candidate(
            "cand-lars",
            &jobs[0],
            "Lars Nilsson",
            "lars.nilsson@exempel.se",
            PipelineStage::Interview,
            8,
        ),
        candidate(
            "cand-maria",
            &jobs[2],
            "Maria Berg",
            "maria.berg@exempel.se",
            PipelineStage::Applied,
            11,
        ),
    ]
}

pub(super) fn seeded_store() -> Arc<InMemoryStore> {
    let jobs = jobs();
    let candidates = candidates(&jobs);
    Arc::new(InMemoryStore::with_records(jobs, candidates))
}

pub(super) fn owner_a() -> Operator {
    Operator::new(OWNER_A, OperatorRole::Owner)
}

pub(super) fn owner_b() -> Operator {
    Operator::new(OWNER_B, OperatorRole::Owner)
}

pub(super) fn admin() -> Operator {
    Operator::new("admin-1", OperatorRole::Administrator)
}

pub(super) fn erik() -> CandidateId {
    CandidateId("cand-erik".to_string())
}

pub(super) fn contact(name: &str, email: &str) -> CandidateFields {
    CandidateFields {
        name: name.to_string(),
        email: email.to_string(),
        ..CandidateFields::default()
    }
}

/// Seeded store with switchable read and write faults; records every write it accepts.
#[derive(Debug, Default)]
pub(super) struct FaultyStore {
    pub(super) inner: InMemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    update_calls: AtomicUsize,
    active_writes: AtomicUsize,
    peak_writes: AtomicUsize,
    pub(super) stage_writes: Mutex<Vec<(CandidateId, PipelineStage)>>,
}

impl FaultyStore {
    pub(super) fn seeded() -> Arc<Self> {
        let jobs = jobs();
        let candidates = candidates(&jobs);
        Arc::new(Self {
            inner: InMemoryStore::with_records(jobs, candidates),
            ..Self::default()
        })
    }

    pub(super) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(super) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(super) fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Highest number of candidate writes that were in progress at the same time.
    pub(super) fn peak_concurrent_writes(&self) -> usize {
        self.peak_writes.load(Ordering::SeqCst)
    }

    pub(super) fn stage_writes(&self) -> Vec<(CandidateId, PipelineStage)> {
        self.stage_writes.lock().expect("writes mutex poisoned").clone()
    }

    fn read_guard(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("database offline".to_string()));
        }
        Ok(())
    }

    fn write_guard(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("database offline".to_string()));
        }
        Ok(())
    }

    pub(super) async fn stage_of(&self, id: &CandidateId) -> PipelineStage {
        self.inner
            .list_candidates(&CandidateQuery::default())
            .await
            .expect("inner store readable")
            .into_iter()
            .find(|candidate| &candidate.id == id)
            .map(|candidate| candidate.stage)
            .expect("candidate exists")
    }
}

#[async_trait]
impl PipelineStore for FaultyStore {
    async fn list_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, StoreError> {
        self.read_guard()?;
        self.inner.list_candidates(query).await
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        self.read_guard()?;
        self.inner.list_jobs(query).await
    }

    async fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, StoreError> {
        self.write_guard()?;
        self.inner.insert_candidate(candidate).await
    }

    async fn update_candidate(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.write_guard()?;
        if let CandidatePatch::Stage(stage) = &patch {
            self.stage_writes
                .lock()
                .expect("writes mutex poisoned")
                .push((id.clone(), *stage));
        }
        let active = self.active_writes.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_writes.fetch_max(active, Ordering::SeqCst);
        // Yield between recording and applying so unserialized writers overlap.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        let result = self.inner.update_candidate(id, patch).await;
        self.active_writes.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        self.write_guard()?;
        self.inner.insert_job(job).await
    }

    async fn update_job(&self, id: &JobId, patch: JobPatch) -> Result<Job, StoreError> {
        self.write_guard()?;
        self.inner.update_job(id, patch).await
    }
}

/// Seeded store whose next candidate listing pauses after taking its snapshot.
#[derive(Debug, Default)]
pub(super) struct GatedStore {
    pub(super) inner: InMemoryStore,
    armed: AtomicBool,
    reading: Notify,
    gate: Notify,
}

impl GatedStore {
    pub(super) fn seeded() -> Arc<Self> {
        let jobs = jobs();
        let candidates = candidates(&jobs);
        Arc::new(Self {
            inner: InMemoryStore::with_records(jobs, candidates),
            ..Self::default()
        })
    }

    pub(super) fn hold_next_read(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolves once the held read has its snapshot and is waiting for [`Self::release`].
    pub(super) async fn wait_until_reading(&self) {
        self.reading.notified().await;
    }

    pub(super) fn release(&self) {
        self.gate.notify_one();
    }

    pub(super) async fn stage_of(&self, id: &CandidateId) -> PipelineStage {
        self.inner
            .list_candidates(&CandidateQuery::default())
            .await
            .expect("inner store readable")
            .into_iter()
            .find(|candidate| &candidate.id == id)
            .map(|candidate| candidate.stage)
            .expect("candidate exists")
    }
}

#[async_trait]
impl PipelineStore for GatedStore {
    async fn list_candidates(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, StoreError> {
        let snapshot = self.inner.list_candidates(query).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reading.notify_one();
            self.gate.notified().await;
        }
        snapshot
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        self.inner.list_jobs(query).await
    }

    async fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, StoreError> {
        self.inner.insert_candidate(candidate).await
    }

    async fn update_candidate(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError> {
        self.inner.update_candidate(id, patch).await
    }

    async fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        self.inner.insert_job(job).await
    }

    async fn update_job(&self, id: &JobId, patch: JobPatch) -> Result<Job, StoreError> {
        self.inner.update_job(id, patch).await
    }
}

pub(super) fn service_for<S>(store: Arc<S>, mode: TransitionMode) -> Arc<PipelineService<S>>
where
    S: PipelineStore,
{
    Arc::new(PipelineService::new(store, mode, "http://jobs.test"))
}

pub(super) fn router_for<S>(store: Arc<S>) -> axum::Router
where
    S: PipelineStore + 'static,
{
    pipeline_router(service_for(store, TransitionMode::WriteThenPatch))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
