use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::dashboard::PipelineDashboard;
use super::domain::{CandidateFields, Job, JobFields, JobId, JobStatus, Operator, OperatorId};
use super::error::PipelineError;
use super::intake::{ApplicationIntake, ApplicationReceipt, JobPosting};
use super::jobs::{apply_link, JobCatalog, JobSummary};
use super::scope::AccessScope;
use super::stage::{StageMachine, TransitionMode};
use super::stats::DashboardStats;
use super::store::PipelineStore;

/// Shared dashboard session, locked for the duration of one interaction.
pub type DashboardHandle<S> = Arc<AsyncMutex<PipelineDashboard<S>>>;

/// Registered sessions kept before the least recently used one is dropped.
pub const DEFAULT_SESSION_LIMIT: usize = 256;

struct RegisteredSession<S: ?Sized> {
    handle: DashboardHandle<S>,
    last_used: u64,
}

/// Per-operator dashboards, bounded by `limit` with least-recently-used eviction.
struct SessionRegistry<S: ?Sized> {
    limit: usize,
    clock: u64,
    entries: HashMap<OperatorId, RegisteredSession<S>>,
}

impl<S: ?Sized> SessionRegistry<S> {
    fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            clock: 0,
            entries: HashMap::new(),
        }
    }

    fn checkout(
        &mut self,
        operator: &OperatorId,
        open: impl FnOnce() -> PipelineDashboard<S>,
    ) -> DashboardHandle<S> {
        self.clock += 1;
        let clock = self.clock;
        if let Some(entry) = self.entries.get_mut(operator) {
            entry.last_used = clock;
            return entry.handle.clone();
        }

        if self.entries.len() >= self.limit {
            self.evict_least_recent();
        }
        debug!(%operator, "opening dashboard session");
        let handle = Arc::new(AsyncMutex::new(open()));
        self.entries.insert(
            operator.clone(),
            RegisteredSession {
                handle: handle.clone(),
                last_used: clock,
            },
        );
        handle
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            self.entries.remove(&id);
            debug!(operator = %id, "evicted least recently used dashboard session");
        }
    }
}

/// Service composing the store, the shared stage machine, and per-operator dashboards.
pub struct PipelineService<S: ?Sized> {
    store: Arc<S>,
    machine: Arc<StageMachine<S>>,
    catalog: JobCatalog<S>,
    intake: ApplicationIntake<S>,
    public_url: String,
    sessions: Mutex<SessionRegistry<S>>,
}

impl<S> PipelineService<S>
where
    S: PipelineStore + ?Sized,
{
    pub fn new(store: Arc<S>, mode: TransitionMode, public_url: impl Into<String>) -> Self {
        Self {
            machine: Arc::new(StageMachine::new(store.clone(), mode)),
            catalog: JobCatalog::new(store.clone()),
            intake: ApplicationIntake::new(store.clone()),
            store,
            public_url: public_url.into(),
            sessions: Mutex::new(SessionRegistry::new(DEFAULT_SESSION_LIMIT)),
        }
    }

    /// Caps the number of registered sessions; a limit of zero is treated as one.
    pub fn with_session_limit(self, limit: usize) -> Self {
        Self {
            sessions: Mutex::new(SessionRegistry::new(limit)),
            ..self
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn transition_mode(&self) -> TransitionMode {
        self.machine.mode()
    }

    /// A fresh dashboard sharing this service's stage machine, not registered as a session.
    pub fn dashboard(&self, operator: Operator) -> PipelineDashboard<S> {
        PipelineDashboard::new(self.store.clone(), self.machine.clone(), operator)
    }

    /// The registered dashboard for `operator`, created on first use.
    pub fn session(&self, operator: &Operator) -> DashboardHandle<S> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.checkout(&operator.id, || self.dashboard(operator.clone()))
    }

    /// Drops the operator's registered dashboard. Returns whether one existed.
    pub fn end_session(&self, operator: &OperatorId) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let ended = sessions.entries.remove(operator).is_some();
        if ended {
            debug!(%operator, "dashboard session ended");
        }
        ended
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Reloads a session's working set without holding its lock across the store read.
    ///
    /// The identity carried by the request wins: a changed role re-resolves the scope and
    /// supersedes whatever that session still had in flight.
    pub async fn refresh(
        &self,
        session: &AsyncMutex<PipelineDashboard<S>>,
        operator: &Operator,
    ) -> Result<bool, PipelineError> {
        let (request, loader) = {
            let mut dashboard = session.lock().await;
            let request = if dashboard.operator() == operator {
                dashboard.begin_load()
            } else {
                dashboard.switch_operator(operator.clone())
            };
            (request, dashboard.loader())
        };

        let result = loader.fetch(&request).await;

        session.lock().await.apply_load(&request, result)
    }

    pub async fn stats(&self, operator: &Operator) -> Result<DashboardStats, PipelineError> {
        let scope = AccessScope::resolve(operator);
        DashboardStats::collect(&*self.store, &scope)
            .await
            .map_err(PipelineError::Stats)
    }

    pub async fn list_jobs(&self, operator: &Operator) -> Result<Vec<JobSummary>, PipelineError> {
        let scope = AccessScope::resolve(operator);
        Ok(self.catalog.list(&scope).await?)
    }

    pub async fn create_job(
        &self,
        operator: &Operator,
        fields: JobFields,
    ) -> Result<Job, PipelineError> {
        Ok(self.catalog.create(operator, fields).await?)
    }

    pub async fn update_job(
        &self,
        operator: &Operator,
        job_id: &JobId,
        fields: JobFields,
    ) -> Result<Job, PipelineError> {
        let scope = AccessScope::resolve(operator);
        Ok(self.catalog.update(&scope, job_id, fields).await?)
    }

    pub async fn set_job_status(
        &self,
        operator: &Operator,
        job_id: &JobId,
        status: JobStatus,
    ) -> Result<Job, PipelineError> {
        let scope = AccessScope::resolve(operator);
        Ok(self.catalog.set_status(&scope, job_id, status).await?)
    }

    pub fn apply_link(&self, job_id: &JobId) -> String {
        apply_link(&self.public_url, job_id)
    }

    pub async fn posting(&self, job_id: &JobId) -> Result<JobPosting, PipelineError> {
        Ok(self.intake.posting(job_id).await?)
    }

    pub async fn apply(
        &self,
        job_id: &JobId,
        form: CandidateFields,
    ) -> Result<ApplicationReceipt, PipelineError> {
        Ok(self.intake.submit(job_id, form).await?)
    }
}
