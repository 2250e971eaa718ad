//! One operator's pipeline page: load state, working set, filters, view mode, and the
//! interaction sessions (drag, edit) scoped to it.
//!
//! Loading is split into [`PipelineDashboard::begin_load`], a fetch through the shared
//! [`PipelineLoader`], and [`PipelineDashboard::apply_load`], so a caller holding the dashboard
//! behind a lock can release it while the store is being read. A response is applied only if
//! its token is still the latest one issued.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{Candidate, CandidateId, Job, JobId, Operator, PipelineStage};
use super::drag::DragSession;
use super::edit::{CandidateEditSession, EditError};
use super::error::PipelineError;
use super::filter::{JobSelection, PipelineFilter};
use super::loader::{LoadError, LoadOutcome, LoadRequest, LoadToken, PipelineLoader};
use super::notify::{Notification, Notifications};
use super::presenter::{PipelinePresenter, PipelineView, ViewMode};
use super::scope::AccessScope;
use super::stage::{StageMachine, TransitionError, TransitionReceipt};
use super::store::PipelineStore;
use super::working_set::{JobOption, PipelineEntry, WorkingSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing requested yet.
    Idle,
    Loading(LoadToken),
    Ready(LoadToken),
    /// Persistent error state; the previous working set is not shown.
    Failed(LoadError),
}

impl LoadState {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading(_) => "loading",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Serializable state of a dashboard after the current filters are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSnapshot {
    pub operator: Operator,
    pub scope: AccessScope,
    pub state: &'static str,
    pub query: String,
    pub job_filter: JobSelection,
    pub job: Option<Job>,
    pub job_options: Vec<JobOption>,
    pub total: usize,
    pub visible: usize,
    pub stage_counts: Vec<StageCount>,
    pub dragging: Option<CandidateId>,
    pub view: PipelineView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: PipelineStage,
    pub count: usize,
}

pub struct PipelineDashboard<S: ?Sized> {
    store: Arc<S>,
    loader: Arc<PipelineLoader<S>>,
    machine: Arc<StageMachine<S>>,
    operator: Operator,
    scope: AccessScope,
    focus: Option<JobId>,
    state: LoadState,
    working_set: WorkingSet,
    job_options: Vec<JobOption>,
    focused_job: Option<Job>,
    filter: PipelineFilter,
    view_mode: ViewMode,
    drag: DragSession,
    edit: Option<CandidateEditSession>,
    notifications: Notifications,
}

impl<S> PipelineDashboard<S>
where
    S: PipelineStore + ?Sized,
{
    pub fn new(store: Arc<S>, machine: Arc<StageMachine<S>>, operator: Operator) -> Self {
        Self {
            loader: Arc::new(PipelineLoader::new(store.clone())),
            store,
            machine,
            scope: AccessScope::resolve(&operator),
            operator,
            focus: None,
            state: LoadState::Idle,
            working_set: WorkingSet::default(),
            job_options: Vec::new(),
            focused_job: None,
            filter: PipelineFilter::default(),
            view_mode: ViewMode::default(),
            drag: DragSession::new(),
            edit: None,
            notifications: Notifications::default(),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn scope(&self) -> &AccessScope {
        &self.scope
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn job_options(&self) -> &[JobOption] {
        &self.job_options
    }

    pub fn focused_job(&self) -> Option<&Job> {
        self.focused_job.as_ref()
    }

    pub fn filter(&self) -> &PipelineFilter {
        &self.filter
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn drag(&self) -> &DragSession {
        &self.drag
    }

    pub fn loader(&self) -> Arc<PipelineLoader<S>> {
        self.loader.clone()
    }

    /// Re-resolves the access scope and issues a new load token, superseding any load in
    /// flight.
    pub fn begin_load(&mut self) -> LoadRequest {
        self.scope = AccessScope::resolve(&self.operator);
        let request = self
            .loader
            .begin(&self.operator.id, self.scope.clone(), self.focus.clone());
        debug!(operator = %self.operator.id, token = request.token.0, "pipeline load started");
        self.state = LoadState::Loading(request.token);
        request
    }

    /// Applies a fetched response. Returns `Ok(false)` when the response was superseded.
    pub fn apply_load(
        &mut self,
        request: &LoadRequest,
        result: Result<LoadOutcome, LoadError>,
    ) -> Result<bool, PipelineError> {
        if !self.loader.is_current(request.token) {
            debug!(token = request.token.0, "ignoring stale pipeline load");
            return Ok(false);
        }

        match result {
            Ok(LoadOutcome::Superseded { .. }) => Ok(false),
            Ok(LoadOutcome::Current(loaded)) => {
                self.working_set = loaded.working_set;
                self.job_options = loaded.job_options;
                self.focused_job = loaded.job;
                self.state = LoadState::Ready(loaded.token);
                info!(
                    operator = %self.operator.id,
                    candidates = self.working_set.len(),
                    "pipeline loaded"
                );
                Ok(true)
            }
            Err(error) => {
                warn!(operator = %self.operator.id, %error, "pipeline load failed");
                self.state = LoadState::Failed(error.clone());
                Err(error.into())
            }
        }
    }

    pub async fn reload(&mut self) -> Result<bool, PipelineError> {
        let request = self.begin_load();
        let result = self.loader.fetch(&request).await;
        self.apply_load(&request, result)
    }

    /// Replaces the session identity. Interaction sessions are dropped and the returned
    /// request supersedes anything still loading for the previous identity.
    pub fn switch_operator(&mut self, operator: Operator) -> LoadRequest {
        info!(from = %self.operator.id, to = %operator.id, "operator switched");
        self.operator = operator;
        self.working_set = WorkingSet::default();
        self.job_options.clear();
        self.focused_job = None;
        self.drag = DragSession::new();
        self.edit = None;
        self.begin_load()
    }

    /// Restricts subsequent loads to one job's board, or lifts the restriction.
    pub fn focus_job(&mut self, job: Option<JobId>) {
        self.focus = job;
    }

    pub fn focus(&self) -> Option<&JobId> {
        self.focus.as_ref()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
    }

    pub fn set_job_filter(&mut self, job: JobSelection) {
        self.filter.job = job;
    }

    pub fn set_view(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn filtered(&self) -> Vec<&PipelineEntry> {
        self.filter.apply(self.working_set.entries())
    }

    pub fn presenter(&self) -> PipelinePresenter<'_> {
        PipelinePresenter::new(self.filtered())
    }

    fn ensure_loaded(&self) -> Result<(), PipelineError> {
        match &self.state {
            LoadState::Failed(error) => Err(error.clone().into()),
            _ => Ok(()),
        }
    }

    pub fn view(&self) -> Result<PipelineView, PipelineError> {
        self.ensure_loaded()?;
        Ok(self.presenter().render(self.view_mode))
    }

    pub fn snapshot(&self) -> Result<DashboardSnapshot, PipelineError> {
        self.ensure_loaded()?;
        let presenter = self.presenter();
        Ok(DashboardSnapshot {
            operator: self.operator.clone(),
            scope: self.scope.clone(),
            state: self.state.label(),
            query: self.filter.query.clone(),
            job_filter: self.filter.job.clone(),
            job: self.focused_job.clone(),
            job_options: self.job_options.clone(),
            total: self.working_set.len(),
            visible: presenter.filtered().len(),
            stage_counts: PipelineStage::ordered()
                .into_iter()
                .map(|stage| StageCount {
                    stage,
                    count: presenter.count(stage),
                })
                .collect(),
            dragging: self.drag.dragging().cloned(),
            view: presenter.render(self.view_mode),
        })
    }

    pub fn begin_drag(&mut self, candidate_id: CandidateId) {
        self.drag.begin_drag(candidate_id);
    }

    pub fn cancel_drag(&mut self) -> Option<CandidateId> {
        self.drag.cancel()
    }

    pub async fn drop_on_stage(
        &mut self,
        target: &str,
    ) -> Result<Option<TransitionReceipt>, PipelineError> {
        if let Err(error) = self.ensure_loaded() {
            self.drag.cancel();
            return Err(error);
        }
        let result = self
            .drag
            .drop_on_stage(&self.machine, &mut self.working_set, target)
            .await;
        match result {
            Ok(Some(receipt)) => {
                self.supersede_in_flight_load();
                self.notify_moved(&receipt);
                Ok(Some(receipt))
            }
            Ok(None) => Ok(None),
            Err(error) => Err(self.notify_transition_failure(error)),
        }
    }

    pub async fn move_candidate(
        &mut self,
        candidate_id: &CandidateId,
        target: &str,
    ) -> Result<TransitionReceipt, PipelineError> {
        self.ensure_loaded()?;
        match self
            .machine
            .move_to_stage(&mut self.working_set, candidate_id, target)
            .await
        {
            Ok(receipt) => {
                self.supersede_in_flight_load();
                self.notify_moved(&receipt);
                Ok(receipt)
            }
            Err(error) => Err(self.notify_transition_failure(error)),
        }
    }

    /// A load that started before a committed write would reinstate the pre-write stage.
    fn supersede_in_flight_load(&mut self) {
        if let LoadState::Loading(stale) = self.state {
            let token = self.loader.supersede();
            debug!(stale = stale.0, token = token.0, "stage write superseded pipeline load");
            self.state = LoadState::Ready(token);
        }
    }

    fn notify_moved(&mut self, receipt: &TransitionReceipt) {
        let name = self
            .working_set
            .get(&receipt.candidate_id)
            .map_or(receipt.candidate_id.0.as_str(), |entry| {
                entry.candidate.name.as_str()
            });
        let message = format!("Moved {name} to {}", receipt.to.label());
        self.notifications.success(message);
    }

    fn notify_transition_failure(&mut self, error: TransitionError) -> PipelineError {
        let message = match &error {
            TransitionError::Persist { .. } => "Could not update candidate stage".to_string(),
            other => other.to_string(),
        };
        self.notifications.error(message);
        error.into()
    }

    pub fn edit_session(&self) -> Option<&CandidateEditSession> {
        self.edit.as_ref()
    }

    pub fn edit_session_mut(&mut self) -> Option<&mut CandidateEditSession> {
        self.edit.as_mut()
    }

    pub fn open_edit(
        &mut self,
        candidate_id: &CandidateId,
    ) -> Result<&mut CandidateEditSession, PipelineError> {
        let entry = self
            .working_set
            .get(candidate_id)
            .ok_or_else(|| PipelineError::CandidateNotFound(candidate_id.clone()))?;
        Ok(self.edit.insert(CandidateEditSession::open(entry)))
    }

    pub fn open_new(&mut self, job_id: JobId) -> &mut CandidateEditSession {
        self.edit.insert(CandidateEditSession::new_candidate(job_id))
    }

    pub fn close_edit(&mut self) -> Option<CandidateEditSession> {
        self.edit.take()
    }

    /// Saves the open edit. On success the session closes and the working set is reloaded;
    /// on failure the session stays open with its draft intact.
    pub async fn submit_edit(&mut self) -> Result<Candidate, PipelineError> {
        let session = self.edit.as_ref().ok_or(PipelineError::NoOpenEdit)?;
        let result = session.submit(&*self.store, &self.scope).await;

        match result {
            Ok(candidate) => {
                self.edit = None;
                self.notifications
                    .success(format!("Saved {}", candidate.name));
                if let Err(error) = self.reload().await {
                    warn!(operator = %self.operator.id, %error, "reload after edit failed");
                }
                Ok(candidate)
            }
            Err(EditError::Validation(error)) => Err(error.into()),
            Err(error) => {
                self.notifications.error(error.to_string());
                Err(error.into())
            }
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        self.notifications.pending()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}
