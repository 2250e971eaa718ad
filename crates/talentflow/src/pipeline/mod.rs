//! Candidate pipeline engine.
//!
//! Data flows from the operator's [`AccessScope`] through the [`PipelineLoader`] into a
//! [`WorkingSet`], is narrowed by a [`PipelineFilter`], and is rendered by the
//! [`PipelinePresenter`] as a table or a board. Gestures flow back through the
//! [`StageMachine`] (directly or via a [`DragSession`]) and the [`CandidateEditSession`], which
//! write through the [`PipelineStore`] and then patch or reload the working set.

pub mod dashboard;
pub mod domain;
pub mod drag;
pub mod edit;
pub mod error;
pub mod filter;
pub mod intake;
pub mod jobs;
pub mod loader;
pub mod notify;
pub mod presenter;
pub mod router;
pub mod scope;
pub mod service;
pub mod stage;
pub mod stats;
pub mod store;
pub mod working_set;

pub use dashboard::{DashboardSnapshot, LoadState, PipelineDashboard, StageCount};
pub use domain::{
    Candidate, CandidateFields, CandidateId, Job, JobFields, JobId, JobStatus, Operator,
    OperatorId, OperatorRole, PipelineStage, UnknownStage,
};
pub use drag::DragSession;
pub use edit::{CandidateEditSession, EditError, EditTarget, ValidationError};
pub use error::{PipelineError, PipelineErrorKind};
pub use filter::{JobSelection, PipelineFilter, ALL_JOBS};
pub use intake::{ApplicationIntake, ApplicationReceipt, IntakeError, JobPosting};
pub use jobs::{apply_link, JobCatalog, JobCatalogError, JobSummary};
pub use loader::{LoadError, LoadOutcome, LoadRequest, LoadToken, LoadedPipeline, PipelineLoader};
pub use notify::{Notification, NotificationLevel, Notifications};
pub use presenter::{
    write_table_csv, BoardCard, BoardColumn, PipelinePresenter, PipelineView, TableRow, ViewMode,
};
pub use router::{pipeline_router, OPERATOR_ID_HEADER, OPERATOR_ROLE_HEADER};
pub use scope::AccessScope;
pub use service::{DashboardHandle, PipelineService, DEFAULT_SESSION_LIMIT};
pub use stage::{
    PendingTransition, StageMachine, TransitionError, TransitionMode, TransitionReceipt,
};
pub use stats::DashboardStats;
pub use store::{
    CandidatePatch, CandidateQuery, Collection, InMemoryStore, JobPatch, JobQuery, PipelineStore,
    SortOrder, StoreError,
};
pub use working_set::{JobOption, PipelineEntry, WorkingSet, MISSING_JOB_TITLE};

#[cfg(test)]
mod tests;
