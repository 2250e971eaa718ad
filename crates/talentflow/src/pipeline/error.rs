use axum::http::StatusCode;
use serde::Serialize;

use super::domain::CandidateId;
use super::edit::{EditError, ValidationError};
use super::intake::IntakeError;
use super::jobs::JobCatalogError;
use super::loader::LoadError;
use super::stage::TransitionError;
use super::store::StoreError;

/// User-facing failure categories of the pipeline engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorKind {
    /// Nothing valid to show; rendered as a persistent in-page state.
    LoadFailure,
    TransitionFailure,
    ValidationFailure,
    WriteFailure,
    NotFound,
}

impl PipelineErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LoadFailure => "load_failure",
            Self::TransitionFailure => "transition_failure",
            Self::ValidationFailure => "validation_failure",
            Self::WriteFailure => "write_failure",
            Self::NotFound => "not_found",
        }
    }
}

/// Every failure a pipeline operation can surface, converted at the operation boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Jobs(#[from] JobCatalogError),
    #[error("failed to compute dashboard statistics: {0}")]
    Stats(#[source] StoreError),
    #[error("candidate {0} is not in the working set")]
    CandidateNotFound(CandidateId),
    #[error("no candidate edit is open")]
    NoOpenEdit,
}

impl PipelineError {
    pub fn kind(&self) -> PipelineErrorKind {
        use PipelineErrorKind as Kind;

        match self {
            Self::Load(LoadError::Store(_)) | Self::Stats(_) => Kind::LoadFailure,
            Self::Load(LoadError::JobNotFound(_)) => Kind::NotFound,

            Self::Transition(TransitionError::InvalidStage(_)) => Kind::ValidationFailure,
            Self::Transition(TransitionError::NotInWorkingSet(_)) => Kind::NotFound,
            Self::Transition(TransitionError::Persist { .. }) => Kind::TransitionFailure,

            Self::Edit(EditError::Validation(_)) | Self::Intake(IntakeError::Validation(_)) => {
                Kind::ValidationFailure
            }
            Self::Edit(EditError::JobNotFound(_)) | Self::Intake(IntakeError::JobNotFound(_)) => {
                Kind::NotFound
            }
            Self::Edit(EditError::Write(source)) | Self::Intake(IntakeError::Write(source)) => {
                write_kind(source)
            }
            Self::Intake(IntakeError::Lookup(_)) => Kind::LoadFailure,

            Self::Jobs(JobCatalogError::MissingTitle) => Kind::ValidationFailure,
            Self::Jobs(JobCatalogError::JobNotFound(_)) => Kind::NotFound,
            Self::Jobs(JobCatalogError::Load(_)) => Kind::LoadFailure,
            Self::Jobs(JobCatalogError::Write(source)) => write_kind(source),

            Self::CandidateNotFound(_) => Kind::NotFound,
            Self::NoOpenEdit => Kind::ValidationFailure,
        }
    }

    /// The store failure underneath, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Load(LoadError::Store(source))
            | Self::Transition(TransitionError::Persist { source, .. })
            | Self::Edit(EditError::Write(source))
            | Self::Intake(IntakeError::Lookup(source) | IntakeError::Write(source))
            | Self::Jobs(JobCatalogError::Load(source) | JobCatalogError::Write(source))
            | Self::Stats(source) => Some(source),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if matches!(self.store_error(), Some(StoreError::Constraint(_))) {
            return StatusCode::CONFLICT;
        }
        match self.kind() {
            PipelineErrorKind::NotFound => StatusCode::NOT_FOUND,
            PipelineErrorKind::ValidationFailure => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineErrorKind::TransitionFailure | PipelineErrorKind::WriteFailure => {
                StatusCode::BAD_GATEWAY
            }
            PipelineErrorKind::LoadFailure => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ValidationError> for PipelineError {
    fn from(value: ValidationError) -> Self {
        Self::Edit(EditError::Validation(value))
    }
}

fn write_kind(source: &StoreError) -> PipelineErrorKind {
    match source {
        StoreError::NotFound { .. } => PipelineErrorKind::NotFound,
        StoreError::Constraint(_) | StoreError::Unreachable(_) => PipelineErrorKind::WriteFailure,
    }
}
