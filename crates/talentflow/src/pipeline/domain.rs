use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an authenticated operator (and of the tenant they own).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub String);

/// Opaque candidate identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_inner!(OperatorId, CandidateId, JobId);

/// Role attached to an operator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorRole {
    #[serde(rename = "admin", alias = "administrator")]
    Administrator,
    #[serde(rename = "owner", alias = "customer")]
    Owner,
}

impl OperatorRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Administrator => "admin",
            Self::Owner => "owner",
        }
    }

    /// Parses the role claim carried by a session. Anything unrecognised is treated as a plain
    /// owner so an unknown claim never widens visibility.
    pub fn from_claim(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Self::Administrator,
            _ => Self::Owner,
        }
    }
}

/// Read-only identity fact consumed from the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: OperatorId,
    pub role: OperatorRole,
}

impl Operator {
    pub fn new(id: impl Into<String>, role: OperatorRole) -> Self {
        Self {
            id: OperatorId(id.into()),
            role,
        }
    }
}

/// Fixed hiring stages in board display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Applied,
    Screening,
    Interview,
    Offer,
    Hired,
    Rejected,
}

impl PipelineStage {
    pub const INITIAL: Self = Self::Applied;

    pub const fn ordered() -> [Self; 6] {
        [
            Self::Applied,
            Self::Screening,
            Self::Interview,
            Self::Offer,
            Self::Hired,
            Self::Rejected,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Screening => "screening",
            Self::Interview => "interview",
            Self::Offer => "offer",
            Self::Hired => "hired",
            Self::Rejected => "rejected",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Screening => "Screening",
            Self::Interview => "Interview",
            Self::Offer => "Offer",
            Self::Hired => "Hired",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pipeline stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for PipelineStage {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| UnknownStage(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Closed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// A hiring requisition owned by one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner: OperatorId,
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// One applicant against exactly one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub owner: OperatorId,
    pub job_id: JobId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub profile_url: Option<String>,
    pub resume_url: Option<String>,
    pub notes: Option<String>,
    pub stage: PipelineStage,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    /// Builds a fresh `applied` candidate for `job`; the owning tenant is always copied from
    /// the job so every write path produces identically scoped records.
    pub fn for_job(job: &Job, fields: CandidateFields, created_at: DateTime<Utc>) -> Self {
        Self {
            id: CandidateId::generate(),
            owner: job.owner.clone(),
            job_id: job.id.clone(),
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            profile_url: fields.profile_url,
            resume_url: fields.resume_url,
            notes: fields.notes,
            stage: PipelineStage::INITIAL,
            created_at,
        }
    }

    pub fn fields(&self) -> CandidateFields {
        CandidateFields {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            profile_url: self.profile_url.clone(),
            resume_url: self.resume_url.clone(),
            notes: self.notes.clone(),
        }
    }

    pub fn apply_fields(&mut self, fields: CandidateFields) {
        self.name = fields.name;
        self.email = fields.email;
        self.phone = fields.phone;
        self.profile_url = fields.profile_url;
        self.resume_url = fields.resume_url;
        self.notes = fields.notes;
    }
}

/// Editable candidate attributes. Stage is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFields {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "linkedin_url")]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Editable job attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFields {
    pub title: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Collapses blank optional inputs to `None` and trims the rest.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
