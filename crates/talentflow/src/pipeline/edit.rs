use chrono::Utc;
use tracing::{info, warn};

use super::domain::{optional_text, Candidate, CandidateFields, CandidateId, JobId};
use super::scope::AccessScope;
use super::store::{CandidatePatch, PipelineStore, StoreError};
use super::working_set::PipelineEntry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name is required")]
    MissingName,
    #[error("email is required")]
    MissingEmail,
    #[error("'{0}' is not a valid email address")]
    MalformedEmail(String),
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

/// Trims required contact fields, rejects blanks, and collapses empty optional inputs.
pub(crate) fn validate_contact(fields: CandidateFields) -> Result<CandidateFields, ValidationError> {
    let name = fields.name.trim().to_string();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }

    let email = fields.email.trim().to_string();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if !looks_like_email(&email) {
        return Err(ValidationError::MalformedEmail(email));
    }

    Ok(CandidateFields {
        name,
        email,
        phone: optional_text(fields.phone),
        profile_url: optional_text(fields.profile_url),
        resume_url: optional_text(fields.resume_url),
        notes: optional_text(fields.notes),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Existing(CandidateId),
    /// Manual add onto a job.
    New(JobId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("failed to save candidate: {0}")]
    Write(#[source] StoreError),
}

/// Editable snapshot of one candidate, or a blank form for a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEditSession {
    target: EditTarget,
    draft: CandidateFields,
}

impl CandidateEditSession {
    pub fn open(entry: &PipelineEntry) -> Self {
        Self {
            target: EditTarget::Existing(entry.id().clone()),
            draft: entry.candidate.fields(),
        }
    }

    pub fn new_candidate(job_id: JobId) -> Self {
        Self {
            target: EditTarget::New(job_id),
            draft: CandidateFields::default(),
        }
    }

    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    pub fn draft(&self) -> &CandidateFields {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut CandidateFields {
        &mut self.draft
    }

    pub fn validate(&self) -> Result<CandidateFields, ValidationError> {
        validate_contact(self.draft.clone())
    }

    /// Persists the draft in one write. The session itself is left untouched so a failed
    /// submit keeps every field for another attempt.
    pub async fn submit<S>(&self, store: &S, scope: &AccessScope) -> Result<Candidate, EditError>
    where
        S: PipelineStore + ?Sized,
    {
        let fields = self.validate()?;

        let result = match &self.target {
            EditTarget::Existing(id) => store
                .update_candidate(id, CandidatePatch::Fields(fields))
                .await
                .map_err(EditError::Write),
            EditTarget::New(job_id) => {
                let job = store
                    .job(job_id)
                    .await
                    .map_err(EditError::Write)?
                    .filter(|job| scope.permits(&job.owner))
                    .ok_or_else(|| EditError::JobNotFound(job_id.clone()))?;
                store
                    .insert_candidate(Candidate::for_job(&job, fields, Utc::now()))
                    .await
                    .map_err(EditError::Write)
            }
        };

        match &result {
            Ok(candidate) => info!(candidate = %candidate.id, "candidate saved"),
            Err(error) => warn!(edit = ?self.target, %error, "candidate save failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str, email: &str) -> CandidateFields {
        CandidateFields {
            name: name.to_string(),
            email: email.to_string(),
            phone: Some("  ".to_string()),
            profile_url: Some(" https://linkedin.com/in/erik ".to_string()),
            resume_url: None,
            notes: Some(String::new()),
        }
    }

    #[test]
    fn requires_name_and_email() {
        assert_eq!(
            validate_contact(fields("  ", "erik@exempel.se")),
            Err(ValidationError::MissingName)
        );
        assert_eq!(
            validate_contact(fields("Erik", " ")),
            Err(ValidationError::MissingEmail)
        );
    }

    #[test]
    fn rejects_malformed_email() {
        for raw in ["erik", "erik@", "@exempel.se", "erik@exempel", "erik @exempel.se"] {
            assert!(
                matches!(
                    validate_contact(fields("Erik", raw)),
                    Err(ValidationError::MalformedEmail(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn normalizes_optional_fields() {
        let cleaned = validate_contact(fields(" Erik Andersson ", "erik@exempel.se"))
            .expect("valid contact");
        assert_eq!(cleaned.name, "Erik Andersson");
        assert_eq!(cleaned.phone, None);
        assert_eq!(
            cleaned.profile_url.as_deref(),
            Some("https://linkedin.com/in/erik")
        );
        assert_eq!(cleaned.notes, None);
    }
}
