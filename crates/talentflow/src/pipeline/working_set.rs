use serde::Serialize;

use super::domain::{Candidate, CandidateId, Job, JobId, PipelineStage};

/// Placeholder shown when a candidate's job could not be joined.
pub const MISSING_JOB_TITLE: &str = "-";

/// A loaded candidate annotated with its joined job title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineEntry {
    pub candidate: Candidate,
    pub job_title: Option<String>,
}

impl PipelineEntry {
    pub fn new(candidate: Candidate, job: Option<&Job>) -> Self {
        Self {
            candidate,
            job_title: job.map(|job| job.title.clone()),
        }
    }

    pub fn id(&self) -> &CandidateId {
        &self.candidate.id
    }

    pub fn stage(&self) -> PipelineStage {
        self.candidate.stage
    }

    pub fn job_id(&self) -> &JobId {
        &self.candidate.job_id
    }

    pub fn job_title_label(&self) -> &str {
        self.job_title.as_deref().unwrap_or(MISSING_JOB_TITLE)
    }
}

/// Option offered by the job filter control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOption {
    pub id: JobId,
    pub title: String,
}

impl From<&Job> for JobOption {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            title: job.title.clone(),
        }
    }
}

/// The in-memory, access-scoped candidates feeding both presentations.
///
/// Rebuilt wholesale on every load; between loads only [`WorkingSet::set_stage`] mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    entries: Vec<PipelineEntry>,
}

impl WorkingSet {
    pub fn new(entries: Vec<PipelineEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PipelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &CandidateId) -> Option<&PipelineEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.get(id).is_some()
    }

    pub fn stage_of(&self, id: &CandidateId) -> Option<PipelineStage> {
        self.get(id).map(PipelineEntry::stage)
    }

    /// Patches one entry's stage in place, returning the stage it replaced.
    pub(crate) fn set_stage(
        &mut self,
        id: &CandidateId,
        stage: PipelineStage,
    ) -> Option<PipelineStage> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id() == id)
            .map(|entry| std::mem::replace(&mut entry.candidate.stage, stage))
    }
}
