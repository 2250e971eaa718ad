use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::domain::JobId;
use super::working_set::PipelineEntry;

/// Sentinel value the filter control uses for "every job".
pub const ALL_JOBS: &str = "all";

/// Job selection of the filter control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JobSelection {
    #[default]
    All,
    Job(JobId),
}

impl JobSelection {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == ALL_JOBS {
            Self::All
        } else {
            Self::Job(JobId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_JOBS,
            Self::Job(id) => &id.0,
        }
    }
}

impl fmt::Display for JobSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Free-text and job filters over the working set. Both compose by logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFilter {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub job: JobSelection,
}

impl PipelineFilter {
    pub fn new(query: impl Into<String>, job: JobSelection) -> Self {
        Self {
            query: query.into(),
            job,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.query.trim().is_empty() && self.job == JobSelection::All
    }

    pub fn matches(&self, entry: &PipelineEntry) -> bool {
        self.matches_text(entry) && self.matches_job(entry)
    }

    fn matches_text(&self, entry: &PipelineEntry) -> bool {
        let needle = self.query.trim();
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        entry.candidate.name.to_lowercase().contains(&needle)
            || entry.candidate.email.to_lowercase().contains(&needle)
    }

    fn matches_job(&self, entry: &PipelineEntry) -> bool {
        match &self.job {
            JobSelection::All => true,
            JobSelection::Job(id) => entry.job_id() == id,
        }
    }

    /// Returns the matching entries in input order.
    pub fn apply<'a, I>(&self, entries: I) -> Vec<&'a PipelineEntry>
    where
        I: IntoIterator<Item = &'a PipelineEntry>,
    {
        entries
            .into_iter()
            .filter(|entry| self.matches(entry))
            .collect()
    }
}
