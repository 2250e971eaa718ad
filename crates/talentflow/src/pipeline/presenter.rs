use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CandidateId, JobId, PipelineStage};
use super::working_set::PipelineEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Table,
    Board,
}

impl ViewMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" | "list" => Some(Self::Table),
            "board" | "kanban" => Some(Self::Board),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub candidate_id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_id: JobId,
    pub job_title: String,
    pub stage: PipelineStage,
    pub stage_label: &'static str,
    pub applied_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub has_profile: bool,
    pub has_resume: bool,
}

impl From<&PipelineEntry> for TableRow {
    fn from(entry: &PipelineEntry) -> Self {
        let candidate = &entry.candidate;
        Self {
            candidate_id: candidate.id.clone(),
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            job_id: candidate.job_id.clone(),
            job_title: entry.job_title_label().to_string(),
            stage: candidate.stage,
            stage_label: candidate.stage.label(),
            applied_on: candidate.created_at.date_naive(),
            created_at: candidate.created_at,
            has_profile: candidate.profile_url.is_some(),
            has_resume: candidate.resume_url.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardCard {
    pub candidate_id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_title: String,
    pub has_profile: bool,
    pub has_resume: bool,
}

impl From<&PipelineEntry> for BoardCard {
    fn from(entry: &PipelineEntry) -> Self {
        let candidate = &entry.candidate;
        Self {
            candidate_id: candidate.id.clone(),
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            job_title: entry.job_title_label().to_string(),
            has_profile: candidate.profile_url.is_some(),
            has_resume: candidate.resume_url.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardColumn {
    pub stage: PipelineStage,
    pub stage_label: &'static str,
    pub count: usize,
    pub cards: Vec<BoardCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "rows", rename_all = "snake_case")]
pub enum PipelineView {
    Table(Vec<TableRow>),
    Board(Vec<BoardColumn>),
}

/// Renders one filtered set as either a table or a board.
///
/// Both renderings read the same slice, so switching modes never refetches or refilters.
#[derive(Debug, Clone)]
pub struct PipelinePresenter<'a> {
    filtered: Vec<&'a PipelineEntry>,
}

impl<'a> PipelinePresenter<'a> {
    pub fn new(filtered: Vec<&'a PipelineEntry>) -> Self {
        Self { filtered }
    }

    pub fn filtered(&self) -> &[&'a PipelineEntry] {
        &self.filtered
    }

    pub fn table(&self) -> Vec<TableRow> {
        self.filtered.iter().map(|entry| TableRow::from(*entry)).collect()
    }

    /// Entries in `stage`, in working-set order.
    pub fn column(&self, stage: PipelineStage) -> Vec<&'a PipelineEntry> {
        self.filtered
            .iter()
            .copied()
            .filter(|entry| entry.stage() == stage)
            .collect()
    }

    pub fn count(&self, stage: PipelineStage) -> usize {
        self.filtered
            .iter()
            .filter(|entry| entry.stage() == stage)
            .count()
    }

    /// One column per stage in display order; empty stages are kept.
    pub fn board(&self) -> Vec<BoardColumn> {
        PipelineStage::ordered()
            .into_iter()
            .map(|stage| {
                let cards: Vec<BoardCard> = self
                    .column(stage)
                    .into_iter()
                    .map(BoardCard::from)
                    .collect();
                BoardColumn {
                    stage,
                    stage_label: stage.label(),
                    count: cards.len(),
                    cards,
                }
            })
            .collect()
    }

    pub fn render(&self, mode: ViewMode) -> PipelineView {
        match mode {
            ViewMode::Table => PipelineView::Table(self.table()),
            ViewMode::Board => PipelineView::Board(self.board()),
        }
    }
}

const CSV_HEADER: [&str; 8] = [
    "candidate_id",
    "name",
    "email",
    "phone",
    "job",
    "stage",
    "applied_on",
    "resume",
];

/// Writes table rows as CSV, header first.
pub fn write_table_csv<W: Write>(rows: &[TableRow], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for row in rows {
        let applied_on = row.applied_on.to_string();
        csv_writer.write_record([
            row.candidate_id.0.as_str(),
            row.name.as_str(),
            row.email.as_str(),
            row.phone.as_deref().unwrap_or(""),
            row.job_title.as_str(),
            row.stage_label,
            applied_on.as_str(),
            if row.has_resume { "yes" } else { "no" },
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}
