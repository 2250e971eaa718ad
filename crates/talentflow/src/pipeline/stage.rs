//! Stage transitions: validate, write, then patch or roll back the working set.
//!
//! A transition is a two-phase protocol. [`PendingTransition::prepare`] validates the request
//! against the working set and yields a [`PendingTransition`]; the write goes through
//! [`StageMachine::persist`]; the pending transition is then committed into, or rolled back
//! out of, the working set. In [`TransitionMode::Optimistic`] the patch is applied before the
//! write and reverted if the write fails, so either way displayed and persisted state agree
//! once the transition resolves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use super::domain::{CandidateId, PipelineStage, UnknownStage};
use super::store::{CandidatePatch, PipelineStore, StoreError};
use super::working_set::WorkingSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Patch the working set only after the write succeeds.
    #[default]
    WriteThenPatch,
    /// Patch first, revert if the write fails.
    Optimistic,
}

impl TransitionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "write_then_patch" | "write-then-patch" | "pessimistic" => Some(Self::WriteThenPatch),
            "optimistic" => Some(Self::Optimistic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionReceipt {
    pub candidate_id: CandidateId,
    pub from: PipelineStage,
    pub to: PipelineStage,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error(transparent)]
    InvalidStage(#[from] UnknownStage),
    #[error("candidate {0} is not in the working set")]
    NotInWorkingSet(CandidateId),
    #[error("failed to move candidate {candidate} to {target}: {source}")]
    Persist {
        candidate: CandidateId,
        target: PipelineStage,
        #[source]
        source: StoreError,
    },
}

/// A validated, not yet resolved stage change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    candidate_id: CandidateId,
    from: PipelineStage,
    to: PipelineStage,
}

impl PendingTransition {
    /// Validates a requested move against the working set.
    pub fn prepare(
        working_set: &WorkingSet,
        candidate_id: &CandidateId,
        target: &str,
    ) -> Result<Self, TransitionError> {
        let to: PipelineStage = target.parse()?;
        let from = working_set
            .stage_of(candidate_id)
            .ok_or_else(|| TransitionError::NotInWorkingSet(candidate_id.clone()))?;

        Ok(Self {
            candidate_id: candidate_id.clone(),
            from,
            to,
        })
    }

    pub fn candidate_id(&self) -> &CandidateId {
        &self.candidate_id
    }

    pub fn origin(&self) -> PipelineStage {
        self.from
    }

    pub fn target(&self) -> PipelineStage {
        self.to
    }

    /// Shows the target stage before the write resolves.
    pub fn apply(&self, working_set: &mut WorkingSet) {
        working_set.set_stage(&self.candidate_id, self.to);
    }

    pub fn commit(self, working_set: &mut WorkingSet) -> TransitionReceipt {
        working_set.set_stage(&self.candidate_id, self.to);
        TransitionReceipt {
            candidate_id: self.candidate_id,
            from: self.from,
            to: self.to,
        }
    }

    pub fn rollback(self, working_set: &mut WorkingSet) {
        working_set.set_stage(&self.candidate_id, self.from);
    }
}

/// Shared transition engine. Writes for the same candidate are serialized, so concurrent
/// moves resolve in lock-acquisition order and the last one wins.
pub struct StageMachine<S: ?Sized> {
    store: Arc<S>,
    mode: TransitionMode,
    in_flight: Mutex<HashMap<CandidateId, Arc<AsyncMutex<()>>>>,
}

impl<S> StageMachine<S>
where
    S: PipelineStore + ?Sized,
{
    pub fn new(store: Arc<S>, mode: TransitionMode) -> Self {
        Self {
            store,
            mode,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> TransitionMode {
        self.mode
    }

    pub async fn persist(&self, pending: &PendingTransition) -> Result<(), StoreError> {
        let slot = self.slot(&pending.candidate_id);
        let result = {
            let _serialized = slot.lock().await;
            self.store
                .update_candidate(&pending.candidate_id, CandidatePatch::Stage(pending.to))
                .await
        };
        self.release(&pending.candidate_id, slot);
        result.map(|_| ())
    }

    pub async fn move_to_stage(
        &self,
        working_set: &mut WorkingSet,
        candidate_id: &CandidateId,
        target: &str,
    ) -> Result<TransitionReceipt, TransitionError> {
        let pending = PendingTransition::prepare(working_set, candidate_id, target)?;

        if self.mode == TransitionMode::Optimistic {
            pending.apply(working_set);
        }

        match self.persist(&pending).await {
            Ok(()) => {
                let receipt = pending.commit(working_set);
                info!(
                    candidate = %receipt.candidate_id,
                    from = %receipt.from,
                    to = %receipt.to,
                    "candidate stage updated"
                );
                Ok(receipt)
            }
            Err(source) => {
                let target = pending.target();
                pending.rollback(working_set);
                warn!(candidate = %candidate_id, stage = %target, error = %source, "stage write failed");
                Err(TransitionError::Persist {
                    candidate: candidate_id.clone(),
                    target,
                    source,
                })
            }
        }
    }

    fn slot(&self, candidate_id: &CandidateId) -> Arc<AsyncMutex<()>> {
        let mut table = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(candidate_id.clone()).or_default().clone()
    }

    fn release(&self, candidate_id: &CandidateId, slot: Arc<AsyncMutex<()>>) {
        let mut table = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table and this caller hold the slot: nobody else is queued on it.
        if Arc::strong_count(&slot) == 2 {
            table.remove(candidate_id);
        }
    }
}
