use super::domain::CandidateId;
use super::stage::{StageMachine, TransitionError, TransitionReceipt};
use super::store::PipelineStore;
use super::working_set::WorkingSet;

/// Single-slot record of the candidate currently being dragged on the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragSession {
    slot: Option<CandidateId>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a drag, replacing any drag already in progress.
    pub fn begin_drag(&mut self, candidate_id: CandidateId) {
        self.slot = Some(candidate_id);
    }

    pub fn dragging(&self) -> Option<&CandidateId> {
        self.slot.as_ref()
    }

    /// Pointer released outside every drop target.
    pub fn cancel(&mut self) -> Option<CandidateId> {
        self.slot.take()
    }

    /// Commits the drag onto `target`. The slot is cleared whatever the outcome; an empty slot
    /// resolves to `Ok(None)` without touching the store.
    pub async fn drop_on_stage<S>(
        &mut self,
        machine: &StageMachine<S>,
        working_set: &mut WorkingSet,
        target: &str,
    ) -> Result<Option<TransitionReceipt>, TransitionError>
    where
        S: PipelineStore + ?Sized,
    {
        let Some(candidate_id) = self.slot.take() else {
            return Ok(None);
        };

        machine
            .move_to_stage(working_set, &candidate_id, target)
            .await
            .map(Some)
    }
}
