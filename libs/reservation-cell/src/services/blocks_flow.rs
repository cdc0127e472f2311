use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use schedule_cell::models::{ScheduleBlock, ScheduleError, SubmitBlockRequest};
use schedule_cell::services::blocks::BlockService;

use crate::models::{AvailabilityEvent, FreedReason, SlotHold};
use crate::services::channels::AvailabilityChannels;
use crate::services::holds::ReservationStore;

/// Coordinates the block approval workflow with the reservation store.
///
/// Approving a block removes availability that may already carry live holds;
/// those holds are force-released before the decision is announced so an
/// in-flight booking fails at consume time instead of landing inside the
/// block.
pub struct BlockWorkflowService {
    blocks: Arc<BlockService>,
    store: Arc<ReservationStore>,
    channels: Arc<AvailabilityChannels>,
}

impl BlockWorkflowService {
    pub fn new(
        blocks: Arc<BlockService>,
        store: Arc<ReservationStore>,
        channels: Arc<AvailabilityChannels>,
    ) -> Self {
        Self {
            blocks,
            store,
            channels,
        }
    }

    pub fn submit(&self, request: SubmitBlockRequest) -> Result<ScheduleBlock, ScheduleError> {
        self.blocks.submit(request)
    }

    #[instrument(skip(self))]
    pub fn decide(
        &self,
        block_id: Uuid,
        approver_id: Uuid,
        approve: bool,
        rejection_reason: Option<String>,
    ) -> Result<(ScheduleBlock, Vec<SlotHold>), ScheduleError> {
        let block = self
            .blocks
            .decide(block_id, approver_id, approve, rejection_reason)?;

        let mut released = Vec::new();
        if approve {
            let dates = block.kind.dates();
            released = self.store.force_release_for_dates(
                block.professional_id,
                &dates,
                FreedReason::BlockApproved,
            );
            if !released.is_empty() {
                info!(
                    "Block {} approval force-released {} holds",
                    block_id,
                    released.len()
                );
            }
        }

        self.channels.publish(AvailabilityEvent::BlockDecided {
            professional_id: block.professional_id,
            block_id: block.id,
            approved: approve,
            from_date: block.kind.first_date(),
            to_date: block.kind.last_date(),
        });

        Ok((block, released))
    }

    /// Soft-deactivate a block. An approved block that stops applying
    /// restores availability, so subscribers are told to refetch.
    pub fn deactivate(&self, block_id: Uuid) -> Result<ScheduleBlock, ScheduleError> {
        let block = self.blocks.deactivate(block_id)?;
        self.channels.publish(AvailabilityEvent::ScheduleChanged {
            professional_id: block.professional_id,
        });
        Ok(block)
    }

    pub fn get(&self, block_id: Uuid) -> Option<ScheduleBlock> {
        self.blocks.get(block_id)
    }

    pub fn list_for_professional(&self, professional_id: Uuid) -> Vec<ScheduleBlock> {
        self.blocks.list_for_professional(professional_id)
    }
}
