use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use schedule_cell::services::blocks::BlockService;
use schedule_cell::services::template::TemplateService;

use crate::error::ReservationError;
use crate::models::{AvailabilitySlot, SlotKey, SlotStatus};
use crate::services::bookings::BookingLedger;
use crate::services::channels::{AvailabilityChannels, EventReceiver};
use crate::services::holds::ReservationStore;

/// Read side of the engine: merges generated candidate slots with live hold
/// and booking state into a Free/Held/Booked snapshot, and hands out the
/// per-professional event subscriptions.
pub struct AvailabilityService {
    templates: Arc<TemplateService>,
    blocks: Arc<BlockService>,
    store: Arc<ReservationStore>,
    ledger: Arc<BookingLedger>,
    channels: Arc<AvailabilityChannels>,
}

impl AvailabilityService {
    pub fn new(
        templates: Arc<TemplateService>,
        blocks: Arc<BlockService>,
        store: Arc<ReservationStore>,
        ledger: Arc<BookingLedger>,
        channels: Arc<AvailabilityChannels>,
    ) -> Self {
        Self {
            templates,
            blocks,
            store,
            ledger,
            channels,
        }
    }

    /// Snapshot of every candidate slot in the range with its current status.
    /// Ordering follows the slot generator: ascending (date, start_time).
    #[instrument(skip(self))]
    pub fn get_availability(
        &self,
        professional_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, ReservationError> {
        if from > to {
            return Err(ReservationError::Validation(
                "Range end precedes range start".to_string(),
            ));
        }

        let approved_blocks = self.blocks.approved_blocks(professional_id);
        let candidates = self
            .templates
            .candidate_slots(professional_id, &approved_blocks, from, to);

        let now = Utc::now();
        let snapshot: Vec<AvailabilitySlot> = candidates
            .into_iter()
            .map(|slot| {
                let key = SlotKey::new(professional_id, slot.date, slot.start_time);
                let status = if self.store.is_held(&key, now) {
                    SlotStatus::Held
                } else if self.ledger.occupies(
                    professional_id,
                    slot.date,
                    slot.start_time,
                    slot.end_time,
                ) {
                    SlotStatus::Booked
                } else {
                    SlotStatus::Free
                };
                AvailabilitySlot {
                    date: slot.date,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    status,
                }
            })
            .collect();

        debug!(
            "Availability snapshot for {}: {} slots between {} and {}",
            professional_id,
            snapshot.len(),
            from,
            to
        );
        Ok(snapshot)
    }

    pub fn subscribe(&self, professional_id: Uuid) -> EventReceiver {
        self.channels.subscribe(professional_id)
    }

    pub fn prune_channel(&self, professional_id: Uuid) {
        self.channels.prune(professional_id);
    }
}
