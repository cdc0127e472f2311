use std::sync::Arc;

use crate::services::availability::AvailabilityService;
use crate::services::blocks_flow::BlockWorkflowService;
use crate::services::bookings::BookingLedger;
use crate::services::holds::ReservationStore;

/// Shared handles for the scheduling HTTP surface.
#[derive(Clone)]
pub struct SchedulingState {
    pub store: Arc<ReservationStore>,
    pub ledger: Arc<BookingLedger>,
    pub availability: Arc<AvailabilityService>,
    pub blocks: Arc<BlockWorkflowService>,
}
