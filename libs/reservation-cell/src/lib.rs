pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod handlers;
pub mod router;

pub use error::ReservationError;
pub use models::*;
pub use services::availability::AvailabilityService;
pub use services::blocks_flow::BlockWorkflowService;
pub use services::bookings::BookingLedger;
pub use services::channels::AvailabilityChannels;
pub use services::holds::ReservationStore;
pub use services::sweeper::ExpirySweeper;
pub use state::SchedulingState;
pub use router::create_reservation_router;
