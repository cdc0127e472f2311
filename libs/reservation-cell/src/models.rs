// libs/reservation-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// SLOT IDENTITY
// ==============================================================================

/// The mutual-exclusion key. Every hold, booking check and availability event
/// is keyed by this tuple; all hold-state mutations for one key are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

impl SlotKey {
    pub fn new(professional_id: Uuid, date: NaiveDate, start_time: NaiveTime) -> Self {
        Self {
            professional_id,
            date,
            start_time,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.professional_id,
            self.date,
            self.start_time.format("%H:%M")
        )
    }
}

// ==============================================================================
// SLOT HOLD MODELS
// ==============================================================================

/// A short-lived exclusive claim on one slot. Holds live only inside the
/// reservation store; leaving the store (consume, release, expiry, forced
/// release) is the terminal transition and the outcome enums carry which one
/// happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotHold {
    pub token: Uuid,
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub holder_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SlotHold {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.professional_id, self.date, self.start_time)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Why a previously offered slot became free again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreedReason {
    Released,
    Expired,
    BookingCancelled,
    BlockApproved,
}

/// Result of a hold acquisition attempt. Conflict is an expected outcome of
/// normal operation, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AcquireOutcome {
    Granted { hold: SlotHold },
    Conflict { reason: ConflictReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    Held,
    Booked,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ConsumeOutcome {
    Consumed { booking: ConfirmedBooking },
    Expired,
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ReleaseOutcome {
    Released,
    NotFound,
}

// ==============================================================================
// CONFIRMED BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmedBooking {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl ConfirmedBooking {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.professional_id, self.date, self.start_time)
    }

    /// Whether this booking still occupies its slot.
    pub fn occupies_slot(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, target: &BookingStatus) -> bool {
        use BookingStatus::*;
        match (self, target) {
            (Scheduled, Confirmed) => true,
            (Confirmed, InProgress) => true,
            (InProgress, Completed) => true,
            (Scheduled, Cancelled) | (Confirmed, Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Scheduled => write!(f, "scheduled"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::InProgress => write!(f, "in_progress"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Free,
    Held,
    Booked,
}

/// One entry of an availability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
}

/// Change events fanned out to subscribers of one professional. Delivery is
/// best-effort and ordered per slot key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AvailabilityEvent {
    SlotHeld {
        professional_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
    },
    SlotFreed {
        professional_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        reason: FreedReason,
    },
    SlotBooked {
        professional_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
    },
    BlockDecided {
        professional_id: Uuid,
        block_id: Uuid,
        approved: bool,
        from_date: NaiveDate,
        to_date: NaiveDate,
    },
    ScheduleChanged {
        professional_id: Uuid,
    },
}

impl AvailabilityEvent {
    pub fn professional_id(&self) -> Uuid {
        match self {
            AvailabilityEvent::SlotHeld { professional_id, .. }
            | AvailabilityEvent::SlotFreed { professional_id, .. }
            | AvailabilityEvent::SlotBooked { professional_id, .. }
            | AvailabilityEvent::BlockDecided { professional_id, .. }
            | AvailabilityEvent::ScheduleChanged { professional_id } => *professional_id,
        }
    }

    pub fn slot_held(key: SlotKey) -> Self {
        AvailabilityEvent::SlotHeld {
            professional_id: key.professional_id,
            date: key.date,
            start_time: key.start_time,
        }
    }

    pub fn slot_freed(key: SlotKey, reason: FreedReason) -> Self {
        AvailabilityEvent::SlotFreed {
            professional_id: key.professional_id,
            date: key.date,
            start_time: key.start_time,
            reason,
        }
    }

    pub fn slot_booked(key: SlotKey) -> Self {
        AvailabilityEvent::SlotBooked {
            professional_id: key.professional_id,
            date: key.date,
            start_time: key.start_time,
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireHoldRequest {
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Per-call override; the configured default applies when absent.
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub professional_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingListQuery {
    pub professional_id: Uuid,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
