use chrono::{NaiveDate, NaiveTime, Utc};
use dashmap::DashMap;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::ReservationError;
use crate::models::{BookingStatus, ConfirmedBooking};

/// In-memory system of record for confirmed bookings, indexed per
/// (professional, day) so occupancy checks stay local to one calendar day.
///
/// `insert` enforces the no-overlap invariant: overlap detected here means a
/// hold was converted for a slot that is somehow already taken, which is the
/// double-booking condition the whole engine exists to prevent. It is logged
/// at alert level and the insert is refused.
pub struct BookingLedger {
    bookings: DashMap<Uuid, ConfirmedBooking>,
    by_day: DashMap<(Uuid, NaiveDate), Vec<Uuid>>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self {
            bookings: DashMap::new(),
            by_day: DashMap::new(),
        }
    }

    /// Insert a freshly converted booking. The caller must already hold the
    /// slot-key critical section; the per-day entry lock below makes the
    /// overlap check and the index push atomic against other inserters.
    pub fn insert(&self, booking: ConfirmedBooking) -> Result<(), ReservationError> {
        let id = booking.id;
        let day_key = (booking.professional_id, booking.date);

        self.bookings.insert(id, booking.clone());

        let mut day = self.by_day.entry(day_key).or_default();
        let overlap = day.iter().any(|other_id| {
            *other_id != id
                && self
                    .bookings
                    .get(other_id)
                    .map(|other| {
                        other.occupies_slot()
                            && other.overlaps(booking.start_time, booking.end_time)
                    })
                    .unwrap_or(false)
        });

        if overlap {
            drop(day);
            self.bookings.remove(&id);
            error!(
                guard = "double_booking_guard",
                "Double booking prevented for professional {} on {} at {}",
                booking.professional_id,
                booking.date,
                booking.start_time
            );
            return Err(ReservationError::Internal(
                "Booking overlaps an existing booking".to_string(),
            ));
        }

        day.push(id);
        drop(day);

        info!(
            "Booking {} recorded for professional {} on {} at {}",
            id, booking.professional_id, booking.date, booking.start_time
        );
        Ok(())
    }

    pub fn get(&self, booking_id: Uuid) -> Option<ConfirmedBooking> {
        self.bookings.get(&booking_id).map(|b| b.clone())
    }

    /// Whether any non-cancelled booking occupies part of [start, end) on the
    /// given professional's day.
    pub fn occupies(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> bool {
        let ids = match self.by_day.get(&(professional_id, date)) {
            Some(ids) => ids.clone(),
            None => return false,
        };

        ids.iter().any(|id| {
            self.bookings
                .get(id)
                .map(|b| b.occupies_slot() && b.overlaps(start, end))
                .unwrap_or(false)
        })
    }

    /// Lifecycle transition for non-cancellation targets.
    pub fn transition(
        &self,
        booking_id: Uuid,
        target: BookingStatus,
    ) -> Result<ConfirmedBooking, ReservationError> {
        let mut booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| ReservationError::NotFound(format!("Booking {} not found", booking_id)))?;

        if !booking.status.can_transition_to(&target) {
            return Err(ReservationError::InvalidState(format!(
                "Booking {} cannot move from {} to {}",
                booking_id, booking.status, target
            )));
        }

        booking.status = target;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    /// Cancellation keeps the record for history; the slot is freed by the
    /// caller publishing the corresponding event.
    pub fn cancel(
        &self,
        booking_id: Uuid,
        reason: String,
    ) -> Result<ConfirmedBooking, ReservationError> {
        let mut booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| ReservationError::NotFound(format!("Booking {} not found", booking_id)))?;

        if !booking.status.can_transition_to(&BookingStatus::Cancelled) {
            return Err(ReservationError::InvalidState(format!(
                "Booking {} cannot be cancelled from {}",
                booking_id, booking.status
            )));
        }

        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        booking.cancelled_at = Some(Utc::now());
        booking.cancellation_reason = Some(reason);

        info!("Booking {} cancelled", booking_id);
        Ok(booking.clone())
    }

    pub fn list(
        &self,
        professional_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<ConfirmedBooking> {
        let mut bookings: Vec<ConfirmedBooking> = self
            .bookings
            .iter()
            .filter(|entry| {
                let b = entry.value();
                b.professional_id == professional_id
                    && from.map_or(true, |f| b.date >= f)
                    && to.map_or(true, |t| b.date <= t)
            })
            .map(|entry| entry.value().clone())
            .collect();

        bookings.sort_by_key(|b| (b.date, b.start_time));
        bookings
    }
}

impl Default for BookingLedger {
    fn default() -> Self {
        Self::new()
    }
}
