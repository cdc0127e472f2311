use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::ReservationError;
use crate::models::{
    AcquireHoldRequest, AcquireOutcome, AvailabilityEvent, BookingStatus, ConfirmedBooking,
    ConflictReason, ConsumeOutcome, FreedReason, ReleaseOutcome, SlotHold, SlotKey,
};
use crate::services::bookings::BookingLedger;
use crate::services::channels::AvailabilityChannels;

/// The reservation store: exclusive short-lived claims on slot keys.
///
/// A hold's presence in `holds` IS its Active state; every transition out of
/// Active (consume, release, expiry, forced release) removes it under the
/// key's entry lock, so for one key the operations are linearizable and
/// exactly one of the racing outcomes wins. Contention on different keys
/// touches different entries and never serializes.
///
/// Events are published inside the same critical section (broadcast send is
/// synchronous and never blocks on subscribers), which keeps per-key event
/// order identical to state-change order.
pub struct ReservationStore {
    holds: DashMap<SlotKey, SlotHold>,
    tokens: DashMap<Uuid, SlotKey>,
    ledger: Arc<BookingLedger>,
    channels: Arc<AvailabilityChannels>,
    default_ttl: Duration,
    allow_self_hold: bool,
}

impl ReservationStore {
    pub fn new(
        config: &AppConfig,
        ledger: Arc<BookingLedger>,
        channels: Arc<AvailabilityChannels>,
    ) -> Self {
        Self {
            holds: DashMap::new(),
            tokens: DashMap::new(),
            ledger,
            channels,
            default_ttl: Duration::seconds(config.hold_ttl_seconds),
            allow_self_hold: config.allow_self_hold,
        }
    }

    /// Attempt to claim a slot for `holder_id`. Exactly one of any number of
    /// concurrent callers for the same key is granted; the rest get Conflict.
    #[instrument(skip(self, request))]
    pub fn try_acquire(
        &self,
        request: &AcquireHoldRequest,
        holder_id: Uuid,
    ) -> Result<AcquireOutcome, ReservationError> {
        if request.start_time >= request.end_time {
            return Err(ReservationError::Validation(
                "Slot start must precede its end".to_string(),
            ));
        }
        if let Some(ttl) = request.ttl_seconds {
            if ttl <= 0 {
                return Err(ReservationError::Validation(
                    "Hold TTL must be positive".to_string(),
                ));
            }
        }
        if !self.allow_self_hold && holder_id == request.professional_id {
            return Err(ReservationError::Validation(
                "Professionals cannot hold their own slots".to_string(),
            ));
        }

        let now = Utc::now();
        let ttl = request
            .ttl_seconds
            .map(Duration::seconds)
            .unwrap_or(self.default_ttl);
        let key = SlotKey::new(request.professional_id, request.date, request.start_time);

        match self.holds.entry(key) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(now) {
                    debug!("Acquire conflict on {}: already held", key);
                    return Ok(AcquireOutcome::Conflict {
                        reason: ConflictReason::Held,
                    });
                }

                // The sweeper has not caught this one yet; expire it inline
                // and take its place.
                let stale = occupied.get().clone();
                self.tokens.remove(&stale.token);
                self.channels
                    .publish(AvailabilityEvent::slot_freed(key, FreedReason::Expired));
                debug!("Acquire on {} swept stale hold {}", key, stale.token);

                if self.ledger.occupies(
                    request.professional_id,
                    request.date,
                    request.start_time,
                    request.end_time,
                ) {
                    occupied.remove();
                    return Ok(AcquireOutcome::Conflict {
                        reason: ConflictReason::Booked,
                    });
                }

                let hold = self.build_hold(request, holder_id, now, ttl);
                self.tokens.insert(hold.token, key);
                occupied.insert(hold.clone());
                self.channels.publish(AvailabilityEvent::slot_held(key));
                info!("Hold {} granted on {} for {}", hold.token, key, holder_id);
                Ok(AcquireOutcome::Granted { hold })
            }
            Entry::Vacant(vacant) => {
                if self.ledger.occupies(
                    request.professional_id,
                    request.date,
                    request.start_time,
                    request.end_time,
                ) {
                    debug!("Acquire conflict on {}: already booked", key);
                    return Ok(AcquireOutcome::Conflict {
                        reason: ConflictReason::Booked,
                    });
                }

                let hold = self.build_hold(request, holder_id, now, ttl);
                self.tokens.insert(hold.token, key);
                vacant.insert(hold.clone());
                self.channels.publish(AvailabilityEvent::slot_held(key));
                info!("Hold {} granted on {} for {}", hold.token, key, holder_id);
                Ok(AcquireOutcome::Granted { hold })
            }
        }
    }

    /// Convert a still-Active hold into a confirmed booking. Expiry is checked
    /// by wall clock here, never by waiting for the sweeper; whichever of
    /// consume and sweep reaches the entry first wins the compare-and-set.
    #[instrument(skip(self))]
    pub fn consume(
        &self,
        token: Uuid,
        patient_id: Uuid,
    ) -> Result<ConsumeOutcome, ReservationError> {
        let key = match self.tokens.get(&token).map(|entry| *entry.value()) {
            Some(key) => key,
            None => return Ok(ConsumeOutcome::NotFound),
        };

        let now = Utc::now();
        match self.holds.entry(key) {
            Entry::Occupied(occupied) => {
                if occupied.get().token != token {
                    // The key was re-acquired by someone else after this
                    // hold left the store.
                    return Ok(ConsumeOutcome::NotFound);
                }

                if occupied.get().is_expired(now) {
                    let stale = occupied.remove();
                    self.tokens.remove(&stale.token);
                    self.channels
                        .publish(AvailabilityEvent::slot_freed(key, FreedReason::Expired));
                    debug!("Consume of {} found hold expired", token);
                    return Ok(ConsumeOutcome::Expired);
                }

                let hold = occupied.get().clone();
                let booking = ConfirmedBooking {
                    id: Uuid::new_v4(),
                    professional_id: hold.professional_id,
                    patient_id,
                    date: hold.date,
                    start_time: hold.start_time,
                    end_time: hold.end_time,
                    status: BookingStatus::Scheduled,
                    created_at: now,
                    updated_at: now,
                    cancelled_at: None,
                    cancellation_reason: None,
                };

                // Ledger write happens inside the key's critical section so
                // hold validation and booking persistence cannot interleave
                // with another operation on this slot.
                self.ledger.insert(booking.clone())?;

                occupied.remove();
                self.tokens.remove(&token);
                self.channels.publish(AvailabilityEvent::slot_booked(key));
                info!("Hold {} consumed into booking {}", token, booking.id);
                Ok(ConsumeOutcome::Consumed { booking })
            }
            Entry::Vacant(_) => Ok(ConsumeOutcome::NotFound),
        }
    }

    /// Explicit abandon of a hold by its holder.
    #[instrument(skip(self))]
    pub fn release(&self, token: Uuid) -> Result<ReleaseOutcome, ReservationError> {
        let key = match self.tokens.get(&token).map(|entry| *entry.value()) {
            Some(key) => key,
            None => return Ok(ReleaseOutcome::NotFound),
        };

        match self.holds.entry(key) {
            Entry::Occupied(occupied) => {
                if occupied.get().token != token {
                    return Ok(ReleaseOutcome::NotFound);
                }
                occupied.remove();
                self.tokens.remove(&token);
                self.channels
                    .publish(AvailabilityEvent::slot_freed(key, FreedReason::Released));
                info!("Hold {} released on {}", token, key);
                Ok(ReleaseOutcome::Released)
            }
            Entry::Vacant(_) => Ok(ReleaseOutcome::NotFound),
        }
    }

    /// Remove every active hold of a professional on the given dates, e.g.
    /// when a block covering them is approved. Returns the released holds so
    /// callers can notify the affected holders.
    pub fn force_release_for_dates(
        &self,
        professional_id: Uuid,
        dates: &[NaiveDate],
        reason: FreedReason,
    ) -> Vec<SlotHold> {
        let affected: Vec<SlotKey> = self
            .holds
            .iter()
            .filter(|entry| {
                entry.key().professional_id == professional_id
                    && dates.contains(&entry.key().date)
            })
            .map(|entry| *entry.key())
            .collect();

        let mut released = Vec::new();
        for key in affected {
            if let Entry::Occupied(occupied) = self.holds.entry(key) {
                let hold = occupied.remove();
                self.tokens.remove(&hold.token);
                self.channels
                    .publish(AvailabilityEvent::slot_freed(key, reason));
                warn!(
                    "Hold {} on {} force-released ({:?})",
                    hold.token, key, reason
                );
                released.push(hold);
            }
        }
        released
    }

    /// One sweep pass: expire every hold whose TTL has passed. Each expiry is
    /// its own compare-and-set under the key's entry lock; no global lock is
    /// ever taken.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let candidates: Vec<SlotKey> = self
            .holds
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| *entry.key())
            .collect();

        let mut swept = 0;
        for key in candidates {
            if let Entry::Occupied(occupied) = self.holds.entry(key) {
                // Re-check under the lock; a racing consume may have won.
                if occupied.get().is_expired(now) {
                    let stale = occupied.remove();
                    self.tokens.remove(&stale.token);
                    self.channels
                        .publish(AvailabilityEvent::slot_freed(key, FreedReason::Expired));
                    swept += 1;
                }
            }
        }
        swept
    }

    /// Whether a live (non-expired) hold exists for the key right now.
    pub fn is_held(&self, key: &SlotKey, now: DateTime<Utc>) -> bool {
        self.holds
            .get(key)
            .map(|hold| !hold.is_expired(now))
            .unwrap_or(false)
    }

    pub fn get_hold(&self, token: Uuid) -> Option<SlotHold> {
        let key = self.tokens.get(&token).map(|entry| *entry.value())?;
        self.holds
            .get(&key)
            .filter(|hold| hold.token == token)
            .map(|hold| hold.clone())
    }

    pub fn active_hold_count(&self) -> usize {
        self.holds.len()
    }

    /// Cancel a booking and free its slot. Runs under the slot key's entry
    /// lock so the freed event cannot reorder against a racing acquire on the
    /// same key.
    #[instrument(skip(self, reason))]
    pub fn cancel_booking(
        &self,
        booking_id: Uuid,
        reason: String,
    ) -> Result<ConfirmedBooking, ReservationError> {
        let booking = self
            .ledger
            .get(booking_id)
            .ok_or_else(|| ReservationError::NotFound(format!("Booking {} not found", booking_id)))?;
        let key = booking.key();

        let entry = self.holds.entry(key);
        let cancelled = self.ledger.cancel(booking_id, reason)?;
        self.channels.publish(AvailabilityEvent::slot_freed(
            key,
            FreedReason::BookingCancelled,
        ));
        drop(entry);

        Ok(cancelled)
    }

    fn build_hold(
        &self,
        request: &AcquireHoldRequest,
        holder_id: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> SlotHold {
        SlotHold {
            token: Uuid::new_v4(),
            professional_id: request.professional_id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            holder_id,
            acquired_at: now,
            expires_at: now + ttl,
        }
    }
}
