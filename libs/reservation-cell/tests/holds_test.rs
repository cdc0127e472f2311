mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use uuid::Uuid;

use reservation_cell::{
    AcquireOutcome, ConflictReason, ConsumeOutcome, FreedReason, ReleaseOutcome, ReservationError,
    SlotKey,
};

use common::{half_hour_request, harness, harness_with_ttl, monday};

fn granted_token(outcome: AcquireOutcome) -> Uuid {
    match outcome {
        AcquireOutcome::Granted { hold } => hold.token,
        AcquireOutcome::Conflict { reason } => panic!("expected grant, got conflict: {:?}", reason),
    }
}

#[tokio::test]
async fn first_acquire_wins_second_conflicts() {
    let h = harness();
    let professional_id = Uuid::new_v4();
    let request = half_hour_request(professional_id, monday(), 9, 0);

    let first = h
        .store
        .try_acquire(&request, Uuid::new_v4())
        .expect("acquire should not error");
    assert_matches!(first, AcquireOutcome::Granted { .. });

    let second = h
        .store
        .try_acquire(&request, Uuid::new_v4())
        .expect("acquire should not error");
    assert_matches!(
        second,
        AcquireOutcome::Conflict {
            reason: ConflictReason::Held
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_acquires_yield_exactly_one_grant() {
    let h = harness();
    let professional_id = Uuid::new_v4();
    let request = half_hour_request(professional_id, monday(), 9, 0);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&h.store);
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            store
                .try_acquire(&request, Uuid::new_v4())
                .expect("acquire should not error")
        }));
    }

    let mut grants = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task should not panic") {
            AcquireOutcome::Granted { .. } => grants += 1,
            AcquireOutcome::Conflict {
                reason: ConflictReason::Held,
            } => conflicts += 1,
            AcquireOutcome::Conflict { reason } => {
                panic!("unexpected conflict reason: {:?}", reason)
            }
        }
    }

    assert_eq!(grants, 1, "exactly one concurrent caller may win the slot");
    assert_eq!(conflicts, 15);
}

#[tokio::test]
async fn released_slot_is_immediately_reacquirable() {
    let h = harness();
    let professional_id = Uuid::new_v4();
    let request = half_hour_request(professional_id, monday(), 9, 0);

    let token = granted_token(
        h.store
            .try_acquire(&request, Uuid::new_v4())
            .expect("acquire should not error"),
    );

    let released = h.store.release(token).expect("release should not error");
    assert_matches!(released, ReleaseOutcome::Released);

    let again = h
        .store
        .try_acquire(&request, Uuid::new_v4())
        .expect("acquire should not error");
    assert_matches!(again, AcquireOutcome::Granted { .. });
}

#[tokio::test]
async fn releasing_twice_reports_not_found() {
    let h = harness();
    let request = half_hour_request(Uuid::new_v4(), monday(), 9, 0);
    let token = granted_token(
        h.store
            .try_acquire(&request, Uuid::new_v4())
            .expect("acquire should not error"),
    );

    h.store.release(token).expect("release should not error");
    let second = h.store.release(token).expect("release should not error");

    assert_matches!(second, ReleaseOutcome::NotFound);
}

#[tokio::test]
async fn consume_converts_the_hold_into_a_booking() {
    let h = harness();
    let professional_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let request = half_hour_request(professional_id, monday(), 9, 0);

    let token = granted_token(
        h.store
            .try_acquire(&request, patient_id)
            .expect("acquire should not error"),
    );

    let outcome = h
        .store
        .consume(token, patient_id)
        .expect("consume should not error");
    let booking = match outcome {
        ConsumeOutcome::Consumed { booking } => booking,
        other => panic!("expected consumed, got {:?}", other),
    };

    assert_eq!(booking.professional_id, professional_id);
    assert_eq!(booking.patient_id, patient_id);
    assert!(h.ledger.get(booking.id).is_some());

    // The slot now conflicts as booked, not held.
    let again = h
        .store
        .try_acquire(&request, Uuid::new_v4())
        .expect("acquire should not error");
    assert_matches!(
        again,
        AcquireOutcome::Conflict {
            reason: ConflictReason::Booked
        }
    );
}

#[tokio::test]
async fn consuming_twice_reports_not_found() {
    let h = harness();
    let patient_id = Uuid::new_v4();
    let request = half_hour_request(Uuid::new_v4(), monday(), 9, 0);
    let token = granted_token(
        h.store
            .try_acquire(&request, patient_id)
            .expect("acquire should not error"),
    );

    h.store
        .consume(token, patient_id)
        .expect("consume should not error");
    let second = h
        .store
        .consume(token, patient_id)
        .expect("consume should not error");

    assert_matches!(second, ConsumeOutcome::NotFound);
}

#[tokio::test]
async fn consume_of_unknown_token_reports_not_found() {
    let h = harness();
    let outcome = h
        .store
        .consume(Uuid::new_v4(), Uuid::new_v4())
        .expect("consume should not error");
    assert_matches!(outcome, ConsumeOutcome::NotFound);
}

#[tokio::test]
async fn consume_after_ttl_expiry_reports_expired_without_the_sweeper() {
    let h = harness_with_ttl(1);
    let patient_id = Uuid::new_v4();
    let request = half_hour_request(Uuid::new_v4(), monday(), 9, 0);
    let token = granted_token(
        h.store
            .try_acquire(&request, patient_id)
            .expect("acquire should not error"),
    );

    tokio::time::sleep(std::time::Duration::from_millis(1300)).await;

    // No sweep pass has run; expiry must still be observed by wall clock.
    let outcome = h
        .store
        .consume(token, patient_id)
        .expect("consume should not error");
    assert_matches!(outcome, ConsumeOutcome::Expired);

    // And the slot is acquirable again straight away.
    let again = h
        .store
        .try_acquire(&request, Uuid::new_v4())
        .expect("acquire should not error");
    assert_matches!(again, AcquireOutcome::Granted { .. });
}

#[tokio::test]
async fn sweep_expires_overdue_holds_only() {
    let h = harness();
    let professional_id = Uuid::new_v4();
    let overdue = half_hour_request(professional_id, monday(), 9, 0);
    let fresh = half_hour_request(professional_id, monday(), 10, 0);

    let mut short = overdue.clone();
    short.ttl_seconds = Some(1);
    h.store
        .try_acquire(&short, Uuid::new_v4())
        .expect("acquire should not error");
    h.store
        .try_acquire(&fresh, Uuid::new_v4())
        .expect("acquire should not error");

    let swept = h.store.sweep_expired(Utc::now() + Duration::seconds(5));
    assert_eq!(swept, 1, "only the short-TTL hold is overdue");

    let overdue_key = SlotKey::new(professional_id, monday(), overdue.start_time);
    let fresh_key = SlotKey::new(professional_id, monday(), fresh.start_time);
    assert!(!h.store.is_held(&overdue_key, Utc::now()));
    assert!(h.store.is_held(&fresh_key, Utc::now()));

    let again = h
        .store
        .try_acquire(&overdue, Uuid::new_v4())
        .expect("acquire should not error");
    assert_matches!(again, AcquireOutcome::Granted { .. });
}

#[tokio::test]
async fn professionals_cannot_hold_their_own_slots() {
    let h = harness();
    let professional_id = Uuid::new_v4();
    let request = half_hour_request(professional_id, monday(), 9, 0);

    let result = h.store.try_acquire(&request, professional_id);

    assert_matches!(result, Err(ReservationError::Validation(_)));
}

#[tokio::test]
async fn inverted_slot_times_are_rejected() {
    let h = harness();
    let mut request = half_hour_request(Uuid::new_v4(), monday(), 9, 0);
    request.end_time = common::time(8, 0);

    let result = h.store.try_acquire(&request, Uuid::new_v4());

    assert_matches!(result, Err(ReservationError::Validation(_)));
}

#[tokio::test]
async fn non_positive_ttl_is_rejected() {
    let h = harness();
    let mut request = half_hour_request(Uuid::new_v4(), monday(), 9, 0);
    request.ttl_seconds = Some(0);

    let result = h.store.try_acquire(&request, Uuid::new_v4());

    assert_matches!(result, Err(ReservationError::Validation(_)));
}

#[tokio::test]
async fn force_release_targets_one_professional_and_dates() {
    let h = harness();
    let blocked_professional = Uuid::new_v4();
    let other_professional = Uuid::new_v4();

    let blocked_request = half_hour_request(blocked_professional, monday(), 9, 0);
    let other_day = half_hour_request(blocked_professional, common::date(2030, 1, 8), 9, 0);
    let other_professional_request = half_hour_request(other_professional, monday(), 9, 0);

    let blocked_token = granted_token(
        h.store
            .try_acquire(&blocked_request, Uuid::new_v4())
            .expect("acquire should not error"),
    );
    h.store
        .try_acquire(&other_day, Uuid::new_v4())
        .expect("acquire should not error");
    h.store
        .try_acquire(&other_professional_request, Uuid::new_v4())
        .expect("acquire should not error");

    let released =
        h.store
            .force_release_for_dates(blocked_professional, &[monday()], FreedReason::BlockApproved);

    assert_eq!(released.len(), 1);
    assert_eq!(released[0].token, blocked_token);
    assert_eq!(h.store.active_hold_count(), 2, "unrelated holds survive");

    // The forced-out holder's consume fails gracefully.
    let outcome = h
        .store
        .consume(blocked_token, Uuid::new_v4())
        .expect("consume should not error");
    assert_matches!(outcome, ConsumeOutcome::NotFound);
}
