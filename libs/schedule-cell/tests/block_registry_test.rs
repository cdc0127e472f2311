use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use schedule_cell::models::{BlockApproval, BlockKind, ScheduleError, SubmitBlockRequest};
use schedule_cell::services::blocks::BlockService;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

// Far-future dates keep the past-date validation out of the way.
fn single_block_request(professional_id: Uuid) -> SubmitBlockRequest {
    SubmitBlockRequest {
        professional_id,
        kind: BlockKind::Single {
            date: date(2030, 1, 7),
        },
        reason: "conference attendance".to_string(),
    }
}

#[test]
fn submit_creates_a_pending_block() {
    let service = BlockService::new();
    let professional_id = Uuid::new_v4();

    let block = service
        .submit(single_block_request(professional_id))
        .expect("submit should succeed");

    assert!(block.approval.is_pending());
    assert!(block.active);
    assert!(service.approved_blocks(professional_id).is_empty());
}

#[test]
fn inverted_range_is_rejected() {
    let service = BlockService::new();
    let result = service.submit(SubmitBlockRequest {
        professional_id: Uuid::new_v4(),
        kind: BlockKind::Range {
            start_date: date(2030, 1, 20),
            end_date: date(2030, 1, 10),
        },
        reason: "holiday".to_string(),
    });

    assert_matches!(result, Err(ScheduleError::Validation(_)));
}

#[test]
fn past_dates_are_rejected() {
    let service = BlockService::new();
    let result = service.submit(SubmitBlockRequest {
        professional_id: Uuid::new_v4(),
        kind: BlockKind::Single {
            date: date(2020, 1, 6),
        },
        reason: "holiday".to_string(),
    });

    assert_matches!(result, Err(ScheduleError::Validation(_)));
}

#[test]
fn empty_reason_is_rejected() {
    let service = BlockService::new();
    let mut request = single_block_request(Uuid::new_v4());
    request.reason = "   ".to_string();

    assert_matches!(service.submit(request), Err(ScheduleError::Validation(_)));
}

#[test]
fn approval_records_the_approver() {
    let service = BlockService::new();
    let professional_id = Uuid::new_v4();
    let approver_id = Uuid::new_v4();
    let block = service
        .submit(single_block_request(professional_id))
        .expect("submit should succeed");

    let decided = service
        .decide(block.id, approver_id, true, None)
        .expect("decision should succeed");

    assert_matches!(
        decided.approval,
        BlockApproval::Approved { approver_id: a, .. } if a == approver_id
    );
    assert_eq!(service.approved_blocks(professional_id).len(), 1);
}

#[test]
fn rejection_requires_a_reason() {
    let service = BlockService::new();
    let block = service
        .submit(single_block_request(Uuid::new_v4()))
        .expect("submit should succeed");

    let missing = service.decide(block.id, Uuid::new_v4(), false, None);
    assert_matches!(missing, Err(ScheduleError::Validation(_)));

    let rejected = service
        .decide(
            block.id,
            Uuid::new_v4(),
            false,
            Some("coverage needed that week".to_string()),
        )
        .expect("rejection with reason should succeed");
    assert_matches!(rejected.approval, BlockApproval::Rejected { .. });
}

#[test]
fn blocks_are_decided_exactly_once() {
    let service = BlockService::new();
    let block = service
        .submit(single_block_request(Uuid::new_v4()))
        .expect("submit should succeed");
    service
        .decide(block.id, Uuid::new_v4(), true, None)
        .expect("first decision should succeed");

    let second = service.decide(block.id, Uuid::new_v4(), true, None);

    assert_matches!(second, Err(ScheduleError::InvalidState(_)));
}

#[test]
fn deciding_an_unknown_block_is_not_found() {
    let service = BlockService::new();
    let result = service.decide(Uuid::new_v4(), Uuid::new_v4(), true, None);
    assert_matches!(result, Err(ScheduleError::NotFound(_)));
}

#[test]
fn deactivated_block_no_longer_affects_availability() {
    let service = BlockService::new();
    let professional_id = Uuid::new_v4();
    let block = service
        .submit(single_block_request(professional_id))
        .expect("submit should succeed");
    service
        .decide(block.id, Uuid::new_v4(), true, None)
        .expect("decision should succeed");
    assert_eq!(service.approved_blocks(professional_id).len(), 1);

    service
        .deactivate(block.id)
        .expect("deactivation should succeed");

    assert!(service.approved_blocks(professional_id).is_empty());

    let kept = service.get(block.id).expect("block is retained");
    assert!(kept.approval.is_approved(), "audit trail survives deactivation");
}

#[test]
fn rejected_blocks_never_reach_the_approved_set() {
    let service = BlockService::new();
    let professional_id = Uuid::new_v4();
    let block = service
        .submit(single_block_request(professional_id))
        .expect("submit should succeed");
    service
        .decide(
            block.id,
            Uuid::new_v4(),
            false,
            Some("not justified".to_string()),
        )
        .expect("rejection should succeed");

    assert!(service.approved_blocks(professional_id).is_empty());
}
