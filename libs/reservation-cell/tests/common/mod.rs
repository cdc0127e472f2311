#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use reservation_cell::{
    AcquireHoldRequest, AvailabilityChannels, AvailabilityService, BlockWorkflowService,
    BookingLedger, ReservationStore,
};
use schedule_cell::models::{PublishTemplateRequest, TimeRange, WeekdayConfig};
use schedule_cell::{BlockService, TemplateService};
use shared_config::AppConfig;

// 2030-01-07 is a Monday, safely in the future for block submission rules.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).expect("valid date")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn time(h: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, min, 0).expect("valid time")
}

pub struct TestHarness {
    pub templates: Arc<TemplateService>,
    pub blocks: Arc<BlockService>,
    pub channels: Arc<AvailabilityChannels>,
    pub ledger: Arc<BookingLedger>,
    pub store: Arc<ReservationStore>,
    pub availability: Arc<AvailabilityService>,
    pub blocks_flow: Arc<BlockWorkflowService>,
}

pub fn harness() -> TestHarness {
    harness_with_ttl(300)
}

pub fn harness_with_ttl(default_ttl_seconds: i64) -> TestHarness {
    let config = AppConfig {
        bind_port: 3000,
        hold_ttl_seconds: default_ttl_seconds,
        sweep_interval_seconds: 30,
        event_buffer_capacity: 64,
        allow_self_hold: false,
    };

    let templates = Arc::new(TemplateService::new());
    let blocks = Arc::new(BlockService::new());
    let channels = Arc::new(AvailabilityChannels::new(config.event_buffer_capacity));
    let ledger = Arc::new(BookingLedger::new());
    let store = Arc::new(ReservationStore::new(
        &config,
        ledger.clone(),
        channels.clone(),
    ));
    let availability = Arc::new(AvailabilityService::new(
        templates.clone(),
        blocks.clone(),
        store.clone(),
        ledger.clone(),
        channels.clone(),
    ));
    let blocks_flow = Arc::new(BlockWorkflowService::new(
        blocks.clone(),
        store.clone(),
        channels.clone(),
    ));

    TestHarness {
        templates,
        blocks,
        channels,
        ledger,
        store,
        availability,
        blocks_flow,
    }
}

impl TestHarness {
    /// Weekday template, Monday to Friday 09:00-17:00, 30-minute slots.
    pub fn publish_weekday_template(&self, professional_id: Uuid) {
        let mut weekdays: [WeekdayConfig; 7] = std::array::from_fn(|_| WeekdayConfig::inactive());
        for day in weekdays.iter_mut().take(5) {
            *day = WeekdayConfig::with_ranges(vec![TimeRange::new(time(9, 0), time(17, 0))]);
        }

        self.templates
            .publish(PublishTemplateRequest {
                professional_id,
                slot_duration_minutes: 30,
                slot_gap_minutes: 0,
                break_window: None,
                weekdays,
                valid_from: date(2029, 1, 1),
                valid_until: None,
            })
            .expect("template publish should succeed");
    }
}

pub fn half_hour_request(
    professional_id: Uuid,
    on: NaiveDate,
    hour: u32,
    minute: u32,
) -> AcquireHoldRequest {
    let start = time(hour, minute);
    AcquireHoldRequest {
        professional_id,
        date: on,
        start_time: start,
        end_time: start + chrono::Duration::minutes(30),
        ttl_seconds: None,
    }
}
