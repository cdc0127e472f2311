// libs/schedule-cell/src/models.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// SCHEDULE TEMPLATE MODELS
// ==============================================================================

/// A half-open working window within a day, e.g. 09:00-12:30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Degenerate ranges (zero-length or inverted) are representable but
    /// produce no slots; creation-time validation rejects them up front.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Per-weekday portion of a recurring template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekdayConfig {
    pub active: bool,
    pub ranges: Vec<TimeRange>,
}

impl WeekdayConfig {
    pub fn inactive() -> Self {
        Self {
            active: false,
            ranges: Vec::new(),
        }
    }

    pub fn with_ranges(ranges: Vec<TimeRange>) -> Self {
        Self {
            active: true,
            ranges,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Active,
    Inactive,
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateStatus::Active => write!(f, "active"),
            TemplateStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// Recurring weekly availability template owned by one professional.
///
/// Templates are superseded rather than edited in place so bookings made
/// against an older template remain interpretable against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleTemplate {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub slot_duration_minutes: i64,
    pub slot_gap_minutes: i64,
    pub break_window: Option<TimeRange>,
    /// Monday-first, one entry per weekday.
    pub weekdays: [WeekdayConfig; 7],
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub status: TemplateStatus,
    pub created_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
}

impl ScheduleTemplate {
    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(self.slot_duration_minutes)
    }

    pub fn slot_step(&self) -> Duration {
        Duration::minutes(self.slot_duration_minutes + self.slot_gap_minutes)
    }

    /// Whether this template's validity window covers the given date.
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_until.map_or(true, |until| date <= until)
    }

    pub fn weekday_config(&self, date: NaiveDate) -> &WeekdayConfig {
        &self.weekdays[date.weekday().num_days_from_monday() as usize]
    }
}

// ==============================================================================
// SCHEDULE BLOCK MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BlockKind {
    Single { date: NaiveDate },
    Range { start_date: NaiveDate, end_date: NaiveDate },
}

impl BlockKind {
    pub fn covers(&self, date: NaiveDate) -> bool {
        match self {
            BlockKind::Single { date: blocked } => *blocked == date,
            BlockKind::Range { start_date, end_date } => date >= *start_date && date <= *end_date,
        }
    }

    pub fn first_date(&self) -> NaiveDate {
        match self {
            BlockKind::Single { date } => *date,
            BlockKind::Range { start_date, .. } => *start_date,
        }
    }

    pub fn last_date(&self) -> NaiveDate {
        match self {
            BlockKind::Single { date } => *date,
            BlockKind::Range { end_date, .. } => *end_date,
        }
    }

    /// All calendar dates the block removes, in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut cursor = self.first_date();
        while cursor <= self.last_date() {
            dates.push(cursor);
            cursor = match cursor.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        dates
    }
}

/// Approval is decided exactly once; the decided variants carry the audit
/// trail and are immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum BlockApproval {
    Pending,
    Approved {
        approver_id: Uuid,
        decided_at: DateTime<Utc>,
    },
    Rejected {
        approver_id: Uuid,
        decided_at: DateTime<Utc>,
        rejection_reason: String,
    },
}

impl BlockApproval {
    pub fn is_pending(&self) -> bool {
        matches!(self, BlockApproval::Pending)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, BlockApproval::Approved { .. })
    }
}

/// A professional-submitted request to remove availability for one date or a
/// date range, gated by admin approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub kind: BlockKind,
    pub reason: String,
    pub approval: BlockApproval,
    pub active: bool,
    pub submitted_at: DateTime<Utc>,
}

impl ScheduleBlock {
    /// Only approved blocks that have not been soft-deactivated remove slots.
    pub fn removes_availability_on(&self, date: NaiveDate) -> bool {
        self.active && self.approval.is_approved() && self.kind.covers(date)
    }
}

// ==============================================================================
// SLOT GENERATOR OUTPUT
// ==============================================================================

/// One bookable interval derived from a template. Ordered by (date, start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishTemplateRequest {
    pub professional_id: Uuid,
    pub slot_duration_minutes: i64,
    pub slot_gap_minutes: i64,
    pub break_window: Option<TimeRange>,
    pub weekdays: [WeekdayConfig; 7],
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBlockRequest {
    pub professional_id: Uuid,
    #[serde(flatten)]
    pub kind: BlockKind,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideBlockRequest {
    pub approve: bool,
    pub rejection_reason: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}
