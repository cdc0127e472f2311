use chrono::NaiveDate;

use crate::models::{CandidateSlot, ScheduleBlock, ScheduleTemplate, TemplateStatus, TimeRange};

/// Derive the bookable slots a template offers between `from` and `to`
/// inclusive, with approved blocks removing whole dates.
///
/// Pure function of its inputs; emits slots in ascending (date, start_time)
/// order, which callers rely on and do not re-sort.
pub fn generate_slots(
    template: &ScheduleTemplate,
    approved_blocks: &[ScheduleBlock],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<CandidateSlot> {
    let mut slots = Vec::new();

    if template.status != TemplateStatus::Active {
        return slots;
    }

    let window_start = from.max(template.valid_from);
    let window_end = match template.valid_until {
        Some(until) => to.min(until),
        None => to,
    };

    let mut date = window_start;
    while date <= window_end {
        let config = template.weekday_config(date);
        if config.active && !date_is_blocked(approved_blocks, template, date) {
            for range in &config.ranges {
                walk_range(template, *range, date, &mut slots);
            }
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    slots
}

fn date_is_blocked(blocks: &[ScheduleBlock], template: &ScheduleTemplate, date: NaiveDate) -> bool {
    blocks
        .iter()
        .any(|b| b.professional_id == template.professional_id && b.removes_availability_on(date))
}

/// Walk one working range in steps of slot duration + gap. Degenerate ranges
/// produce nothing; a slot overlapping the break window is skipped but the
/// walk continues past it.
fn walk_range(
    template: &ScheduleTemplate,
    range: TimeRange,
    date: NaiveDate,
    slots: &mut Vec<CandidateSlot>,
) {
    let slot = template.slot_duration();
    let step = template.slot_step();
    if slot <= chrono::Duration::zero() || step <= chrono::Duration::zero() {
        return;
    }

    let mut cursor = range.start;
    loop {
        let (end, wrapped) = cursor.overflowing_add_signed(slot);
        if wrapped != 0 || end > range.end {
            break;
        }

        if !in_break_window(template, cursor, end) {
            slots.push(CandidateSlot {
                date,
                start_time: cursor,
                end_time: end,
            });
        }

        let (next, wrapped) = cursor.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        cursor = next;
    }
}

fn in_break_window(
    template: &ScheduleTemplate,
    start: chrono::NaiveTime,
    end: chrono::NaiveTime,
) -> bool {
    template
        .break_window
        .map_or(false, |brk| start < brk.end && end > brk.start)
}
