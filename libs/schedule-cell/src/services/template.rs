use chrono::{Duration, NaiveDate, Utc};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    CandidateSlot, PublishTemplateRequest, ScheduleBlock, ScheduleError, ScheduleTemplate,
    TemplateStatus, WeekdayConfig,
};
use crate::services::slots::generate_slots;

/// Registry of weekly schedule templates. Templates are superseded, never
/// mutated, so one professional accumulates a history of validity windows of
/// which at most one is Active.
pub struct TemplateService {
    templates: DashMap<Uuid, ScheduleTemplate>,
    by_professional: DashMap<Uuid, Vec<Uuid>>,
}

impl TemplateService {
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
            by_professional: DashMap::new(),
        }
    }

    /// Publish a first template for a professional. Fails if an Active
    /// template already exists; replacing one goes through `supersede`.
    pub fn publish(&self, request: PublishTemplateRequest) -> Result<ScheduleTemplate, ScheduleError> {
        let template = self.build_validated(request)?;

        if self.active_template(template.professional_id).is_some() {
            return Err(ScheduleError::InvalidState(
                "Professional already has an active template; supersede it instead".to_string(),
            ));
        }

        self.insert(template.clone());
        info!(
            "Published template {} for professional {}",
            template.id, template.professional_id
        );
        Ok(template)
    }

    /// Replace an Active template. The old one is closed in place (status,
    /// validity clamp, supersede timestamp) and kept for history.
    pub fn supersede(
        &self,
        template_id: Uuid,
        request: PublishTemplateRequest,
    ) -> Result<ScheduleTemplate, ScheduleError> {
        let replacement = self.build_validated(request)?;

        {
            let mut old = self
                .templates
                .get_mut(&template_id)
                .ok_or_else(|| ScheduleError::NotFound(format!("Template {} not found", template_id)))?;

            if old.professional_id != replacement.professional_id {
                return Err(ScheduleError::Validation(
                    "Replacement template belongs to a different professional".to_string(),
                ));
            }
            if old.status != TemplateStatus::Active {
                return Err(ScheduleError::InvalidState(
                    "Only an active template can be superseded".to_string(),
                ));
            }

            let closing_date = replacement.valid_from - Duration::days(1);
            old.status = TemplateStatus::Inactive;
            old.superseded_at = Some(Utc::now());
            old.valid_until = Some(match old.valid_until {
                Some(until) => until.min(closing_date),
                None => closing_date,
            });
            debug!("Closed template {} at {:?}", old.id, old.valid_until);
        }

        self.insert(replacement.clone());
        info!(
            "Superseded template {} with {} for professional {}",
            template_id, replacement.id, replacement.professional_id
        );
        Ok(replacement)
    }

    pub fn get(&self, template_id: Uuid) -> Option<ScheduleTemplate> {
        self.templates.get(&template_id).map(|t| t.clone())
    }

    /// Template history for a professional, oldest validity window first.
    pub fn list_for_professional(&self, professional_id: Uuid) -> Vec<ScheduleTemplate> {
        let ids = self
            .by_professional
            .get(&professional_id)
            .map(|e| e.clone())
            .unwrap_or_default();

        let mut templates: Vec<ScheduleTemplate> = ids
            .iter()
            .filter_map(|id| self.templates.get(id).map(|t| t.clone()))
            .collect();
        templates.sort_by_key(|t| t.valid_from);
        templates
    }

    pub fn active_template(&self, professional_id: Uuid) -> Option<ScheduleTemplate> {
        self.list_for_professional(professional_id)
            .into_iter()
            .find(|t| t.status == TemplateStatus::Active)
    }

    /// Candidate slots for a professional over a date range, resolved against
    /// their Active template. No template means no availability.
    pub fn candidate_slots(
        &self,
        professional_id: Uuid,
        approved_blocks: &[ScheduleBlock],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<CandidateSlot> {
        match self.active_template(professional_id) {
            Some(template) => generate_slots(&template, approved_blocks, from, to),
            None => Vec::new(),
        }
    }

    fn insert(&self, template: ScheduleTemplate) {
        self.by_professional
            .entry(template.professional_id)
            .or_default()
            .push(template.id);
        self.templates.insert(template.id, template);
    }

    fn build_validated(
        &self,
        request: PublishTemplateRequest,
    ) -> Result<ScheduleTemplate, ScheduleError> {
        if request.slot_duration_minutes <= 0 {
            return Err(ScheduleError::Validation(
                "Slot duration must be positive".to_string(),
            ));
        }
        if request.slot_gap_minutes < 0 {
            return Err(ScheduleError::Validation(
                "Slot gap cannot be negative".to_string(),
            ));
        }
        if let Some(until) = request.valid_until {
            if until < request.valid_from {
                return Err(ScheduleError::Validation(
                    "Validity end precedes validity start".to_string(),
                ));
            }
        }
        if let Some(brk) = request.break_window {
            if !brk.is_well_formed() {
                return Err(ScheduleError::Validation(
                    "Break window start must precede its end".to_string(),
                ));
            }
        }

        let mut weekdays = request.weekdays;
        for (index, config) in weekdays.iter_mut().enumerate() {
            validate_weekday(index, config, request.slot_duration_minutes)?;
        }

        Ok(ScheduleTemplate {
            id: Uuid::new_v4(),
            professional_id: request.professional_id,
            slot_duration_minutes: request.slot_duration_minutes,
            slot_gap_minutes: request.slot_gap_minutes,
            break_window: request.break_window,
            weekdays,
            valid_from: request.valid_from,
            valid_until: request.valid_until,
            status: TemplateStatus::Active,
            created_at: Utc::now(),
            superseded_at: None,
        })
    }
}

impl Default for TemplateService {
    fn default() -> Self {
        Self::new()
    }
}

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn validate_weekday(
    index: usize,
    config: &mut WeekdayConfig,
    slot_duration_minutes: i64,
) -> Result<(), ScheduleError> {
    if !config.active {
        return Ok(());
    }

    let day = WEEKDAY_NAMES[index];
    if config.ranges.is_empty() {
        return Err(ScheduleError::Validation(format!(
            "{} is active but has no time ranges",
            day
        )));
    }

    for range in &config.ranges {
        if !range.is_well_formed() {
            return Err(ScheduleError::Validation(format!(
                "{} range {} is inverted or empty",
                day, range
            )));
        }
        if range.duration() < Duration::minutes(slot_duration_minutes) {
            return Err(ScheduleError::Validation(format!(
                "{} range {} is shorter than one slot",
                day, range
            )));
        }
    }

    config.ranges.sort_by_key(|r| r.start);
    for pair in config.ranges.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(ScheduleError::Validation(format!(
                "{} ranges {} and {} overlap",
                day, pair[0], pair[1]
            )));
        }
    }

    Ok(())
}
