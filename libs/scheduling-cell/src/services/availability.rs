// libs/scheduling-cell/src/services/availability.rs
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::{
    Appointment, RuleType, ScheduleConstraints, SchedulingRule, SlotAvailability,
};
use crate::services::slots::minute_of_day;

pub const CONFLICT_CLOSED: &str = "Business is closed";
pub const CONFLICT_OUTSIDE_HOURS: &str = "Outside business hours";
pub const CONFLICT_BOOKED: &str = "Time slot already booked";

pub struct AvailabilityChecker;

impl AvailabilityChecker {
    /// Exact-slot availability as a pure function of loaded constraints.
    /// Conflict sources are checked independently and accumulated, never
    /// short-circuited; the slot is available iff the list is empty.
    pub fn check(
        constraints: &ScheduleConstraints,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i32,
        staff_id: Option<Uuid>,
        service_id: Option<Uuid>,
    ) -> SlotAvailability {
        let mut conflicts = Vec::new();

        let slot_start = minute_of_day(time);
        let slot_end = slot_start + duration_minutes as i64;

        match constraints.hours_for(date) {
            None => conflicts.push(CONFLICT_CLOSED.to_string()),
            Some(hours) if hours.is_closed => conflicts.push(CONFLICT_CLOSED.to_string()),
            Some(hours) => {
                if slot_start < minute_of_day(hours.open_time)
                    || slot_end > minute_of_day(hours.close_time)
                {
                    conflicts.push(CONFLICT_OUTSIDE_HOURS.to_string());
                }
            }
        }

        let day_appointments: Vec<&Appointment> = constraints
            .appointments
            .iter()
            .filter(|apt| apt.appointment_date == date)
            .filter(|apt| match staff_id {
                Some(id) => apt.staff_id == Some(id),
                None => true,
            })
            .collect();

        if day_appointments
            .iter()
            .any(|apt| overlaps(slot_start, slot_end, apt))
        {
            conflicts.push(CONFLICT_BOOKED.to_string());
        }

        for rule in buffer_rules(&constraints.rules, service_id) {
            let before = rule.actions.buffer_minutes_before.unwrap_or(0) as i64;
            let after = rule.actions.buffer_minutes_after.unwrap_or(0) as i64;

            // Each existing appointment claims `before` idle minutes ahead of
            // it and `after` minutes behind it; the candidate must stay clear
            // of the expanded interval.
            let violated = day_appointments.iter().any(|apt| {
                let apt_start = (minute_of_day(apt.start_time) - before).max(0);
                let apt_end = (minute_of_day(apt.end_time) + after).min(24 * 60);
                slot_start < apt_end && slot_end > apt_start
            });

            if violated {
                conflicts.push(format!(
                    "Buffer time conflict ({}min before, {}min after)",
                    before, after
                ));
            }
        }

        SlotAvailability {
            available: conflicts.is_empty(),
            conflicts,
        }
    }
}

/// Half-open interval overlap: touching endpoints do not conflict.
fn overlaps(slot_start: i64, slot_end: i64, appointment: &Appointment) -> bool {
    let apt_start = minute_of_day(appointment.start_time);
    let apt_end = minute_of_day(appointment.end_time);
    slot_start < apt_end && slot_end > apt_start
}

/// Active buffer-time rules whose service condition matches the requested
/// service or is absent.
fn buffer_rules(
    rules: &[SchedulingRule],
    service_id: Option<Uuid>,
) -> impl Iterator<Item = &SchedulingRule> {
    rules.iter().filter(move |rule| {
        if !rule.is_active || rule.rule_type != RuleType::BufferTime {
            return false;
        }
        match (&rule.conditions.service_ids, service_id) {
            (None, _) => true,
            (Some(ids), Some(id)) => ids.contains(&id),
            (Some(_), None) => false,
        }
    })
}
