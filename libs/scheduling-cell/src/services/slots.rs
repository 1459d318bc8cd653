// libs/scheduling-cell/src/services/slots.rs
use chrono::{NaiveDate, NaiveTime, Timelike};
use uuid::Uuid;

use crate::models::{BusinessHours, ScheduleConstraints, SchedulingSlot, Service, StaffMember};

/// Candidate start times are enumerated on a fixed grid.
pub const SLOT_GRANULARITY_MINUTES: i64 = 30;

pub(crate) fn minute_of_day(time: NaiveTime) -> i64 {
    (time.num_seconds_from_midnight() / 60) as i64
}

/// Minute-of-day back to a wall clock time; `None` once the value leaves the
/// day, which callers treat as "past close".
pub(crate) fn time_from_minutes(minutes: i64) -> Option<NaiveTime> {
    if !(0..24 * 60).contains(&minutes) {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt((minutes * 60) as u32, 0)
}

pub struct SlotGenerator;

impl SlotGenerator {
    /// Enumerate candidate start times for one staff member within business
    /// hours. Stops once a slot's end would pass close time, so a duration
    /// longer than the open window yields nothing.
    pub fn generate_staff_slots(
        staff_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
        hours: &BusinessHours,
    ) -> Vec<SchedulingSlot> {
        if hours.is_closed || duration_minutes <= 0 {
            return Vec::new();
        }

        let open = minute_of_day(hours.open_time);
        let close = minute_of_day(hours.close_time);

        let mut slots = Vec::new();
        let mut current = open;
        while current + duration_minutes as i64 <= close {
            let Some(time) = time_from_minutes(current) else {
                break;
            };
            slots.push(SchedulingSlot {
                date,
                time,
                duration_minutes,
                staff_id: Some(staff_id),
                service_id,
                available: true,
                conflicts: Vec::new(),
            });
            current += SLOT_GRANULARITY_MINUTES;
        }

        slots
    }

    /// Candidate slots for a date across every eligible staff member, one
    /// independent sequence per staff member, concatenated. Staff on a
    /// blackout date are skipped entirely.
    pub fn candidate_slots(
        constraints: &ScheduleConstraints,
        service: &Service,
        date: NaiveDate,
        duration_minutes: i32,
    ) -> Vec<SchedulingSlot> {
        let Some(hours) = constraints.hours_for(date) else {
            return Vec::new();
        };
        if hours.is_closed {
            return Vec::new();
        }

        let mut slots = Vec::new();
        for staff in &constraints.staff {
            if staff.schedule.unavailable_dates.contains(&date) {
                continue;
            }
            if !Self::staff_eligible(staff, service) {
                continue;
            }
            slots.extend(Self::generate_staff_slots(
                staff.id,
                service.id,
                date,
                duration_minutes,
                hours,
            ));
        }

        slots
    }

    /// A staff member with no declared specialties takes every service; a
    /// service with no category is open to everyone; otherwise the service
    /// category must appear in the staff specialty set.
    pub fn staff_eligible(staff: &StaffMember, service: &Service) -> bool {
        if staff.specialties.is_empty() {
            return true;
        }
        match &service.category {
            None => true,
            Some(category) => staff
                .specialties
                .iter()
                .any(|s| s.eq_ignore_ascii_case(category)),
        }
    }

    /// Rank surviving candidates: earliest time of day first, slots with an
    /// assigned staff member winning ties over unassigned ones.
    pub fn rank_slots(slots: &mut Vec<SchedulingSlot>) {
        slots.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| b.staff_id.is_some().cmp(&a.staff_id.is_some()))
        });
    }
}
