// libs/scheduling-cell/tests/engine_test.rs
//
// Pure-logic coverage for slot generation, rule filtering, and availability
// checking. No backend involved: constraint sets are built in memory.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use scheduling_cell::models::{
    Appointment, AppointmentStatus, BookingSource, BusinessHours, RuleActions, RuleConditions,
    RuleType, ScheduleConstraints, SchedulingRule, SchedulingSlot, Service, StaffMember,
    StaffSchedule, TimeRange,
};
use scheduling_cell::services::{AvailabilityChecker, RuleEngine, SlotGenerator};

// ==============================================================================
// FIXTURES
// ==============================================================================

fn business_id() -> Uuid {
    Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
}

fn staff_a() -> Uuid {
    Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap()
}

fn service_id() -> Uuid {
    Uuid::parse_str("33333333-3333-3333-3333-333333333333").unwrap()
}

// 2025-06-23 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 23).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn monday_hours() -> BusinessHours {
    BusinessHours {
        id: Uuid::new_v4(),
        business_id: business_id(),
        day_of_week: 1,
        open_time: t(9, 0),
        close_time: t(17, 0),
        is_closed: false,
    }
}

fn haircut() -> Service {
    Service {
        id: service_id(),
        business_id: business_id(),
        name: "Haircut".to_string(),
        duration_minutes: 30,
        category: None,
    }
}

fn stylist() -> StaffMember {
    StaffMember {
        id: staff_a(),
        business_id: business_id(),
        display_name: "Alex".to_string(),
        specialties: Vec::new(),
        schedule: StaffSchedule::default(),
    }
}

fn appointment(staff: Option<Uuid>, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Appointment {
    let duration = (end.signed_duration_since(start)).num_minutes() as i32;
    Appointment {
        id: Uuid::new_v4(),
        business_id: business_id(),
        customer_id: Uuid::new_v4(),
        service_id: service_id(),
        staff_id: staff,
        appointment_date: date,
        start_time: start,
        end_time: end,
        duration_minutes: duration,
        status: AppointmentStatus::Confirmed,
        booking_source: BookingSource::Online,
        notes: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

fn constraints(appointments: Vec<Appointment>, rules: Vec<SchedulingRule>) -> ScheduleConstraints {
    let mut business_hours = HashMap::new();
    business_hours.insert(1, monday_hours());
    ScheduleConstraints {
        business_hours,
        staff: vec![stylist()],
        appointments,
        rules,
        services: vec![haircut()],
    }
}

fn buffer_rule(before: i32, after: i32) -> SchedulingRule {
    SchedulingRule {
        id: Uuid::new_v4(),
        business_id: business_id(),
        name: "Buffer".to_string(),
        rule_type: RuleType::BufferTime,
        conditions: RuleConditions::default(),
        actions: RuleActions {
            buffer_minutes_before: Some(before),
            buffer_minutes_after: Some(after),
            ..RuleActions::default()
        },
        priority: 10,
        is_active: true,
    }
}

fn lunch_block() -> SchedulingRule {
    SchedulingRule {
        id: Uuid::new_v4(),
        business_id: business_id(),
        name: "Lunch block".to_string(),
        rule_type: RuleType::TimeBlock,
        conditions: RuleConditions {
            time_ranges: Some(vec![TimeRange {
                start: t(12, 0),
                end: t(13, 0),
            }]),
            ..RuleConditions::default()
        },
        actions: RuleActions {
            block_booking: Some(true),
            ..RuleActions::default()
        },
        priority: 20,
        is_active: true,
    }
}

// ==============================================================================
// SLOT GENERATION
// ==============================================================================

#[test]
fn slots_stay_within_business_hours() {
    let slots = SlotGenerator::generate_staff_slots(
        staff_a(),
        service_id(),
        monday(),
        30,
        &monday_hours(),
    );

    assert!(!slots.is_empty());
    for slot in &slots {
        assert!(slot.time >= t(9, 0));
        let end_minutes =
            slot.time.signed_duration_since(t(0, 0)).num_minutes() + slot.duration_minutes as i64;
        assert!(end_minutes <= 17 * 60);
    }
}

#[test]
fn open_day_yields_full_half_hour_grid() {
    // 09:00 through 16:30: the 16:30 slot ends exactly at close.
    let slots = SlotGenerator::generate_staff_slots(
        staff_a(),
        service_id(),
        monday(),
        30,
        &monday_hours(),
    );

    assert_eq!(slots.len(), 16);
    assert_eq!(slots.first().unwrap().time, t(9, 0));
    assert_eq!(slots.last().unwrap().time, t(16, 30));
}

#[test]
fn closed_day_yields_no_slots() {
    let mut hours = monday_hours();
    hours.is_closed = true;

    let slots =
        SlotGenerator::generate_staff_slots(staff_a(), service_id(), monday(), 30, &hours);
    assert!(slots.is_empty());
}

#[test]
fn duration_longer_than_open_window_yields_no_slots() {
    let slots = SlotGenerator::generate_staff_slots(
        staff_a(),
        service_id(),
        monday(),
        9 * 60, // 9 hours against an 8 hour day
        &monday_hours(),
    );
    assert!(slots.is_empty());
}

#[test]
fn staff_on_blackout_date_is_skipped() {
    let mut staff = stylist();
    staff.schedule.unavailable_dates.push(monday());

    let mut set = constraints(vec![], vec![]);
    set.staff = vec![staff];

    let slots = SlotGenerator::candidate_slots(&set, &haircut(), monday(), 30);
    assert!(slots.is_empty());
}

#[test]
fn specialty_matching_gates_eligibility() {
    let service = Service {
        category: Some("Nails".to_string()),
        ..haircut()
    };

    let mut colorist = stylist();
    colorist.specialties = vec!["Color".to_string()];
    assert!(!SlotGenerator::staff_eligible(&colorist, &service));

    let mut nail_tech = stylist();
    nail_tech.specialties = vec!["nails".to_string()];
    assert!(SlotGenerator::staff_eligible(&nail_tech, &service));

    // No declared specialties: takes every service.
    assert!(SlotGenerator::staff_eligible(&stylist(), &service));
}

#[test]
fn ranking_prefers_earlier_times_then_assigned_staff() {
    let slot = |time: NaiveTime, staff: Option<Uuid>| SchedulingSlot {
        date: monday(),
        time,
        duration_minutes: 30,
        staff_id: staff,
        service_id: service_id(),
        available: true,
        conflicts: Vec::new(),
    };

    let mut slots = vec![
        slot(t(11, 0), Some(staff_a())),
        slot(t(9, 0), None),
        slot(t(9, 0), Some(staff_a())),
    ];
    SlotGenerator::rank_slots(&mut slots);

    assert_eq!(slots[0].time, t(9, 0));
    assert!(slots[0].staff_id.is_some());
    assert_eq!(slots[1].time, t(9, 0));
    assert!(slots[1].staff_id.is_none());
    assert_eq!(slots[2].time, t(11, 0));
}

// ==============================================================================
// AVAILABILITY CHECKING
// ==============================================================================

#[test]
fn closed_weekday_reports_business_closed() {
    let set = constraints(vec![], vec![]);
    // No hours row for Tuesday.
    let tuesday = monday().succ_opt().unwrap();

    let result = AvailabilityChecker::check(&set, tuesday, t(10, 0), 30, Some(staff_a()), None);
    assert!(!result.available);
    assert!(result.conflicts.contains(&"Business is closed".to_string()));
}

#[test]
fn slot_outside_hours_is_rejected() {
    let set = constraints(vec![], vec![]);

    let early = AvailabilityChecker::check(&set, monday(), t(8, 0), 30, Some(staff_a()), None);
    assert!(early
        .conflicts
        .contains(&"Outside business hours".to_string()));

    // Ends at 17:30, past close.
    let late = AvailabilityChecker::check(&set, monday(), t(17, 0), 30, Some(staff_a()), None);
    assert!(late
        .conflicts
        .contains(&"Outside business hours".to_string()));

    // Ends exactly at close: fine.
    let boundary = AvailabilityChecker::check(&set, monday(), t(16, 30), 30, Some(staff_a()), None);
    assert!(boundary.available);
}

#[test]
fn overlap_uses_half_open_intervals() {
    let set = constraints(
        vec![appointment(Some(staff_a()), monday(), t(10, 0), t(10, 30))],
        vec![],
    );

    // Exact collision.
    let clash = AvailabilityChecker::check(&set, monday(), t(10, 0), 30, Some(staff_a()), None);
    assert!(!clash.available);
    assert!(clash
        .conflicts
        .contains(&"Time slot already booked".to_string()));

    // Starts exactly when the existing one ends: no conflict.
    let after = AvailabilityChecker::check(&set, monday(), t(10, 30), 30, Some(staff_a()), None);
    assert!(after.available);

    // Ends exactly when the existing one starts: no conflict.
    let before = AvailabilityChecker::check(&set, monday(), t(9, 30), 30, Some(staff_a()), None);
    assert!(before.available);

    // One-minute intrusion.
    let partial = AvailabilityChecker::check(&set, monday(), t(10, 29), 30, Some(staff_a()), None);
    assert!(!partial.available);
}

#[test]
fn other_staff_calendar_does_not_conflict() {
    let other_staff = Uuid::new_v4();
    let set = constraints(
        vec![appointment(Some(other_staff), monday(), t(10, 0), t(10, 30))],
        vec![],
    );

    let result = AvailabilityChecker::check(&set, monday(), t(10, 0), 30, Some(staff_a()), None);
    assert!(result.available);
}

#[test]
fn buffer_rule_flags_slots_too_close_to_existing_appointments() {
    let set = constraints(
        vec![appointment(Some(staff_a()), monday(), t(14, 0), t(14, 45))],
        vec![buffer_rule(5, 10)],
    );

    // 14:50 starts inside the 10-minute cooldown after 14:45.
    let too_close =
        AvailabilityChecker::check(&set, monday(), t(14, 50), 30, Some(staff_a()), None);
    assert!(!too_close.available);
    assert!(too_close
        .conflicts
        .contains(&"Buffer time conflict (5min before, 10min after)".to_string()));

    // 15:05 clears the cooldown.
    let clear = AvailabilityChecker::check(&set, monday(), t(15, 5), 30, Some(staff_a()), None);
    assert!(clear.available);
}

#[test]
fn buffer_rule_scoped_to_other_service_is_ignored() {
    let mut rule = buffer_rule(5, 10);
    rule.conditions.service_ids = Some(vec![Uuid::new_v4()]);

    let set = constraints(
        vec![appointment(Some(staff_a()), monday(), t(14, 0), t(14, 45))],
        vec![rule],
    );

    let result = AvailabilityChecker::check(
        &set,
        monday(),
        t(14, 50),
        30,
        Some(staff_a()),
        Some(service_id()),
    );
    assert!(result.available);
}

#[test]
fn availability_check_is_idempotent() {
    let set = constraints(
        vec![appointment(Some(staff_a()), monday(), t(10, 0), t(10, 30))],
        vec![buffer_rule(5, 10)],
    );

    let first = AvailabilityChecker::check(&set, monday(), t(10, 0), 30, Some(staff_a()), None);
    let second = AvailabilityChecker::check(&set, monday(), t(10, 0), 30, Some(staff_a()), None);

    assert_eq!(first.available, second.available);
    assert_eq!(first.conflicts, second.conflicts);
}

#[test]
fn conflicts_accumulate_rather_than_short_circuit() {
    let set = constraints(
        vec![appointment(Some(staff_a()), monday(), t(8, 0), t(8, 30))],
        vec![],
    );

    // Before open and double-booked at once.
    let result = AvailabilityChecker::check(&set, monday(), t(8, 0), 30, Some(staff_a()), None);
    assert!(!result.available);
    assert_eq!(result.conflicts.len(), 2);
}

// ==============================================================================
// RULE FILTERING
// ==============================================================================

fn all_monday_slots() -> Vec<SchedulingSlot> {
    SlotGenerator::generate_staff_slots(staff_a(), service_id(), monday(), 30, &monday_hours())
}

#[test]
fn time_block_rule_removes_blocked_starts() {
    let rules = vec![lunch_block()];
    let slots = all_monday_slots();
    let before = slots.len();

    let filtered = RuleEngine::apply_scheduling_rules(slots, service_id(), &rules);

    assert!(filtered.len() < before);
    for slot in &filtered {
        assert!(
            slot.time < t(12, 0) || slot.time >= t(13, 0),
            "slot at {} should have been blocked",
            slot.time
        );
    }
}

#[test]
fn rule_filtering_is_a_strict_narrowing() {
    let rules = vec![lunch_block(), buffer_rule(5, 10)];
    let slots = all_monday_slots();
    let before = slots.len();

    let filtered = RuleEngine::apply_scheduling_rules(slots, service_id(), &rules);

    assert!(filtered.len() <= before);
    for slot in &filtered {
        for rule in &rules {
            assert!(RuleEngine::evaluate(rule, slot));
        }
    }
}

#[test]
fn non_matching_day_condition_exempts_the_slot() {
    let mut rule = lunch_block();
    // Gate Tuesdays only; Monday slots pass untouched.
    rule.conditions.days_of_week = Some(vec![2]);

    let filtered =
        RuleEngine::apply_scheduling_rules(all_monday_slots(), service_id(), &[rule]);
    assert_eq!(filtered.len(), all_monday_slots().len());
}

#[test]
fn staff_condition_only_gates_listed_staff() {
    let mut rule = lunch_block();
    rule.conditions.staff_ids = Some(vec![Uuid::new_v4()]);

    // Slots belong to staff A, who is not in the rule's staff set.
    let filtered =
        RuleEngine::apply_scheduling_rules(all_monday_slots(), service_id(), &[rule]);
    assert_eq!(filtered.len(), all_monday_slots().len());
}

#[test]
fn buffer_rules_do_not_reject_at_the_filter_layer() {
    let filtered = RuleEngine::apply_scheduling_rules(
        all_monday_slots(),
        service_id(),
        &[buffer_rule(5, 10)],
    );
    assert_eq!(filtered.len(), all_monday_slots().len());
}

#[test]
fn inactive_rules_are_ignored() {
    let mut rule = lunch_block();
    rule.is_active = false;

    let filtered =
        RuleEngine::apply_scheduling_rules(all_monday_slots(), service_id(), &[rule]);
    assert_eq!(filtered.len(), all_monday_slots().len());
}

#[test]
fn default_rules_include_the_lunch_block() {
    let rules = scheduling_cell::services::rules::default_rules(business_id());
    assert_eq!(rules.len(), 3);

    let noon_slot = SchedulingSlot {
        date: monday(),
        time: t(12, 0),
        duration_minutes: 30,
        staff_id: Some(staff_a()),
        service_id: service_id(),
        available: true,
        conflicts: Vec::new(),
    };

    let filtered = RuleEngine::apply_scheduling_rules(vec![noon_slot], service_id(), &rules);
    assert!(filtered.is_empty());
}
