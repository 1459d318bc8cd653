// libs/scheduling-cell/src/services/rules.rs
use chrono::{Datelike, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    RuleActions, RuleConditions, RuleType, SchedulingRule, SchedulingSlot, TimeRange,
};

pub struct RuleEngine;

impl RuleEngine {
    /// Whether a rule gates this slot at all. Every defined condition must
    /// match; a non-matching condition exempts the slot from the rule rather
    /// than rejecting it.
    pub fn rule_applies(rule: &SchedulingRule, slot: &SchedulingSlot) -> bool {
        let conditions = &rule.conditions;

        if let Some(service_ids) = &conditions.service_ids {
            if !service_ids.contains(&slot.service_id) {
                return false;
            }
        }

        if let Some(days) = &conditions.days_of_week {
            if !days.contains(&slot.date.weekday().num_days_from_sunday()) {
                return false;
            }
        }

        if let Some(ranges) = &conditions.time_ranges {
            if !ranges.iter().any(|r| within_range(slot.time, r)) {
                return false;
            }
        }

        if let (Some(staff_ids), Some(staff_id)) = (&conditions.staff_ids, slot.staff_id) {
            if !staff_ids.contains(&staff_id) {
                return false;
            }
        }

        true
    }

    /// Accept or reject a candidate slot against one rule. Buffer-time rules
    /// never reject here: they need the existing-appointment calendar, which
    /// is the availability checker's job. Rules are composed as a hard AND
    /// filter; the priority field orders evaluation but carries no weight.
    pub fn evaluate(rule: &SchedulingRule, slot: &SchedulingSlot) -> bool {
        if !rule.is_active || rule.rule_type == RuleType::BufferTime {
            return true;
        }

        if !Self::rule_applies(rule, slot) {
            return true;
        }

        if rule.actions.block_booking.unwrap_or(false) {
            debug!("Rule '{}' blocks slot at {} {}", rule.name, slot.date, slot.time);
            return false;
        }

        true
    }

    /// Retain only slots accepted by every active, service-matching rule.
    /// A single rejecting rule removes a slot.
    pub fn apply_scheduling_rules(
        slots: Vec<SchedulingSlot>,
        service_id: Uuid,
        rules: &[SchedulingRule],
    ) -> Vec<SchedulingSlot> {
        let applicable: Vec<&SchedulingRule> = rules
            .iter()
            .filter(|rule| rule.is_active && Self::service_matches(rule, service_id))
            .collect();

        if applicable.is_empty() {
            return slots;
        }

        slots
            .into_iter()
            .filter(|slot| applicable.iter().all(|rule| Self::evaluate(rule, slot)))
            .collect()
    }

    /// A rule with no service condition matches every service.
    pub fn service_matches(rule: &SchedulingRule, service_id: Uuid) -> bool {
        match &rule.conditions.service_ids {
            None => true,
            Some(ids) => ids.contains(&service_id),
        }
    }
}

fn within_range(time: NaiveTime, range: &TimeRange) -> bool {
    time >= range.start && time < range.end
}

/// Seed rules offered to newly onboarded businesses: a standard buffer, a
/// longer cooldown after long services, and a hard lunch block.
pub fn default_rules(business_id: Uuid) -> Vec<SchedulingRule> {
    vec![
        SchedulingRule {
            id: Uuid::new_v4(),
            business_id,
            name: "Standard buffer".to_string(),
            rule_type: RuleType::BufferTime,
            conditions: RuleConditions::default(),
            actions: RuleActions {
                buffer_minutes_before: Some(5),
                buffer_minutes_after: Some(10),
                ..RuleActions::default()
            },
            priority: 10,
            is_active: true,
        },
        SchedulingRule {
            id: Uuid::new_v4(),
            business_id,
            name: "Long service cooldown".to_string(),
            rule_type: RuleType::BufferTime,
            // Scoped to an empty service set until the owner picks the long
            // services this applies to.
            conditions: RuleConditions {
                service_ids: Some(Vec::new()),
                ..RuleConditions::default()
            },
            actions: RuleActions {
                buffer_minutes_after: Some(15),
                ..RuleActions::default()
            },
            priority: 5,
            is_active: true,
        },
        SchedulingRule {
            id: Uuid::new_v4(),
            business_id,
            name: "Lunch block".to_string(),
            rule_type: RuleType::TimeBlock,
            conditions: RuleConditions {
                time_ranges: Some(vec![TimeRange {
                    start: NaiveTime::from_hms_opt(12, 0, 0).expect("valid time"),
                    end: NaiveTime::from_hms_opt(13, 0, 0).expect("valid time"),
                }]),
                ..RuleConditions::default()
            },
            actions: RuleActions {
                block_booking: Some(true),
                ..RuleActions::default()
            },
            priority: 20,
            is_active: true,
        },
    ]
}
