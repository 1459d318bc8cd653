// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// One weekday row of a business's operating hours. Day 0 is Sunday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHours {
    pub id: Uuid,
    pub business_id: Uuid,
    pub day_of_week: u32,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub is_closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub business_id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub schedule: StaffSchedule,
}

/// Schedule blob stored on the staff profile. The engine only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffSchedule {
    #[serde(default)]
    pub available_times: Vec<String>,
    #[serde(default)]
    pub unavailable_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub business_id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub booking_source: BookingSource,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Pending,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    SmartScheduling,
    Online,
    Phone,
    WalkIn,
}

impl fmt::Display for BookingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingSource::SmartScheduling => write!(f, "smart_scheduling"),
            BookingSource::Online => write!(f, "online"),
            BookingSource::Phone => write!(f, "phone"),
            BookingSource::WalkIn => write!(f, "walk_in"),
        }
    }
}

// ==============================================================================
// SCHEDULING RULE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingRule {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub rule_type: RuleType,
    #[serde(default)]
    pub conditions: RuleConditions,
    #[serde(default)]
    pub actions: RuleActions,
    pub priority: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    BufferTime,
    StaffPreference,
    ServiceConstraint,
    TimeBlock,
    CapacityLimit,
}

/// All defined conditions must match for a rule's actions to apply to a
/// candidate slot; a non-matching condition exempts the slot from the rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConditions {
    pub service_ids: Option<Vec<Uuid>>,
    pub staff_ids: Option<Vec<Uuid>>,
    pub days_of_week: Option<Vec<u32>>,
    pub time_ranges: Option<Vec<TimeRange>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleActions {
    pub buffer_minutes_before: Option<i32>,
    pub buffer_minutes_after: Option<i32>,
    pub block_booking: Option<bool>,
    pub max_concurrent: Option<i32>,
    pub preferred_staff_ids: Option<Vec<Uuid>>,
}

// ==============================================================================
// DERIVED SLOT MODELS (never persisted)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub staff_id: Option<Uuid>,
    pub service_id: Uuid,
    pub available: bool,
    #[serde(default)]
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub available: bool,
    pub conflicts: Vec<String>,
}

// ==============================================================================
// CONSTRAINT SET
// ==============================================================================

/// Everything the engine needs to answer availability queries for one tenant,
/// loaded once per store instance. Business hours are keyed by weekday 0-6.
#[derive(Debug, Clone)]
pub struct ScheduleConstraints {
    pub business_hours: std::collections::HashMap<u32, BusinessHours>,
    pub staff: Vec<StaffMember>,
    pub appointments: Vec<Appointment>,
    pub rules: Vec<SchedulingRule>,
    pub services: Vec<Service>,
}

impl ScheduleConstraints {
    pub fn hours_for(&self, date: NaiveDate) -> Option<&BusinessHours> {
        use chrono::Datelike;
        self.business_hours.get(&date.weekday().num_days_from_sunday())
    }

    pub fn service(&self, service_id: Uuid) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartBookingRequest {
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub preferred_date: NaiveDate,
    pub preferred_time: Option<NaiveTime>,
    pub preferred_staff_id: Option<Uuid>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartBookingResponse {
    pub success: bool,
    pub appointment: Option<Appointment>,
    pub alternatives: Vec<SchedulingSlot>,
}

impl SmartBookingResponse {
    pub fn booked(appointment: Appointment) -> Self {
        Self {
            success: true,
            appointment: Some(appointment),
            alternatives: Vec::new(),
        }
    }

    pub fn no_availability() -> Self {
        Self {
            success: false,
            appointment: None,
            alternatives: Vec::new(),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Scheduling data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("Invalid scheduling input: {0}")]
    InvalidInput(String),

    #[error("Appointment write failed: {0}")]
    WriteFailure(String),
}
