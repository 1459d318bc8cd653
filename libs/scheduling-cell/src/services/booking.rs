// libs/scheduling-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::tenant::TenantContext;

use crate::models::{
    Appointment, AppointmentStatus, BookingSource, SchedulingError, SchedulingRule,
    SchedulingSlot, SlotAvailability, SmartBookingRequest, SmartBookingResponse,
};
use crate::services::availability::AvailabilityChecker;
use crate::services::constraints::ConstraintStore;
use crate::services::rules::{default_rules, RuleEngine};
use crate::services::slots::{minute_of_day, time_from_minutes, SlotGenerator};

/// Process-wide booking locks. Keyed by staff id (or business id for
/// unassigned slots) so concurrent bookings for the same calendar serialize
/// even though engine instances are constructed per request.
static BOOKING_LOCKS: OnceLock<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>> = OnceLock::new();

async fn booking_lock(key: Uuid) -> Arc<Mutex<()>> {
    let registry = BOOKING_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = registry.lock().await;
    map.entry(key)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

enum BookOutcome {
    Booked(Appointment),
    SlotTaken,
    WriteFailed,
}

pub struct SmartSchedulingService {
    supabase: Arc<SupabaseClient>,
    constraints: ConstraintStore,
}

impl SmartSchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            constraints: ConstraintStore::new(Arc::clone(&supabase)),
            supabase,
        }
    }

    pub fn constraint_store(&self) -> &ConstraintStore {
        &self.constraints
    }

    /// Open, rule-compliant slots for a service on a date, ranked earliest
    /// first. Candidates are generated per eligible staff member, annotated
    /// against the existing calendar, then narrowed by the active rules.
    pub async fn find_available_slots(
        &self,
        ctx: &TenantContext,
        service_id: Uuid,
        date: NaiveDate,
        duration_override: Option<i32>,
        auth_token: &str,
    ) -> Result<Vec<SchedulingSlot>, SchedulingError> {
        let constraints = self.constraints.load(ctx, auth_token).await?;
        let service = constraints
            .service(service_id)
            .ok_or(SchedulingError::ServiceNotFound(service_id))?;

        let duration = duration_override.unwrap_or(service.duration_minutes);
        if duration <= 0 {
            return Err(SchedulingError::InvalidInput(
                "Duration must be positive".to_string(),
            ));
        }

        let candidates = SlotGenerator::candidate_slots(constraints, service, date, duration);
        debug!("Generated {} candidate slots for {}", candidates.len(), date);

        let open: Vec<SchedulingSlot> = candidates
            .into_iter()
            .filter_map(|mut slot| {
                let availability = AvailabilityChecker::check(
                    constraints,
                    slot.date,
                    slot.time,
                    slot.duration_minutes,
                    slot.staff_id,
                    Some(service_id),
                );
                slot.available = availability.available;
                slot.conflicts = availability.conflicts;
                slot.available.then_some(slot)
            })
            .collect();

        let mut filtered = RuleEngine::apply_scheduling_rules(open, service_id, &constraints.rules);
        SlotGenerator::rank_slots(&mut filtered);

        debug!("{} slots survive rule filtering", filtered.len());
        Ok(filtered)
    }

    /// Exact-slot availability against the cached constraint set.
    pub async fn check_availability(
        &self,
        ctx: &TenantContext,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i32,
        staff_id: Option<Uuid>,
        service_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<SlotAvailability, SchedulingError> {
        let constraints = self.constraints.load(ctx, auth_token).await?;
        Ok(AvailabilityChecker::check(
            constraints,
            date,
            time,
            duration_minutes,
            staff_id,
            service_id,
        ))
    }

    /// Smart booking: try the preferred slot exactly; on any miss, search the
    /// day's alternatives and auto-book the top-ranked one. No surviving
    /// candidate is a normal outcome, not an error.
    pub async fn book_appointment_smart(
        &self,
        ctx: &TenantContext,
        request: SmartBookingRequest,
        auth_token: &str,
    ) -> Result<SmartBookingResponse, SchedulingError> {
        let constraints = self.constraints.load(ctx, auth_token).await?;
        let service = constraints
            .service(request.service_id)
            .ok_or(SchedulingError::ServiceNotFound(request.service_id))?;
        let duration = request.duration_minutes.unwrap_or(service.duration_minutes);
        if duration <= 0 {
            return Err(SchedulingError::InvalidInput(
                "Duration must be positive".to_string(),
            ));
        }

        if let Some(preferred_time) = request.preferred_time {
            let availability = AvailabilityChecker::check(
                constraints,
                request.preferred_date,
                preferred_time,
                duration,
                request.preferred_staff_id,
                Some(request.service_id),
            );

            if availability.available {
                match self
                    .try_book_slot(
                        ctx,
                        &request,
                        request.preferred_date,
                        preferred_time,
                        duration,
                        request.preferred_staff_id,
                        auth_token,
                    )
                    .await?
                {
                    BookOutcome::Booked(appointment) => {
                        info!("Booked preferred slot {} {}", appointment.appointment_date, appointment.start_time);
                        return Ok(SmartBookingResponse::booked(appointment));
                    }
                    // Lost the slot between check and insert: fall through to
                    // the alternative search like any other busy preferred slot.
                    BookOutcome::SlotTaken => {
                        debug!("Preferred slot taken during booking, searching alternatives");
                    }
                    BookOutcome::WriteFailed => {
                        return Ok(SmartBookingResponse::no_availability());
                    }
                }
            } else {
                debug!(
                    "Preferred slot unavailable ({:?}), searching alternatives",
                    availability.conflicts
                );
            }
        }

        let mut candidates = self
            .find_available_slots(
                ctx,
                request.service_id,
                request.preferred_date,
                request.duration_minutes,
                auth_token,
            )
            .await?;

        if candidates.is_empty() {
            info!("No alternative slots for {} on {}", request.service_id, request.preferred_date);
            return Ok(SmartBookingResponse::no_availability());
        }

        let top = candidates.remove(0);
        match self
            .try_book_slot(
                ctx,
                &request,
                top.date,
                top.time,
                top.duration_minutes,
                top.staff_id,
                auth_token,
            )
            .await?
        {
            BookOutcome::Booked(appointment) => {
                info!(
                    "Booked alternative slot {} {} for customer {}",
                    appointment.appointment_date, appointment.start_time, request.customer_id
                );
                Ok(SmartBookingResponse::booked(appointment))
            }
            // The caller has committed to this slot; no second fallback.
            BookOutcome::SlotTaken | BookOutcome::WriteFailed => {
                Ok(SmartBookingResponse::no_availability())
            }
        }
    }

    /// Seed the illustrative default rules for a newly onboarded business.
    pub async fn seed_default_rules(
        &self,
        ctx: &TenantContext,
        auth_token: &str,
    ) -> Result<Vec<SchedulingRule>, SchedulingError> {
        let rules = default_rules(ctx.business_id);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/scheduling_rules",
                Some(auth_token),
                Some(json!(rules)),
                Some(headers),
            )
            .await
            .map_err(|e| SchedulingError::WriteFailure(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::WriteFailure(
                "Failed to seed scheduling rules".to_string(),
            ));
        }

        info!("Seeded {} default rules for business {}", rules.len(), ctx.business_id);
        Ok(rules)
    }

    /// Serialize on the target calendar, re-check the slot against fresh
    /// appointment rows, then insert. The cached constraint set may be stale,
    /// so the re-check always goes to the store.
    async fn try_book_slot(
        &self,
        ctx: &TenantContext,
        request: &SmartBookingRequest,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i32,
        staff_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<BookOutcome, SchedulingError> {
        let constraints = self.constraints.load(ctx, auth_token).await?;

        let lock = booking_lock(staff_id.unwrap_or(ctx.business_id)).await;
        let _guard = lock.lock().await;

        let fresh = self
            .constraints
            .appointments_for_date(ctx, date, auth_token)
            .await?;
        let mut recheck = constraints.clone();
        recheck.appointments = fresh;

        let availability = AvailabilityChecker::check(
            &recheck,
            date,
            time,
            duration_minutes,
            staff_id,
            Some(request.service_id),
        );
        if !availability.available {
            warn!(
                "Slot {} {} lost before insert: {:?}",
                date, time, availability.conflicts
            );
            return Ok(BookOutcome::SlotTaken);
        }

        match self
            .create_appointment(ctx, request, date, time, duration_minutes, staff_id, auth_token)
            .await
        {
            Ok(appointment) => Ok(BookOutcome::Booked(appointment)),
            Err(e) => {
                warn!("Appointment insert failed for {} {}: {}", date, time, e);
                Ok(BookOutcome::WriteFailed)
            }
        }
    }

    async fn create_appointment(
        &self,
        ctx: &TenantContext,
        request: &SmartBookingRequest,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i32,
        staff_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let end_time = time_from_minutes(minute_of_day(time) + duration_minutes as i64)
            .ok_or_else(|| {
                SchedulingError::InvalidInput("Appointment end crosses midnight".to_string())
            })?;
        let now = Utc::now();

        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "business_id": ctx.business_id,
            "customer_id": request.customer_id,
            "service_id": request.service_id,
            "staff_id": staff_id,
            "appointment_date": date,
            "start_time": time,
            "end_time": end_time,
            "duration_minutes": duration_minutes,
            "status": AppointmentStatus::Confirmed.to_string(),
            "booking_source": BookingSource::SmartScheduling.to_string(),
            "notes": request.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| SchedulingError::WriteFailure(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::WriteFailure(
                "Failed to create appointment".to_string(),
            ));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| {
                SchedulingError::WriteFailure(format!("Failed to parse created appointment: {}", e))
            })?;

        Ok(appointment)
    }
}
