// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, NaiveTime};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::tenant::TenantContext;

use crate::models::{SchedulingError, SmartBookingRequest};
use crate::services::booking::SmartSchedulingService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub staff_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
}

fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::DataUnavailable(msg) => AppError::ExternalService(msg),
        SchedulingError::ServiceNotFound(id) => {
            AppError::NotFound(format!("Service {} not found", id))
        }
        SchedulingError::InvalidInput(msg) => AppError::ValidationError(msg),
        SchedulingError::WriteFailure(msg) => AppError::Internal(msg),
    }
}

// ==============================================================================
// HANDLERS
// ==============================================================================

/// Ranked open slots for a service on a date.
#[axum::debug_handler]
pub async fn find_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
    Query(params): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let ctx = TenantContext::new(business_id);
    let service = SmartSchedulingService::new(&state);

    let slots = service
        .find_available_slots(
            &ctx,
            params.service_id,
            params.date,
            params.duration_minutes,
            auth.token(),
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "date": params.date,
        "count": slots.len(),
        "slots": slots
    })))
}

/// Exact-slot availability with structured conflict reasons.
#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
    Query(params): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    if params.duration_minutes <= 0 {
        return Err(AppError::ValidationError(
            "duration_minutes must be positive".to_string(),
        ));
    }

    let ctx = TenantContext::new(business_id);
    let service = SmartSchedulingService::new(&state);

    let availability = service
        .check_availability(
            &ctx,
            params.date,
            params.time,
            params.duration_minutes,
            params.staff_id,
            params.service_id,
            auth.token(),
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "available": availability.available,
        "conflicts": availability.conflicts
    })))
}

/// Smart booking: exact slot if free, otherwise auto-book the best
/// alternative on the requested date.
#[axum::debug_handler]
pub async fn smart_book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
    Json(request): Json<SmartBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = TenantContext::new(business_id);
    let service = SmartSchedulingService::new(&state);

    let response = service
        .book_appointment_smart(&ctx, request, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!(response)))
}

/// Seed the default scheduling rules for a new business.
#[axum::debug_handler]
pub async fn seed_default_rules(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ctx = TenantContext::new(business_id);
    let service = SmartSchedulingService::new(&state);

    let rules = service
        .seed_default_rules(&ctx, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "seeded": rules.len(),
        "rules": rules
    })))
}
