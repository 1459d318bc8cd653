// libs/scheduling-cell/src/services/constraints.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use shared_database::supabase::SupabaseClient;
use shared_models::tenant::TenantContext;

use crate::models::{
    Appointment, BusinessHours, ScheduleConstraints, SchedulingError, SchedulingRule, Service,
    StaffMember,
};

/// Existing appointments are loaded this many days forward for conflict
/// checking.
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 30;

/// Loads and caches a tenant's scheduling inputs. The cache lives for the
/// store instance's lifetime with no invalidation: construct a fresh store to
/// observe new data.
pub struct ConstraintStore {
    supabase: Arc<SupabaseClient>,
    lookahead_days: i64,
    cache: OnceCell<ScheduleConstraints>,
}

impl ConstraintStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self::with_lookahead(supabase, DEFAULT_LOOKAHEAD_DAYS)
    }

    pub fn with_lookahead(supabase: Arc<SupabaseClient>, lookahead_days: i64) -> Self {
        Self {
            supabase,
            lookahead_days,
            cache: OnceCell::new(),
        }
    }

    /// Load the full constraint set for the tenant, fetching on first call
    /// and serving the cached copy afterwards. Callers must not proceed to
    /// slot generation when this fails.
    pub async fn load(
        &self,
        ctx: &TenantContext,
        auth_token: &str,
    ) -> Result<&ScheduleConstraints, SchedulingError> {
        self.cache
            .get_or_try_init(|| self.fetch_all(ctx, auth_token))
            .await
    }

    async fn fetch_all(
        &self,
        ctx: &TenantContext,
        auth_token: &str,
    ) -> Result<ScheduleConstraints, SchedulingError> {
        debug!("Loading scheduling constraints for business {}", ctx.business_id);

        let business_hours = self.fetch_business_hours(ctx, auth_token).await?;
        let staff = self.fetch_staff(ctx, auth_token).await?;
        let appointments = self.fetch_appointments(ctx, auth_token).await?;
        let rules = self.fetch_rules(ctx, auth_token).await?;
        let services = self.fetch_services(ctx, auth_token).await?;

        debug!(
            "Loaded constraints: {} hour rows, {} staff, {} appointments, {} rules, {} services",
            business_hours.len(),
            staff.len(),
            appointments.len(),
            rules.len(),
            services.len()
        );

        Ok(ScheduleConstraints {
            business_hours,
            staff,
            appointments,
            rules,
            services,
        })
    }

    async fn fetch_business_hours(
        &self,
        ctx: &TenantContext,
        auth_token: &str,
    ) -> Result<HashMap<u32, BusinessHours>, SchedulingError> {
        let path = format!(
            "/rest/v1/business_hours?business_id=eq.{}&order=day_of_week.asc",
            ctx.business_id
        );
        let rows: Vec<BusinessHours> = self.fetch(&path, auth_token).await?;

        Ok(rows.into_iter().map(|row| (row.day_of_week, row)).collect())
    }

    async fn fetch_staff(
        &self,
        ctx: &TenantContext,
        auth_token: &str,
    ) -> Result<Vec<StaffMember>, SchedulingError> {
        let path = format!(
            "/rest/v1/staff?business_id=eq.{}&is_active=eq.true",
            ctx.business_id
        );
        self.fetch(&path, auth_token).await
    }

    async fn fetch_appointments(
        &self,
        ctx: &TenantContext,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let today = Utc::now().date_naive();
        let horizon = today + Duration::days(self.lookahead_days);

        let path = format!(
            "/rest/v1/appointments?business_id=eq.{}&appointment_date=gte.{}&appointment_date=lte.{}&status=neq.cancelled&order=appointment_date.asc,start_time.asc",
            ctx.business_id, today, horizon
        );
        self.fetch(&path, auth_token).await
    }

    /// Fresh, cache-bypassing read of one day's non-cancelled appointments.
    /// Used for the final pre-insert availability re-check.
    pub async fn appointments_for_date(
        &self,
        ctx: &TenantContext,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?business_id=eq.{}&appointment_date=eq.{}&status=neq.cancelled&order=start_time.asc",
            ctx.business_id, date
        );
        self.fetch(&path, auth_token).await
    }

    async fn fetch_rules(
        &self,
        ctx: &TenantContext,
        auth_token: &str,
    ) -> Result<Vec<SchedulingRule>, SchedulingError> {
        let path = format!(
            "/rest/v1/scheduling_rules?business_id=eq.{}&is_active=eq.true&order=priority.desc",
            ctx.business_id
        );
        self.fetch(&path, auth_token).await
    }

    async fn fetch_services(
        &self,
        ctx: &TenantContext,
        auth_token: &str,
    ) -> Result<Vec<Service>, SchedulingError> {
        let path = format!("/rest/v1/services?business_id=eq.{}", ctx.business_id);
        self.fetch(&path, auth_token).await
    }

    async fn fetch<T>(&self, path: &str, auth_token: &str) -> Result<T, SchedulingError>
    where
        T: serde::de::DeserializeOwned,
    {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DataUnavailable(e.to_string()))?;

        serde_json::from_value(Value::Array(result))
            .map_err(|e| SchedulingError::DataUnavailable(format!("Failed to parse rows: {}", e)))
    }
}
