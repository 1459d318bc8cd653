use std::env;

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub business_type: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            business_type: env::var("BUSINESS_TYPE")
                .unwrap_or_else(|_| "beauty_salon".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    /// Resolve the capability set for this deployment's business type.
    /// Resolved once at startup and passed down explicitly; call sites must
    /// never re-read the process environment for feature decisions.
    pub fn features(&self) -> BusinessFeatures {
        BusinessFeatures::for_business_type(&self.business_type)
    }
}

/// Capability set keyed by tenant business type. The scheduling engine itself
/// is always on; the flags gate the optional add-on surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessFeatures {
    pub business_type: String,
    pub smart_scheduling: bool,
    pub lead_generation: bool,
    pub voice_receptionist: bool,
    pub email_campaigns: bool,
}

impl BusinessFeatures {
    pub fn for_business_type(business_type: &str) -> Self {
        let (lead_generation, voice_receptionist, email_campaigns) = match business_type {
            "beauty_salon" | "barbershop" | "nail_salon" => (true, true, true),
            "spa" | "wellness" => (false, true, true),
            _ => (false, false, true),
        };

        Self {
            business_type: business_type.to_string(),
            smart_scheduling: true,
            lead_generation,
            voice_receptionist,
            email_campaigns,
        }
    }
}
