use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit tenant context for a single request. The business id is always
/// threaded through data-access calls as a parameter, never read from
/// ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub business_id: Uuid,
}

impl TenantContext {
    pub fn new(business_id: Uuid) -> Self {
        Self { business_id }
    }
}
