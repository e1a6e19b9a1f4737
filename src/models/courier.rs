use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: u64,
    pub name: String,
    pub phone: Option<String>,
    /// Credential hash produced by the auth layer; opaque to dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}
