use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Listing/detail row. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserRow {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "maria.admin")]
    pub username: String,

    #[schema(example = "Maria Souza")]
    pub full_name: String,

    #[schema(example = 1)]
    pub role_id: u8,

    #[schema(example = true)]
    pub is_active: bool,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time", nullable = true)]
    pub last_login_at: Option<DateTime<Utc>>,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
