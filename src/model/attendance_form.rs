use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceForm {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Facial Treatment Intake")]
    pub name: String,

    #[schema(example = "Filled before every facial session", nullable = true)]
    pub description: Option<String>,

    #[schema(example = true)]
    pub is_active: bool,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
