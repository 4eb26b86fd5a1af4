use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One survey per completed attendance. `score`/`submitted_at` stay NULL
/// until the client follows the token link and rates the service.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct NpsSurvey {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 42)]
    pub attendance_id: u64,

    #[schema(example = "d3b1f3f0-6f4e-4b9e-8a52-0e6a4f6d2c11")]
    pub token: String,

    #[schema(example = 9, nullable = true)]
    pub score: Option<u8>,

    #[schema(example = "Loved the service", nullable = true)]
    pub comment: Option<String>,

    #[schema(example = "2026-01-05T15:10:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(example = "2026-01-06T09:00:00Z", value_type = Option<String>, format = "date-time", nullable = true)]
    pub submitted_at: Option<DateTime<Utc>>,
}
