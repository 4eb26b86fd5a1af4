use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Open,
    Completed,
    Canceled,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 2)]
    pub client_id: u64,
    #[schema(example = 3)]
    pub user_id: u64,
    #[schema(example = 1)]
    pub form_id: u64,
    /// Answers keyed by field label, snapshot of the form at fill time
    pub responses: serde_json::Value,
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...", nullable = true)]
    pub signature: Option<String>,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(example = "open")]
    pub status: String,
    #[schema(example = "2026-01-05T14:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2026-01-05T15:10:00Z", value_type = Option<String>, format = "date-time", nullable = true)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in [
            AttendanceStatus::Open,
            AttendanceStatus::Completed,
            AttendanceStatus::Canceled,
        ] {
            assert_eq!(
                AttendanceStatus::from_str(&status.to_string()).unwrap(),
                status
            );
        }
        assert!(AttendanceStatus::from_str("archived").is_err());
    }
}
