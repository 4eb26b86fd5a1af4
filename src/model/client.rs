use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Ana Lima",
        "cpf": "52998224725",
        "phone": "+5511912345678",
        "email": "ana.lima@example.com",
        "birth_date": "1990-04-12",
        "notes": "Prefers afternoon slots",
        "is_active": true,
        "created_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct Client {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Ana Lima")]
    pub name: String,

    /// Digits only, check digits verified on write
    #[schema(example = "52998224725")]
    pub cpf: String,

    #[schema(example = "+5511912345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "ana.lima@example.com", nullable = true)]
    pub email: Option<String>,

    #[schema(example = "1990-04-12", value_type = String, format = "date", nullable = true)]
    pub birth_date: Option<NaiveDate>,

    #[schema(nullable = true)]
    pub notes: Option<String>,

    #[schema(example = true)]
    pub is_active: bool,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
