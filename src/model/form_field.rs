use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raw field row; `field_type` and `options` stay DB-shaped here and are
/// parsed into typed definitions by the form engine.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct FormFieldRow {
    #[schema(example = 7)]
    pub id: u64,
    pub form_id: u64,
    pub label: String,
    pub field_type: String,
    pub options: Option<serde_json::Value>,
    pub required: bool,
    pub position: u32,
}
