use crate::{
    auth::auth::AuthUser,
    form_engine::{FieldDef, FieldError, FieldType, validate_definitions},
    model::{attendance_form::AttendanceForm, form_field::FormFieldRow},
    utils::db_utils::{FilterValue, build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: &[&str] = &["name", "description", "is_active"];

/// One field as it arrives from the form builder. `field_type` stays a
/// string here so a typo yields a per-field error instead of a serde reject.
#[derive(Deserialize, ToSchema)]
pub struct FieldInput {
    #[schema(example = "Skin type")]
    pub label: String,
    #[schema(example = "select")]
    pub field_type: String,
    #[schema(example = json!(["oily", "dry", "combination"]))]
    pub options: Option<Vec<String>>,
    #[schema(example = true)]
    pub required: Option<bool>,
}

impl FieldInput {
    fn to_def(&self) -> Result<FieldDef, FieldError> {
        let field_type = FieldType::from_str(self.field_type.trim().to_lowercase().as_str())
            .map_err(|_| FieldError {
                field: self.label.clone(),
                message: format!("unknown field type '{}'", self.field_type),
            })?;

        Ok(FieldDef {
            label: self.label.clone(),
            field_type,
            options: self.options.clone().unwrap_or_default(),
            required: self.required.unwrap_or(false),
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateForm {
    #[schema(example = "Facial Treatment Intake")]
    pub name: String,
    #[schema(example = "Filled before every facial session")]
    pub description: Option<String>,
    #[schema(example = true)]
    pub is_active: Option<bool>,
    pub fields: Vec<FieldInput>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct FormQuery {
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 20)]
    /// Items per page
    pub per_page: Option<u32>,
    /// Search by form name
    pub search: Option<String>,
    /// Filter by active flag
    pub is_active: Option<bool>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct FormSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Facial Treatment Intake")]
    pub name: String,
    #[schema(example = "Filled before every facial session", nullable = true)]
    pub description: Option<String>,
    #[schema(example = true)]
    pub is_active: bool,
    #[schema(example = 5)]
    pub field_count: i64,
    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct FormListResponse {
    pub data: Vec<FormSummary>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct FormDetail {
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
    /// Fields in render order
    pub fields: Vec<FormFieldRow>,
}

/// Turn builder input into engine definitions, or a 400 with one entry
/// per broken field.
fn parse_field_inputs(inputs: &[FieldInput]) -> Result<Vec<FieldDef>, Vec<FieldError>> {
    let mut defs = Vec::with_capacity(inputs.len());
    let mut errors = Vec::new();

    for input in inputs {
        match input.to_def() {
            Ok(def) => defs.push(def),
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    validate_definitions(&defs)?;
    Ok(defs)
}

async fn insert_fields(
    tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
    form_id: u64,
    defs: &[FieldDef],
) -> Result<(), sqlx::Error> {
    for (position, def) in defs.iter().enumerate() {
        let options = def
            .field_type
            .takes_options()
            .then(|| json!(def.options));

        sqlx::query(
            r#"
            INSERT INTO form_fields (form_id, label, field_type, options, required, position)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(form_id)
        .bind(def.label.trim())
        .bind(def.field_type.to_string())
        .bind(options)
        .bind(def.required)
        .bind(position as u32)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Create Form with its fields (admin)
#[utoipa::path(
    post,
    path = "/api/v1/forms",
    request_body = CreateForm,
    responses(
        (status = 201, description = "Form created", body = Object, example = json!({
            "message": "Form created successfully",
            "id": 1
        })),
        (status = 400, description = "Invalid form definition", body = Object, example = json!({
            "message": "Form definition is invalid",
            "errors": [ { "field": "Skin type", "message": "choice field needs at least one option" } ]
        })),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Forms",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_form(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateForm>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = payload.name.trim();
    if name.is_empty() || name.len() > 120 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Form name is required (max 120 chars)"
        })));
    }

    let defs = match parse_field_inputs(&payload.fields) {
        Ok(defs) => defs,
        Err(errors) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Form definition is invalid",
                "errors": errors
            })));
        }
    };

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let res = sqlx::query(
        r#"
        INSERT INTO attendance_forms (name, description, is_active)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(payload.description.as_deref())
    .bind(payload.is_active.unwrap_or(true))
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert form");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let form_id = res.last_insert_id();

    insert_fields(&mut tx, form_id, &defs).await.map_err(|e| {
        error!(error = %e, form_id, "Failed to insert form fields");
        ErrorInternalServerError("Internal Server Error")
    })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, form_id, "Failed to commit form");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Form created successfully",
        "id": form_id
    })))
}

/// Paginated form list with field counts
#[utoipa::path(
    get,
    path = "/api/v1/forms",
    params(FormQuery),
    responses(
        (status = 200, description = "Paginated form list", body = FormListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Forms",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_forms(
    pool: web::Data<MySqlPool>,
    query: web::Query<FormQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(is_active) = query.is_active {
        where_sql.push_str(" AND f.is_active = ?");
        args.push(FilterValue::Bool(is_active));
    }

    if let Some(search) = query.search.as_deref() {
        where_sql.push_str(" AND f.name LIKE ?");
        args.push(FilterValue::String(format!("%{}%", search.trim())));
    }

    let count_sql = format!("SELECT COUNT(*) FROM attendance_forms f{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::U8(v) => count_q.bind(*v),
            FilterValue::Bool(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
            FilterValue::String(s) => count_q.bind(s.clone()),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count forms");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT f.id, f.name, f.description, f.is_active,
               COUNT(ff.id) AS field_count, f.created_at
        FROM attendance_forms f
        LEFT JOIN form_fields ff ON ff.form_id = f.id
        {}
        GROUP BY f.id
        ORDER BY f.id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, FormSummary>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::U8(v) => data_q.bind(*v),
            FilterValue::Bool(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(*s),
            FilterValue::String(s) => data_q.bind(s.clone()),
        };
    }

    let forms = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch form list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(FormListResponse {
        data: forms,
        page,
        per_page,
        total,
    }))
}

/// Get Form with ordered fields
#[utoipa::path(
    get,
    path = "/api/v1/forms/{form_id}",
    params(
        ("form_id" = u64, Path, description = "Form ID")
    ),
    responses(
        (status = 200, description = "Form found", body = FormDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Form not found")
    ),
    tag = "Forms",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_form(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let form_id = path.into_inner();

    let form = sqlx::query_as::<_, AttendanceForm>(
        r#"
        SELECT id, name, description, is_active, created_at
        FROM attendance_forms
        WHERE id = ?
        "#,
    )
    .bind(form_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, form_id, "Failed to fetch form");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(form) = form else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Form not found"
        })));
    };

    let fields = sqlx::query_as::<_, FormFieldRow>(
        r#"
        SELECT id, form_id, label, field_type, options, required, position
        FROM form_fields
        WHERE form_id = ?
        ORDER BY position ASC, id ASC
        "#,
    )
    .bind(form_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, form_id, "Failed to fetch form fields");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(FormDetail {
        id: form.id,
        name: form.name,
        description: form.description,
        is_active: form.is_active,
        created_at: form.created_at,
        fields,
    }))
}

/// Update Form (admin, partial; `fields` replaces the whole field set)
#[utoipa::path(
    put,
    path = "/api/v1/forms/{form_id}",
    params(
        ("form_id" = u64, Path, description = "Form ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Form updated successfully"),
        (status = 400, description = "Invalid payload or field definitions"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Form not found")
    ),
    tag = "Forms",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_form(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let form_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM attendance_forms WHERE id = ? LIMIT 1)",
    )
    .bind(form_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, form_id, "Failed to check form");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if !exists {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Form not found"
        })));
    }

    if let Some(name) = body.get("name") {
        match name.as_str() {
            Some(n) if !n.trim().is_empty() && n.trim().len() <= 120 => {}
            _ => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "Form name is required (max 120 chars)"
                })));
            }
        }
    }

    // `fields` is handled apart from the scalar columns: when present, the
    // stored field set is replaced wholesale. Existing attendances keep their
    // responses as-is; they were validated against the form as it was then.
    let new_defs = match body.get("fields") {
        None => None,
        Some(raw) => {
            let inputs: Vec<FieldInput> = match serde_json::from_value(raw.clone()) {
                Ok(inputs) => inputs,
                Err(_) => {
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": "fields must be an array of field definitions"
                    })));
                }
            };

            match parse_field_inputs(&inputs) {
                Ok(defs) => Some(defs),
                Err(errors) => {
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": "Form definition is invalid",
                        "errors": errors
                    })));
                }
            }
        }
    };

    let mut scalars = body
        .as_object()
        .cloned()
        .unwrap_or_default();
    scalars.remove("fields");

    if scalars.is_empty() && new_defs.is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No fields provided for update"
        })));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, form_id, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if !scalars.is_empty() {
        let update = build_update_sql(
            "attendance_forms",
            &Value::Object(scalars),
            UPDATABLE,
            "id",
            form_id,
        )?;

        execute_update(&mut *tx, update).await.map_err(|e| {
            error!(error = %e, form_id, "Failed to update form");
            ErrorInternalServerError("Internal Server Error")
        })?;
    }

    if let Some(defs) = new_defs {
        sqlx::query("DELETE FROM form_fields WHERE form_id = ?")
            .bind(form_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, form_id, "Failed to clear form fields");
                ErrorInternalServerError("Internal Server Error")
            })?;

        insert_fields(&mut tx, form_id, &defs).await.map_err(|e| {
            error!(error = %e, form_id, "Failed to insert form fields");
            ErrorInternalServerError("Internal Server Error")
        })?;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, form_id, "Failed to commit form update");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Form updated successfully"
    })))
}

/// Delete Form (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/forms/{form_id}",
    params(
        ("form_id" = u64, Path, description = "Form ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Form not found"),
        (status = 409, description = "Form has attendance records")
    ),
    tag = "Forms",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_form(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let form_id = path.into_inner();

    let result = sqlx::query("DELETE FROM attendance_forms WHERE id = ?")
        .bind(form_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Form not found"
                })));
            }

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }

        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Form has attendance records"
                    })));
                }
            }

            error!(error = %e, form_id, "Failed to delete form");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
