use crate::{
    auth::auth::AuthUser,
    form_engine::{FieldDef, validate_responses},
    model::{attendance::Attendance, attendance::AttendanceStatus, form_field::FormFieldRow},
    utils::db_utils::FilterValue,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Signatures arrive as canvas exports; anything above this is not a
/// signature, it is someone uploading a photo album.
const MAX_SIGNATURE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Deserialize, ToSchema)]
pub struct CreateAttendance {
    #[schema(example = 2)]
    pub client_id: u64,
    #[schema(example = 1)]
    pub form_id: u64,
    /// Answers keyed by field label
    #[schema(example = json!({ "Skin type": "oily", "Session notes": "first visit" }))]
    pub responses: Value,
    #[schema(example = "arrived 10 min late", nullable = true)]
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendance {
    /// Full replacement for the stored answers
    pub responses: Option<Value>,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteAttendance {
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub signature: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 20)]
    /// Items per page
    pub per_page: Option<u32>,
    /// Filter by client
    pub client_id: Option<u64>,
    /// Filter by attending user
    pub user_id: Option<u64>,
    /// Filter by form
    pub form_id: Option<u64>,
    #[schema(example = "open")]
    /// Filter by status (open, completed, canceled)
    pub status: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 2)]
    pub client_id: u64,
    #[schema(example = "Maria Silva")]
    pub client_name: String,
    #[schema(example = 3)]
    pub user_id: u64,
    #[schema(example = "João Pereira")]
    pub attendant_name: String,
    #[schema(example = 1)]
    pub form_id: u64,
    #[schema(example = "Facial Treatment Intake")]
    pub form_name: String,
    #[schema(example = "open")]
    pub status: String,
    #[schema(example = "2026-01-05T14:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2026-01-05T15:10:00Z", value_type = Option<String>, format = "date-time", nullable = true)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceSummary>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 12)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceDetail {
    #[serde(flatten)]
    #[schema(inline)]
    pub record: Attendance,
    #[schema(example = "Maria Silva")]
    pub client_name: String,
    #[schema(example = "João Pereira")]
    pub attendant_name: String,
    #[schema(example = "Facial Treatment Intake")]
    pub form_name: String,
}

fn is_signature_data_url(signature: &str) -> bool {
    if signature.len() > MAX_SIGNATURE_BYTES {
        return false;
    }

    let Some(rest) = signature.strip_prefix("data:image/") else {
        return false;
    };
    let Some((mime, payload)) = rest.split_once(";base64,") else {
        return false;
    };

    !mime.is_empty()
        && !payload.is_empty()
        && payload
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

/// Load a form's field definitions for response validation. Rows were
/// validated when stored, so a parse failure is a data problem, not user error.
async fn load_form_defs(
    pool: &MySqlPool,
    form_id: u64,
) -> Result<Vec<FieldDef>, actix_web::Error> {
    let rows = sqlx::query_as::<_, FormFieldRow>(
        r#"
        SELECT id, form_id, label, field_type, options, required, position
        FROM form_fields
        WHERE form_id = ?
        ORDER BY position ASC, id ASC
        "#,
    )
    .bind(form_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, form_id, "Failed to fetch form fields");
        ErrorInternalServerError("Internal Server Error")
    })?;

    rows.iter()
        .map(FieldDef::from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            error!(form_id, reason = %e, "Stored form definition is corrupt");
            ErrorInternalServerError("Internal Server Error")
        })
}

/// WHERE clause for the list endpoint. Unknown status values are rejected
/// here, before they reach the SQL text.
fn list_filters(query: &AttendanceQuery) -> Result<(String, Vec<FilterValue<'_>>), &'static str> {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(client_id) = query.client_id {
        where_sql.push_str(" AND a.client_id = ?");
        args.push(FilterValue::U64(client_id));
    }

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND a.user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(form_id) = query.form_id {
        where_sql.push_str(" AND a.form_id = ?");
        args.push(FilterValue::U64(form_id));
    }

    if let Some(status) = query.status.as_deref() {
        if AttendanceStatus::from_str(status).is_err() {
            return Err("Invalid status. Allowed: open, completed, canceled");
        }
        where_sql.push_str(" AND a.status = ?");
        args.push(FilterValue::Str(status));
    }

    Ok((where_sql, args))
}

/// Writes that only make sense on an open attendance carry the status in
/// the WHERE clause, so a racing transition loses with zero affected rows
/// instead of overwriting a terminal state.
fn guarded_open_update(set_clause: &str) -> String {
    format!(
        "UPDATE attendances SET {} WHERE id = ? AND status = '{}'",
        set_clause,
        AttendanceStatus::Open
    )
}

/// Start Attendance
#[utoipa::path(
    post,
    path = "/api/v1/attendances",
    request_body = CreateAttendance,
    responses(
        (status = 201, description = "Attendance opened", body = Object, example = json!({
            "message": "Attendance created successfully",
            "id": 10
        })),
        (status = 400, description = "Inactive client/form or invalid responses"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Client or form not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendances",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAttendance>,
) -> actix_web::Result<impl Responder> {
    let client_active =
        sqlx::query_scalar::<_, bool>("SELECT is_active FROM clients WHERE id = ?")
            .bind(payload.client_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, client_id = payload.client_id, "Failed to check client");
                ErrorInternalServerError("Internal Server Error")
            })?;

    match client_active {
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Client not found"
            })));
        }
        Some(false) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Client is inactive"
            })));
        }
        Some(true) => {}
    }

    let form_active =
        sqlx::query_scalar::<_, bool>("SELECT is_active FROM attendance_forms WHERE id = ?")
            .bind(payload.form_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, form_id = payload.form_id, "Failed to check form");
                ErrorInternalServerError("Internal Server Error")
            })?;

    match form_active {
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Form not found"
            })));
        }
        Some(false) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Form is inactive"
            })));
        }
        Some(true) => {}
    }

    let defs = load_form_defs(pool.get_ref(), payload.form_id).await?;

    if let Err(errors) = validate_responses(&defs, &payload.responses) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Responses failed validation",
            "errors": errors
        })));
    }

    let res = sqlx::query(
        r#"
        INSERT INTO attendances (client_id, user_id, form_id, responses, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.client_id)
    .bind(auth.user_id)
    .bind(payload.form_id)
    .bind(payload.responses.clone())
    .bind(payload.notes.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert attendance");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Attendance created successfully",
        "id": res.last_insert_id()
    })))
}

/// Paginated attendance list with display names
#[utoipa::path(
    get,
    path = "/api/v1/attendances",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Attendances",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_attendances(
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let (where_sql, args) = match list_filters(&query) {
        Ok(filters) => filters,
        Err(message) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": message
            })));
        }
    };

    let count_sql = format!("SELECT COUNT(*) FROM attendances a{}", where_sql);

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
        error!(error = %e, "Failed to count attendances");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT a.id, a.client_id, c.name AS client_name,
               a.user_id, u.full_name AS attendant_name,
               a.form_id, f.name AS form_name,
               a.status, a.created_at, a.completed_at
        FROM attendances a
        JOIN clients c ON c.id = a.client_id
        JOIN users u ON u.id = a.user_id
        JOIN attendance_forms f ON f.id = a.form_id
        {}
        ORDER BY a.id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, AttendanceSummary>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::U8(v) => data_q.bind(*v),
            FilterValue::Bool(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(*s),
            FilterValue::String(s) => data_q.bind(s.clone()),
        };
    }

    let records = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data: records,
        page,
        per_page,
        total,
    }))
}

/// Get Attendance by ID
#[utoipa::path(
    get,
    path = "/api/v1/attendances/{attendance_id}",
    params(
        ("attendance_id" = u64, Path, description = "Attendance ID")
    ),
    responses(
        (status = 200, description = "Attendance found", body = AttendanceDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance not found")
    ),
    tag = "Attendances",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_attendance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let attendance_id = path.into_inner();

    let record = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, client_id, user_id, form_id, responses, signature,
               notes, status, created_at, completed_at
        FROM attendances
        WHERE id = ?
        "#,
    )
    .bind(attendance_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, attendance_id, "Failed to fetch attendance");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(record) = record else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance not found"
        })));
    };

    let names = sqlx::query_as::<_, (String, String, String)>(
        r#"
        SELECT c.name, u.full_name, f.name
        FROM attendances a
        JOIN clients c ON c.id = a.client_id
        JOIN users u ON u.id = a.user_id
        JOIN attendance_forms f ON f.id = a.form_id
        WHERE a.id = ?
        "#,
    )
    .bind(attendance_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, attendance_id, "Failed to fetch attendance names");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(AttendanceDetail {
        record,
        client_name: names.0,
        attendant_name: names.1,
        form_name: names.2,
    }))
}

/// Update Attendance while open
#[utoipa::path(
    put,
    path = "/api/v1/attendances/{attendance_id}",
    params(
        ("attendance_id" = u64, Path, description = "Attendance ID")
    ),
    request_body = UpdateAttendance,
    responses(
        (status = 200, description = "Attendance updated successfully"),
        (status = 400, description = "Not open, empty payload or invalid responses"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance not found")
    ),
    tag = "Attendances",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_attendance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateAttendance>,
) -> actix_web::Result<impl Responder> {
    let attendance_id = path.into_inner();

    if payload.responses.is_none() && payload.notes.is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No fields provided for update"
        })));
    }

    let current = sqlx::query_as::<_, (String, u64)>(
        "SELECT status, form_id FROM attendances WHERE id = ?",
    )
    .bind(attendance_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, attendance_id, "Failed to fetch attendance");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((status, form_id)) = current else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance not found"
        })));
    };

    if status != AttendanceStatus::Open.to_string() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Only open attendances can be edited"
        })));
    }

    if let Some(responses) = &payload.responses {
        let defs = load_form_defs(pool.get_ref(), form_id).await?;

        if let Err(errors) = validate_responses(&defs, responses) {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Responses failed validation",
                "errors": errors
            })));
        }
    }

    let result = match (&payload.responses, &payload.notes) {
        (Some(responses), Some(notes)) => {
            let sql = guarded_open_update("responses = ?, notes = ?");
            sqlx::query(&sql)
                .bind(responses.clone())
                .bind(notes)
                .bind(attendance_id)
                .execute(pool.get_ref())
                .await
        }
        (Some(responses), None) => {
            let sql = guarded_open_update("responses = ?");
            sqlx::query(&sql)
                .bind(responses.clone())
                .bind(attendance_id)
                .execute(pool.get_ref())
                .await
        }
        (None, Some(notes)) => {
            let sql = guarded_open_update("notes = ?");
            sqlx::query(&sql)
                .bind(notes)
                .bind(attendance_id)
                .execute(pool.get_ref())
                .await
        }
        (None, None) => unreachable!("rejected above"),
    };

    let result = result.map_err(|e| {
        error!(error = %e, attendance_id, "Failed to update attendance");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        // MySQL reports changed rows, not matched rows, so a same-values
        // rewrite also lands here. Re-read to tell the two apart.
        let status_now = sqlx::query_scalar::<_, String>(
            "SELECT status FROM attendances WHERE id = ?",
        )
        .bind(attendance_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, attendance_id, "Failed to re-check attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;

        match status_now {
            Some(s) if s == AttendanceStatus::Open.to_string() => {}
            Some(_) => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "Only open attendances can be edited"
                })));
            }
            None => {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Attendance not found"
                })));
            }
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance updated successfully"
    })))
}

/// Complete Attendance: signature + full answers → survey token
#[utoipa::path(
    put,
    path = "/api/v1/attendances/{attendance_id}/complete",
    params(
        ("attendance_id" = u64, Path, description = "Attendance ID")
    ),
    request_body = CompleteAttendance,
    responses(
        (status = 200, description = "Attendance completed", body = Object, example = json!({
            "message": "Attendance completed",
            "survey_token": "d3b1f3f0-6f4e-4b9e-8a52-0e6a4f6d2c11"
        })),
        (status = 400, description = "Not open, bad signature or incomplete responses"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance not found")
    ),
    tag = "Attendances",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn complete_attendance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<CompleteAttendance>,
) -> actix_web::Result<impl Responder> {
    let attendance_id = path.into_inner();

    if !is_signature_data_url(&payload.signature) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Signature must be a base64 image data URL"
        })));
    }

    let current = sqlx::query_as::<_, (String, u64, Value)>(
        "SELECT status, form_id, responses FROM attendances WHERE id = ?",
    )
    .bind(attendance_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, attendance_id, "Failed to fetch attendance");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((status, form_id, responses)) = current else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance not found"
        })));
    };

    if status != AttendanceStatus::Open.to_string() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Only open attendances can be completed"
        })));
    }

    // The form may have changed since the attendance was opened, so the
    // stored answers are checked against the form as it is now.
    let defs = load_form_defs(pool.get_ref(), form_id).await?;

    if let Err(errors) = validate_responses(&defs, &responses) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Responses are incomplete",
            "errors": errors
        })));
    }

    let survey_token = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, attendance_id, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let sql = guarded_open_update("status = ?, signature = ?, completed_at = CURRENT_TIMESTAMP");
    let updated = sqlx::query(&sql)
        .bind(AttendanceStatus::Completed.to_string())
        .bind(&payload.signature)
        .bind(attendance_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, attendance_id, "Failed to complete attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if updated.rows_affected() == 0 {
        // Another transition won between the status check and this write.
        // No survey row either; dropping the transaction rolls it back.
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Only open attendances can be completed"
        })));
    }

    sqlx::query("INSERT INTO nps_surveys (attendance_id, token) VALUES (?, ?)")
        .bind(attendance_id)
        .bind(&survey_token)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, attendance_id, "Failed to create survey");
            ErrorInternalServerError("Internal Server Error")
        })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, attendance_id, "Failed to commit completion");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance completed",
        "survey_token": survey_token
    })))
}

/// Cancel Attendance while open
#[utoipa::path(
    put,
    path = "/api/v1/attendances/{attendance_id}/cancel",
    params(
        ("attendance_id" = u64, Path, description = "Attendance ID")
    ),
    responses(
        (status = 200, description = "Attendance canceled"),
        (status = 400, description = "Attendance is not open"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance not found")
    ),
    tag = "Attendances",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn cancel_attendance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let attendance_id = path.into_inner();

    let status = sqlx::query_scalar::<_, String>(
        "SELECT status FROM attendances WHERE id = ?",
    )
    .bind(attendance_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, attendance_id, "Failed to fetch attendance");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(status) = status else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance not found"
        })));
    };

    if status != AttendanceStatus::Open.to_string() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Only open attendances can be canceled"
        })));
    }

    let sql = guarded_open_update("status = ?");
    let result = sqlx::query(&sql)
        .bind(AttendanceStatus::Canceled.to_string())
        .bind(attendance_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, attendance_id, "Failed to cancel attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Only open attendances can be canceled"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance canceled"
    })))
}

/// Delete Attendance (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/attendances/{attendance_id}",
    params(
        ("attendance_id" = u64, Path, description = "Attendance ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance not found")
    ),
    tag = "Attendances",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let attendance_id = path.into_inner();

    let result = sqlx::query("DELETE FROM attendances WHERE id = ?")
        .bind(attendance_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, attendance_id, "Failed to delete attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canvas_style_signature() {
        assert!(is_signature_data_url(
            "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAA+/=="
        ));
        assert!(is_signature_data_url("data:image/jpeg;base64,QUJD"));
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert!(!is_signature_data_url("hello"));
        assert!(!is_signature_data_url("data:text/plain;base64,QUJD"));
        assert!(!is_signature_data_url("data:image/png;base64,"));
        assert!(!is_signature_data_url("data:image/;base64,QUJD"));
    }

    #[test]
    fn rejects_payloads_with_non_base64_bytes() {
        assert!(!is_signature_data_url("data:image/png;base64,QUJD<script>"));
        assert!(!is_signature_data_url("data:image/png;base64,QU JD"));
    }

    #[test]
    fn rejects_oversized_signatures() {
        let huge = format!("data:image/png;base64,{}", "A".repeat(MAX_SIGNATURE_BYTES));
        assert!(!is_signature_data_url(&huge));
    }

    #[test]
    fn open_only_writes_carry_the_status_guard() {
        assert_eq!(
            guarded_open_update("status = ?"),
            "UPDATE attendances SET status = ? WHERE id = ? AND status = 'open'"
        );
        assert_eq!(
            guarded_open_update("responses = ?, notes = ?"),
            "UPDATE attendances SET responses = ?, notes = ? WHERE id = ? AND status = 'open'"
        );
    }

    fn filter_query(status: Option<&str>) -> AttendanceQuery {
        AttendanceQuery {
            page: None,
            per_page: None,
            client_id: None,
            user_id: None,
            form_id: None,
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn status_filter_binds_the_raw_term() {
        let query = filter_query(Some("completed"));
        let (where_sql, args) = list_filters(&query).unwrap();

        assert!(where_sql.ends_with(" AND a.status = ?"));
        assert!(matches!(args.as_slice(), [FilterValue::Str("completed")]));
    }

    #[test]
    fn unknown_status_filter_is_rejected() {
        assert!(list_filters(&filter_query(Some("archived"))).is_err());
    }

    #[test]
    fn id_filters_combine_in_order() {
        let mut query = filter_query(Some("open"));
        query.client_id = Some(7);
        query.form_id = Some(2);

        let (where_sql, args) = list_filters(&query).unwrap();
        assert_eq!(
            where_sql,
            " WHERE 1=1 AND a.client_id = ? AND a.form_id = ? AND a.status = ?"
        );
        assert!(matches!(
            args.as_slice(),
            [FilterValue::U64(7), FilterValue::U64(2), FilterValue::Str("open")]
        ));
    }
}
