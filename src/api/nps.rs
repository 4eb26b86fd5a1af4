use crate::{
    api::notifications,
    auth::auth::AuthUser,
    model::nps::NpsSurvey,
    utils::db_utils::FilterValue,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct SubmitSurvey {
    #[schema(example = 9, minimum = 0, maximum = 10)]
    pub score: u8,
    #[schema(example = "Loved the service", nullable = true)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct NpsQuery {
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 20)]
    /// Items per page
    pub per_page: Option<u32>,
    /// Only surveys the client actually answered
    pub submitted_only: Option<bool>,
    #[schema(example = 9)]
    /// Filter by exact score
    pub score: Option<u8>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct NpsRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[schema(inline)]
    pub survey: NpsSurvey,
    #[schema(example = "Maria Silva")]
    pub client_name: String,
    #[schema(example = "João Pereira")]
    pub attendant_name: String,
    #[schema(example = "Facial Treatment Intake")]
    pub form_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct NpsListResponse {
    pub data: Vec<NpsRow>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 8)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct NpsSummary {
    #[schema(example = 20)]
    pub total: i64,
    #[schema(example = 12)]
    pub submitted: i64,
    #[schema(example = 7)]
    pub promoters: i64,
    #[schema(example = 3)]
    pub passives: i64,
    #[schema(example = 2)]
    pub detractors: i64,
    /// round((promoters − detractors) / submitted × 100)
    #[schema(example = 42)]
    pub score: i64,
}

fn first_name(full: &str) -> &str {
    full.split_whitespace().next().unwrap_or(full)
}

fn nps_score(promoters: i64, detractors: i64, submitted: i64) -> i64 {
    if submitted == 0 {
        return 0;
    }
    (((promoters - detractors) as f64 / submitted as f64) * 100.0).round() as i64
}

/// Survey context for the rating page (public, token-addressed)
#[utoipa::path(
    get,
    path = "/survey/{token}",
    params(
        ("token" = String, Path, description = "Survey token from the completed attendance")
    ),
    responses(
        (status = 200, description = "Survey context", body = Object, example = json!({
            "client_first_name": "Maria",
            "attended_at": "2026-01-05T15:10:00Z",
            "form_name": "Facial Treatment Intake"
        })),
        (status = 404, description = "Survey not found"),
        (status = 409, description = "Survey already submitted")
    ),
    tag = "NPS"
)]
pub async fn get_survey(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let token = path.into_inner();

    let row = sqlx::query_as::<_, (Option<DateTime<Utc>>, String, Option<DateTime<Utc>>, String)>(
        r#"
        SELECT s.submitted_at, c.name, a.completed_at, f.name
        FROM nps_surveys s
        JOIN attendances a ON a.id = s.attendance_id
        JOIN clients c ON c.id = a.client_id
        JOIN attendance_forms f ON f.id = a.form_id
        WHERE s.token = ?
        "#,
    )
    .bind(&token)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch survey");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((submitted_at, client_name, attended_at, form_name)) = row else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Survey not found"
        })));
    };

    if submitted_at.is_some() {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Survey already submitted"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "client_first_name": first_name(&client_name),
        "attended_at": attended_at,
        "form_name": form_name
    })))
}

/// Submit a rating (public, token-addressed)
#[utoipa::path(
    post,
    path = "/survey/{token}",
    params(
        ("token" = String, Path, description = "Survey token from the completed attendance")
    ),
    request_body = SubmitSurvey,
    responses(
        (status = 200, description = "Rating recorded"),
        (status = 400, description = "Score outside 0..=10"),
        (status = 404, description = "Survey not found"),
        (status = 409, description = "Survey already submitted")
    ),
    tag = "NPS"
)]
pub async fn submit_survey(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<SubmitSurvey>,
) -> actix_web::Result<impl Responder> {
    let token = path.into_inner();

    if payload.score > 10 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Score must be between 0 and 10"
        })));
    }

    let row = sqlx::query_as::<_, (u64, u64, Option<DateTime<Utc>>, u64, String)>(
        r#"
        SELECT s.id, s.attendance_id, s.submitted_at, a.user_id, c.name
        FROM nps_surveys s
        JOIN attendances a ON a.id = s.attendance_id
        JOIN clients c ON c.id = a.client_id
        WHERE s.token = ?
        "#,
    )
    .bind(&token)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch survey");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((survey_id, attendance_id, submitted_at, attendant_id, client_name)) = row else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Survey not found"
        })));
    };

    if submitted_at.is_some() {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Survey already submitted"
        })));
    }

    let comment = payload
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    // The IS NULL guard settles races: the second submit changes no rows.
    let result = sqlx::query(
        r#"
        UPDATE nps_surveys
        SET score = ?, comment = ?, submitted_at = CURRENT_TIMESTAMP
        WHERE id = ? AND submitted_at IS NULL
        "#,
    )
    .bind(payload.score)
    .bind(comment)
    .bind(survey_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, survey_id, "Failed to record rating");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Survey already submitted"
        })));
    }

    if let Err(e) = notifications::push_notification(
        pool.get_ref(),
        attendant_id,
        "New rating",
        &format!(
            "{} rated attendance #{}: {}/10",
            client_name, attendance_id, payload.score
        ),
    )
    .await
    {
        warn!(error = %e, attendant_id, "Failed to push rating notification");
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Thank you for your feedback"
    })))
}

/// Paginated survey list with attendance context (admin)
#[utoipa::path(
    get,
    path = "/api/v1/nps",
    params(NpsQuery),
    responses(
        (status = 200, description = "Paginated survey list", body = NpsListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "NPS",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_surveys(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NpsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if query.submitted_only.unwrap_or(false) {
        where_sql.push_str(" AND s.submitted_at IS NOT NULL");
    }

    if let Some(score) = query.score {
        where_sql.push_str(" AND s.score = ?");
        args.push(FilterValue::U8(score));
    }

    let count_sql = format!("SELECT COUNT(*) FROM nps_surveys s{}", where_sql);

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
        error!(error = %e, "Failed to count surveys");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT s.id, s.attendance_id, s.token, s.score, s.comment,
               s.created_at, s.submitted_at,
               c.name AS client_name, u.full_name AS attendant_name,
               f.name AS form_name
        FROM nps_surveys s
        JOIN attendances a ON a.id = s.attendance_id
        JOIN clients c ON c.id = a.client_id
        JOIN users u ON u.id = a.user_id
        JOIN attendance_forms f ON f.id = a.form_id
        {}
        ORDER BY s.id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, NpsRow>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::U8(v) => data_q.bind(*v),
            FilterValue::Bool(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(*s),
            FilterValue::String(s) => data_q.bind(s.clone()),
        };
    }

    let surveys = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch survey list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(NpsListResponse {
        data: surveys,
        page,
        per_page,
        total,
    }))
}

/// NPS summary: bucket counts and the score (admin)
#[utoipa::path(
    get,
    path = "/api/v1/nps/summary",
    responses(
        (status = 200, description = "NPS summary", body = NpsSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "NPS",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn nps_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    // COUNT over a CASE skips NULLs, so unanswered surveys never land
    // in a bucket.
    let (total, submitted, promoters, passives, detractors) =
        sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(submitted_at),
                   COUNT(CASE WHEN score >= 9 THEN 1 END),
                   COUNT(CASE WHEN score BETWEEN 7 AND 8 THEN 1 END),
                   COUNT(CASE WHEN score <= 6 THEN 1 END)
            FROM nps_surveys
            "#,
        )
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to compute NPS summary");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(NpsSummary {
        total,
        submitted,
        promoters,
        passives,
        detractors,
        score: nps_score(promoters, detractors, submitted),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_zero_with_no_submissions() {
        assert_eq!(nps_score(0, 0, 0), 0);
    }

    #[test]
    fn score_spans_minus_100_to_100() {
        assert_eq!(nps_score(5, 0, 5), 100);
        assert_eq!(nps_score(0, 5, 5), -100);
        assert_eq!(nps_score(3, 3, 10), 0);
    }

    #[test]
    fn score_rounds_to_nearest_integer() {
        // 2 promoters, 1 detractor of 3 → 33.33…
        assert_eq!(nps_score(2, 1, 3), 33);
        // 2 promoters of 3 → 66.67
        assert_eq!(nps_score(2, 0, 3), 67);
    }

    #[test]
    fn first_name_takes_the_leading_word() {
        assert_eq!(first_name("Maria Silva"), "Maria");
        assert_eq!(first_name("Cher"), "Cher");
        assert_eq!(first_name("  Ana  Lima "), "Ana");
    }
}
