use crate::{
    model::client::Client,
    utils::cpf,
    utils::cpf_cache,
    utils::cpf_filter,
    utils::db_utils::{FilterValue, build_update_sql, execute_update, is_duplicate_key},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

/// Columns a PUT may touch; everything else on the row is server-managed.
const UPDATABLE: &[&str] = &[
    "name",
    "cpf",
    "phone",
    "email",
    "birth_date",
    "notes",
    "is_active",
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateClient {
    #[schema(example = "Ana Lima")]
    pub name: String,
    /// Accepted formatted or digits-only; stored as digits
    #[schema(example = "529.982.247-25")]
    pub cpf: String,
    #[schema(example = "+5511912345678")]
    pub phone: Option<String>,
    #[schema(example = "ana.lima@example.com")]
    pub email: Option<String>,
    #[schema(example = "1990-04-12", format = "date", value_type = String)]
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ClientQuery {
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 20)]
    /// Items per page
    pub per_page: Option<u32>,
    /// Search by name, CPF or email
    pub search: Option<String>,
    /// Filter by active flag
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ClientListResponse {
    pub data: Vec<Client>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

/// true  => CPF AVAILABLE
/// false => CPF TAKEN
async fn is_cpf_available(value: &str, pool: &MySqlPool) -> bool {
    // 1️⃣ Cuckoo filter — fast negative
    if !cpf_filter::might_exist(value) {
        return true;
    }

    // 2️⃣ Moka cache — fast positive
    if cpf_cache::is_taken(value).await {
        return false;
    }

    // 3️⃣ Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM clients WHERE cpf = ? LIMIT 1)",
    )
    .bind(value)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

/// Search arm of the WHERE clause. CPF is stored digits-only; a term with
/// no digits would turn the CPF arm into `LIKE '%%'` and match every row,
/// so that arm only joins when the term carries digits.
fn push_search_filter(where_sql: &mut String, args: &mut Vec<FilterValue<'_>>, term: &str) {
    let term = term.trim();
    if term.is_empty() {
        return;
    }

    let like = format!("%{}%", term);
    let digits = cpf::normalize(term);

    if digits.is_empty() {
        where_sql.push_str(" AND (name LIKE ? OR email LIKE ?)");
        args.push(FilterValue::String(like.clone()));
        args.push(FilterValue::String(like));
    } else {
        where_sql.push_str(" AND (name LIKE ? OR cpf LIKE ? OR email LIKE ?)");
        args.push(FilterValue::String(like.clone()));
        args.push(FilterValue::String(format!("%{}%", digits)));
        args.push(FilterValue::String(like));
    }
}

/// Create Client
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = CreateClient,
    responses(
        (status = 201, description = "Client created", body = Object, example = json!({
            "message": "Client created successfully",
            "id": 1
        })),
        (status = 400, description = "Invalid name or CPF"),
        (status = 409, description = "CPF already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Clients",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_client(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateClient>,
) -> impl Responder {
    let name = payload.name.trim();

    if name.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "message": "Client name must not be empty"
        }));
    }

    let cpf_digits = cpf::normalize(&payload.cpf);
    if !cpf::is_valid(&cpf_digits) {
        return HttpResponse::BadRequest().json(json!({
            "message": "Invalid CPF"
        }));
    }

    if !is_cpf_available(&cpf_digits, pool.get_ref()).await {
        return HttpResponse::Conflict().json(json!({
            "message": "CPF already registered"
        }));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO clients (name, cpf, phone, email, birth_date, notes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&cpf_digits)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(payload.birth_date)
    .bind(&payload.notes)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            // keep the fast availability path hot
            cpf_filter::insert(&cpf_digits);
            cpf_cache::mark_taken(&cpf_digits).await;

            HttpResponse::Created().json(json!({
                "message": "Client created successfully",
                "id": res.last_insert_id()
            }))
        }
        Err(e) => {
            if is_duplicate_key(&e) {
                return HttpResponse::Conflict().json(json!({
                    "message": "CPF already registered"
                }));
            }

            error!(error = %e, "Failed to create client");
            HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, Contact with system admin"
            }))
        }
    }
}

/// Paginated client list
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    params(ClientQuery),
    responses(
        (status = 200, description = "Paginated client list", body = ClientListResponse)
    ),
    tag = "Clients",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_clients(
    pool: web::Data<MySqlPool>,
    query: web::Query<ClientQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(is_active) = query.is_active {
        where_sql.push_str(" AND is_active = ?");
        args.push(FilterValue::Bool(is_active));
    }

    if let Some(search) = query.search.as_deref() {
        push_search_filter(&mut where_sql, &mut args, search);
    }

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM clients{}", where_sql);
    debug!(sql = %count_sql, "Counting clients");

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
        error!(error = %e, sql = %count_sql, "Failed to count clients");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM clients{} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_sql
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching clients");

    let mut data_q = sqlx::query_as::<_, Client>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::U8(v) => data_q.bind(*v),
            FilterValue::Bool(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(*s),
            FilterValue::String(s) => data_q.bind(s.clone()),
        };
    }
    data_q = data_q.bind(per_page as i64).bind(offset as i64);

    let clients = data_q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch clients");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(ClientListResponse {
        data: clients,
        page,
        per_page,
        total,
    }))
}

/// Get Client by ID
#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}",
    params(
        ("client_id" = u64, Path, description = "Client ID")
    ),
    responses(
        (status = 200, description = "Client found", body = Client),
        (status = 404, description = "Client not found", body = Object, example = json!({
            "message": "Client not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Clients",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_client(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let client_id = path.into_inner();

    let client = sqlx::query_as::<_, Client>(
        r#"
        SELECT id, name, cpf, phone, email, birth_date, notes, is_active, created_at
        FROM clients
        WHERE id = ?
        "#,
    )
    .bind(client_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, client_id, "Failed to fetch client");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match client {
        Some(c) => Ok(HttpResponse::Ok().json(c)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Client not found"
        }))),
    }
}

/// Update Client (partial)
#[utoipa::path(
    put,
    path = "/api/v1/clients/{client_id}",
    params(
        ("client_id" = u64, Path, description = "Client ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Client updated successfully"),
        (status = 400, description = "Invalid payload or CPF"),
        (status = 404, description = "Client not found"),
        (status = 409, description = "CPF already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Clients",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_client(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let client_id = path.into_inner();
    let mut body = body.into_inner();

    let current_cpf = sqlx::query_scalar::<_, String>("SELECT cpf FROM clients WHERE id = ?")
        .bind(client_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, client_id, "Failed to fetch client");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let current_cpf = match current_cpf {
        Some(c) => c,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Client not found"
            })));
        }
    };

    // CPF changes re-run validation + uniqueness before touching the row
    let mut new_cpf: Option<String> = None;
    if let Some(raw) = body.get("cpf") {
        let digits = match raw.as_str() {
            Some(s) => cpf::normalize(s),
            None => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "CPF must be a string"
                })));
            }
        };

        if !cpf::is_valid(&digits) {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid CPF"
            })));
        }

        if digits != current_cpf {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM clients WHERE cpf = ? AND id != ? LIMIT 1)",
            )
            .bind(&digits)
            .bind(client_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, client_id, "Failed to check CPF uniqueness");
                ErrorInternalServerError("Internal Server Error")
            })?;

            if taken {
                return Ok(HttpResponse::Conflict().json(json!({
                    "message": "CPF already registered"
                })));
            }

            new_cpf = Some(digits.clone());
        }

        body["cpf"] = json!(digits);
    }

    let update = build_update_sql("clients", &body, UPDATABLE, "id", client_id)?;

    if let Err(e) = execute_update(pool.get_ref(), update).await {
        // a concurrent insert can slip past the pre-check and land on the
        // UNIQUE key instead
        if is_duplicate_key(&e) {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "CPF already registered"
            })));
        }

        error!(error = %e, client_id, "Failed to update client");
        return Err(ErrorInternalServerError("Internal Server Error"));
    }

    if let Some(digits) = new_cpf {
        cpf_filter::remove(&current_cpf);
        cpf_cache::mark_free(&current_cpf).await;
        cpf_filter::insert(&digits);
        cpf_cache::mark_taken(&digits).await;
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Client updated successfully"
    })))
}

/// Delete Client
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{client_id}",
    params(
        ("client_id" = u64, Path, description = "Client ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Client not found"),
        (status = 409, description = "Client has attendance records"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Clients",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_client(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let client_id = path.into_inner();

    let cpf_digits = sqlx::query_scalar::<_, String>("SELECT cpf FROM clients WHERE id = ?")
        .bind(client_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, client_id, "Failed to fetch client");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let cpf_digits = match cpf_digits {
        Some(c) => c,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Client not found"
            })));
        }
    };

    let result = sqlx::query("DELETE FROM clients WHERE id = ?")
        .bind(client_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            cpf_filter::remove(&cpf_digits);
            cpf_cache::mark_free(&cpf_digits).await;

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }

        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Client has attendance records"
                    })));
                }
            }

            error!(error = %e, client_id, "Failed to delete client");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_search_leaves_the_cpf_arm_out() {
        let mut where_sql = String::new();
        let mut args: Vec<FilterValue> = Vec::new();
        push_search_filter(&mut where_sql, &mut args, "Maria");

        assert_eq!(where_sql, " AND (name LIKE ? OR email LIKE ?)");
        assert_eq!(args.len(), 2);
        for arg in &args {
            assert!(matches!(arg, FilterValue::String(s) if s == "%Maria%"));
        }
    }

    #[test]
    fn cpf_search_binds_the_normalized_digits() {
        let mut where_sql = String::new();
        let mut args: Vec<FilterValue> = Vec::new();
        push_search_filter(&mut where_sql, &mut args, "529.982.247-25");

        assert_eq!(where_sql, " AND (name LIKE ? OR cpf LIKE ? OR email LIKE ?)");
        assert!(matches!(&args[1], FilterValue::String(s) if s == "%52998224725%"));
    }

    #[test]
    fn blank_search_adds_no_filter() {
        let mut where_sql = String::new();
        let mut args: Vec<FilterValue> = Vec::new();
        push_search_filter(&mut where_sql, &mut args, "   ");

        assert!(where_sql.is_empty());
        assert!(args.is_empty());
    }
}
