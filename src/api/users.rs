use crate::{
    api::notifications,
    auth::auth::AuthUser,
    auth::password::{hash_password, verify_password},
    model::{role::Role, user::UserRow},
    utils::db_utils::{FilterValue, build_update_sql, execute_update, is_duplicate_key},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, warn};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: &[&str] = &["username", "full_name", "role_id", "is_active"];

const MIN_PASSWORD_LEN: usize = 8;

/// Usernames are stored trimmed and lowercased, whichever handler writes
/// the row.
fn canonical_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validates a partial-update `username` field and rewrites it to the
/// canonical form in place. Absent field is fine.
fn canonicalize_username_field(body: &mut Value) -> Result<(), &'static str> {
    let Some(username) = body.get("username") else {
        return Ok(());
    };

    match username.as_str() {
        Some(u) if u.trim().len() >= 3 => {
            let canonical = canonical_username(u);
            body["username"] = json!(canonical);
            Ok(())
        }
        _ => Err("Username must be at least 3 characters"),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "joao.attendant")]
    pub username: String,
    #[schema(example = "a-strong-password")]
    pub password: String,
    #[schema(example = "João Pereira")]
    pub full_name: String,
    #[schema(example = 2)]
    pub role_id: u8,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 20)]
    /// Items per page
    pub per_page: Option<u32>,
    /// Search by username or full name
    pub search: Option<String>,
    #[schema(example = 2)]
    /// Filter by role
    pub role_id: Option<u8>,
    /// Filter by active flag
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserRow>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 4)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePassword {
    /// Required when changing your own password
    pub current_password: Option<String>,
    #[schema(example = "a-new-strong-password")]
    pub password: String,
}

/// Create User (admin)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created successfully",
            "id": 3
        })),
        (status = 400, description = "Invalid username, password or role"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let username = canonical_username(&payload.username);
    let full_name = payload.full_name.trim();

    if username.len() < 3 || full_name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Username (min 3 chars) and full name are required"
        })));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Password must be at least 8 characters"
        })));
    }

    if Role::from_id(payload.role_id).is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Invalid role. Allowed: 1 (ADMIN), 2 (ATTENDANT)"
        })));
    }

    let hashed = hash_password(&payload.password);

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password, full_name, role_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&username)
    .bind(&hashed)
    .bind(full_name)
    .bind(payload.role_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let user_id = res.last_insert_id();

            // Welcome note, intentionally not failing the create
            if let Err(e) = notifications::push_notification(
                pool.get_ref(),
                user_id,
                "Welcome",
                &format!("Welcome to Fiber Beauty, {}!", full_name),
            )
            .await
            {
                warn!(error = %e, user_id, "Failed to push welcome notification");
            }

            Ok(HttpResponse::Created().json(json!({
                "message": "User created successfully",
                "id": user_id
            })))
        }
        Err(e) => {
            if is_duplicate_key(&e) {
                return Ok(HttpResponse::Conflict().json(json!({
                    "message": "Username already taken"
                })));
            }

            error!(error = %e, "Failed to create user");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, Contact with system admin"
            })))
        }
    }
}

/// Paginated user list (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(role_id) = query.role_id {
        where_sql.push_str(" AND role_id = ?");
        args.push(FilterValue::U8(role_id));
    }

    if let Some(is_active) = query.is_active {
        where_sql.push_str(" AND is_active = ?");
        args.push(FilterValue::Bool(is_active));
    }

    if let Some(search) = query.search.as_deref() {
        where_sql.push_str(" AND (username LIKE ? OR full_name LIKE ?)");
        let like = format!("%{}%", search.trim());
        args.push(FilterValue::String(like.clone()));
        args.push(FilterValue::String(like));
    }

    let count_sql = format!("SELECT COUNT(*) FROM users{}", where_sql);

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
        error!(error = %e, "Failed to count users");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, username, full_name, role_id, is_active, last_login_at, created_at
        FROM users
        {}
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, UserRow>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::U8(v) => data_q.bind(*v),
            FilterValue::Bool(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(*s),
            FilterValue::String(s) => data_q.bind(s.clone()),
        };
    }

    let users = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch user list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Get User by ID (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserRow),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, full_name, role_id, is_active, last_login_at, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to fetch user");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match user {
        Some(u) => Ok(HttpResponse::Ok().json(u)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        }))),
    }
}

/// Update User (admin, partial)
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "User updated successfully"),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let mut body = body.into_inner();

    if let Some(role_raw) = body.get("role_id") {
        let valid = role_raw
            .as_u64()
            .and_then(|id| u8::try_from(id).ok())
            .and_then(Role::from_id)
            .is_some();
        if !valid {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid role. Allowed: 1 (ADMIN), 2 (ATTENDANT)"
            })));
        }
    }

    if let Err(message) = canonicalize_username_field(&mut body) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": message
        })));
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? LIMIT 1)",
    )
    .bind(user_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to check user");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if !exists {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    let update = build_update_sql("users", &body, UPDATABLE, "id", user_id)?;

    match execute_update(pool.get_ref(), update).await {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "User updated successfully"
        }))),
        Err(e) => {
            if is_duplicate_key(&e) {
                return Ok(HttpResponse::Conflict().json(json!({
                    "message": "Username already taken"
                })));
            }

            error!(error = %e, user_id, "Failed to update user");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Change password (self with current password, or admin reset)
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/password",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    request_body = ChangePassword,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Password too short"),
        (status = 401, description = "Current password incorrect"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ChangePassword>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();

    if payload.password.len() < MIN_PASSWORD_LEN {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Password must be at least 8 characters"
        })));
    }

    if auth.user_id == user_id {
        // self-change must prove knowledge of the current password
        let current = match payload.current_password.as_deref() {
            Some(c) => c,
            None => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "current_password is required"
                })));
            }
        };

        let stored = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "Failed to fetch password hash");
                ErrorInternalServerError("Internal Server Error")
            })?;

        let Some(stored) = stored else {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "User not found"
            })));
        };

        if verify_password(current, &stored).is_err() {
            return Ok(HttpResponse::Unauthorized().json(json!({
                "message": "Current password incorrect"
            })));
        }
    } else {
        auth.require_admin()?;
    }

    let hashed = hash_password(&payload.password);

    let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(&hashed)
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to change password");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    // force every device back through login
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password changed"
    })))
}

/// Delete User (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has attendance records")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    if auth.user_id == user_id {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Cannot delete own account"
        })));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "User not found"
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
                        "message": "User has attendance records"
                    })));
                }
            }

            error!(error = %e, user_id, "Failed to delete user");
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
    fn usernames_canonicalize_to_trimmed_lowercase() {
        assert_eq!(canonical_username("  Bob  "), "bob");
        assert_eq!(canonical_username("Ana.COSTA"), "ana.costa");
        assert_eq!(canonical_username("joao.attendant"), "joao.attendant");
    }

    #[test]
    fn update_payload_usernames_are_rewritten_in_place() {
        let mut body = json!({ "username": "  New.Attendant ", "is_active": true });
        canonicalize_username_field(&mut body).unwrap();

        assert_eq!(body["username"], json!("new.attendant"));
        assert_eq!(body["is_active"], json!(true));
    }

    #[test]
    fn short_or_non_string_usernames_are_rejected() {
        assert!(canonicalize_username_field(&mut json!({ "username": "ab" })).is_err());
        assert!(canonicalize_username_field(&mut json!({ "username": 7 })).is_err());
        assert!(canonicalize_username_field(&mut json!({ "full_name": "x" })).is_ok());
    }
}
