//! Demo data loader: `cargo run --bin seed`
//!
//! Runs the migrations, then loads a small salon the staff can click
//! through: two accounts, three clients, the intake form and a pair of
//! attendances (one still open, one completed and already rated).
//! Refuses to touch a database that already has an admin user.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::NaiveDate;
use dotenvy::dotenv;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use uuid::Uuid;

// 1x1 transparent PNG, stands in for a real signature pad export
const DEMO_SIGNATURE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

fn hash_password(password: &str) -> String {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .expect("Failed to hash password")
        .to_string()
}

fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid seed date")
}

async fn insert_user(pool: &MySqlPool, username: &str, password: &str, full_name: &str, role_id: u8) -> u64 {
    let res = sqlx::query(
        "INSERT INTO users (username, password, full_name, role_id) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(hash_password(password))
    .bind(full_name)
    .bind(role_id)
    .execute(pool)
    .await
    .expect("Failed to insert user");

    res.last_insert_id()
}

async fn insert_client(
    pool: &MySqlPool,
    name: &str,
    cpf: &str,
    phone: &str,
    email: &str,
    birth_date: NaiveDate,
) -> u64 {
    let res = sqlx::query(
        "INSERT INTO clients (name, cpf, phone, email, birth_date) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(cpf)
    .bind(phone)
    .bind(email)
    .bind(birth_date)
    .execute(pool)
    .await
    .expect("Failed to insert client");

    res.last_insert_id()
}

async fn insert_field(
    pool: &MySqlPool,
    form_id: u64,
    label: &str,
    field_type: &str,
    options: Option<Vec<&str>>,
    required: bool,
    position: u32,
) {
    sqlx::query(
        r#"
        INSERT INTO form_fields (form_id, label, field_type, options, required, position)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(form_id)
    .bind(label)
    .bind(field_type)
    .bind(options.map(|o| json!(o)))
    .bind(required)
    .bind(position)
    .execute(pool)
    .await
    .expect("Failed to insert form field");
}

#[actix_web::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = MySqlPool::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    info!("Migrations applied");

    let has_admin = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE role_id = 1 LIMIT 1)",
    )
    .fetch_one(&pool)
    .await
    .expect("Failed to check for existing admin");

    if has_admin {
        info!("Seed skipped: an admin user already exists");
        return;
    }

    // ── Accounts ───────────────────────────────────────────────────────
    let admin_id = insert_user(&pool, "admin", "changeme123", "Salon Admin", 1).await;
    let attendant_id = insert_user(&pool, "ana.costa", "attendant123", "Ana Costa", 2).await;

    sqlx::query("INSERT INTO notifications (user_id, title, message) VALUES (?, ?, ?)")
        .bind(attendant_id)
        .bind("Welcome")
        .bind("Welcome to Fiber Beauty, Ana Costa!")
        .execute(&pool)
        .await
        .expect("Failed to insert welcome notification");

    // ── Clients (CPFs pass the check-digit rules) ──────────────────────
    let maria_id = insert_client(
        &pool,
        "Maria Silva",
        "52998224725",
        "+55 11 98765-4321",
        "maria.silva@example.com",
        date("1990-04-12"),
    )
    .await;

    let ana_id = insert_client(
        &pool,
        "Ana Lima",
        "12345678909",
        "+55 11 91234-5678",
        "ana.lima@example.com",
        date("1985-11-30"),
    )
    .await;

    insert_client(
        &pool,
        "Carla Souza",
        "98765432100",
        "+55 21 99876-5432",
        "carla.souza@example.com",
        date("1998-02-07"),
    )
    .await;

    // ── Intake form, one field of every type ───────────────────────────
    let res = sqlx::query(
        "INSERT INTO attendance_forms (name, description) VALUES (?, ?)",
    )
    .bind("Facial Treatment Intake")
    .bind("Filled before every facial session")
    .execute(&pool)
    .await
    .expect("Failed to insert form");
    let form_id = res.last_insert_id();

    insert_field(&pool, form_id, "Current skin care routine", "text", None, false, 0).await;
    insert_field(&pool, form_id, "Known allergies", "textarea", None, false, 1).await;
    insert_field(&pool, form_id, "Age", "number", None, true, 2).await;
    insert_field(&pool, form_id, "Last facial treatment", "date", None, false, 3).await;
    insert_field(
        &pool,
        form_id,
        "Skin type",
        "select",
        Some(vec!["oily", "dry", "combination", "sensitive"]),
        true,
        4,
    )
    .await;
    insert_field(
        &pool,
        form_id,
        "Sun exposure",
        "radio",
        Some(vec!["low", "moderate", "high"]),
        true,
        5,
    )
    .await;
    insert_field(
        &pool,
        form_id,
        "Areas of concern",
        "checkbox",
        Some(vec!["forehead", "cheeks", "chin", "nose"]),
        false,
        6,
    )
    .await;

    // ── One attendance mid-service, one finished and rated ─────────────
    sqlx::query(
        r#"
        INSERT INTO attendances (client_id, user_id, form_id, responses, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(maria_id)
    .bind(attendant_id)
    .bind(form_id)
    .bind(json!({
        "Age": 35,
        "Skin type": "oily",
        "Sun exposure": "moderate"
    }))
    .bind("first visit")
    .execute(&pool)
    .await
    .expect("Failed to insert open attendance");

    let res = sqlx::query(
        r#"
        INSERT INTO attendances
            (client_id, user_id, form_id, responses, signature, notes, status, completed_at)
        VALUES (?, ?, ?, ?, ?, ?, 'completed', CURRENT_TIMESTAMP)
        "#,
    )
    .bind(ana_id)
    .bind(attendant_id)
    .bind(form_id)
    .bind(json!({
        "Current skin care routine": "cleanser and sunscreen",
        "Known allergies": "none",
        "Age": 40,
        "Last facial treatment": "2026-01-10",
        "Skin type": "dry",
        "Sun exposure": "low",
        "Areas of concern": ["cheeks", "chin"]
    }))
    .bind(DEMO_SIGNATURE)
    .bind("regular, prefers afternoon slots")
    .execute(&pool)
    .await
    .expect("Failed to insert completed attendance");
    let completed_id = res.last_insert_id();

    let survey_token = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO nps_surveys (attendance_id, token, score, comment, submitted_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(completed_id)
    .bind(&survey_token)
    .bind(9u8)
    .bind("Loved the service")
    .execute(&pool)
    .await
    .expect("Failed to insert survey");

    sqlx::query("INSERT INTO notifications (user_id, title, message) VALUES (?, ?, ?)")
        .bind(attendant_id)
        .bind("New rating")
        .bind(format!("Ana Lima rated attendance #{}: 9/10", completed_id))
        .execute(&pool)
        .await
        .expect("Failed to insert rating notification");

    info!(admin_id, attendant_id, form_id, "Seed complete");
    info!("Login with admin / changeme123 (or ana.costa / attendant123)");
    info!(%survey_token, "Demo survey already submitted with score 9");
}
