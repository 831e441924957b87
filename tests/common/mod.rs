#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use jifunze::router::init_router;
use jifunze::state::AppState;
use jifunze_auth::{Identity, TokenService};
use jifunze_config::{CorsConfig, JwtConfig, RateLimitConfig, ResetConfig};
use jifunze_core::hash_password;
use jifunze_models::{PublicId, Role, SchoolId};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "testpass123";

pub struct TestUser {
    pub id: i64,
    pub public_id: Uuid,
    pub email: String,
    pub role: Role,
    pub school_id: Option<i64>,
}

pub fn test_state(pool: PgPool) -> AppState {
    test_state_with_rate_limit(pool, RateLimitConfig::disabled())
}

pub fn test_state_with_rate_limit(pool: PgPool, rate_limit_config: RateLimitConfig) -> AppState {
    let jwt = JwtConfig {
        secret: "integration-test-secret-with-enough-entropy".into(),
        access_token_expiry: 3600,
        refresh_token_expiry: 86400,
    };

    AppState {
        db: pool,
        tokens: TokenService::in_memory(jwt),
        reset_config: ResetConfig {
            token_ttl_hours: 24,
            expose_token: true,
        },
        cors_config: CorsConfig::from_list("http://localhost:3000"),
        rate_limit_config,
        metrics: None,
    }
}

pub fn test_app(state: &AppState) -> Router {
    init_router(state.clone())
}

pub fn unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub async fn create_user(pool: &PgPool, role: Role, school_id: Option<i64>) -> TestUser {
    let email = unique_email();
    let hashed = hash_password(PASSWORD).unwrap();

    let (id, public_id): (i64, Uuid) = sqlx::query_as(
        "INSERT INTO users (name, email, password_hash, role, school_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, public_id",
    )
    .bind(format!("Test {role}"))
    .bind(&email)
    .bind(hashed)
    .bind(role.as_str())
    .bind(school_id)
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser {
        id,
        public_id,
        email,
        role,
        school_id,
    }
}

pub async fn create_school(pool: &PgPool, owner: &TestUser) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO schools (name, address, owner_id) VALUES ($1, 'Test Address', $2) RETURNING id",
    )
    .bind(format!("Test School {}", Uuid::new_v4()))
    .bind(owner.id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_course(pool: &PgPool, school_id: i64, educator: &TestUser) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO courses (title, description, school_id, educator_id)
         VALUES ($1, 'A test course', $2, $3)
         RETURNING id",
    )
    .bind(format!("Course {}", Uuid::new_v4()))
    .bind(school_id)
    .bind(educator.id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn enroll(pool: &PgPool, student: &TestUser, course_id: i64) -> i64 {
    sqlx::query_scalar("INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2) RETURNING id")
        .bind(student.id)
        .bind(course_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn post_message(
    pool: &PgPool,
    author: &TestUser,
    course_id: i64,
    parent_id: Option<i64>,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO messages (course_id, user_id, parent_id, content)
         VALUES ($1, $2, $3, 'Hello class')
         RETURNING id",
    )
    .bind(course_id)
    .bind(author.id)
    .bind(parent_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn add_resource(pool: &PgPool, uploader: &TestUser, course_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO resources (course_id, uploaded_by, title, url, type)
         VALUES ($1, $2, 'Syllabus', 'https://example.com/syllabus.pdf', 'pdf')
         RETURNING id",
    )
    .bind(course_id)
    .bind(uploader.id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn record_attendance(pool: &PgPool, student: &TestUser, course_id: i64, date: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO attendance (user_id, course_id, date, status)
         VALUES ($1, $2, $3::DATE, 'present')
         RETURNING id",
    )
    .bind(student.id)
    .bind(course_id)
    .bind(date)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// A manager owning one school, with an educator teaching one course there
/// and a student of that school.
pub struct Tenant {
    pub manager: TestUser,
    pub school_id: i64,
    pub educator: TestUser,
    pub student: TestUser,
    pub course_id: i64,
}

pub async fn create_tenant(pool: &PgPool) -> Tenant {
    let manager = create_user(pool, Role::Manager, None).await;
    let school_id = create_school(pool, &manager).await;
    let educator = create_user(pool, Role::Educator, Some(school_id)).await;
    let student = create_user(pool, Role::Student, Some(school_id)).await;
    let course_id = create_course(pool, school_id, &educator).await;

    Tenant {
        manager,
        school_id,
        educator,
        student,
        course_id,
    }
}

/// Issues an access token for `user` directly, bypassing login.
pub fn token_for(state: &AppState, user: &TestUser) -> String {
    let identity = Identity {
        public_id: PublicId(user.public_id),
        role: user.role,
        school_id: user.school_id.map(SchoolId),
    };
    state.tokens.issue(&identity).unwrap().access_token
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}
