mod common;

use axum::http::StatusCode;
use common::{PASSWORD, create_school, create_user, send, test_app, test_state, unique_email};
use jifunze_models::Role;
use serde_json::json;
use sqlx::PgPool;

async fn login(app: &axum::Router, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_register_manager_without_school(pool: PgPool) {
    let app = test_app(&test_state(pool));
    let email = unique_email();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Maria Manager",
            "email": email,
            "role": "manager",
            "password": PASSWORD
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], email);
    assert_eq!(body["data"]["role"], "manager");
    assert!(body["data"]["school_id"].is_null());
    assert!(body["data"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_register_student_requires_school(pool: PgPool) {
    let app = test_app(&test_state(pool));

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Sam Student",
            "email": unique_email(),
            "role": "student",
            "password": PASSWORD
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["code"], "ValidationError");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_register_duplicate_email_conflicts(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let school_id = create_school(&pool, &manager).await;
    let app = test_app(&test_state(pool));

    let payload = json!({
        "name": "Sam Student",
        "email": "Duplicate@Test.com",
        "role": "student",
        "school_id": school_id,
        "password": PASSWORD
    });

    let (status, _) = send(&app, "POST", "/api/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Other",
            "email": "duplicate@test.com",
            "role": "student",
            "school_id": school_id,
            "password": PASSWORD
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["code"], "Conflict");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_register_rejects_short_password(pool: PgPool) {
    let app = test_app(&test_state(pool));

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Maria",
            "email": unique_email(),
            "role": "manager",
            "password": "abc"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_success_and_failure(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let app = test_app(&test_state(pool));

    let (status, body) = login(&app, &manager.email.to_uppercase(), PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["user"]["public_id"], manager.public_id.to_string());

    let (status, body) = login(&app, &manager.email, "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"]["code"], "Unauthenticated");

    let (status, _) = login(&app, "nobody@test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_protected_route_requires_token(pool: PgPool) {
    let app = test_app(&test_state(pool));

    let (status, body) = send(&app, "GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"]["code"], "Unauthenticated");

    let (status, _) = send(&app, "GET", "/api/users/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_token_is_single_use(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let app = test_app(&test_state(pool));

    let (_, body) = login(&app, &manager.email, PASSWORD).await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", "/api/auth/refresh", Some(refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].is_string());
    assert_ne!(body["data"]["refresh_token"], refresh.as_str());

    let (status, _) = send(&app, "POST", "/api/auth/refresh", Some(refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_access_token_cannot_refresh(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let app = test_app(&test_state(pool));

    let (_, body) = login(&app, &manager.email, PASSWORD).await;
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", "/api/auth/refresh", Some(access.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_logout_revokes_access_token(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let app = test_app(&test_state(pool));

    let (_, body) = login(&app, &manager.email, PASSWORD).await;
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", "/api/users/me", Some(access.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(access.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/users/me", Some(access.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_after_logout_rejected(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let app = test_app(&test_state(pool));

    let (_, body) = login(&app, &manager.email, PASSWORD).await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", "/api/auth/refresh", Some(refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let first_access = body["data"]["access_token"].as_str().unwrap().to_string();
    let rotated = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(first_access.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/api/auth/refresh", Some(rotated.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"]["code"], "Unauthenticated");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_logout_ends_only_its_own_session(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let app = test_app(&test_state(pool));

    let (_, first) = login(&app, &manager.email, PASSWORD).await;
    let (_, second) = login(&app, &manager.email, PASSWORD).await;
    let first_access = first["data"]["access_token"].as_str().unwrap().to_string();
    let first_refresh = first["data"]["refresh_token"].as_str().unwrap().to_string();
    let second_refresh = second["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(first_access.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/api/auth/refresh", Some(first_refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/auth/refresh", Some(second_refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_reflects_current_role(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let school_id = create_school(&pool, &manager).await;
    let user = create_user(&pool, Role::Student, Some(school_id)).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);

    let (_, body) = login(&app, &user.email, PASSWORD).await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    sqlx::query("UPDATE users SET role = 'educator' WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(&app, "POST", "/api/auth/refresh", Some(refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let access = body["data"]["access_token"].as_str().unwrap();
    let claims = state.tokens.authenticate(access).await.unwrap();
    assert_eq!(claims.role, Role::Educator);
}
