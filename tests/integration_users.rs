mod common;

use axum::http::StatusCode;
use common::{PASSWORD, count, create_tenant, enroll, send, test_app, test_state, token_for};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_get_me(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.student);

    let (status, body) = send(&app, "GET", "/api/users/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], tenant.student.email);
    assert_eq!(body["data"]["role"], "student");
    assert_eq!(body["data"]["school_id"], tenant.school_id);
    assert!(body["data"].get("id").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_students_cannot_list_users(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);

    let token = token_for(&state, &tenant.student);
    let (status, body) = send(&app, "GET", "/api/users", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["code"], "InsufficientRole");

    let token = token_for(&state, &tenant.educator);
    let (status, body) = send(&app, "GET", "/api/users?role=student", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_user_field_permissions(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let uri = format!("/api/users/{}", tenant.student.public_id);

    let token = token_for(&state, &tenant.student);
    let (status, body) = send(&app, "PATCH", &uri, Some(token.as_str()), Some(json!({ "name": "Renamed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");

    let (status, body) = send(&app, "PATCH", &uri, Some(token.as_str()), Some(json!({ "role": "educator" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["code"], "Forbidden");

    let token = token_for(&state, &tenant.manager);
    let (status, body) = send(&app, "PATCH", &uri, Some(token.as_str()), Some(json!({ "role": "educator" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "educator");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_students_cannot_read_classmates(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.student);

    let uri = format!("/api/users/{}", tenant.educator.public_id);
    let (status, _) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/users/{}", tenant.student.public_id);
    let (status, _) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_role_change_blocked_by_enrollments(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    enroll(&pool, &tenant.student, tenant.course_id).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.manager);

    let uri = format!("/api/users/{}", tenant.student.public_id);
    let (status, body) = send(&app, "PATCH", &uri, Some(token.as_str()), Some(json!({ "role": "educator" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["dependents"], "enrollments");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_user_delete_blocked_by_authored_records(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    enroll(&pool, &tenant.student, tenant.course_id).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let educator_token = token_for(&state, &tenant.educator);

    let (status, _) = send(
        &app,
        "POST",
        "/api/attendance",
        Some(educator_token.as_str()),
        Some(json!({
            "user_id": tenant.student.public_id,
            "course_id": tenant.course_id,
            "date": "2025-03-10",
            "status": "present"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let token = token_for(&state, &tenant.manager);
    let uri = format!("/api/users/{}", tenant.student.public_id);
    let (status, body) = send(&app, "DELETE", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["reason"], "has_dependents");
    assert_eq!(body["errors"]["dependents"], "attendance");

    assert_eq!(count(&pool, "users").await, 3);
    assert_eq!(count(&pool, "enrollments").await, 1);
    assert_eq!(count(&pool, "attendance").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_user_delete_removes_enrollments_and_reset_tokens(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    enroll(&pool, &tenant.student, tenant.course_id).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "email": tenant.student.email })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count(&pool, "reset_tokens").await, 1);

    let token = token_for(&state, &tenant.manager);
    let uri = format!("/api/users/{}", tenant.student.public_id);
    let (status, _) = send(&app, "DELETE", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(count(&pool, "users").await, 2);
    assert_eq!(count(&pool, "enrollments").await, 0);
    assert_eq!(count(&pool, "reset_tokens").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_change_password(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.student);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/me/password",
        Some(token.as_str()),
        Some(json!({ "current_password": "wrong-password", "new_password": "new-password-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/me/password",
        Some(token.as_str()),
        Some(json!({ "current_password": PASSWORD, "new_password": "new-password-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": tenant.student.email, "password": "new-password-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
