mod common;

use axum::http::StatusCode;
use common::{
    add_resource, count, create_school, create_tenant, create_user, enroll, post_message,
    record_attendance, send, test_app, test_state, token_for,
};
use jifunze_models::Role;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_manager_creates_school(pool: PgPool) {
    let manager = create_user(&pool, Role::Manager, None).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &manager);

    let (status, body) = send(
        &app,
        "POST",
        "/api/schools",
        Some(token.as_str()),
        Some(json!({ "name": "Hillside Academy", "address": "1 Hill Rd" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "Hillside Academy");
    assert_eq!(body["data"]["owner_id"], manager.public_id.to_string());

    let school_id: Option<i64> = sqlx::query_scalar("SELECT school_id FROM users WHERE id = $1")
        .bind(manager.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(school_id, body["data"]["id"].as_i64());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_managers_create_schools(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.educator);

    let (status, body) = send(
        &app,
        "POST",
        "/api/schools",
        Some(token.as_str()),
        Some(json!({ "name": "Rogue School" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["code"], "InsufficientRole");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_schools_are_scoped_to_their_owner(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let other_manager = create_user(&pool, Role::Manager, None).await;
    create_school(&pool, &other_manager).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &other_manager);

    let (status, body) = send(&app, "GET", "/api/schools", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["total"], 1);

    let uri = format!("/api/schools/{}", tenant.school_id);
    let (status, _) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "PATCH", &uri, Some(token.as_str()), Some(json!({ "name": "Mine" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["code"], "CrossTenant");

    let token = token_for(&state, &tenant.student);
    let (status, _) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_school_delete_cascades_to_courses_and_members(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    enroll(&pool, &tenant.student, tenant.course_id).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.manager);

    let uri = format!("/api/schools/{}", tenant.school_id);
    let (status, _) = send(&app, "DELETE", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(count(&pool, "schools").await, 0);
    assert_eq!(count(&pool, "courses").await, 0);
    assert_eq!(count(&pool, "enrollments").await, 0);

    let remaining: Vec<String> = sqlx::query_scalar("SELECT role FROM users")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, vec!["manager".to_string()]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_school_delete_removes_full_course_history(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    enroll(&pool, &tenant.student, tenant.course_id).await;
    record_attendance(&pool, &tenant.student, tenant.course_id, "2025-03-10").await;
    let question = post_message(&pool, &tenant.student, tenant.course_id, None).await;
    post_message(&pool, &tenant.educator, tenant.course_id, Some(question)).await;
    add_resource(&pool, &tenant.educator, tenant.course_id).await;

    sqlx::query(
        "INSERT INTO reset_tokens (user_id, token_hash, expires_at)
         VALUES ($1, 'digest', NOW() + INTERVAL '1 hour')",
    )
    .bind(tenant.student.id)
    .execute(&pool)
    .await
    .unwrap();

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.manager);

    let uri = format!("/api/schools/{}", tenant.school_id);
    let (status, _) = send(&app, "DELETE", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    for table in [
        "schools",
        "courses",
        "enrollments",
        "attendance",
        "messages",
        "resources",
        "reset_tokens",
    ] {
        assert_eq!(count(&pool, table).await, 0, "{table}");
    }
    assert_eq!(count(&pool, "users").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assign_user_between_owned_schools(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let second_school = create_school(&pool, &tenant.manager).await;
    let newcomer = create_user(&pool, Role::Student, Some(tenant.school_id)).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.manager);
    let uri = format!("/api/schools/{second_school}/users");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(token.as_str()),
        Some(json!({ "user_id": newcomer.public_id, "role": "educator" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["reason"], "role_mismatch");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(token.as_str()),
        Some(json!({ "user_id": newcomer.public_id, "role": "student" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["school_id"], second_school);

    let (status, body) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assignment_blocked_by_history_in_old_school(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let second_school = create_school(&pool, &tenant.manager).await;
    enroll(&pool, &tenant.student, tenant.course_id).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.manager);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/schools/{second_school}/users"),
        Some(token.as_str()),
        Some(json!({ "user_id": tenant.student.public_id, "role": "student" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["reason"], "history_exists");

    let school_id: Option<i64> = sqlx::query_scalar("SELECT school_id FROM users WHERE id = $1")
        .bind(tenant.student.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(school_id, Some(tenant.school_id));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assignment_blocked_by_authored_content_in_old_school(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let second_school = create_school(&pool, &tenant.manager).await;
    let assistant = create_user(&pool, Role::Educator, Some(tenant.school_id)).await;
    post_message(&pool, &tenant.student, tenant.course_id, None).await;
    add_resource(&pool, &assistant, tenant.course_id).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.manager);
    let uri = format!("/api/schools/{second_school}/users");

    for (user, role) in [(&tenant.student, "student"), (&assistant, "educator")] {
        let (status, body) = send(
            &app,
            "POST",
            &uri,
            Some(token.as_str()),
            Some(json!({ "user_id": user.public_id, "role": role })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{role}");
        assert_eq!(body["errors"]["reason"], "history_exists");
    }

    let moved: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE school_id = $1")
        .bind(second_school)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(moved, 0);

    let uri = format!("/api/schools/{second_school}");
    let (status, _) = send(&app, "DELETE", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
}
