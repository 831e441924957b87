mod common;

use axum::http::StatusCode;
use common::{count, create_school, create_tenant, create_user, enroll, send, test_app, test_state, token_for};
use jifunze_models::Role;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_courses_are_publicly_listed(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let app = test_app(&test_state(pool));

    let (status, body) = send(&app, "GET", "/api/courses", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["total"], 1);

    let uri = format!("/api/courses/{}", tenant.course_id);
    let (status, body) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["educator_id"], tenant.educator.public_id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_educator_creates_course_in_own_school(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.educator);

    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(token.as_str()),
        Some(json!({ "title": "Algebra", "description": "Intro" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["school_id"], tenant.school_id);
    assert_eq!(body["data"]["educator_id"], tenant.educator.public_id.to_string());

    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(token.as_str()),
        Some(json!({ "title": "ALGEBRA" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["reason"], "duplicate_title");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_manager_must_name_a_school_educator(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.manager);

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(token.as_str()),
        Some(json!({ "title": "Biology", "school_id": tenant.school_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(token.as_str()),
        Some(json!({
            "title": "Biology",
            "school_id": tenant.school_id,
            "educator_id": tenant.student.public_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["reason"], "invalid_educator");

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(token.as_str()),
        Some(json!({
            "title": "Biology",
            "school_id": tenant.school_id,
            "educator_id": tenant.educator.public_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_students_cannot_create_courses(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let state = test_state(pool.clone());
    let app = test_app(&state);
    let token = token_for(&state, &tenant.student);

    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(token.as_str()),
        Some(json!({ "title": "Chemistry" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["code"], "InsufficientRole");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_the_teaching_educator_updates_a_course(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    let colleague = create_user(&pool, Role::Educator, Some(tenant.school_id)).await;
    let other_manager = create_user(&pool, Role::Manager, None).await;
    let other_school = create_school(&pool, &other_manager).await;
    let outsider = create_user(&pool, Role::Educator, Some(other_school)).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let uri = format!("/api/courses/{}", tenant.course_id);
    let patch = json!({ "description": "Updated" });

    let token = token_for(&state, &colleague);
    let (status, body) = send(&app, "PATCH", &uri, Some(token.as_str()), Some(patch.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["code"], "Forbidden");

    let token = token_for(&state, &outsider);
    let (status, body) = send(&app, "PATCH", &uri, Some(token.as_str()), Some(patch.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["code"], "CrossTenant");

    let token = token_for(&state, &tenant.educator);
    let (status, body) = send(&app, "PATCH", &uri, Some(token.as_str()), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Updated");

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(token.as_str()),
        Some(json!({ "educator_id": colleague.public_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["fields"][0], "educator_id");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_delete_cascades_to_course_records(pool: PgPool) {
    let tenant = create_tenant(&pool).await;
    enroll(&pool, &tenant.student, tenant.course_id).await;

    let state = test_state(pool.clone());
    let app = test_app(&state);
    let educator_token = token_for(&state, &tenant.educator);
    let student_token = token_for(&state, &tenant.student);

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

    let (status, body) = send(
        &app,
        "POST",
        "/api/messages",
        Some(student_token.as_str()),
        Some(json!({ "course_id": tenant.course_id, "content": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let parent = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/messages",
        Some(educator_token.as_str()),
        Some(json!({ "course_id": tenant.course_id, "content": "Welcome", "parent_id": parent })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/resources",
        Some(educator_token.as_str()),
        Some(json!({
            "course_id": tenant.course_id,
            "title": "Syllabus",
            "url": "https://example.com/syllabus.pdf",
            "type": "pdf"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let token = token_for(&state, &tenant.manager);
    let uri = format!("/api/courses/{}", tenant.course_id);
    let (status, _) = send(&app, "DELETE", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    for table in ["courses", "enrollments", "attendance", "messages", "resources"] {
        assert_eq!(count(&pool, table).await, 0, "{table}");
    }
    assert_eq!(count(&pool, "users").await, 3);
}
