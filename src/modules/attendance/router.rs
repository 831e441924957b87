use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_attendance, delete_attendance, get_attendance, get_attendance_records,
    update_attendance,
};

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_attendance).get(get_attendance_records))
        .route(
            "/{id}",
            get(get_attendance)
                .patch(update_attendance)
                .delete(delete_attendance),
        )
}
