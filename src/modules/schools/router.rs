use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    assign_user, create_school, delete_school, get_school, get_school_users, get_schools,
    update_school,
};

pub fn init_schools_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_school).get(get_schools))
        .route(
            "/{id}",
            get(get_school).patch(update_school).delete(delete_school),
        )
        .route("/{id}/users", get(get_school_users).post(assign_user))
}
