use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{change_password, delete_user, get_me, get_user, get_users, update_user};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_users))
        .route("/me", get(get_me))
        .route("/me/password", put(change_password))
        .route(
            "/{public_id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}
