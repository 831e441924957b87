use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::{
    forgot_password, login_user, logout, refresh_tokens, register_user, reset_password,
};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/refresh", post(refresh_tokens))
        .route("/logout", post(logout))
        .route("/reset-password", post(forgot_password).patch(reset_password))
}
