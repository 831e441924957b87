use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_message, delete_message, get_message, get_messages, update_message};

pub fn init_messages_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_message).get(get_messages))
        .route(
            "/{id}",
            get(get_message).patch(update_message).delete(delete_message),
        )
}
