use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_resource, delete_resource, get_resource, get_resources, update_resource};

pub fn init_resources_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_resource).get(get_resources))
        .route(
            "/{id}",
            get(get_resource).patch(update_resource).delete(delete_resource),
        )
}
