use axum::{
    Router,
    http::Method,
    routing::{post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_command, delete_command, get_command, list_commands, update_command,
    update_command_access,
};
use super::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/commands", post(create_command).get(list_commands))
        .route(
            "/commands/:id",
            put(update_command).get(get_command).delete(delete_command),
        )
        .route("/commands/:id/access", put(update_command_access))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
