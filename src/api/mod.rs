mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::Store;

pub fn create_router(store: Store) -> Router {
    let api = Router::new()
        // Intents
        .route("/dispatch", post(handlers::dispatch))
        // Snapshot
        .route("/state", get(handlers::get_state))
        .route("/state/areas", get(handlers::list_area_summaries))
        .route("/state/areas/{id}", get(handlers::get_area_summary))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(store)
}
