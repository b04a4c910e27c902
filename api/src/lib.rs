pub mod form;
pub mod handlers;
pub mod qa_response;
pub mod upload_request;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use qa_system::QaPipeline;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QaPipeline>,
}

impl AppState {
    pub fn new(pipeline: QaPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let max_upload_bytes = state.pipeline.config().max_upload_bytes;

    Router::new()
        .route("/", get(handlers::upload_form).post(handlers::answer_questions))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}
