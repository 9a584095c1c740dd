//! HTTP API.
//!
//! | route | body | response |
//! |---|---|---|
//! | `GET /health` | | `{ok, env, provider, budget}` |
//! | `POST /analyze?provider=` | `{text}` | `{nodes, links, provider, budget?}` |
//! | `POST /extract` | `{url}` | `{url, length, text}` |
//!
//! Failures are `{"detail": "..."}`; a spent budget is 429, bad input 400.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{AnalyzeResponse, ExtractResponse, HealthResponse};

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::budget::BudgetGuard;
use crate::config::Settings;
use crate::extract::TextExtractor;
use crate::observability::request_span;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub budget: Arc<BudgetGuard>,
    pub extractor: TextExtractor,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let budget = BudgetGuard::from_settings(&settings);
        Self {
            settings: Arc::new(settings),
            budget: Arc::new(budget),
            extractor: TextExtractor::new(),
        }
    }

    pub fn with_budget(mut self, budget: BudgetGuard) -> Self {
        self.budget = Arc::new(budget);
        self
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.frontend_origin);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/extract", post(handlers::extract))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                request_span(request.method().as_str(), request.uri().path())
            }),
        )
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(AllowOrigin::exact(origin)),
        Err(_) => {
            tracing::warn!(origin, "invalid FRONTEND_ORIGIN; cross-origin requests disabled");
            layer
        }
    }
}
