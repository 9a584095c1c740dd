//! Route handlers.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use crate::budget::BudgetStatus;
use crate::graph::{Graph, connect_to_hub};
use crate::providers::{Provider, TripleExtractor};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub env: String,
    pub provider: String,
    pub budget: f64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        env: state.settings.app_env.clone(),
        provider: state.settings.ai_provider.clone(),
        budget: state.settings.monthly_budget_usd,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub provider: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub graph: Graph,
    pub provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetStatus>,
}

pub async fn analyze(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let provider = Provider::from_name(&query.provider, &state.settings)?;

    let budget = if provider.is_metered() && state.settings.budget_enforce {
        Some(state.budget.enforce().await?)
    } else {
        None
    };

    let triples = provider.extract_triples(&request.text).await?;
    let graph = connect_to_hub(&triples);
    tracing::info!(
        provider = provider.name(),
        triples = triples.len(),
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        "analyzed text"
    );

    Ok(Json(AnalyzeResponse {
        graph,
        provider: provider.name(),
        budget,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub url: String,
    pub length: usize,
    pub text: String,
}

pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("url is required"));
    }

    let text = state
        .extractor
        .extract(url)
        .await
        .map_err(|e| ApiError::bad_request(format!("Could not extract url: {}", e)))?;

    Ok(Json(ExtractResponse {
        url: url.to_string(),
        length: text.chars().count(),
        text,
    }))
}
