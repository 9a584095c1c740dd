//! Budget guard against a mocked organization costs endpoint.
//!
//! Run: cargo nextest run --test budget_guard

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use kg_visualizer::budget::{BudgetConfig, BudgetGuard, ManualClock, OpenAiCostSource};
use kg_visualizer::Settings;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COSTS_PATH: &str = "/v1/organization/costs";

fn costs(values: &[f64]) -> serde_json::Value {
    json!({
        "object": "page",
        "data": [{
            "object": "bucket",
            "results": values
                .iter()
                .map(|v| json!({"object": "organization.costs.result", "amount": {"value": v, "currency": "usd"}}))
                .collect::<Vec<_>>()
        }],
        "has_more": false
    })
}

fn guard_for(server: &MockServer, budget_usd: f64) -> BudgetGuard {
    let source = OpenAiCostSource::new(SecretString::from("sk-admin"))
        .with_base_url(server.uri())
        .with_project_id("proj_123");
    BudgetGuard::new(BudgetConfig::new(budget_usd))
        .with_cost_source(Arc::new(source))
        .with_clock(Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        )))
}

// =============================================================================
// Cost query
// =============================================================================

#[tokio::test]
async fn test_query_parameters_and_auth() {
    let server = MockServer::start().await;
    let march = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .and(header("authorization", "Bearer sk-admin"))
        .and(query_param("start_time", march.timestamp().to_string()))
        .and(query_param("bucket_width", "1d"))
        .and(query_param("limit", "180"))
        .and(query_param("project_ids", "proj_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(costs(&[1.25, 0.75])))
        .expect(1)
        .mount(&server)
        .await;

    let status = guard_for(&server, 5.0).get_status().await;
    assert_eq!(status.month_key, "2025-03");
    assert!(status.hard_cap_active);
    assert!((status.spent_usd - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_cached_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(costs(&[1.0])))
        .expect(1)
        .mount(&server)
        .await;

    let guard = guard_for(&server, 5.0);
    guard.enforce().await.unwrap();
    guard.enforce().await.unwrap();
    guard.get_status().await;
}

// =============================================================================
// Enforcement
// =============================================================================

#[tokio::test]
async fn test_hard_block_over_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(costs(&[4.0, 2.0])))
        .mount(&server)
        .await;

    let err = guard_for(&server, 5.0).enforce().await.unwrap_err();
    assert!(err.is_budget_exceeded());
    assert_eq!(err.to_string(), "Monthly budget exceeded (6.00$ / 5.00$).");
}

#[tokio::test]
async fn test_under_budget_passes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(costs(&[4.0])))
        .mount(&server)
        .await;

    let status = guard_for(&server, 5.0).enforce().await.unwrap();
    assert!(status.hard_cap_active);
    assert!((status.remaining_usd() - 1.0).abs() < 1e-9);
}

// =============================================================================
// Fail-open
// =============================================================================

#[tokio::test]
async fn test_server_error_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let guard = guard_for(&server, 0.0);
    let status = guard.enforce().await.unwrap();
    assert!(!status.hard_cap_active);
    assert_eq!(status.spent_usd, 0.0);

    // failure is cached for the TTL too
    guard.enforce().await.unwrap();
}

#[tokio::test]
async fn test_unparseable_body_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let status = guard_for(&server, 0.0).enforce().await.unwrap();
    assert!(!status.hard_cap_active);
}

#[tokio::test]
async fn test_overflowing_total_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(costs(&[5e28, 5e28])))
        .mount(&server)
        .await;

    let status = guard_for(&server, 5.0).enforce().await.unwrap();
    assert!(!status.hard_cap_active);
    assert_eq!(status.spent_usd, 0.0);
}

#[tokio::test]
async fn test_slow_source_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(costs(&[100.0]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let source = OpenAiCostSource::new(SecretString::from("sk-admin")).with_base_url(server.uri());
    let guard = BudgetGuard::new(
        BudgetConfig::new(5.0).fetch_timeout(Duration::from_millis(200)),
    )
    .with_cost_source(Arc::new(source));

    let status = guard.enforce().await.unwrap();
    assert!(!status.hard_cap_active);
}

#[tokio::test]
async fn test_from_settings_without_admin_key_never_blocks() {
    let settings = Settings {
        monthly_budget_usd: 0.0,
        ..Settings::default()
    };
    let guard = BudgetGuard::from_settings(&settings);
    assert!(!guard.has_cost_source());

    let status = guard.enforce().await.unwrap();
    assert!(!status.hard_cap_active);
    assert_eq!(status.budget_usd, 0.0);
}

#[tokio::test]
async fn test_from_settings_uses_base_url_and_project() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COSTS_PATH))
        .and(query_param("project_ids", "proj_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(costs(&[9.0])))
        .expect(1)
        .mount(&server)
        .await;

    let settings = Settings {
        openai_base_url: server.uri(),
        openai_project_id: Some("proj_9".into()),
        ..Settings::default()
    }
    .with_openai_admin_key("sk-admin");

    let guard = BudgetGuard::from_settings(&settings);
    assert!(guard.enforce().await.unwrap_err().is_budget_exceeded());
}
