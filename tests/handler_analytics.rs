mod common;

use axum::Router;
use axum_test::TestServer;
use outreach_analytics::api::routes::api_routes;
use outreach_analytics::application::services::AnalyticsSettings;
use outreach_analytics::domain::entities::{AnalyticsDomain, MetricsRecord};
use serde_json::{Value, json};

fn server(ctx: &common::TestContext) -> TestServer {
    let app = Router::new()
        .nest("/api", api_routes())
        .with_state(ctx.state.clone());

    TestServer::new(app).unwrap()
}

fn seed_campaigns(ctx: &common::TestContext) {
    let today = common::today();
    ctx.repository
        .seed(AnalyticsDomain::Campaigns, "c1", today, common::sample_metrics());
    ctx.repository.seed(
        AnalyticsDomain::Campaigns,
        "c2",
        today,
        MetricsRecord {
            sent: 50,
            delivered: 40,
            ..Default::default()
        },
    );
}

#[tokio::test]
async fn test_overview_success_envelope() {
    let ctx = common::create_test_context();
    seed_campaigns(&ctx);
    let server = server(&ctx);

    let response = server
        .get("/api/analytics/campaigns/overview")
        .add_query_param("entity_ids", "c1")
        .await;

    response.assert_status_ok();

    let json = response.json::<Value>();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["metrics"]["sent"], 100);
    assert_eq!(json["data"]["formattedRates"]["openRate"], "31.6%");
    assert_eq!(json["data"]["formattedRates"]["deliveryRate"], "95.0%");
    assert_eq!(json["data"]["source"], "database");
}

#[tokio::test]
async fn test_overview_second_read_is_cached() {
    let ctx = common::create_test_context();
    seed_campaigns(&ctx);
    let server = server(&ctx);

    server.get("/api/analytics/campaigns/overview").await;
    let response = server.get("/api/analytics/campaigns/overview").await;

    let json = response.json::<Value>();
    assert_eq!(json["data"]["source"], "cache");
    assert_eq!(json["data"]["metrics"]["sent"], 150);
    assert_eq!(
        ctx.repository
            .reads
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_entity_named_all_is_not_served_the_domain_aggregate() {
    let ctx = common::create_test_context();
    let today = common::today();
    ctx.repository.seed(
        AnalyticsDomain::Campaigns,
        "all",
        today,
        MetricsRecord {
            sent: 1,
            ..Default::default()
        },
    );
    ctx.repository.seed(
        AnalyticsDomain::Campaigns,
        "c1",
        today,
        MetricsRecord {
            sent: 100,
            ..Default::default()
        },
    );
    let server = server(&ctx);

    let aggregate = server
        .get("/api/analytics/campaigns/overview")
        .await
        .json::<Value>();
    assert_eq!(aggregate["data"]["metrics"]["sent"], 101);

    let entity = server
        .get("/api/analytics/campaigns/overview")
        .add_query_param("entity_ids", "all")
        .await
        .json::<Value>();
    assert_eq!(entity["data"]["metrics"]["sent"], 1);
    assert_eq!(entity["data"]["source"], "database");
    assert_eq!(entity["data"]["entityIds"], json!(["all"]));
}

#[tokio::test]
async fn test_entity_order_shares_cache_entry_and_echoes_sorted_ids() {
    let ctx = common::create_test_context();
    seed_campaigns(&ctx);
    let server = server(&ctx);

    let first = server
        .get("/api/analytics/campaigns/overview")
        .add_query_param("entity_ids", "c2,c1,c2")
        .await
        .json::<Value>();
    let second = server
        .get("/api/analytics/campaigns/overview")
        .add_query_param("entity_ids", "c1,c2")
        .await
        .json::<Value>();

    assert_eq!(first["data"]["entityIds"], json!(["c1", "c2"]));
    assert_eq!(second["data"]["source"], "cache");
    assert_eq!(second["data"]["entityIds"], json!(["c1", "c2"]));
    assert_eq!(second["data"]["metrics"]["sent"], 150);
}

#[tokio::test]
async fn test_overview_unknown_domain() {
    let ctx = common::create_test_context();
    let server = server(&ctx);

    let response = server.get("/api/analytics/planets/overview").await;

    response.assert_status_bad_request();

    let json = response.json::<Value>();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["statusCode"], 400);
    assert!(json["error"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_overview_rejects_zero_days() {
    let ctx = common::create_test_context();
    let server = server(&ctx);

    let response = server
        .get("/api/analytics/campaigns/overview")
        .add_query_param("days", "0")
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_overview_fallback_when_database_down() {
    let ctx = common::create_test_context();
    ctx.repository.set_down(true);
    let server = server(&ctx);

    let response = server.get("/api/analytics/campaigns/overview").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["data"]["source"], "fallback");
    assert_eq!(json["data"]["metrics"]["sent"], 0);
    assert_eq!(json["data"]["formattedRates"]["openRate"], "0.0%");
}

#[tokio::test]
async fn test_overview_error_when_fallback_disabled() {
    let ctx = common::create_test_context_with(AnalyticsSettings {
        fallback_enabled: false,
        ..common::test_settings()
    });
    ctx.repository.set_down(true);
    let server = server(&ctx);

    let response = server.get("/api/analytics/campaigns/overview").await;

    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    let json = response.json::<Value>();
    assert_eq!(json["error"]["code"], "DATABASE_CONNECTION_ERROR");
}

#[tokio::test]
async fn test_breakdown_lists_entities_in_order() {
    let ctx = common::create_test_context();
    seed_campaigns(&ctx);
    let server = server(&ctx);

    let response = server.get("/api/analytics/campaigns/breakdown").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    let entities = json["data"]["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["entityId"], "c1");
    assert_eq!(entities[1]["entityId"], "c2");
    assert_eq!(entities[1]["formattedRates"]["deliveryRate"], "80.0%");
    assert_eq!(json["data"]["totals"]["sent"], 150);
}

#[tokio::test]
async fn test_register_entity_and_duplicate() {
    let ctx = common::create_test_context();
    let server = server(&ctx);

    let response = server
        .post("/api/analytics/mailboxes/entities")
        .json(&json!({ "entity_id": "mb-1" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["data"]["entity_id"], "mb-1");

    let response = server
        .post("/api/analytics/mailboxes/entities")
        .json(&json!({ "entity_id": "mb-1" }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_record_events_invalidates_cached_overview() {
    let ctx = common::create_test_context();
    seed_campaigns(&ctx);
    let server = server(&ctx);

    let before = server.get("/api/analytics/campaigns/overview").await;
    assert_eq!(before.json::<Value>()["data"]["metrics"]["replied"], 5);

    let response = server
        .post("/api/analytics/campaigns/entities/c1/events")
        .json(&json!({ "replied": 2 }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["invalidatedEntries"], 1);

    let after = server.get("/api/analytics/campaigns/overview").await;
    let json = after.json::<Value>();
    assert_eq!(json["data"]["source"], "database");
    assert_eq!(json["data"]["metrics"]["replied"], 7);
}

#[tokio::test]
async fn test_record_events_rejects_empty_delta() {
    let ctx = common::create_test_context();
    seed_campaigns(&ctx);
    let server = server(&ctx);

    let response = server
        .post("/api/analytics/campaigns/entities/c1/events")
        .json(&json!({}))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_rates_endpoint() {
    let ctx = common::create_test_context();
    let server = server(&ctx);

    let response = server
        .post("/api/analytics/rates")
        .json(&json!({
            "sent": 100,
            "delivered": 95,
            "opened_tracked": 30,
            "clicked_tracked": 8,
            "replied": 5,
            "bounced": 5
        }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["data"]["formattedRates"]["openRate"], "31.6%");
    assert_eq!(json["data"]["formattedRates"]["replyRate"], "5.3%");
    assert_eq!(json["data"]["formattedRates"]["bounceRate"], "5.0%");
    assert!(json["data"]["funnelWarnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rates_endpoint_reports_funnel_warnings() {
    let ctx = common::create_test_context();
    let server = server(&ctx);

    let response = server
        .post("/api/analytics/rates")
        .json(&json!({ "sent": 10, "delivered": 5, "opened_tracked": 7 }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["data"]["funnelWarnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rates_endpoint_rejects_malformed_body() {
    let ctx = common::create_test_context();
    let server = server(&ctx);

    let response = server
        .post("/api/analytics/rates")
        .json(&json!({ "sent": -1 }))
        .await;

    let json = response.json::<Value>();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}
