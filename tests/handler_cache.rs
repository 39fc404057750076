mod common;

use axum::Router;
use axum_test::TestServer;
use outreach_analytics::api::routes::api_routes;
use outreach_analytics::domain::entities::{AnalyticsDomain, MetricsRecord};
use serde_json::{Value, json};

fn server(ctx: &common::TestContext) -> TestServer {
    let app = Router::new()
        .nest("/api", api_routes())
        .with_state(ctx.state.clone());

    TestServer::new(app).unwrap()
}

fn seed(ctx: &common::TestContext) {
    let today = common::today();
    for (domain, id) in [
        (AnalyticsDomain::Campaigns, "c1"),
        (AnalyticsDomain::Campaigns, "c2"),
        (AnalyticsDomain::Mailboxes, "m1"),
    ] {
        ctx.repository.seed(
            domain,
            id,
            today,
            MetricsRecord {
                sent: 1,
                ..Default::default()
            },
        );
    }
}

async fn warm_reads(server: &TestServer) {
    server
        .get("/api/analytics/campaigns/overview")
        .add_query_param("entity_ids", "c1")
        .await;
    server
        .get("/api/analytics/campaigns/overview")
        .add_query_param("entity_ids", "c2")
        .await;
    server.get("/api/analytics/mailboxes/overview").await;
}

#[tokio::test]
async fn test_invalidate_entities() {
    let ctx = common::create_test_context();
    seed(&ctx);
    let server = server(&ctx);
    warm_reads(&server).await;
    assert_eq!(ctx.cache.len(), 3);

    let response = server
        .post("/api/cache/invalidate")
        .json(&json!({ "domain": "campaigns", "entity_ids": ["c1"] }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["deletedEntries"], 1);
    assert_eq!(ctx.cache.len(), 2);
}

#[tokio::test]
async fn test_invalidate_domain() {
    let ctx = common::create_test_context();
    seed(&ctx);
    let server = server(&ctx);
    warm_reads(&server).await;

    let response = server
        .post("/api/cache/invalidate")
        .json(&json!({ "domain": "campaigns" }))
        .await;

    assert_eq!(response.json::<Value>()["data"]["deletedEntries"], 2);
    assert_eq!(ctx.cache.len(), 1);
}

#[tokio::test]
async fn test_invalidate_everything() {
    let ctx = common::create_test_context();
    seed(&ctx);
    let server = server(&ctx);
    warm_reads(&server).await;

    let response = server.post("/api/cache/invalidate").json(&json!({})).await;

    assert_eq!(response.json::<Value>()["data"]["deletedEntries"], 3);
    assert!(ctx.cache.is_empty());
}

#[tokio::test]
async fn test_invalidate_rejects_unknown_domain() {
    let ctx = common::create_test_context();
    let server = server(&ctx);

    let response = server
        .post("/api/cache/invalidate")
        .json(&json!({ "domain": "planets" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_warm_runs_strategy() {
    let ctx = common::create_test_context();
    seed(&ctx);
    let server = server(&ctx);

    let response = server.post("/api/cache/warm").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    // campaigns x (overview, breakdown) x (7, 30, 90 days)
    assert_eq!(json["data"]["total"], 6);
    assert_eq!(json["data"]["succeeded"], 6);
    assert_eq!(json["data"]["failed"], 0);
    assert_eq!(ctx.cache.len(), 6);
}

#[tokio::test]
async fn test_warm_counts_failures() {
    let ctx = common::create_test_context();
    ctx.repository.set_down(true);
    let server = server(&ctx);

    let response = server.post("/api/cache/warm").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["data"]["succeeded"], 0);
    assert_eq!(json["data"]["failed"], 6);
    assert!(ctx.cache.is_empty());
}
