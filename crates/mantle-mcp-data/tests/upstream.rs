//! Client tests against a local mock of the upstream APIs.

use std::collections::HashMap;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};

use mantle_mcp_data::defillama::HealthCategory;
use mantle_mcp_data::{
    DataError, DefiLlamaClient, DefiLlamaConfig, PageQuery, RecoupClient, RecoupConfig,
};

const USDC: &str = "0x09Bc4E0D864854c6aFB6eB9A9cdF58aC190D0dF9";

fn mock_upstream() -> Router {
    Router::new()
        .route(
            "/prices/current/{coin}",
            get(|Path(coin): Path<String>| async move {
                if coin.eq_ignore_ascii_case(&format!("mantle:{USDC}")) {
                    // Address echoed lower-cased, as the live API does.
                    let mut coins = serde_json::Map::new();
                    coins.insert(
                        coin.to_lowercase(),
                        json!({
                            "symbol": "USDC", "price": 0.9998, "decimals": 6,
                            "timestamp": 1_735_689_600, "confidence": 0.99
                        }),
                    );
                    Json(json!({ "coins": coins }))
                } else {
                    Json(json!({ "coins": {} }))
                }
            }),
        )
        .route(
            "/v2/historicalChainTvl/Mantle",
            get(|| async {
                Json(json!([
                    { "date": 1, "tvl": 100.0 },
                    { "date": 2, "tvl": 90.0 },
                    { "date": 3, "tvl": 99.0 }
                ]))
            }),
        )
        .route(
            "/protocol/{slug}",
            get(|Path(slug): Path<String>| async move {
                if slug != "merchant-moe" {
                    return Err(StatusCode::NOT_FOUND);
                }
                Ok(Json(json!({
                    "name": "Merchant Moe",
                    "twitter": "MerchantMoe_xyz",
                    "github": ["merchant-moe"],
                    "url": "https://merchantmoe.com",
                    "chains": ["Mantle", "Arbitrum"],
                    "audits": "2",
                    "tvl": [{ "date": 1, "totalLiquidityUSD": 5.0 }],
                    "currentChainTvls": { "Mantle": 25_000_000.0 }
                })))
            }),
        )
        .route(
            "/stablecoincharts/Mantle",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let id = q.get("stablecoin").cloned().unwrap_or_default();
                let latest = if id == "1" { 1_500_000.0 } else { 42.0 };
                Json(json!([
                    { "totalCirculating": { "peggedUSD": 1.0 }, "totalBridgedToUSD": { "peggedUSD": 1.0 } },
                    { "totalCirculating": { "peggedUSD": latest }, "totalBridgedToUSD": { "peggedUSD": latest } }
                ]))
            }),
        )
        .route("/api/fans", get(fans))
        .route(
            "/api/posts",
            get(|| async {
                Json(json!({
                    "status": "success",
                    "posts": [{ "id": "p1", "post_url": "https://x.com/a/1", "updated_at": "2025-01-01" }],
                    "pagination": { "total_count": 1, "page": 1, "limit": 20, "total_pages": 1 }
                }))
            }),
        )
        .route(
            "/api/artist-profile",
            get(|| async {
                Json(json!({
                    "status": "success",
                    "profile": {
                        "id": "artist-1",
                        "profiles": [{
                            "id": "s1", "username": "artist",
                            "profile_url": "https://www.instagram.com/artist",
                            "follower_count": 1200, "updated_at": "2025-01-01"
                        }],
                        "total_followers": 1200,
                        "total_following": 10,
                        "total_posts": 33,
                        "updated_at": "2025-01-01"
                    }
                }))
            }),
        )
}

async fn fans(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    if q.get("artist_account_id").map(String::as_str) == Some("missing") {
        return Json(json!({ "status": "error", "message": "Artist not found" }));
    }
    let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let limit: u32 = q.get("limit").and_then(|p| p.parse().ok()).unwrap_or(0);
    Json(json!({
        "status": "success",
        "fans": [{ "id": "f1", "username": "superfan", "followerCount": 7 }],
        "pagination": { "total_count": 41, "page": page, "limit": limit, "total_pages": 3 }
    }))
}

/// Serve the mock on an ephemeral port and return its base URL.
async fn spawn_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, mock_upstream()).await.unwrap();
    });
    format!("http://{addr}")
}

async fn llama() -> DefiLlamaClient {
    let base = spawn_upstream().await;
    DefiLlamaClient::new(&DefiLlamaConfig {
        coins_base_url: base.clone(),
        api_base_url: base.clone(),
        stablecoins_base_url: base,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

async fn recoup() -> RecoupClient {
    let base = spawn_upstream().await;
    RecoupClient::new(&RecoupConfig {
        base_url: format!("{base}/api/"),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn token_price_matches_key_case_insensitively() {
    let price = llama().await.token_price(USDC).await.unwrap();
    assert_eq!(price.symbol, "USDC");
    assert!((price.price - 0.9998).abs() < f64::EPSILON);
    assert_eq!(price.decimals, Some(6));
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let err = llama().await.token_price("0xdead").await.unwrap_err();
    assert!(matches!(err, DataError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn chain_tvl_summary_from_history() {
    let summary = llama().await.chain_tvl_summary().await.unwrap();
    assert!((summary.latest - 99.0).abs() < f64::EPSILON);
    assert!((summary.daily_change_pct - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn protocol_summary_scores_health() {
    let summary = llama().await.protocol_summary("merchant-moe").await.unwrap();
    assert_eq!(summary.name, "Merchant Moe");
    assert!(summary.is_multi_chain);
    // 40 (TVL) + 15 + 15 + 10 + 10
    assert_eq!(summary.health.score, 90);
    assert_eq!(summary.health.category, HealthCategory::Healthy);
}

#[tokio::test]
async fn missing_protocol_surfaces_http_status() {
    let err = llama().await.protocol("nope").await.unwrap_err();
    assert!(matches!(err, DataError::Api { status: 404, .. }), "got {err:?}");
}

#[tokio::test]
async fn stablecoin_tvl_takes_latest_point() {
    let client = llama().await;
    assert!((client.stablecoin_tvl(1).await.unwrap() - 1_500_000.0).abs() < f64::EPSILON);
    assert!((client.stablecoin_tvl(2).await.unwrap() - 42.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn fans_forwards_paging() {
    let page = recoup()
        .await
        .fans("artist-1", PageQuery::new(Some(2), Some(50)))
        .await
        .unwrap();
    assert_eq!(page.fans.len(), 1);
    assert_eq!(page.fans[0].follower_count, 7);
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.pagination.limit, 50);
}

#[tokio::test]
async fn error_envelope_becomes_upstream_error() {
    let err = recoup()
        .await
        .fans("missing", PageQuery::default())
        .await
        .unwrap_err();
    match err {
        DataError::Upstream(msg) => assert_eq!(msg, "Artist not found"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn invalid_limit_rejected_locally() {
    let err = recoup()
        .await
        .posts("artist-1", PageQuery::new(None, Some(101)))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Validation(_)));
}

#[tokio::test]
async fn posts_and_profile_decode() {
    let client = recoup().await;
    let posts = client.posts("artist-1", PageQuery::default()).await.unwrap();
    assert_eq!(posts.posts[0].post_url, "https://x.com/a/1");

    let profile = client.artist_profile("artist-1").await.unwrap();
    assert_eq!(profile.total_posts, 33);
    assert_eq!(profile.profiles[0].platform(), "www.instagram.com");
}
