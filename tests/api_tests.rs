use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use radar::api::create_router;
use radar::cache::MemoryCacheStore;
use radar::config::Config;
use radar::provider::SerperProvider;
use radar::radar::RadarService;

fn app(config: Config) -> Router {
    let provider = Arc::new(SerperProvider::new(&config).expect("provider"));
    let radar = RadarService::new(config, provider, Arc::new(MemoryCacheStore::new()));
    create_router(Arc::new(radar))
}

fn configured(server: &MockServer) -> Config {
    Config {
        serper_api_key: Some("test-key".to_string()),
        serper_base_url: server.uri(),
        ..Config::default()
    }
}

async fn post_search(app: Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/radar/search")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&bytes).expect("json parse");
    (status, json)
}

#[tokio::test]
async fn search_returns_classified_leads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/places"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [
                {
                    "title": "Café Lejano",
                    "address": "Autopista Norte km 20",
                    "latitude": 4.95,
                    "longitude": -74.0721
                },
                {
                    "title": "Café Juan",
                    "address": "Cl. 72 #9-10",
                    "latitude": 4.7119,
                    "longitude": -74.0721,
                    "website": "https://juan.example"
                },
                {
                    "title": "Café Sin Web",
                    "address": "Cra. 11 #80-02"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = post_search(
        app(configured(&server)),
        r#"{"keyword":"café","lat":4.7110,"lng":-74.0721,"radius":0.5}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total_found"], 2);
    let leads = body["leads"].as_array().expect("leads array");
    assert_eq!(leads[0]["title"], "Café Sin Web");
    assert_eq!(leads[0]["distance_km"], 0.0);
    assert_eq!(leads[0]["status"], "cold");
    assert_eq!(leads[1]["title"], "Café Juan");
    assert_eq!(leads[1]["distance_km"], 0.1);
    assert_eq!(leads[1]["status"], "qualified");
    assert_eq!(body["failed_points"], json!([]));
}

#[tokio::test]
async fn upstream_failure_is_reported_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/places"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (status, body) = post_search(
        app(configured(&server)),
        r#"{"keyword":"panadería","lat":4.7110,"lng":-74.0721,"radius":5}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_found"], 0);
    assert_eq!(body["leads"], json!([]));
    let failed = body["failed_points"].as_array().expect("failed points");
    assert_eq!(failed.len(), 5);
    assert_eq!(failed[0]["stage"], "provider");
}

#[tokio::test]
async fn missing_keyword_is_bad_request() {
    let (status, body) =
        post_search(app(Config::default()), r#"{"lat":4.7110,"lng":-74.0721}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing parameters: keyword, lat, lng");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (status, body) = post_search(app(Config::default()), "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn missing_api_key_is_server_error() {
    let (status, body) = post_search(
        app(Config::default()),
        r#"{"keyword":"café","lat":4.7110,"lng":-74.0721}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.contains("SERPER_API_KEY"))
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app(Config::default())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&bytes).expect("json parse");
    assert_eq!(json["status"], "ok");
}
