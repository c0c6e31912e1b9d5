#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use linguaquest_backend::config::Config;
use linguaquest_backend::db::DocumentStore;
use linguaquest_backend::services::llm_provider::{LLMConfig, LLMProvider};
use linguaquest_backend::state::AppState;

pub const SECRET: &str = "integration-secret";

pub async fn create_test_state() -> AppState {
    let config = Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        log_level: "warn".to_string(),
        log_dir: None,
        database_path: PathBuf::from(":memory:"),
        jwt_secret: Some(SECRET.to_string()),
        default_daily_goal: 20,
    };
    let store = DocumentStore::in_memory().await.unwrap();
    let llm = LLMProvider::new(LLMConfig {
        api_key: None,
        model: "test-model".to_string(),
        api_endpoint: "http://127.0.0.1:9/v1".to_string(),
        timeout: Duration::from_secs(1),
        temperature: 0.0,
    });

    AppState::new(config, store, llm)
}

pub async fn create_test_app() -> Router {
    linguaquest_backend::create_app(create_test_state().await)
}

pub fn token_for(user_id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let exp = chrono::Utc::now().timestamp() + 3600;
    let body = URL_SAFE_NO_PAD.encode(serde_json::json!({ "userId": user_id, "exp": exp }).to_string());
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(format!("{header}.{body}").as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{header}.{body}.{sig}")
}

pub fn authed(method: Method, uri: &str, user_id: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
