//! Test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{Router, body::Body};
use tempfile::TempDir;

use finda::ai::chat::Advisor;
use finda::api::AppState;
use finda::api::app;
use finda::core::AppConfig;
use finda::investors::DatasetSource;

pub const TEST_CSV: &str = "Investor name,Website,Global HQ,Stage of investment,Investor type,First cheque minimum,First cheque maximum
Acme Ventures,https://acme.vc,\"Austin, TX\",Seed,Venture Capital,$100K,$1M
Beta Capital,https://beta.vc,\"London, UK\",\"Seed, Early\",Venture Capital,$250K,$2M
Gamma Partners,https://gamma.vc,Berlin,Pre-seed,Angel Network,$25K,$100K
Delta Fund,https://delta.vc,Paris,Growth,Venture Capital,$5M,$20M
Epsilon,https://epsilon.vc,Toronto,Seed,Accelerator,$50K,$150K
Zeta Labs,https://zeta.vc,Singapore,\"Seed, Early\",Venture Capital,$500K,$3M
Eta Capital,https://eta.vc,Sydney,Early,Venture Capital,$1M,$5M
";

/// Creates a static directory holding the dataset at data/vcs.csv.
pub fn static_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = dir.path().join("data");
    fs::create_dir_all(&data_dir).expect("Failed to create data directory");
    fs::write(data_dir.join("vcs.csv"), TEST_CSV).expect("Failed to write dataset");
    dir
}

pub fn test_config(static_dir: &Path, openai_api_hostname: &str, api_key: Option<&str>) -> AppConfig {
    AppConfig {
        openai_api_hostname: openai_api_hostname.to_string(),
        openai_api_key: api_key.map(String::from),
        openai_model: String::from("gpt-4o"),
        max_tokens: 800,
        dataset: DatasetSource::File(static_dir.join("data").join("vcs.csv")),
        recommendation_count: 6,
        readiness_path: None,
        static_dir: static_dir.display().to_string(),
        session_ttl: Duration::from_secs(60 * 60),
    }
}

pub fn test_state(config: AppConfig) -> Arc<RwLock<AppState>> {
    let advisor = Advisor::from_config(&config).expect("Failed to build advisor");
    Arc::new(RwLock::new(AppState::new(advisor, config)))
}

/// Creates a test application router backed by a temporary static
/// directory. The directory must outlive the router.
pub fn test_app(static_dir: &Path, openai_api_hostname: &str) -> Router {
    let config = test_config(static_dir, openai_api_hostname, Some("test-api-key"));
    app(test_state(config))
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// An OpenAI style SSE body streaming `fragments`.
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let chunk = serde_json::json!({
            "choices": [{"index": 0, "delta": {"content": fragment}, "finish_reason": null}]
        });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
