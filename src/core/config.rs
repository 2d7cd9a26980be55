use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::investors::{DEFAULT_RECOMMENDATION_COUNT, DatasetSource};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_hostname: String,
    // Checked when the first completion is requested, not at startup
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub max_tokens: u32,
    pub dataset: DatasetSource,
    pub recommendation_count: usize,
    pub readiness_path: Option<String>,
    pub static_dir: String,
    /// Idle sessions older than this are dropped by the server
    pub session_ttl: Duration,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {}", key, value);
            default
        }),
        Err(_) => default,
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let static_dir = env::var("FINDA_STATIC_DIR").unwrap_or("./web-ui".to_string());
        let openai_api_hostname = env::var("FINDA_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key = env::var("OPENAI_API_KEY").ok();
        let openai_model =
            env::var("FINDA_LLM_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        let max_tokens = env_or("FINDA_MAX_TOKENS", 800);
        let recommendation_count =
            env_or("FINDA_RECOMMENDATION_COUNT", DEFAULT_RECOMMENDATION_COUNT);
        let readiness_path = env::var("FINDA_READINESS_PATH").ok();
        let session_ttl = Duration::from_secs(env_or("FINDA_SESSION_TTL_SECS", 60 * 60));

        // A URL takes precedence over a local file
        let dataset = match env::var("FINDA_DATASET_URL") {
            Ok(url) => DatasetSource::Url(url),
            Err(_) => DatasetSource::File(PathBuf::from(
                env::var("FINDA_DATASET_PATH")
                    .unwrap_or_else(|_| format!("{}/data/vcs.csv", static_dir)),
            )),
        };

        Self {
            openai_api_hostname,
            openai_api_key,
            openai_model,
            max_tokens,
            dataset,
            recommendation_count,
            readiness_path,
            static_dir,
            session_ttl,
        }
    }
}
