//! AI worker client configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the external summarization service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of the AI worker.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// URL the worker should call back when done.
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Summary language used when a request does not name one.
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            callback_url: None,
            default_language: default_language(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_language() -> String {
    "en".to_string()
}
