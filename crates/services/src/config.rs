use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether integrations simulate their providers or call them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Demo,
    Live,
}

impl RuntimeMode {
    pub fn from_demo_flag(demo: bool) -> Self {
        if demo {
            RuntimeMode::Demo
        } else {
            RuntimeMode::Live
        }
    }

    pub fn is_demo(&self) -> bool {
        *self == RuntimeMode::Demo
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub mode: RuntimeMode,
    /// Base URL of the NexaFlow server hosting the `/api/*` proxy routes
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Simulated latency of a demo-mode file import
    #[serde(default = "default_import_latency_ms")]
    pub import_latency_ms: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_import_latency_ms() -> u64 {
    2000
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Demo,
            api_base_url: default_api_base_url(),
            import_latency_ms: default_import_latency_ms(),
        }
    }
}

impl ServicesConfig {
    pub fn new(mode: RuntimeMode, api_base_url: impl Into<String>) -> Self {
        Self {
            mode,
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Absolute URL of a proxy route, e.g. `endpoint("/api/email/send")`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    pub fn import_latency(&self) -> Duration {
        Duration::from_millis(self.import_latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ServicesConfig::new(RuntimeMode::Live, "https://nexaflow.test/");
        assert_eq!(config.endpoint("/api/ai/generate"), "https://nexaflow.test/api/ai/generate");
    }

    #[test]
    fn test_defaults_to_demo_with_two_second_import() {
        let config: ServicesConfig = serde_json::from_str("{}").unwrap();
        assert!(config.mode.is_demo());
        assert_eq!(config.import_latency(), Duration::from_secs(2));
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(RuntimeMode::from_demo_flag(true), RuntimeMode::Demo);
        assert_eq!(RuntimeMode::from_demo_flag(false), RuntimeMode::Live);
    }
}
