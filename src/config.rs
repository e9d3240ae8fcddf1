use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::citation::ChapterPageMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Mock,
    Http,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Mock => "mock",
            BackendKind::Http => "http",
        }
    }

    pub fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" | "live" => BackendKind::Http,
            _ => BackendKind::Mock,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Multiplier applied to every simulated latency. 0 disables the delays.
    pub latency_scale: f64,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_base_url: String,
    pub backend: BackendKind,
    pub http_timeout: Duration,
    pub chapter_map_path: Option<PathBuf>,
    pub mock: MockConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("TUTOR_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            api_base_url: env::var("TUTOR_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            backend: env::var("TUTOR_BACKEND")
                .map(|v| BackendKind::from_env_value(&v))
                .unwrap_or(BackendKind::Mock),
            http_timeout: Duration::from_secs(
                env::var("TUTOR_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            chapter_map_path: env::var("TUTOR_CHAPTER_MAP").ok().map(PathBuf::from),
            mock: MockConfig {
                latency_scale: env::var("TUTOR_MOCK_LATENCY_SCALE")
                    .ok()
                    .and_then(|v| v.parse::<f64>().ok())
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .unwrap_or(1.0),
            },
        }
    }

    pub fn chapter_page_map(&self) -> Result<ChapterPageMap> {
        match &self.chapter_map_path {
            Some(path) => ChapterPageMap::from_json_file(path),
            None => Ok(ChapterPageMap::default()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            api_base_url: "http://localhost:8080".to_string(),
            backend: BackendKind::Mock,
            http_timeout: Duration::from_secs(30),
            chapter_map_path: None,
            mock: MockConfig { latency_scale: 1.0 },
        }
    }
}
