//! Layered service configuration: defaults, optional TOML file, then
//! `FASHION__*` environment variables.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use fashion_common::color::naming::ColorNaming;
use fashion_common::pipeline::AnalyzerSettings;
use ort_common::backend::BackendOptions;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "FASHION";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Prefix all routes are nested under, e.g. `/ai` or `/api`. Empty for none.
    pub route_prefix: String,
    pub request_timeout_secs: u64,
    /// How long a pending item selection stays valid.
    pub session_ttl_secs: u64,
    pub session_sweep_secs: u64,
    /// Pending selections kept at once; the oldest is evicted beyond this.
    pub max_sessions: usize,
    pub max_body_bytes: usize,
    /// Use the fast color preset everywhere (mobile deployments).
    pub fast_colors: bool,
    pub color_naming: ColorNaming,
    pub backend: BackendOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            route_prefix: String::new(),
            request_timeout_secs: 30,
            session_ttl_secs: 600,
            session_sweep_secs: 60,
            max_sessions: 256,
            max_body_bytes: 16 * 1024 * 1024,
            fast_colors: false,
            color_naming: ColorNaming::CssNearest,
            backend: BackendOptions::default(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: &Path, env: config::Environment) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| format!("Failed to load configuration from {path:?}"))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Normalized route prefix (`/ai`), or `None` when routes live at the root.
    pub fn route_prefix(&self) -> Option<String> {
        let trimmed = self.route_prefix.trim().trim_matches('/');
        (!trimmed.is_empty()).then(|| format!("/{trimmed}"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs.max(1))
    }

    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        let settings = if self.fast_colors {
            AnalyzerSettings::fast()
        } else {
            AnalyzerSettings::default()
        };
        settings.with_naming(self.color_naming)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
