/// Application configuration module
use crate::domain::ExecutionMode;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 12_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub listen_addr: String,
    pub client: ClientConfig,
    pub view: ViewDefaults,
}

/// Settings for a single forecast client instance
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub default_timeout: Duration,
    pub user_agent: String,
}

/// Initial selection of the dashboard view
#[derive(Clone, Debug)]
pub struct ViewDefaults {
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub use_satellite: bool,
    pub mode: ExecutionMode,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: "breath-dashboard/0.1".to_string(),
        }
    }
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            state: Some("Colorado".to_string()),
            lat: 39.7392,
            lon: -104.9903,
            use_satellite: false,
            mode: ExecutionMode::Fast,
            timeout: Duration::from_millis(15_000),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = env::var("FORECAST_API_BASE")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = ClientConfig::new(base_url).with_timeout(Duration::from_millis(env_u64(
            "FORECAST_TIMEOUT_MS",
            DEFAULT_TIMEOUT_MS,
        )));

        let defaults = ViewDefaults::default();
        let view = ViewDefaults {
            state: env::var("DEFAULT_STATE").ok().or(defaults.state),
            lat: env_f64("DEFAULT_LAT", defaults.lat),
            lon: env_f64("DEFAULT_LON", defaults.lon),
            use_satellite: env_bool("USE_SATELLITE", defaults.use_satellite),
            mode: env::var("DEFAULT_MODE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.mode),
            timeout: defaults.timeout,
        };

        if !(-90.0..=90.0).contains(&view.lat) || !(-180.0..=180.0).contains(&view.lon) {
            anyhow::bail!(
                "DEFAULT_LAT/DEFAULT_LON out of range: {}, {}",
                view.lat,
                view.lon
            );
        }

        let listen_addr =
            env::var("BREATH_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            listen_addr,
            client,
            view,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.base_url, "http://127.0.0.1:8000");
        assert_eq!(cfg.default_timeout, Duration::from_millis(12_000));
    }

    #[test]
    fn test_client_config_builder() {
        let cfg = ClientConfig::new("http://forecast.local").with_timeout(Duration::from_secs(3));
        assert_eq!(cfg.base_url, "http://forecast.local");
        assert_eq!(cfg.default_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_default_view_matches_state_catalogue() {
        let view = ViewDefaults::default();
        let state = crate::states::find(view.state.as_deref().unwrap()).unwrap();
        assert_eq!((state.lat, state.lon), (view.lat, view.lon));
    }

    #[test]
    fn test_env_helpers_fall_back() {
        assert_eq!(env_u64("BREATH_TEST_UNSET_U64", 7), 7);
        assert_eq!(env_f64("BREATH_TEST_UNSET_F64", 1.5), 1.5);
        assert!(env_bool("BREATH_TEST_UNSET_BOOL", true));
    }
}
