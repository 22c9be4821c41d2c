use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "EstateGuard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Primary environment variable for the provider key (build-time name kept
/// for parity with the web front-end).
pub const API_KEY_ENV: &str = "VITE_GOOGLE_API_KEY";
/// Secondary alias consulted when the primary variable is unset.
pub const API_KEY_ENV_ALIAS: &str = "GOOGLE_API_KEY";

/// Bind address override for the fetch proxy server.
pub const PROXY_ADDR_ENV: &str = "ESTATEGUARD_PROXY_ADDR";
const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:8787";

/// User agent sent upstream by the fetch proxy.
pub const PROXY_USER_AGENT: &str = "EstateGuard-AI-Agent/1.0 (Mozilla/5.0)";

const DEFAULT_PROVIDER_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 30;

/// True for debug builds.
pub fn is_dev() -> bool {
    cfg!(debug_assertions)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if is_dev() {
        "estateguard_lib=debug,estateguard_proxy=debug,info"
    } else {
        "info"
    }
}

/// Get the application data directory (~/EstateGuard/).
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default path of the local SQLite store.
pub fn local_store_path() -> PathBuf {
    app_data_dir().join("estateguard.db")
}

/// Resolve the provider API key: explicit key, then `VITE_GOOGLE_API_KEY`,
/// then `GOOGLE_API_KEY`. Empty values are skipped.
pub fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    resolve_api_key_with(explicit, |name| std::env::var(name).ok())
}

/// Same as [`resolve_api_key`] with an injectable environment lookup.
pub fn resolve_api_key_with<F>(explicit: Option<&str>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |s: String| {
        let trimmed = s.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    explicit
        .map(str::to_string)
        .and_then(non_empty)
        .or_else(|| lookup(API_KEY_ENV).and_then(non_empty))
        .or_else(|| lookup(API_KEY_ENV_ALIAS).and_then(non_empty))
}

/// A model identifier paired with the API version it is served under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub name: String,
    pub api_version: String,
}

impl ModelCandidate {
    pub fn new(name: &str, api_version: &str) -> Self {
        Self {
            name: name.to_string(),
            api_version: api_version.to_string(),
        }
    }
}

/// Models tried in order by the fallback runner.
pub fn known_models() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::new("gemini-2.0-flash", "v1beta"),
        ModelCandidate::new("gemini-flash-latest", "v1beta"),
        ModelCandidate::new("gemini-pro-latest", "v1beta"),
        ModelCandidate::new("gemini-2.0-flash-lite", "v1beta"),
    ]
}

/// Generative-language provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub candidates: Vec<ModelCandidate>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            candidates: known_models(),
        }
    }
}

/// Fetch proxy server settings.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind_addr: SocketAddr,
    pub upstream_timeout_secs: u64,
    pub user_agent: String,
}

impl ProxyConfig {
    /// Read the bind address from `ESTATEGUARD_PROXY_ADDR`, falling back to the
    /// default when unset or unparseable.
    pub fn from_env() -> Self {
        let bind_addr = std::env::var(PROXY_ADDR_ENV)
            .ok()
            .and_then(|raw| match raw.parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Ignoring invalid proxy bind address");
                    None
                }
            });
        Self {
            bind_addr: bind_addr.unwrap_or_else(default_proxy_addr),
            ..Self::default()
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_proxy_addr(),
            upstream_timeout_secs: DEFAULT_PROXY_TIMEOUT_SECS,
            user_agent: PROXY_USER_AGENT.to_string(),
        }
    }
}

fn default_proxy_addr() -> SocketAddr {
    DEFAULT_PROXY_ADDR
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8787)))
}

/// Remote backend-as-a-service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: None,
            timeout_secs: 30,
        }
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }
}
