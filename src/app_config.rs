//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with QUICKPOLL_, sections split by `__`)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like the backend's anon key should be kept in environment
//! variables, not in the config file.

use crate::constants::{DEFAULT_ACCESS_TOKEN_COOKIE, DEFAULT_AVATAR_BUCKET};
use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    /// Address the HTTP server binds to
    pub bind_address: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "QuickPoll".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// An identity known to the in-process backend, for local development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub token: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Hosted backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend kind: "supabase" or "memory"
    pub kind: String,
    /// Project URL, e.g. https://xyz.supabase.co
    pub url: String,
    /// Public anon key (should be in env var QUICKPOLL_BACKEND__ANON_KEY)
    pub anon_key: String,
    /// Request timeout towards the backend
    pub timeout_seconds: u64,
    /// Tokens accepted by the memory backend
    pub seed_users: Vec<SeedUser>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: "supabase".to_string(),
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            timeout_seconds: 10,
            seed_users: Vec::new(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Cookie carrying the access token when no Authorization header is sent
    pub access_token_cookie: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_cookie: DEFAULT_ACCESS_TOKEN_COOKIE.to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket avatars are uploaded to
    pub avatar_bucket: String,
    /// Base of public object URLs (memory backend only; the hosted backend uses its project URL)
    pub public_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            avatar_bucket: DEFAULT_AVATAR_BUCKET.to_string(),
            public_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Content limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Polls returned by the listing endpoint
    pub polls_per_page: u32,
    /// Options shown per poll in listings
    pub options_preview: u32,
    /// Maximum upload size in MB
    pub max_upload_size_mb: u32,
    /// Maximum JSON request body in KB
    pub max_json_payload_kb: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            polls_per_page: 50,
            options_preview: 5,
            max_upload_size_mb: 5,
            max_json_payload_kb: 64,
        }
    }
}

impl LimitsConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb as usize * 1024 * 1024
    }

    pub fn max_json_bytes(&self) -> usize {
        self.max_json_payload_kb as usize * 1024
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // e.g., QUICKPOLL_BACKEND__URL, QUICKPOLL_LIMITS__POLLS_PER_PAGE
            .add_source(
                Environment::with_prefix("QUICKPOLL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reload configuration from file
    pub fn reload() -> Result<(), ConfigError> {
        let new_config = Self::load()?;
        if let Ok(mut config) = APP_CONFIG.write() {
            *config = new_config;
            log::info!("Configuration reloaded");
        }
        Ok(())
    }
}

/// Initialize application configuration
///
/// This triggers the lazy loading of the config file and logs the result.
/// Should be called early in application startup.
pub fn init() {
    let config = get_config();
    log::info!(
        "Configuration loaded: site.name = {}, backend.kind = {}",
        config.site.name,
        config.backend.kind
    );
}

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

pub fn site() -> SiteConfig {
    get_config().site
}

pub fn backend() -> BackendConfig {
    get_config().backend
}

pub fn auth() -> AuthConfig {
    get_config().auth
}

pub fn storage() -> StorageConfig {
    get_config().storage
}

pub fn limits() -> LimitsConfig {
    get_config().limits
}
