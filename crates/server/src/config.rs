use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Which [`SessionStore`](crate::store::SessionStore) implementation backs the server.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// e.g. `redis://127.0.0.1:6379/0` or `rediss://:token@host:6379`
    #[serde(default)]
    pub redis_url: Option<String>,
}

/// Lifetimes are expressed in seconds.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime: u64,
    #[serde(default = "default_refresh_token_lifetime")]
    pub refresh_token_lifetime: u64,
    #[serde(default = "default_auth_session_lifetime")]
    pub auth_session_lifetime: u64,
    #[serde(default = "default_authorization_code_lifetime")]
    pub authorization_code_lifetime: u64,
    /// Mark the presented refresh token revoked once its successor has been issued.
    #[serde(default)]
    pub revoke_rotated_refresh_tokens: bool,
}

impl TokenConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_lifetime)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_lifetime)
    }

    pub fn auth_session_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_session_lifetime)
    }

    pub fn authorization_code_ttl(&self) -> Duration {
        Duration::from_secs(self.authorization_code_lifetime)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: default_access_token_lifetime(),
            refresh_token_lifetime: default_refresh_token_lifetime(),
            auth_session_lifetime: default_auth_session_lifetime(),
            authorization_code_lifetime: default_authorization_code_lifetime(),
            revoke_rotated_refresh_tokens: false,
        }
    }
}

/// A login known to the built-in credential table.
#[derive(Clone, Debug, Deserialize)]
pub struct UserCredentialConfig {
    pub email: String,
    /// Argon2 PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`
    pub password_hash: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    /// Value of the `iss` claim and base of the discovery document.
    #[serde(default = "default_issuer_url")]
    pub issuer_url: String,
    /// Registered public clients. Anything else is rejected at every endpoint.
    #[serde(default = "default_client_ids")]
    pub client_ids: Vec<String>,
    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub users: Vec<UserCredentialConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            issuer_url: default_issuer_url(),
            client_ids: default_client_ids(),
            allowed_origins: Vec::new(),
            store: StoreConfig::default(),
            tokens: TokenConfig::default(),
            users: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn is_registered_client(&self, client_id: &str) -> bool {
        self.client_ids.iter().any(|c| c == client_id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.client_ids.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "client_ids must contain at least one client".into(),
            ));
        }
        if self.issuer_url.is_empty() {
            return Err(ConfigError::Validation("issuer_url must be set".into()));
        }
        if self.store.backend == StoreBackend::Redis && self.store.redis_url.is_none() {
            return Err(ConfigError::Validation(
                "store.redis_url is required when store.backend is redis".into(),
            ));
        }
        let t = &self.tokens;
        let lifetimes = [
            ("access_token_lifetime", t.access_token_lifetime),
            ("refresh_token_lifetime", t.refresh_token_lifetime),
            ("auth_session_lifetime", t.auth_session_lifetime),
            ("authorization_code_lifetime", t.authorization_code_lifetime),
        ];
        for (name, secs) in lifetimes {
            if secs == 0 {
                return Err(ConfigError::Validation(format!("tokens.{name} must be > 0")));
            }
            if secs > MAX_LIFETIME_SECS {
                return Err(ConfigError::Validation(format!(
                    "tokens.{name} must be at most {MAX_LIFETIME_SECS} seconds"
                )));
            }
        }
        Ok(())
    }
}

/// Upper bound for every configured lifetime (one year).
pub const MAX_LIFETIME_SECS: u64 = 365 * 24 * 3600;

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_issuer_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_client_ids() -> Vec<String> {
    ["demo-store-1", "demo-store-2", "demo-store-3"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_access_token_lifetime() -> u64 {
    3600
}

fn default_refresh_token_lifetime() -> u64 {
    30 * 24 * 3600
}

fn default_auth_session_lifetime() -> u64 {
    600
}

fn default_authorization_code_lifetime() -> u64 {
    300
}

/// Deserialize and validate an already-built [`config::Config`].
pub fn parse_config(cfg: config::Config) -> Result<AppConfig, ConfigError> {
    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Load application configuration from an optional `config.yaml` + environment overrides.
///
/// Environment variables use `__` as the path separator (e.g. `TOKENS__ACCESS_TOKEN_LIFETIME`).
/// `CLIENT_IDS` and `ALLOWED_ORIGINS` accept comma-separated lists.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(environment())
        .build()?;

    parse_config(cfg)
}

/// The environment-variable source used by [`load_config`].
pub fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("client_ids")
        .with_list_parse_key("allowed_origins")
        .try_parsing(true)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
