use auth_hub::config::{ConfigError, StoreBackend, environment, parse_config};
use config::{Config, File, FileFormat};
use std::time::Duration;

fn build(yaml: &str, env: &[(&str, &str)]) -> Result<auth_hub::config::AppConfig, ConfigError> {
    let env: config::Map<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let cfg = Config::builder()
        .add_source(File::from_str(yaml, FileFormat::Yaml))
        .add_source(environment().source(Some(env)))
        .build()?;
    parse_config(cfg)
}

#[test]
fn test_app_config_deserialization() {
    let yaml_content = r#"
bind_address: "127.0.0.1:9000"
issuer_url: "https://auth.example.com"
client_ids: ["shop-a", "shop-b"]
allowed_origins: ["https://shop-a.example.com"]
store:
  backend: redis
  redis_url: "redis://127.0.0.1:6379/0"
tokens:
  access_token_lifetime: 900
  refresh_token_lifetime: 86400
  revoke_rotated_refresh_tokens: true
users:
  - email: "a@b.com"
    password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA"
"#;

    let config = build(yaml_content, &[]).expect("valid config");
    assert_eq!(config.bind_address.port(), 9000);
    assert_eq!(config.issuer_url, "https://auth.example.com");
    assert!(config.is_registered_client("shop-b"));
    assert!(!config.is_registered_client("demo-store-1"));
    assert_eq!(config.allowed_origins.len(), 1);
    assert_eq!(config.store.backend, StoreBackend::Redis);
    assert_eq!(config.tokens.access_token_ttl(), Duration::from_secs(900));
    assert_eq!(config.tokens.refresh_token_ttl(), Duration::from_secs(86400));
    // untouched lifetimes keep their defaults
    assert_eq!(config.tokens.auth_session_lifetime, 600);
    assert_eq!(config.tokens.authorization_code_lifetime, 300);
    assert!(config.tokens.revoke_rotated_refresh_tokens);
    assert_eq!(config.users.len(), 1);
}

#[test]
fn test_environment_overrides_file() {
    let config = build(
        "issuer_url: \"https://file.example.com\"\n",
        &[
            ("ISSUER_URL", "https://env.example.com"),
            ("CLIENT_IDS", "one,two,three,four"),
            ("TOKENS__ACCESS_TOKEN_LIFETIME", "120"),
            ("STORE__BACKEND", "memory"),
        ],
    )
    .expect("valid config");

    assert_eq!(config.issuer_url, "https://env.example.com");
    assert_eq!(config.client_ids, vec!["one", "two", "three", "four"]);
    assert_eq!(config.tokens.access_token_lifetime, 120);
    assert_eq!(config.store.backend, StoreBackend::Memory);
}

#[test]
fn test_invalid_configurations_are_rejected() {
    let unknown_backend = build("store:\n  backend: memcached\n", &[]);
    assert!(matches!(unknown_backend, Err(ConfigError::Build(_))));

    let zero_code_lifetime = build("tokens:\n  authorization_code_lifetime: 0\n", &[]);
    assert!(matches!(
        zero_code_lifetime,
        Err(ConfigError::Validation(_))
    ));

    let blank_clients = build("client_ids: [\"  \"]\n", &[]);
    assert!(matches!(blank_clients, Err(ConfigError::Validation(_))));
}
