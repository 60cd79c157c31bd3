use auth_hub::api::start_webserver;
use auth_hub::build_state;
use auth_hub::config::load_config_or_panic;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_standard_tracing() {
    let default_directives = "auth_hub=info,tower_http=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    initialize_standard_tracing();

    let config = load_config_or_panic();
    tracing::info!(
        bind_address = %config.bind_address,
        issuer = %config.issuer_url,
        clients = config.client_ids.len(),
        store = ?config.store.backend,
        "configuration loaded"
    );

    let state = build_state(config).await?;
    start_webserver(state).await?;
    Ok(())
}
