use music_identity::AppResources;
use music_identity::api::start_webserver;
use music_identity::auth::{AuthService, SessionTokenCodec};
use music_identity::config::load_config_or_panic;
use music_identity::oauth::IdentityReconciler;
use music_identity::store::DatabaseAccountStore;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "music_identity=info,tower_http=info,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    initialize_tracing();

    let config = Arc::new(load_config_or_panic());

    let db = Arc::new(Database::connect(&config.database_url).await?);
    let store = Arc::new(DatabaseAccountStore::new(db));
    store.create_schema().await?;

    let tokens = SessionTokenCodec::new(config.jwt_secret.as_bytes(), config.token_ttl());
    let auth = Arc::new(AuthService::new(store, tokens));

    let http = reqwest::Client::builder()
        .user_agent(concat!("music-identity/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let oauth = Arc::new(IdentityReconciler::from_config(
        auth.clone(),
        &config.oauth,
        http,
    ));

    tracing::info!(
        google = config.oauth.google.is_configured(),
        yandex = config.oauth.yandex.is_configured(),
        ttl_secs = config.token_ttl_secs,
        "identity service configured"
    );

    start_webserver(AppResources { auth, oauth, config }).await?;
    Ok(())
}
