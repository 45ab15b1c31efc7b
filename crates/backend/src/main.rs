use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod db;
pub mod error;
mod models;
mod routes;
mod schema;
mod store;

use auth::{AuthGuard, GoogleOAuthClient, OAuthSettings, TokenService};
use config::Config;
use store::{InMemoryUserStore, PgUserStore, UserStore};

/// Shared handler state. Cheap to clone; built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub oauth: GoogleOAuthClient,
    pub guard: AuthGuard,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let tokens = TokenService::new(config.jwt_secret.clone(), config.token_ttl());
        let oauth = GoogleOAuthClient::new(OAuthSettings::from_config(&config))?;
        let guard = AuthGuard::new(
            tokens.clone(),
            store.clone(),
            config.store_timeout(),
            config::SESSION_COOKIE_NAME,
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            tokens,
            oauth,
            guard,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("backend=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn UserStore> = if config.in_memory_store {
        tracing::warn!("Using in-memory user store, accounts are lost on restart");
        Arc::new(InMemoryUserStore::new())
    } else {
        let pool = db::establish_connection_pool(&config.database_url)?;
        Arc::new(PgUserStore::new(pool, config.store_timeout()))
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = routes::build_router(AppState::new(config, store)?);

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
