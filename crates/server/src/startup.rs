use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use common::utils::logging::{init_logging, LogFormat};
use configs::AppConfig;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};
use tracing::info;

use crate::cookies::CookiePolicy;
use crate::routes::{self, auth::ServerState};
use service::auth::{
    password::SecretHasher,
    repo::seaorm::SeaOrmCredentialStore,
    repository::CredentialStore,
    token::TokenIssuer,
    SessionManager,
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Router plus the outer layers the binary runs with.
pub fn build_app(state: ServerState, request_timeout: Duration) -> Router {
    routes::build_router(state, build_cors()).layer(TimeoutLayer::new(request_timeout))
}

/// Wire the session manager over any credential store.
pub fn build_state(
    cfg: &AppConfig,
    store: Arc<dyn CredentialStore>,
    hasher: SecretHasher,
) -> anyhow::Result<ServerState> {
    let tokens = TokenIssuer::new(&cfg.auth.access_secret, &cfg.auth.refresh_secret)?;
    let sessions = Arc::new(SessionManager::new(store, hasher, tokens)?);
    Ok(ServerState::new(sessions, CookiePolicy::for_environment(cfg.auth.environment)))
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging(LogFormat::from_env());

    // Missing or identical token secrets abort startup here
    let cfg = AppConfig::load_and_validate()?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;

    let store: Arc<dyn CredentialStore> = Arc::new(SeaOrmCredentialStore::new(db));
    let state = build_state(&cfg, store, SecretHasher::default())?;

    if let Some(seed) = &cfg.auth.seed_admin {
        if let Some(admin) = state.sessions.seed_admin(&seed.email, &seed.password, &seed.full_name).await? {
            info!(user_id = %admin.id, email = %admin.email, "bootstrap admin created");
        }
    }

    let app = build_app(state, Duration::from_secs(cfg.server.request_timeout_secs));

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, environment = ?cfg.auth.environment, "starting server crate");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
