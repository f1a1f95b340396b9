//! SayWrite API Server
//!
//! REST API server for the SayWrite dictation backend.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use saywrite_api::auth::repository::PgUserRepository;
use saywrite_api::{create_router, db, state::AppState};
use saywrite_core::config::{AppConfig, LoggingConfig};
use saywrite_providers::{create_rewrite_provider, create_stt_provider};
use std::sync::Arc;

fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "saywrite_api={0},saywrite_providers={0},audit=info,tower_http=info",
            config.level
        )
        .into()
    });

    if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// `CONFIG_FILE` names an optional TOML file; environment variables win
fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load {path}"))?
            .with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    let config = load_config()?;
    init_tracing(&config.logging);
    tracing::debug!(auth = ?config.auth, "Configuration loaded");

    // Database
    let pool = db::connect(&config.database).context("Invalid DATABASE_URL")?;
    let users = Arc::new(PgUserRepository::new(pool.clone()));
    match db::init_schema(&pool).await {
        Ok(()) => {
            if config.database.seed_test_user {
                if let Err(e) = db::seed_test_user(users.as_ref()).await {
                    tracing::warn!(error = %e, "Failed to seed test user");
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Database not reachable at startup");
        }
    }

    // Providers
    let stt = create_stt_provider(&config);
    let llm = create_rewrite_provider(&config.llm);
    tracing::info!(stt = stt.name(), llm = llm.name(), "Providers configured");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, users, stt, llm));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("SayWrite API Server starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
