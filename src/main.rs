use std::sync::Arc;

use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use faction_badge::auth::{GithubClient, SessionCodec};
use faction_badge::config::{Config, DEV_SESSION_SECRET};
use faction_badge::{logging, routes, store, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting faction badge service");

    if config.session.secret == DEV_SESSION_SECRET {
        tracing::warn!("SESSION_SECRET is not set, using the development default");
    }

    // Initialize components
    let store = store::connect(&config.database)?;

    let github = match (&config.github.client_id, &config.github.client_secret) {
        (Some(client_id), Some(client_secret)) => {
            Some(GithubClient::new(client_id, client_secret))
        }
        _ => {
            tracing::info!("GitHub OAuth not configured, running guest-only");
            None
        }
    };

    let sessions = SessionCodec::new(&config.session.secret);

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        github,
        sessions,
    });

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = routes::app(state.clone())
        .layer(middleware::from_fn_with_state(
            state,
            logging::request_logger,
        ))
        .layer(cors);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
