//! delivery-server - food-ordering order lifecycle service
//!
//! - HTTP API for checkout, baskets and owner order handling
//! - SSE push of order status and review prompts
//! - Background auto-cancel and review-prompt schedulers

use std::sync::Arc;

use delivery_server::core::{BackgroundTasks, TaskKind};
use delivery_server::scheduler::{AutoCancelScheduler, ReviewPromptScheduler};
use delivery_server::{AppState, Config, Storage, api, sms};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "delivery_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting delivery-server (env: {})", config.environment);
    if config.is_development() {
        tracing::warn!("Development mode: JWT secret and SMS gateway may be placeholders");
    }

    if let Some(parent) = std::path::Path::new(&config.database_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let storage = Storage::open(&config.database_path)?;
    tracing::info!(path = %config.database_path, "Storage opened");

    let sms = sms::from_config(&config)?;
    let state = AppState::new(config.clone(), storage.clone(), sms);

    // Background schedulers
    let mut tasks = BackgroundTasks::new();

    let auto_cancel = Arc::new(AutoCancelScheduler::new(
        storage.clone(),
        state.events.clone(),
        config.auto_cancel_grace,
    ));
    let token = tasks.shutdown_token();
    let (delay, period) = (config.scheduler_initial_delay, config.auto_cancel_interval);
    tasks.spawn("auto_cancel", TaskKind::Periodic, async move {
        auto_cancel.run(delay, period, token).await;
    });

    let review_prompt = Arc::new(ReviewPromptScheduler::new(
        storage,
        state.events.clone(),
        state.registry.clone(),
        config.review_prompt_delay,
        config.review_prompt_window,
    ));
    let token = tasks.shutdown_token();
    let (delay, period) = (config.scheduler_initial_delay, config.review_prompt_interval);
    tasks.spawn("review_prompt", TaskKind::Periodic, async move {
        review_prompt.run(delay, period, token).await;
    });

    tasks.log_summary();

    let app = api::create_router(state);
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("delivery-server HTTP listening on {http_addr}");

    let shutdown = tasks.shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    tasks.shutdown().await;
    Ok(())
}
