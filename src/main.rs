use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autopost::config::Config;
use autopost::services::generator::ContentGenerator;
use autopost::services::llm::ChatCompletionsClient;
use autopost::services::pipeline::Pipeline;
use autopost::services::prompt::PromptComposer;
use autopost::services::publisher::Publisher;
use autopost::scheduler::Scheduler;
use autopost::services::twitter::TwitterClient;
use autopost::{AppState, build_router};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,autopost=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let llm = ChatCompletionsClient::new(
        &config.generator.base_url,
        &config.generator.api_key,
        config.generator.timeout(),
    )
    .context("Failed to build language model client")?;
    let generator = ContentGenerator::new(Arc::new(llm), config.generator.settings());

    let twitter = TwitterClient::new(
        config.twitter.credentials(),
        &config.twitter.api_base,
        config.twitter.timeout(),
    )
    .context("Failed to build X client")?;
    let publisher = Publisher::new(Arc::new(twitter), &config.twitter.status_url_base);

    let pipeline = Arc::new(Pipeline::new(
        PromptComposer::default(),
        generator,
        publisher,
        pool.clone(),
    ));

    let scheduler_task = if config.scheduler.enabled {
        let scheduler = Scheduler::new(
            pool.clone(),
            Arc::clone(&pipeline),
            config.scheduler.max_concurrent,
        );
        let interval = std::time::Duration::from_secs(config.scheduler.interval_secs);
        Some(tokio::spawn(async move { scheduler.run(interval).await }))
    } else {
        info!("Background scheduler disabled");
        None
    };

    let state = Arc::new(AppState {
        db: pool,
        pipeline: Arc::clone(&pipeline),
    });
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(model = %config.generator.model, "Listening on http://{}", addr);

    // The rate limiter keys on the peer address when no proxy headers are present
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    // Publications already handed to the pipeline keep running until recorded
    if let Some(task) = scheduler_task {
        task.abort();
    }
    pipeline.shutdown().await;
    served.context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
