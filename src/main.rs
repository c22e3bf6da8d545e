//! # Liora
//!
//! Runs the reply agent: a scheduled reply cycle plus the read-only dashboard.
//!
//! ## Environment Variables
//!
//! - `xapi_access_token`: Twitter API Access token (OAuth 2.0 User Context for v2 endpoints)
//! - `OPENAI_API_KEY` / `OPENAI_MODEL`: Reply generation (optional)
//! - `LIORA_MODE`: `auto` (default) or `preview`
//! - `LIORA_SCHEDULE`: Cron expression for reply cycles (defaults to every 4 hours)
//! - `LIORA_RUN_ONCE`: Run a single cycle and exit
//! - `PORT`: Dashboard port (defaults to 3000)

use liora::config::AppConfig;
use liora::cronjob::{run_scheduled_cycle, run_single_cycle, start_reply_cronjob};
use liora::handlers::build_router;
use liora::llm::{FallbackOnlyGenerator, OpenAiGenerator};
use liora::orchestrator::{Collaborators, Orchestrator, ReplyGenerator};
use liora::rate_limit::SystemClock;
use liora::store::DataFiles;
use liora::twitter::TwitterClient;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Main entry point for the liora agent.
///
/// Loads configuration, verifies the Twitter credentials and then either runs a
/// single cycle (`LIORA_RUN_ONCE`) or starts the scheduler next to the dashboard
/// server until Ctrl+C. Configuration or credential failures exit with status 1
/// before any cycle starts.
///
/// # Logging
///
/// The application uses the `env_logger` crate for structured logging. Log levels
/// can be controlled via the `RUST_LOG` environment variable.
///
/// # Example Usage
///
/// ```bash
/// # Preview mode, one cycle, debug logging
/// LIORA_MODE=preview LIORA_RUN_ONCE=true RUST_LOG=debug cargo run
/// ```
#[tokio::main]
async fn main() {
    // Initialize the logging system
    env_logger::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let mut twitter_config = config.twitter.clone();
    match TwitterClient::new(twitter_config.clone())
        .verify_credentials()
        .await
    {
        Ok(username) => {
            if twitter_config.bot_username.is_none() {
                twitter_config.bot_username = Some(username);
            }
        }
        Err(e) => {
            error!("Failed to verify Twitter credentials: {}", e);
            std::process::exit(1);
        }
    }
    let twitter = Arc::new(TwitterClient::new(twitter_config));

    let generator: Arc<dyn ReplyGenerator> = match config.openai.clone() {
        Some(openai) => Arc::new(OpenAiGenerator::new(openai)),
        None => {
            warn!("OPENAI_API_KEY not set - every reply will come from the fallback pool");
            Arc::new(FallbackOnlyGenerator)
        }
    };

    let files = DataFiles::new(&config.data_dir);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator = match Orchestrator::new(
        config.cycle.clone(),
        config.rate_limits,
        files.clone(),
        Collaborators {
            search: twitter.clone(),
            generator,
            poster: twitter.clone(),
        },
        Arc::new(SystemClock),
        shutdown_rx,
    ) {
        Ok(orchestrator) => Arc::new(Mutex::new(orchestrator)),
        Err(e) => {
            error!("Failed to load persisted state from {}: {}", files.dir().display(), e);
            std::process::exit(1);
        }
    };

    if config.run_once {
        info!("Running a single reply cycle");
        let report = run_single_cycle(
            &orchestrator,
            twitter.as_ref(),
            &files,
            &shutdown_tx,
            tokio::signal::ctrl_c(),
        )
        .await;
        if let Some(report) = report {
            info!("Cycle report: {:?}", report);
        }
        return;
    }

    let mut scheduler =
        match start_reply_cronjob(orchestrator.clone(), twitter.clone(), files.clone(), &config.schedule)
            .await
        {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Failed to create cronjob scheduler: {}", e);
                std::process::exit(1);
            }
        };
    if let Err(e) = scheduler.start().await {
        error!("Failed to start cronjob scheduler: {}", e);
        std::process::exit(1);
    }

    // First cycle runs right away instead of waiting for the first tick.
    let first_cycle = {
        let orchestrator = orchestrator.clone();
        let twitter = twitter.clone();
        let files = files.clone();
        tokio::spawn(async move {
            run_scheduled_cycle(&orchestrator, twitter.as_ref(), &files).await;
        })
    };

    let app = build_router(files.clone()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any)),
    );

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Starting liora dashboard on {}", addr);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.shutdown().await {
        warn!("Failed to stop cronjob scheduler: {}", e);
    }
    // Lets an in-flight candidate finish before exiting.
    let _ = orchestrator.lock().await;
    let _ = first_cycle.await;
    info!("Liora stopped");
}
