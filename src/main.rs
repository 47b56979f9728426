use chrono::Duration as ChronoDuration;
use clap::Parser;
use slotbook::api::build_router;
use slotbook::config::file::FileConfig;
use slotbook::domain::ports::{Notifier, PaymentGateway};
use slotbook::utils::error::ErrorSeverity;
use slotbook::utils::{logger, validation::Validate};
use slotbook::{
    Coordinator, ExpirySweeper, HttpPaymentGateway, InMemoryGrid, InMemoryReservationStore,
    LogNotifier, RetryPolicy, SandboxGateway, ServerConfig, WebhookNotifier,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = ServerConfig::parse();

    if let Some(path) = config.config_file.clone() {
        match FileConfig::load(&path) {
            Ok(file_config) => file_config.apply_to(&mut config),
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
                std::process::exit(1);
            }
        }
    }

    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_server_logger(config.verbose);
    }

    tracing::info!("Starting slotbook server");
    if config.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!(
            "❌ Configuration validation failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code.max(1));
    }

    let grid = InMemoryGrid::new();
    let store = InMemoryReservationStore::new();

    let gateway: Arc<dyn PaymentGateway> = match &config.gateway_url {
        Some(url) => {
            tracing::info!("Using payment gateway at {}", url);
            Arc::new(HttpPaymentGateway::new(url.clone()))
        }
        None => {
            tracing::warn!("No gateway URL configured, using the in-process sandbox gateway");
            Arc::new(SandboxGateway::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notify_url {
        Some(url) => {
            tracing::info!("Notifying outcomes to {}", url);
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    let retry = RetryPolicy::new(
        config.gateway_retry_attempts,
        Duration::from_millis(config.gateway_retry_delay_ms),
    );

    let coordinator = Arc::new(Coordinator::new(grid, store, gateway, notifier, retry));

    let sweeper = ExpirySweeper::new(
        Arc::clone(&coordinator),
        Duration::from_secs(config.sweep_interval_secs),
        ChronoDuration::hours(config.pending_timeout_hours),
    );
    let sweeper_shutdown = sweeper.spawn();

    let router = build_router(coordinator);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("✅ Listening on {}", config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the sweeper before the runtime drops so a pass in flight can
    // finish its current reservation.
    let _ = sweeper_shutdown.send(true);
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
