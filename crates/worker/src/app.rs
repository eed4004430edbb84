//! Worker startup and lifetime.

use std::sync::Arc;

use doseminder_db::{PgNotificationPreferences, PgReminderStorage};
use doseminder_events::delivery::webhook::WebhookError;
use doseminder_events::{
    EmailConfig, EmailDelivery, ReminderScheduler, UserNotifier, WebhookDelivery,
};

use crate::config::{ConfigError, WorkerConfig};

/// Failure that prevents the worker from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Webhook client could not be built: {0}")]
    Webhook(#[from] WebhookError),
}

/// Connect, wire the scheduler, and run until SIGINT or SIGTERM.
pub async fn run(config: WorkerConfig) -> Result<(), StartupError> {
    let pool =
        doseminder_db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database connection pool created");

    doseminder_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    doseminder_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Notifier ---
    let preferences = Arc::new(PgNotificationPreferences::new(pool.clone()));
    let mut notifier = UserNotifier::new(preferences);

    if config.webhook_delivery_enabled {
        notifier = notifier.with_webhook(WebhookDelivery::new()?);
        tracing::info!("Webhook delivery enabled");
    } else {
        tracing::info!("Webhook delivery disabled");
    }

    match EmailConfig::from_env() {
        Some(email) => {
            tracing::info!(smtp_host = %email.smtp_host, "Email delivery enabled");
            notifier = notifier.with_email(EmailDelivery::new(email));
        }
        None => tracing::info!("SMTP_HOST not set, email delivery disabled"),
    }

    // --- Scheduler ---
    let storage = Arc::new(PgReminderStorage::new(pool.clone()));
    let scheduler = ReminderScheduler::new(storage, Arc::new(notifier), config.reminder);
    let handle = scheduler.spawn();
    tracing::info!("Reminder scheduler spawned");

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping reminder scheduler");

    match handle.shutdown(config.shutdown_timeout).await {
        Ok(()) => tracing::info!("Reminder scheduler stopped"),
        Err(e) => tracing::error!(error = %e, "Reminder scheduler did not stop cleanly"),
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
