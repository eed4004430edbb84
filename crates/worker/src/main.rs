use doseminder_worker::app;
use doseminder_worker::config::WorkerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "doseminder_worker=debug,doseminder_events=debug,doseminder_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match WorkerConfig::from_env() {
        Ok(config) => app::run(config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Worker failed to start");
        std::process::exit(1);
    }
}
