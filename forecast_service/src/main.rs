use anyhow::Context;
use clap::{Parser, Subcommand};
use forecast_engine::{CsvSeriesSource, ForecastEngine};
use forecast_service::{create_router, default_scheduler, ServiceConfig, ServiceContext};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "unrate-forecast", version, about = "UNRATE forecast service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API and the job scheduler (default)
    Serve,
    /// Run one refresh cycle and print the stored record
    Fetch,
    /// E-mail the stored forecast to every subscriber
    Notify,
    /// Forecast offline from a FRED-style CSV file
    Forecast {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forecast_service=info,forecast_engine=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Fetch => {
            let ctx = ServiceContext::from_config(&config);
            let record = tokio::task::spawn_blocking(move || ctx.refresh()).await??;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Command::Notify => {
            let ctx = ServiceContext::from_config(&config);
            let summary = tokio::task::spawn_blocking(move || ctx.notify()).await??;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Forecast { csv } => {
            let series_id = config.fred.series_id.clone();
            let result = tokio::task::spawn_blocking(move || {
                let engine = ForecastEngine::new(CsvSeriesSource::new(csv)).with_series_id(series_id);
                let fetched = engine.fetch_series()?;
                engine.forecast_next(&fetched.series)
            })
            .await??;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    tracing::info!("Starting UNRATE forecast service");
    let ctx = Arc::new(ServiceContext::from_config(&config));

    let has_forecast = {
        let ctx = Arc::clone(&ctx);
        match tokio::task::spawn_blocking(move || ctx.forecasts.load()).await? {
            Ok(stored) => stored.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored forecast unreadable, it will be replaced");
                false
            }
        }
    };
    if !has_forecast {
        tracing::info!("No stored forecast, running initial refresh");
        let ctx = Arc::clone(&ctx);
        tokio::task::spawn_blocking(move || ctx.scheduled_refresh()).await?;
    }

    let scheduler = default_scheduler(Arc::clone(&ctx))?.start();
    tracing::info!(jobs = scheduler.job_count(), "Scheduler started");

    let app = create_router(ctx);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    tracing::info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
