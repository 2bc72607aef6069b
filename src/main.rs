//! Wattline Binary Entry Point
//!
//! This binary runs the complete Wattline collection service.
//! Core functionality is provided by the `wattline` library crate.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wattline::{
    AppConfig, DeviceCollector, EnergyAccumulator, EnergySink, HttpTransport, PowerApi,
    TokenManager,
    device::record::DeviceRecord,
    server::{AppState, create_router},
};

/// Wattline - Appliance Telemetry Collector
#[derive(Parser, Debug)]
#[command(name = "wattline", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "WATTLINE_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "WATTLINE_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "WATTLINE_SERVER_PORT")]
    server_port: Option<u16>,

    /// Appliance base URL (overrides config file)
    #[arg(long, env = "WATTLINE_APPLIANCE_URL")]
    appliance_url: Option<String>,
}

type DeviceSnapshot = Arc<RwLock<Vec<DeviceRecord>>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wattline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Wattline - Appliance Telemetry Collector");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(url) = cli.appliance_url {
        config.appliance.base_url = url;
    }
    config.validate()?;

    tracing::info!(
        appliance = %config.appliance.base_url,
        timeout = ?config.appliance.timeout,
        refresh_threshold = ?config.appliance.refresh_threshold,
        "Appliance configured"
    );

    // Wire the collection pipeline
    let transport: Arc<dyn PowerApi> = Arc::new(HttpTransport::new(&config.appliance)?);
    let tokens = TokenManager::new(
        Arc::clone(&transport),
        config.appliance.username.clone(),
        config.appliance.password.clone(),
        config.appliance.refresh_threshold,
    );
    let energy = Arc::new(EnergyAccumulator::new());
    let collector = Arc::new(
        DeviceCollector::new(transport, tokens)
            .with_sink(Arc::clone(&energy) as Arc<dyn EnergySink>),
    );
    let devices: DeviceSnapshot = Arc::new(RwLock::new(Vec::new()));

    // Initial collection so the status API has data immediately
    run_collection(&collector, &devices).await;

    // Schedule periodic collection
    let scheduler = JobScheduler::new().await?;
    let job = collection_job(&config, Arc::clone(&collector), Arc::clone(&devices))?;
    scheduler.add(job).await?;
    scheduler.start().await?;

    match &config.poll.cron {
        Some(expr) => tracing::info!(cron = %expr, "Collection scheduled"),
        None => tracing::info!(interval = ?config.poll.interval_or_default(), "Collection scheduled"),
    }

    // Create web server state
    let app_state = AppState {
        collector: Arc::clone(&collector),
        devices: Arc::clone(&devices),
        energy,
    };
    let app = create_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    tracing::info!("Status server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Build the scheduled collection job from the poll configuration.
fn collection_job(
    config: &AppConfig,
    collector: Arc<DeviceCollector>,
    devices: DeviceSnapshot,
) -> Result<Job, Box<dyn std::error::Error>> {
    let make_callback = move || {
        let (collector, devices) = (Arc::clone(&collector), Arc::clone(&devices));
        move |_: uuid::Uuid, _: JobScheduler| {
            let (collector, devices) = (Arc::clone(&collector), Arc::clone(&devices));
            Box::pin(async move { run_collection(&collector, &devices).await })
                as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        }
    };

    let job = match &config.poll.cron {
        Some(expr) => Job::new_cron_job_async(expr.as_str(), make_callback())?,
        None => Job::new_repeated_async(config.poll.interval_or_default(), make_callback())?,
    };
    Ok(job)
}

/// Execute one collection cycle and publish the snapshot.
async fn run_collection(collector: &Arc<DeviceCollector>, devices: &DeviceSnapshot) {
    let start = std::time::Instant::now();
    match collector.collect_devices().await {
        Ok(records) => {
            let duration_ms = start.elapsed().as_millis();
            tracing::info!(
                devices = records.len(),
                duration_ms,
                "Collection cycle complete"
            );
            *devices.write().await = records;
        }
        Err(err) => {
            tracing::error!(error = %err, kind = %err.kind(), "Collection cycle failed");
        }
    }
}

/// Wait for Ctrl+C, then stop the scheduler before the server exits.
async fn shutdown_signal(mut scheduler: JobScheduler) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }
}
