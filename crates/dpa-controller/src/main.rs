//! Dynamic Pod Autoscaler controller
//!
//! Samples each configured target on a fixed cadence, forecasts its next
//! request rate and decides a replica count from the per-pod capacity.

use anyhow::{Context, Result};
use clap::Parser;
use dpa_controller::{api, config::CONFIG_PATH_ENV, ControllerConfig};
use dpa_lib::{
    cycle::{CycleRunner, CycleScheduler, SchedulerConfig, TargetRegistry},
    health::{components, HealthRegistry},
    history::HistoryStore,
    predictor::{ForecastClient, HttpOracle, OnnxOracle, Oracle},
    source::PrometheusSource,
    ControllerMetrics, StructuredLogger,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CONTROLLER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "dpa-controller")]
#[command(version, about = "Dynamic Pod Autoscaler controller")]
struct Args {
    /// Configuration file (TOML, YAML or JSON); `DPA_*` variables override it
    #[arg(long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

fn build_oracle(config: &ControllerConfig) -> Result<Arc<dyn Oracle>> {
    match &config.oracle_model_path {
        Some(path) => {
            let oracle = OnnxOracle::from_file(
                Path::new(path),
                config.history_length,
                config.oracle_model_sha256.as_deref(),
            )
            .context("Failed to load local forecasting model")?;
            Ok(Arc::new(oracle))
        }
        None => Ok(Arc::new(HttpOracle::new(&config.oracle_endpoint)?)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting dpa-controller");

    let config = ControllerConfig::load(args.config.as_deref())?;
    info!(
        controller_name = %config.controller_name,
        targets = config.targets.len(),
        "Controller configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::SAMPLE_SOURCE).await;
    health_registry.register(components::ORACLE).await;
    health_registry.register(components::SCHEDULER).await;

    let metrics = ControllerMetrics::new();
    let logger = StructuredLogger::new(&config.controller_name);

    let oracle = build_oracle(&config)?;
    let source = Arc::new(PrometheusSource::new()?);
    let history = Arc::new(HistoryStore::new(config.history_length, config.warmup_policy));
    let runner = CycleRunner::new(
        source,
        ForecastClient::new(oracle.clone(), config.oracle_timeout()),
        history,
        config.scaling_policy(),
    )
    .with_sample_timeout(config.sample_timeout());

    let registry = Arc::new(TargetRegistry::new());
    for target in config.targets()? {
        let key = target.key();
        let replicas = target.replicas;
        if registry.register(target) {
            logger.log_target_registered(&key, replicas);
        }
    }
    metrics.set_targets_monitored(registry.len() as i64);

    let (scheduler, mut reports) = CycleScheduler::new(
        Arc::new(runner),
        registry.clone(),
        SchedulerConfig {
            poll_interval: config.poll_interval(),
            ..SchedulerConfig::default()
        },
    );
    let scheduler = Arc::new(scheduler.with_logger(logger.clone()));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Fan cycle reports out to metrics, logs and health
    let report_health = health_registry.clone();
    let report_metrics = metrics.clone();
    let report_logger = logger.clone();
    tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            report_metrics.record_report(&report);
            report_logger.log_report(&report);
            report_health.record_cycle(&report).await;
        }
    });

    let scheduler_handle = tokio::spawn(scheduler.clone().run(shutdown_tx.subscribe()));
    health_registry.set_healthy(components::SCHEDULER).await;

    let app_state = Arc::new(
        api::AppState::new(health_registry.clone(), metrics.clone(), registry.clone())
            .with_scheduler(scheduler.clone()),
    );
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    health_registry.set_ready(true).await;
    logger.log_startup(CONTROLLER_VERSION, &oracle.describe(), registry.len());

    let reason = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            "SIGINT received"
        }
        served = &mut api_handle => {
            match served {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
            "API server stopped"
        }
    };

    health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;
    logger.log_shutdown(reason);
    info!("Shutting down");

    Ok(())
}
