//! Dynamic Pod Autoscaler CLI
//!
//! Queries the controller for target status and runs the capacity model,
//! scaling policy and cost calibration offline.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{calibrate, plan, targets};
use dpa_lib::scaling::{ScalingPolicy, DEFAULT_MIN_REPLICAS, DEFAULT_REDUCTION_RATIO};
use std::path::PathBuf;

/// Dynamic Pod Autoscaler CLI
#[derive(Parser)]
#[command(name = "dpa")]
#[command(author, version, about = "CLI for the Dynamic Pod Autoscaler", long_about = None)]
pub struct Cli {
    /// Controller API URL (can also be set via DPA_API_URL env var)
    #[arg(long, env = "DPA_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List monitored targets and their last decision
    Targets,

    /// Show one target's status
    Target {
        /// Target as namespace/name (bare names use the default namespace)
        target: String,
    },

    /// Compute the bottleneck resource and per-pod capacity
    Capacity {
        /// Per-pod CPU limit, e.g. 500m or 2
        #[arg(long)]
        cpu_limit: String,

        /// Per-pod memory limit, e.g. 256Mi or 1Gi
        #[arg(long)]
        memory_limit: String,

        /// CPU millicores consumed per request
        #[arg(long)]
        cpu_per_request: f64,

        /// Memory MiB consumed per request
        #[arg(long)]
        memory_per_request: f64,

        /// Current workload (request rate, rounded up)
        #[arg(long)]
        workload: i64,
    },

    /// Run the scaling policy for a replica count and forecast
    Decide {
        /// Current replica count
        #[arg(long)]
        replicas: i32,

        /// Maximum sustainable workload per pod
        #[arg(long)]
        max_per_pod: i64,

        /// Predicted workload
        #[arg(long, allow_negative_numbers = true)]
        predicted: i64,

        /// Fraction of the surplus removed per scale-down
        #[arg(long, default_value_t = DEFAULT_REDUCTION_RATIO)]
        reduction_ratio: f64,

        /// Replica floor
        #[arg(long, default_value_t = DEFAULT_MIN_REPLICAS)]
        min_replicas: i32,
    },

    /// Derive per-request cost from a benchmark report
    Calibrate {
        /// Benchmark report (JSON)
        #[arg(long)]
        report: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::Config::load()?;
    let format = settings.format(cli.format)?;

    match cli.command {
        Commands::Targets => {
            let client = client::ApiClient::new(&settings.api_url(cli.api_url.as_deref()))?;
            targets::list_targets(&client, format).await?;
        }
        Commands::Target { target } => {
            let client = client::ApiClient::new(&settings.api_url(cli.api_url.as_deref()))?;
            targets::show_target(&client, &target, format).await?;
        }
        Commands::Capacity {
            cpu_limit,
            memory_limit,
            cpu_per_request,
            memory_per_request,
            workload,
        } => {
            let input = plan::CapacityInput {
                cpu_limit,
                memory_limit,
                cpu_per_request,
                memory_per_request,
                workload,
            };
            plan::show_capacity(&input, format)?;
        }
        Commands::Decide {
            replicas,
            max_per_pod,
            predicted,
            reduction_ratio,
            min_replicas,
        } => {
            let policy = ScalingPolicy::new(reduction_ratio, min_replicas);
            plan::show_decision(replicas, max_per_pod, predicted, policy, format)?;
        }
        Commands::Calibrate { report } => {
            calibrate::calibrate(&report, format)?;
        }
    }

    Ok(())
}
