//! Controller configuration

use anyhow::{bail, Context, Result};
use dpa_lib::history::{WarmupPolicy, DEFAULT_HISTORY_LENGTH};
use dpa_lib::quantity::{parse_cpu_millicores, parse_memory_mib};
use dpa_lib::scaling::{ScalingPolicy, DEFAULT_MIN_REPLICAS, DEFAULT_REDUCTION_RATIO};
use dpa_lib::{RequestCost, ResourceLimits, Target};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file when `--config` is absent
pub const CONFIG_PATH_ENV: &str = "DPA_CONFIG";

/// Controller configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Name used in logs, from the Kubernetes downward API when available
    #[serde(default = "default_controller_name")]
    pub controller_name: String,

    /// API server port for health, metrics and target status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between two cycles of the same target
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Length of each target's history window, which is also the oracle input size
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    #[serde(default = "default_reduction_ratio")]
    pub reduction_ratio: f64,

    #[serde(default = "default_min_replicas")]
    pub min_replicas: i32,

    #[serde(default)]
    pub warmup_policy: WarmupPolicy,

    #[serde(default = "default_timeout_ms")]
    pub sample_timeout_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub oracle_timeout_ms: u64,

    /// HTTP forecasting endpoint
    #[serde(default = "default_oracle_endpoint")]
    pub oracle_endpoint: String,

    /// Local ONNX model; takes precedence over `oracle_endpoint`
    #[serde(default)]
    pub oracle_model_path: Option<String>,

    #[serde(default)]
    pub oracle_model_sha256: Option<String>,

    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// One monitored workload as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    /// Prometheus instant-query URL returning the request rate
    pub scrape_url: String,
    /// CPU quantity, e.g. `500m` or `2`
    #[serde(default)]
    pub cpu_limit: Option<String>,
    /// Memory quantity, e.g. `256Mi`
    #[serde(default)]
    pub memory_limit: Option<String>,
    #[serde(default)]
    pub cpu_per_request_millicores: Option<f64>,
    #[serde(default)]
    pub memory_per_request_mib: Option<f64>,
}

fn default_controller_name() -> String {
    std::env::var("POD_NAME").unwrap_or_else(|_| "dpa-controller".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_poll_interval() -> u64 {
    10
}

fn default_history_length() -> usize {
    DEFAULT_HISTORY_LENGTH
}

fn default_reduction_ratio() -> f64 {
    DEFAULT_REDUCTION_RATIO
}

fn default_min_replicas() -> i32 {
    DEFAULT_MIN_REPLICAS
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_oracle_endpoint() -> String {
    "http://localhost:8501/predict".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_replicas() -> i32 {
    1
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: default_controller_name(),
            api_port: default_api_port(),
            poll_interval_secs: default_poll_interval(),
            history_length: default_history_length(),
            reduction_ratio: default_reduction_ratio(),
            min_replicas: default_min_replicas(),
            warmup_policy: WarmupPolicy::default(),
            sample_timeout_ms: default_timeout_ms(),
            oracle_timeout_ms: default_timeout_ms(),
            oracle_endpoint: default_oracle_endpoint(),
            oracle_model_path: None,
            oracle_model_sha256: None,
            targets: Vec::new(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from an optional file and `DPA_*` environment variables.
    ///
    /// Nested keys use `__` as separator. Environment values override the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("DPA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read controller configuration")?;

        let config: ControllerConfig = settings
            .try_deserialize()
            .context("Failed to parse controller configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_length < 2 {
            bail!("history_length must be at least 2, got {}", self.history_length);
        }
        if !(0.0..=1.0).contains(&self.reduction_ratio) {
            bail!(
                "reduction_ratio must be within [0, 1], got {}",
                self.reduction_ratio
            );
        }
        if self.min_replicas < 0 {
            bail!("min_replicas must not be negative, got {}", self.min_replicas);
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than 0");
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            let parsed = target.to_target()?;
            if !seen.insert(parsed.key()) {
                bail!("target {} is declared more than once", parsed.key());
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn scaling_policy(&self) -> ScalingPolicy {
        ScalingPolicy::new(self.reduction_ratio, self.min_replicas)
    }

    /// Parsed targets
    pub fn targets(&self) -> Result<Vec<Target>> {
        self.targets.iter().map(TargetConfig::to_target).collect()
    }
}

impl TargetConfig {
    /// Convert to a target, parsing the resource quantities
    pub fn to_target(&self) -> Result<Target> {
        let key = format!("{}/{}", self.namespace, self.name);
        if self.replicas < 0 {
            bail!("{}: replicas must not be negative", key);
        }

        let cpu_millicores = self
            .cpu_limit
            .as_deref()
            .map(parse_cpu_millicores)
            .transpose()
            .with_context(|| format!("{}: invalid cpu_limit", key))?;
        let memory_mib = self
            .memory_limit
            .as_deref()
            .map(parse_memory_mib)
            .transpose()
            .with_context(|| format!("{}: invalid memory_limit", key))?;

        let request_cost = match (self.cpu_per_request_millicores, self.memory_per_request_mib) {
            (Some(cpu), Some(memory)) => {
                if cpu < 0.0 || memory < 0.0 {
                    bail!("{}: per-request cost must not be negative", key);
                }
                Some(RequestCost {
                    cpu_millicores: cpu,
                    memory_mib: memory,
                })
            }
            (None, None) => None,
            _ => bail!(
                "{}: cpu_per_request_millicores and memory_per_request_mib must be set together",
                key
            ),
        };

        Ok(Target {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            replicas: self.replicas,
            scrape_url: self.scrape_url.clone(),
            limits: ResourceLimits {
                cpu_millicores,
                memory_mib,
            },
            request_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn target_config() -> TargetConfig {
        TargetConfig {
            namespace: "shop".to_string(),
            name: "checkout".to_string(),
            replicas: 2,
            scrape_url: "http://prometheus:9090/api/v1/query?query=rps".to_string(),
            cpu_limit: Some("500m".to_string()),
            memory_limit: Some("256Mi".to_string()),
            cpu_per_request_millicores: Some(5.0),
            memory_per_request_mib: Some(0.5),
        }
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.history_length, 10);
        assert_eq!(config.reduction_ratio, 0.5);
        assert_eq!(config.min_replicas, 1);
        assert_eq!(config.warmup_policy, WarmupPolicy::ZeroSentinel);
        assert_eq!(config.oracle_timeout(), Duration::from_millis(5000));
        assert!(config.oracle_model_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
poll_interval_secs = 30
history_length = 12
reduction_ratio = 0.25
warmup_policy = "sample_count"
oracle_endpoint = "http://forecaster:8501/v1/models/rps:predict"

[[targets]]
namespace = "shop"
name = "checkout"
replicas = 3
scrape_url = "http://prometheus:9090/api/v1/query?query=rps"
cpu_limit = "1"
memory_limit = "1Gi"
cpu_per_request_millicores = 20.0
memory_per_request_mib = 2.0
"#,
        );

        let config = ControllerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.history_length, 12);
        assert_eq!(config.warmup_policy, WarmupPolicy::SampleCount);
        assert_eq!(config.scaling_policy().reduction_ratio, 0.25);
        assert_eq!(config.api_port, 8080);

        let targets = config.targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].key(), "shop/checkout");
        assert_eq!(targets[0].limits.cpu_millicores, Some(1000.0));
        assert_eq!(targets[0].limits.memory_mib, Some(1024.0));
        assert_eq!(targets[0].request_cost.unwrap().cpu_millicores, 20.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ControllerConfig::load(Some(Path::new("/nonexistent/dpa.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ControllerConfig::default();
        config.history_length = 1;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.reduction_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.min_replicas = -1;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        let mut config = ControllerConfig::default();
        config.targets = vec![target_config(), target_config()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shop/checkout"));
    }

    #[test]
    fn test_target_conversion() {
        let target = target_config().to_target().unwrap();
        assert_eq!(target.limits.cpu_millicores, Some(500.0));
        assert_eq!(target.limits.memory_mib, Some(256.0));
        assert_eq!(
            target.request_cost,
            Some(RequestCost {
                cpu_millicores: 5.0,
                memory_mib: 0.5
            })
        );
    }

    #[test]
    fn test_target_without_limits_or_cost() {
        let mut config = target_config();
        config.cpu_limit = None;
        config.cpu_per_request_millicores = None;
        config.memory_per_request_mib = None;

        let target = config.to_target().unwrap();
        assert!(target.limits.cpu_millicores.is_none());
        assert!(target.request_cost.is_none());
    }

    #[test]
    fn test_half_declared_cost_rejected() {
        let mut config = target_config();
        config.memory_per_request_mib = None;
        assert!(config.to_target().is_err());

        let mut config = target_config();
        config.memory_limit = Some("lots".to_string());
        assert!(config.to_target().is_err());
    }
}
