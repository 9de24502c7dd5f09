//! Integration tests for cycle orchestration
//!
//! These tests verify:
//! - A full sample -> forecast -> capacity -> decision cycle
//! - Soft skips and hard failures
//! - History is updated before the oracle is called and never corrupted
//! - Scheduler fan-out, decision application and target removal

use super::*;
use crate::error::CycleError;
use crate::history::{HistoryStore, WarmupPolicy};
use crate::models::{
    Bottleneck, CyclePhase, RequestCost, ResourceLimits, ScaleDirection, Target,
};
use crate::predictor::{ForecastClient, Oracle};
use crate::scaling::ScalingPolicy;
use crate::source::SampleSource;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Returns scripted rates in order, repeating the last one
struct ScriptedSource {
    rates: Mutex<VecDeque<Result<f64, CycleError>>>,
}

impl ScriptedSource {
    fn new(rates: Vec<Result<f64, CycleError>>) -> Self {
        Self {
            rates: Mutex::new(rates.into()),
        }
    }

    fn rates(values: &[f64]) -> Self {
        Self::new(values.iter().map(|v| Ok(*v)).collect())
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn latest_rate(&self, _target: &Target) -> Result<f64, CycleError> {
        let mut rates = self.rates.lock().unwrap();
        if rates.len() > 1 {
            rates.pop_front().unwrap()
        } else {
            rates.front().cloned().unwrap()
        }
    }
}

/// Constant rate per target name
struct NamedSource(HashMap<String, f64>);

#[async_trait]
impl SampleSource for NamedSource {
    async fn latest_rate(&self, target: &Target) -> Result<f64, CycleError> {
        self.0
            .get(&target.name)
            .copied()
            .ok_or_else(|| CycleError::NoSampleData {
                query: target.scrape_url.clone(),
            })
    }
}

struct SlowSource;

#[async_trait]
impl SampleSource for SlowSource {
    async fn latest_rate(&self, _target: &Target) -> Result<f64, CycleError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(1.0)
    }
}

/// Returns a fixed value and records every input it sees
struct RecordingOracle {
    value: f64,
    inputs: Mutex<Vec<Vec<f64>>>,
}

impl RecordingOracle {
    fn new(value: f64) -> Self {
        Self {
            value,
            inputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Oracle for RecordingOracle {
    async fn predict(&self, input: &[f64]) -> Result<f64, CycleError> {
        self.inputs.lock().unwrap().push(input.to_vec());
        Ok(self.value)
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}

struct DownOracle;

#[async_trait]
impl Oracle for DownOracle {
    async fn predict(&self, _input: &[f64]) -> Result<f64, CycleError> {
        Err(CycleError::OracleUnavailable {
            reason: "connection refused".to_string(),
        })
    }

    fn describe(&self) -> String {
        "down".to_string()
    }
}

fn target(name: &str, replicas: i32) -> Target {
    Target {
        namespace: "default".to_string(),
        name: name.to_string(),
        replicas,
        scrape_url: format!("http://prometheus/api/v1/query?query={}", name),
        // cpu headroom 100 - 100 = 0 is the bottleneck
        limits: ResourceLimits {
            cpu_millicores: Some(100.0),
            memory_mib: Some(1000.0),
        },
        request_cost: Some(RequestCost {
            cpu_millicores: 100.0,
            memory_mib: 1.0,
        }),
    }
}

fn runner(source: Arc<dyn SampleSource>, oracle: Arc<dyn Oracle>, window_len: usize) -> CycleRunner {
    let history = Arc::new(HistoryStore::new(window_len, WarmupPolicy::ZeroSentinel));
    CycleRunner::new(
        source,
        ForecastClient::new(oracle, Duration::from_secs(1)),
        history,
        ScalingPolicy::default(),
    )
}

#[tokio::test]
async fn test_full_cycle_scales_up() {
    let oracle = Arc::new(RecordingOracle::new(4.0));
    let source = Arc::new(ScriptedSource::rates(&[100.0, 150.0, 250.0, 400.0]));
    let runner = runner(source, oracle.clone(), 3);
    let web = target("web", 2);

    for _ in 0..3 {
        runner.run_cycle(&web).await.unwrap();
    }
    let report = runner.run_cycle(&web).await.unwrap();

    // deltas [50, 100, 150] normalize to [0, 0.5, 1]
    assert_eq!(oracle.inputs.lock().unwrap().last().unwrap(), &vec![0.0, 0.5, 1.0]);

    assert_eq!(report.target, "default/web");
    assert_eq!(report.phase, CyclePhase::Decided);
    assert_eq!(report.observed_rate, Some(400.0));

    let forecast = report.forecast.unwrap();
    assert_eq!(forecast.current_rate, 150.0);
    assert_eq!(forecast.predicted_rate, 450.0);
    assert_eq!(forecast.predicted_norm, 4.0);

    // ceil(100) * 150 / ceil(100)
    let capacity = report.capacity.unwrap();
    assert_eq!(capacity.bottleneck, Bottleneck::Cpu);
    assert_eq!(capacity.max_workload_per_pod, 150);

    let decision = report.decision.unwrap();
    assert_eq!(decision.predicted_pods, 3);
    assert_eq!(decision.target_replicas, 3);
    assert_eq!(decision.direction, ScaleDirection::Up);
    assert!(report.wants_scale());
    assert!(report.error_kind.is_none());
}

#[tokio::test]
async fn test_zero_cost_is_soft_skip() {
    let source = Arc::new(ScriptedSource::rates(&[10.0, 20.0]));
    let runner = runner(source, Arc::new(RecordingOracle::new(0.5)), 4);
    let mut web = target("web", 2);
    web.limits = ResourceLimits {
        cpu_millicores: Some(1000.0),
        memory_mib: Some(500.0),
    };
    web.request_cost = Some(RequestCost {
        cpu_millicores: 10.0,
        memory_mib: 0.0,
    });

    let report = runner.run_cycle(&web).await.unwrap();
    assert_eq!(report.phase, CyclePhase::Skipped);
    assert!(report.decision.is_none());
    assert!(report.forecast.is_some());
    assert_eq!(report.error_kind.as_deref(), Some("zero_cost_unscalable"));
    assert!(report.skipped_reason.unwrap().contains("memory cost per request is 0"));
}

#[tokio::test]
async fn test_missing_cost_fails_cycle() {
    let source = Arc::new(ScriptedSource::rates(&[10.0]));
    let runner = runner(source, Arc::new(RecordingOracle::new(0.5)), 4);
    let mut web = target("web", 2);
    web.request_cost = None;

    let err = runner.run_cycle(&web).await.unwrap_err();
    assert_eq!(
        err,
        CycleError::MissingRequestCost {
            target: "default/web".to_string()
        }
    );

    // The folding variant keeps what the cycle got before failing
    let report = runner.run(&web).await;
    assert_eq!(report.phase, CyclePhase::Skipped);
    assert_eq!(report.observed_rate, Some(10.0));
    assert!(report.forecast.is_some());
    assert_eq!(report.error_kind.as_deref(), Some("missing_request_cost"));
}

#[tokio::test]
async fn test_oracle_failure_keeps_observation() {
    let source = Arc::new(ScriptedSource::rates(&[100.0, 130.0]));
    let history = Arc::new(HistoryStore::new(3, WarmupPolicy::ZeroSentinel));
    let failing = CycleRunner::new(
        source.clone(),
        ForecastClient::new(Arc::new(DownOracle), Duration::from_secs(1)),
        history.clone(),
        ScalingPolicy::default(),
    );
    let web = target("web", 2);

    let err = failing.run_cycle(&web).await.unwrap_err();
    assert_eq!(err.kind(), "oracle_unavailable");
    assert_eq!(err.failed_phase(), CyclePhase::Sampled);

    let snapshot = history.snapshot("default/web").await.unwrap();
    assert_eq!(snapshot.raw_samples, vec![0.0, 0.0, 100.0]);
    assert_eq!(snapshot.observed, 1);

    // The next cycle continues from the existing window
    let healthy = CycleRunner::new(
        source,
        ForecastClient::new(Arc::new(RecordingOracle::new(1.0)), Duration::from_secs(1)),
        history.clone(),
        ScalingPolicy::default(),
    );
    let report = healthy.run_cycle(&web).await.unwrap();
    assert_eq!(report.forecast.unwrap().current_rate, 30.0);
    let snapshot = history.snapshot("default/web").await.unwrap();
    assert_eq!(snapshot.delta_samples, vec![0.0, 0.0, 30.0]);
}

#[tokio::test]
async fn test_sample_timeout_leaves_history_untouched() {
    let runner = runner(Arc::new(SlowSource), Arc::new(RecordingOracle::new(0.5)), 3)
        .with_sample_timeout(Duration::from_millis(20));
    let web = target("web", 2);

    let err = runner.run_cycle(&web).await.unwrap_err();
    match err {
        CycleError::SampleUnavailable { reason } => assert!(reason.contains("timed out")),
        other => panic!("unexpected error: {:?}", other),
    }

    let snapshot = runner.history().snapshot("default/web").await.unwrap();
    assert_eq!(snapshot.observed, 0);
    assert_eq!(snapshot.raw_samples, vec![0.0; 3]);
}

#[tokio::test]
async fn test_no_sample_data_skips() {
    let source = Arc::new(ScriptedSource::new(vec![Err(CycleError::NoSampleData {
        query: "rps".to_string(),
    })]));
    let oracle = Arc::new(RecordingOracle::new(0.5));
    let runner = runner(source, oracle.clone(), 3);

    let report = runner.run(&target("web", 2)).await;
    assert_eq!(report.phase, CyclePhase::Skipped);
    assert_eq!(report.error_kind.as_deref(), Some("no_sample_data"));
    assert!(report.observed_rate.is_none());
    assert!(oracle.inputs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_targets_do_not_share_history() {
    let source = Arc::new(NamedSource(HashMap::from([
        ("web".to_string(), 100.0),
        ("api".to_string(), 7.0),
    ])));
    let runner = runner(source, Arc::new(RecordingOracle::new(0.5)), 3);
    let web = target("web", 1);
    let api = target("api", 1);

    let (a, b) = tokio::join!(runner.run_cycle(&web), runner.run_cycle(&api));
    assert!(a.is_ok() && b.is_ok());

    let web_history = runner.history().snapshot("default/web").await.unwrap();
    let api_history = runner.history().snapshot("default/api").await.unwrap();
    assert_eq!(web_history.raw_samples, vec![0.0, 0.0, 100.0]);
    assert_eq!(api_history.raw_samples, vec![0.0, 0.0, 7.0]);
}

fn scheduler_with(source: Arc<dyn SampleSource>, targets: Vec<Target>) -> (Arc<CycleScheduler>, tokio::sync::mpsc::Receiver<crate::models::CycleReport>) {
    let registry = Arc::new(TargetRegistry::new());
    for t in targets {
        registry.register(t);
    }
    let runner = Arc::new(runner(source, Arc::new(RecordingOracle::new(4.0)), 3));
    let config = SchedulerConfig {
        poll_interval: Duration::from_millis(10),
        report_buffer: 16,
    };
    let (scheduler, rx) = CycleScheduler::new(runner, registry, config);
    (Arc::new(scheduler), rx)
}

#[tokio::test]
async fn test_run_all_applies_decisions() {
    let source = Arc::new(NamedSource(HashMap::from([
        ("web".to_string(), 100.0),
        ("api".to_string(), 50.0),
    ])));
    let (scheduler, mut rx) = scheduler_with(source, vec![target("web", 3), target("api", 1)]);

    assert_eq!(scheduler.run_all().await, 2);

    let mut reports = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    reports.sort_by(|a, b| a.target.cmp(&b.target));
    assert_eq!(reports[0].target, "default/api");
    assert_eq!(reports[1].target, "default/web");

    // First cycle: flat window, zero workload, single-pod fallback
    for report in &reports {
        assert_eq!(report.decision.unwrap().predicted_pods, 1);
    }
    // web: surplus floor(2 * 0.5) = 1 -> 2 replicas
    assert_eq!(reports[1].phase, CyclePhase::Applied);
    assert_eq!(scheduler.registry().get("default/web").unwrap().replicas, 2);
    // api: already at one pod
    assert_eq!(reports[0].phase, CyclePhase::Decided);

    let status = scheduler.registry().status("default/web").unwrap();
    assert_eq!(status.cycles, 1);
    assert!(status.last_scale_time.is_some());
}

#[tokio::test]
async fn test_failed_cycle_does_not_block_others() {
    let source = Arc::new(NamedSource(HashMap::from([("web".to_string(), 100.0)])));
    let (scheduler, mut rx) = scheduler_with(source, vec![target("web", 1), target("ghost", 1)]);

    assert_eq!(scheduler.run_all().await, 2);
    let mut kinds = vec![
        rx.recv().await.unwrap().error_kind,
        rx.recv().await.unwrap().error_kind,
    ];
    kinds.sort();
    assert_eq!(kinds, vec![None, Some("no_sample_data".to_string())]);

    let ghost = scheduler.registry().status("default/ghost").unwrap();
    assert!(ghost.last_error.is_some());
    assert!(ghost.last_decision.is_none());
}

#[tokio::test]
async fn test_remove_target_evicts_history() {
    let source = Arc::new(NamedSource(HashMap::from([("web".to_string(), 100.0)])));
    let (scheduler, _rx) = scheduler_with(source, vec![target("web", 1)]);

    scheduler.run_all().await;
    let history = scheduler.runner().history();
    assert!(history.contains("default/web"));
    assert!(history.snapshot("default/web").await.is_some());

    assert!(scheduler.remove_target("default/web"));
    assert!(!history.contains("default/web"));
    assert!(history.snapshot("default/web").await.is_none());
    assert!(!scheduler.remove_target("default/web"));
    assert!(scheduler.registry().is_empty());
    assert_eq!(scheduler.run_all().await, 0);
}

#[tokio::test]
async fn test_scheduler_loop_stops_on_shutdown() {
    let source = Arc::new(NamedSource(HashMap::from([("web".to_string(), 100.0)])));
    let (scheduler, mut rx) = scheduler_with(source, vec![target("web", 1)]);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let handle = tokio::spawn(scheduler.clone().run(shutdown_rx));

    let report = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.target, "default/web");

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}
