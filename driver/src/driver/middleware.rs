//! Cross-cutting step concerns, composed as an explicit ordered list rather
//! than nested decorators. The stack order is visible and testable: timing
//! wraps recovery, so elapsed time includes any diagnostic-capture work.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use slog::{error, info, Logger};

use super::case::Step;
use super::checkpoint::SnapshotStore;
use super::config::Config;
use super::env_api::{DiagnosticBundler, Environment, FuelWebClient, RemoteExecutor};
use super::error::{StepError, StepResult};
use super::recovery::RecoveryMiddleware;

/// Shared execution state of one case run. Steps mutate the environment one
/// at a time, in declared order; values produced by one step and consumed by
/// a later one travel through the attribute map.
pub struct StepContext {
    pub env: Option<Arc<dyn Environment>>,
    pub fuel: Option<Arc<dyn FuelWebClient>>,
    pub remote: Option<Arc<dyn RemoteExecutor>>,
    pub bundler: Option<Arc<dyn DiagnosticBundler>>,
    pub config: Config,
    pub logger: Logger,
    attributes: BTreeMap<String, serde_json::Value>,
    timings: Vec<(String, Duration)>,
}

impl StepContext {
    pub fn new(config: Config, logger: Logger) -> Self {
        Self {
            env: None,
            fuel: None,
            remote: None,
            bundler: None,
            config,
            logger,
            attributes: BTreeMap::new(),
            timings: Vec::new(),
        }
    }

    pub fn with_environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_fuel_client(mut self, fuel: Arc<dyn FuelWebClient>) -> Self {
        self.fuel = Some(fuel);
        self
    }

    pub fn with_remote_executor(mut self, remote: Arc<dyn RemoteExecutor>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn DiagnosticBundler>) -> Self {
        self.bundler = Some(bundler);
        self
    }

    /// Snapshot access for checkpointing, if an environment is wired in.
    pub fn snapshot_store(&self) -> Option<SnapshotStore> {
        self.env
            .as_ref()
            .map(|env| SnapshotStore::new(env.clone(), self.logger.clone()))
    }

    pub fn write_attribute<T: Serialize>(&mut self, name: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("serializing attribute '{name}'"))?;
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    pub fn read_attribute<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .attributes
            .get(name)
            .with_context(|| format!("attribute '{name}' was not written by an earlier step"))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("deserializing attribute '{name}'"))
    }

    pub fn record_timing(&mut self, step_name: &str, elapsed: Duration) {
        self.timings.push((step_name.to_string(), elapsed));
    }

    pub fn duration_of(&self, step_name: &str) -> Option<Duration> {
        self.timings
            .iter()
            .find(|(name, _)| name == step_name)
            .map(|(_, d)| *d)
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }
}

pub type Next<'a> = &'a dyn Fn(&Step, &mut StepContext) -> StepResult;

pub trait StepMiddleware: Send + Sync {
    fn call(&self, step: &Step, ctx: &mut StepContext, next: Next<'_>) -> StepResult;
}

/// Runs a step through the ordered middleware layers, outermost first, with
/// the step body innermost.
pub struct MiddlewareStack {
    layers: Vec<Arc<dyn StepMiddleware>>,
}

impl MiddlewareStack {
    pub fn new(layers: Vec<Arc<dyn StepMiddleware>>) -> Self {
        Self { layers }
    }

    /// The production composition: timing around recovery around the body.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(TimingMiddleware),
            Arc::new(RecoveryMiddleware),
        ])
    }

    pub fn run(&self, step: &Step, ctx: &mut StepContext) -> StepResult {
        self.run_from(0, step, ctx)
    }

    fn run_from(&self, index: usize, step: &Step, ctx: &mut StepContext) -> StepResult {
        match self.layers.get(index) {
            Some(layer) => layer.call(step, ctx, &|step, ctx| self.run_from(index + 1, step, ctx)),
            None => (step.run)(ctx),
        }
    }
}

/// Emits the step start/stop banner and records elapsed time on the context.
pub struct TimingMiddleware;

impl StepMiddleware for TimingMiddleware {
    fn call(&self, step: &Step, ctx: &mut StepContext, next: Next<'_>) -> StepResult {
        info!(ctx.logger, ">>> {}: {}", step.name, step.summary);
        let started = Instant::now();
        let result = next(step, ctx);
        let elapsed = started.elapsed();
        ctx.record_timing(&step.name, elapsed);
        match &result {
            Ok(()) => info!(
                ctx.logger,
                "<<< {} passed in {:.2}s",
                step.name,
                elapsed.as_secs_f64()
            ),
            Err(StepError::Skipped { reason }) => info!(
                ctx.logger,
                "<<< {} skipped after {:.2}s: {}",
                step.name,
                elapsed.as_secs_f64(),
                reason
            ),
            Err(StepError::Failed(err)) => error!(
                ctx.logger,
                "<<< {} failed in {:.2}s: {:#}",
                step.name,
                elapsed.as_secs_f64(),
                err
            ),
        }
        result
    }
}
