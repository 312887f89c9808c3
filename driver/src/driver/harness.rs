//! Composition root: collaborators, configurations and case definitions are
//! wired together here at start-up, then a CLI subcommand drives resolution
//! and execution.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use slog::{info, o, Logger};

use super::case::{synthesize, Case};
use super::cli::{CliArgs, DriverSubcommand};
use super::config::{Config, ConfigStore};
use super::env_api::{DiagnosticBundler, Environment, FuelWebClient, RemoteExecutor};
use super::logger::new_stdout_logger;
use super::middleware::StepContext;
use super::registry::{CaseRegistry, GroupSpec};
use super::report::HarnessReport;
use super::runner::CaseRunner;

pub struct Harness {
    registry: CaseRegistry,
    configs: ConfigStore,
    env: Option<Arc<dyn Environment>>,
    fuel: Option<Arc<dyn FuelWebClient>>,
    remote: Option<Arc<dyn RemoteExecutor>>,
    bundler: Option<Arc<dyn DiagnosticBundler>>,
    logger: Logger,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self {
            registry: CaseRegistry::new(),
            configs: ConfigStore::new(),
            env: None,
            fuel: None,
            remote: None,
            bundler: None,
            logger: new_stdout_logger(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
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

    pub fn register(mut self, def: Arc<super::case::CaseDefinition>) -> Self {
        self.registry.register(def);
        self
    }

    pub fn add_config(mut self, config: Config) -> Self {
        self.configs.insert(config);
        self
    }

    pub fn execute_from_args(self) -> Result<()> {
        let args = CliArgs::parse();
        self.execute(args)
    }

    pub fn execute(mut self, args: CliArgs) -> Result<()> {
        if let Some(dir) = &args.config_dir {
            self.configs.load_dir(dir)?;
        }
        match args.action {
            DriverSubcommand::Run { group_spec } => self.run_group(&group_spec),
            DriverSubcommand::Explain { group_spec } => self.explain_group(&group_spec),
            DriverSubcommand::ListGroups => {
                for group in self.registry.group_names() {
                    println!("{group}");
                    for def in self.registry.definitions().filter(|d| {
                        d.groups().iter().any(|g| g == group)
                    }) {
                        for config in def.compatible_configs(&self.configs) {
                            println!("{group}({})", config.name());
                        }
                    }
                }
                Ok(())
            }
            DriverSubcommand::ListConfigs => {
                for name in self.configs.names() {
                    println!("{name}");
                }
                Ok(())
            }
        }
    }

    fn resolve(&self, group_spec: &str) -> Result<Vec<Case>> {
        let spec = GroupSpec::parse(group_spec)?;
        let pairs = self.registry.resolve(&spec, &self.configs)?;
        Ok(pairs
            .iter()
            .map(|(def, config)| synthesize(def, config))
            .collect())
    }

    fn run_group(&self, group_spec: &str) -> Result<()> {
        let cases = self.resolve(group_spec)?;
        info!(
            self.logger,
            "Resolved '{group_spec}' to {} case(s)",
            cases.len()
        );
        let runner = CaseRunner::new(self.logger.clone());
        let mut report = HarnessReport::new();
        for case in &cases {
            let mut ctx = self.new_context(case);
            report.push(runner.run(case, &mut ctx));
        }
        info!(self.logger, "Report:\n{report}");
        if report.is_failure_free() {
            Ok(())
        } else {
            bail!("{} case(s) failed", report.failed_case_count());
        }
    }

    fn explain_group(&self, group_spec: &str) -> Result<()> {
        let cases = self.resolve(group_spec)?;
        println!("'{group_spec}' resolves to {} case(s):", cases.len());
        for case in &cases {
            println!("\n{} (config '{}')", case.name, case.config.name());
            for line in case.scenario.lines() {
                println!("  {line}");
            }
        }
        Ok(())
    }

    fn new_context(&self, case: &Case) -> StepContext {
        let logger = self.logger.new(o!("case" => case.name.clone()));
        let mut ctx = StepContext::new(case.config.clone(), logger);
        ctx.env = self.env.clone();
        ctx.fuel = self.fuel.clone();
        ctx.remote = self.remote.clone();
        ctx.bundler = self.bundler.clone();
        ctx
    }
}
