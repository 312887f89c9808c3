//! Failure recovery: best-effort forensic capture that never alters the
//! step's observable outcome.
//!
//! On failure, three captures are attempted in order, each independently
//! fault-tolerant: the full diagnostic bundle, a degraded raw log pull over
//! the remote executor, and a named environment snapshot for manual revert
//! and inspection. The original error is then returned unchanged.

use slog::{error, info, warn};

use super::case::Step;
use super::checkpoint::diagnostic_snapshot_name;
use super::error::{StepError, StepResult};
use super::middleware::{Next, StepContext, StepMiddleware};

/// Node the degraded log pull targets: the deployment manager's master.
const MASTER_NODE: &str = "admin";

pub struct RecoveryMiddleware;

impl StepMiddleware for RecoveryMiddleware {
    fn call(&self, step: &Step, ctx: &mut StepContext, next: Next<'_>) -> StepResult {
        match next(step, ctx) {
            Ok(()) => Ok(()),
            // A skip is not a failure: no capture, propagated untouched.
            skip @ Err(StepError::Skipped { .. }) => skip,
            Err(StepError::Failed(err)) => {
                capture_diagnostics(step, ctx);
                Err(StepError::Failed(err))
            }
        }
    }
}

fn capture_diagnostics(step: &Step, ctx: &mut StepContext) {
    let mut bundled = false;
    if let (Some(bundler), Some(env)) = (&ctx.bundler, &ctx.env) {
        match bundler.collect(env.as_ref(), "fail", &step.name) {
            Ok(path) => {
                info!(
                    ctx.logger,
                    "Diagnostic bundle for '{}' downloaded to {}",
                    step.name,
                    path.display()
                );
                bundled = true;
            }
            Err(err) => error!(
                ctx.logger,
                "Diagnostic bundle collection for '{}' failed: {:#}", step.name, err
            ),
        }
    }

    if !bundled {
        if let Some(remote) = &ctx.remote {
            let archive = format!("/root/{}.logs.tar.gz", step.name);
            let command = format!("tar czf {archive} /var/log");
            match remote.execute(MASTER_NODE, &command) {
                Ok(output) if output.exit_code == 0 => {
                    info!(ctx.logger, "Raw logs archived on {MASTER_NODE}: {archive}")
                }
                Ok(output) => warn!(
                    ctx.logger,
                    "Raw log pull exited with {}: {}", output.exit_code, output.stderr
                ),
                Err(err) => error!(ctx.logger, "Raw log pull failed: {:#}", err),
            }
        }
    }

    if let Some(store) = ctx.snapshot_store() {
        let name = diagnostic_snapshot_name(&step.base_name, &step.config_name, step.ordinal);
        match store.capture(&name) {
            Ok(()) => info!(ctx.logger, "Post-mortem snapshot '{name}' created"),
            Err(err) => error!(
                ctx.logger,
                "Post-mortem snapshot '{name}' could not be created: {:#}", err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::config::Config;
    use crate::driver::env_api::Environment;
    use crate::driver::logger::new_discard_logger;
    use crate::driver::middleware::MiddlewareStack;
    use crate::driver::mock::{MockBundler, MockEnvironment, MockRemoteExecutor};
    use std::sync::Arc;

    fn failing_step() -> Step {
        Step {
            name: "Case_Deploy__Config_demo.Step001_deploy".to_string(),
            ordinal: 1,
            base_name: "Deploy".to_string(),
            config_name: "demo".to_string(),
            summary: "Deploy the cluster".to_string(),
            run: Arc::new(|_ctx| Err(StepError::Failed(anyhow::anyhow!("root cause")))),
        }
    }

    fn ctx_with(
        env: Arc<MockEnvironment>,
        remote: Arc<MockRemoteExecutor>,
        bundler: Arc<MockBundler>,
    ) -> StepContext {
        let config = Config::from_yaml_str("demo", "slaves: 1\n").unwrap();
        StepContext::new(config, new_discard_logger())
            .with_environment(env)
            .with_remote_executor(remote)
            .with_bundler(bundler)
    }

    #[test]
    fn failure_triggers_bundle_and_snapshot() {
        let env = Arc::new(MockEnvironment::new());
        let remote = Arc::new(MockRemoteExecutor::new());
        let bundler = Arc::new(MockBundler::new());
        let mut ctx = ctx_with(env.clone(), remote.clone(), bundler.clone());

        let stack = MiddlewareStack::new(vec![Arc::new(RecoveryMiddleware)]);
        let err = stack.run(&failing_step(), &mut ctx).unwrap_err();
        assert!(matches!(err, StepError::Failed(_)));

        assert_eq!(bundler.collected(), vec![
            "Case_Deploy__Config_demo.Step001_deploy".to_string()
        ]);
        // Bundle succeeded, so the degraded log pull must not run.
        assert!(remote.commands().is_empty());
        let expected = diagnostic_snapshot_name("Deploy", "demo", 1);
        assert!(env.has_snapshot(&expected));
    }

    #[test]
    fn bundle_failure_falls_back_to_raw_log_pull() {
        let env = Arc::new(MockEnvironment::new());
        let remote = Arc::new(MockRemoteExecutor::new());
        let bundler = Arc::new(MockBundler::new());
        bundler.set_fail(true);
        let mut ctx = ctx_with(env, remote.clone(), bundler);

        let stack = MiddlewareStack::new(vec![Arc::new(RecoveryMiddleware)]);
        let _ = stack.run(&failing_step(), &mut ctx);

        let commands = remote.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, "admin");
        assert!(commands[0].1.starts_with("tar czf"));
    }

    #[test]
    fn recovery_failures_never_mask_the_original_error() {
        let env = Arc::new(MockEnvironment::new());
        env.set_fail_snapshots(true);
        let remote = Arc::new(MockRemoteExecutor::new());
        remote.set_fail(true);
        let bundler = Arc::new(MockBundler::new());
        bundler.set_fail(true);
        let mut ctx = ctx_with(env, remote, bundler);

        let stack = MiddlewareStack::new(vec![Arc::new(RecoveryMiddleware)]);
        let err = stack.run(&failing_step(), &mut ctx).unwrap_err();
        match err {
            StepError::Failed(err) => assert_eq!(err.to_string(), "root cause"),
            other => panic!("expected the original failure, got {other:?}"),
        }
    }

    #[test]
    fn skip_triggers_no_capture_at_all() {
        let env = Arc::new(MockEnvironment::new());
        let remote = Arc::new(MockRemoteExecutor::new());
        let bundler = Arc::new(MockBundler::new());
        let mut ctx = ctx_with(env.clone(), remote.clone(), bundler.clone());

        let step = Step {
            run: Arc::new(|_ctx| Err(StepError::skip("no cluster under this config"))),
            ..failing_step()
        };
        let stack = MiddlewareStack::new(vec![Arc::new(RecoveryMiddleware)]);
        let err = stack.run(&step, &mut ctx).unwrap_err();
        assert!(matches!(err, StepError::Skipped { .. }));
        assert!(bundler.collected().is_empty());
        assert!(remote.commands().is_empty());
        assert!(env.snapshot_names().is_empty());
    }
}
