//! End-to-end orchestration against the in-memory collaborators: a deploy
//! case with checkpointed phases, run once cold and once warm, and a
//! failing deploy whose forensics and dependency skips are asserted.

use std::sync::Arc;

use fuel_test_driver::driver::case::{synthesize, CaseDefinition};
use fuel_test_driver::driver::checkpoint::{
    self, diagnostic_snapshot_name, READY_SNAPSHOT,
};
use fuel_test_driver::driver::config::Config;
use fuel_test_driver::driver::env_api::ClusterId;
use fuel_test_driver::driver::logger::new_discard_logger;
use fuel_test_driver::driver::middleware::StepContext;
use fuel_test_driver::driver::mock::{
    MockBundler, MockEnvironment, MockFuelWebClient, MockRemoteExecutor,
};
use fuel_test_driver::driver::report::StepStatus;
use fuel_test_driver::driver::runner::CaseRunner;
use fuel_test_driver::StepError;

fn deploy_definition() -> Arc<CaseDefinition> {
    CaseDefinition::builder("Deploy")
        .summary("Deploy a cluster and verify it")
        .group("deploy")
        .action("setup_master", "Bootstrap the master node", |ctx| {
            let store = ctx.snapshot_store().expect("environment is wired in");
            store.run_or_revert(READY_SNAPSHOT, || Ok(()))?;
            Ok(())
        })
        .action("bootstrap_slaves", "Bootstrap the slave nodes", |ctx| {
            let slaves = ctx.config.slave_count().map_err(anyhow::Error::from)?;
            let store = ctx.snapshot_store().expect("environment is wired in");
            store.run_or_revert(&checkpoint::ready_with_slaves(slaves), || Ok(()))?;
            Ok(())
        })
        .action("create_cluster", "Create the cluster", |ctx| {
            let fuel = ctx.fuel.clone().expect("fuel client is wired in");
            let name = ctx.config.cluster_name("deploy");
            let cluster = fuel.create_cluster(&name, "mitaka-9.0")?;
            let roles = ctx.config.node_roles().map_err(anyhow::Error::from)?;
            fuel.update_nodes(cluster, &roles)?;
            ctx.write_attribute("cluster_id", &cluster.0)?;
            Ok(())
        })
        .action("deploy_cluster", "Deploy the cluster", |ctx| {
            let fuel = ctx.fuel.clone().expect("fuel client is wired in");
            let cluster = ClusterId(ctx.read_attribute("cluster_id")?);
            fuel.deploy_cluster(cluster)?;
            Ok(())
        })
        .action("verify", "Verify network and run health checks", |ctx| {
            let fuel = ctx.fuel.clone().expect("fuel client is wired in");
            let cluster = ClusterId(ctx.read_attribute("cluster_id")?);
            fuel.verify_network(cluster)?;
            fuel.run_health_checks(cluster)?;
            Ok(())
        })
        .actions_order([
            "setup_master",
            "bootstrap_slaves",
            "create_cluster",
            "deploy_cluster",
            "verify",
        ])
        .build()
        .unwrap()
}

struct Fixture {
    env: Arc<MockEnvironment>,
    fuel: Arc<MockFuelWebClient>,
    remote: Arc<MockRemoteExecutor>,
    bundler: Arc<MockBundler>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            env: Arc::new(MockEnvironment::new()),
            fuel: Arc::new(MockFuelWebClient::new()),
            remote: Arc::new(MockRemoteExecutor::new()),
            bundler: Arc::new(MockBundler::new()),
        }
    }

    fn context(&self, config: &Config) -> StepContext {
        StepContext::new(config.clone(), new_discard_logger())
            .with_environment(self.env.clone())
            .with_fuel_client(self.fuel.clone())
            .with_remote_executor(self.remote.clone())
            .with_bundler(self.bundler.clone())
    }
}

fn demo_config() -> Config {
    Config::from_yaml_str(
        "demo",
        r#"
slaves: 3
cluster_name: demo_cluster
nodes:
  - name: slave-01
    roles: [controller]
  - name: slave-02
    roles: [compute]
  - name: slave-03
    roles: [cinder]
"#,
    )
    .unwrap()
}

#[test]
fn cold_run_deploys_and_leaves_phase_snapshots_behind() {
    let fixture = Fixture::new();
    let def = deploy_definition();
    let config = demo_config();
    let case = synthesize(&def, &config);

    let runner = CaseRunner::new(new_discard_logger());
    let report = runner.run(&case, &mut fixture.context(&config));

    assert!(report.is_failure_free(), "report:\n{report}");
    assert_eq!(report.outcomes().len(), 5);
    let snapshots = fixture.env.snapshot_names();
    assert!(snapshots.contains(&READY_SNAPSHOT.to_string()));
    assert!(snapshots.contains(&"ready_with_3_slaves".to_string()));
    assert!(fixture.fuel.is_deployed(ClusterId(1)));
}

#[test]
fn warm_run_reverts_phase_snapshots_instead_of_reprovisioning() {
    let fixture = Fixture::new();
    let def = deploy_definition();
    let config = demo_config();
    let case = synthesize(&def, &config);
    let runner = CaseRunner::new(new_discard_logger());

    let first = runner.run(&case, &mut fixture.context(&config));
    assert!(first.is_failure_free());
    assert!(fixture.env.reverted().is_empty());

    let second = runner.run(&case, &mut fixture.context(&config));
    assert!(second.is_failure_free());
    assert_eq!(
        fixture.env.reverted(),
        vec![READY_SNAPSHOT.to_string(), "ready_with_3_slaves".to_string()],
        "both checkpointed phases must be served from snapshots"
    );
}

#[test]
fn failing_deploy_blocks_verify_and_captures_forensics() {
    let fixture = Fixture::new();
    fixture.fuel.set_fail_deploy(true);
    let def = deploy_definition();
    let config = demo_config();
    let case = synthesize(&def, &config);

    let runner = CaseRunner::new(new_discard_logger());
    let report = runner.run(&case, &mut fixture.context(&config));

    assert!(!report.is_failure_free());
    assert!(matches!(
        report.status_of("Case_Deploy__Config_demo.Step000_setup_master"),
        Some(StepStatus::Passed { .. })
    ));
    assert!(matches!(
        report.status_of("Case_Deploy__Config_demo.Step003_deploy_cluster"),
        Some(StepStatus::Failed { message, .. }) if message.contains("error state")
    ));
    assert!(matches!(
        report.status_of("Case_Deploy__Config_demo.Step004_verify"),
        Some(StepStatus::DependencySkipped { blocked_on })
            if blocked_on == "Case_Deploy__Config_demo.Step003_deploy_cluster"
    ));

    // Forensics: a bundle for the failing step and a deterministically
    // named post-mortem snapshot.
    assert_eq!(
        fixture.bundler.collected(),
        vec!["Case_Deploy__Config_demo.Step003_deploy_cluster".to_string()]
    );
    let diag = diagnostic_snapshot_name("Deploy", "demo", 3);
    assert!(
        fixture.env.snapshot_names().contains(&diag),
        "expected snapshot '{diag}' in {:?}",
        fixture.env.snapshot_names()
    );
}

#[test]
fn config_gated_step_skips_the_tail_without_failing() {
    let fixture = Fixture::new();
    let def = CaseDefinition::builder("Scale")
        .summary("Scale the cluster when the config asks for it")
        .group("scale")
        .action("setup", "Bootstrap the master node", |_ctx| Ok(()))
        .action("scale", "Add compute nodes", |ctx| {
            match ctx.config.get("scale_to") {
                Some(_) => Ok(()),
                None => Err(StepError::skip("config does not request scaling")),
            }
        })
        .action("verify", "Verify the scaled cluster", |_ctx| Ok(()))
        .actions_order(["setup", "scale", "verify"])
        .build()
        .unwrap();
    let config = demo_config();
    let case = synthesize(&def, &config);

    let runner = CaseRunner::new(new_discard_logger());
    let report = runner.run(&case, &mut fixture.context(&config));

    assert!(report.is_failure_free());
    assert!(matches!(
        report.status_of("Case_Scale__Config_demo.Step001_scale"),
        Some(StepStatus::Skipped { .. })
    ));
    assert!(matches!(
        report.status_of("Case_Scale__Config_demo.Step002_verify"),
        Some(StepStatus::Skipped { .. })
    ));
    assert!(fixture.bundler.collected().is_empty());
}
