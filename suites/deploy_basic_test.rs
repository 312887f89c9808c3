//! Basic deployment suite: master bootstrap, slave bootstrap, cluster
//! creation, deployment and verification, with every expensive phase
//! checkpointed behind a named snapshot.
//!
//! Wired against the in-memory collaborators so the orchestration can be
//! exercised without infrastructure; a production launcher swaps in the
//! real virtualization, Fuel REST and SSH implementations.

use std::sync::Arc;

use anyhow::Result;
use fuel_test_driver::driver::checkpoint::{self, READY_SNAPSHOT};
use fuel_test_driver::driver::env_api::ClusterId;
use fuel_test_driver::driver::mock::{
    MockBundler, MockEnvironment, MockFuelWebClient, MockRemoteExecutor,
};
use fuel_test_driver::{CaseDefinition, Config, Harness, StepContext, StepError};

const RELEASE: &str = "mitaka-9.0";

fn require_slaves(ctx: &StepContext, minimum: usize) -> Result<usize, StepError> {
    let slaves = ctx.config.slave_count().map_err(anyhow::Error::from)?;
    if slaves < minimum {
        return Err(StepError::skip(format!(
            "config provides {slaves} slave(s), this case needs {minimum}"
        )));
    }
    Ok(slaves)
}

fn deploy_basic() -> Arc<CaseDefinition> {
    CaseDefinition::builder("DeployBasic")
        .summary("Deploy a cluster on the configured topology and verify it")
        .group("deploy_basic")
        .nested_action("prepare", "Prepare master and slaves", || {
            vec!["setup_master".to_string(), "bootstrap_slaves".to_string()]
        })
        .action("setup_master", "Bootstrap and configure the master node", |ctx| {
            let store = ctx
                .snapshot_store()
                .ok_or_else(|| anyhow::anyhow!("no environment wired in"))?;
            store.run_or_revert(READY_SNAPSHOT, || Ok(()))?;
            Ok(())
        })
        .action("bootstrap_slaves", "Bootstrap the slave nodes", |ctx| {
            let slaves = require_slaves(ctx, 1)?;
            let store = ctx
                .snapshot_store()
                .ok_or_else(|| anyhow::anyhow!("no environment wired in"))?;
            store.run_or_revert(&checkpoint::ready_with_slaves(slaves), || Ok(()))?;
            Ok(())
        })
        .action("create_cluster", "Create the cluster and assign node roles", |ctx| {
            let fuel = ctx
                .fuel
                .clone()
                .ok_or_else(|| anyhow::anyhow!("no fuel client wired in"))?;
            let name = ctx.config.cluster_name("deploy_basic");
            let cluster = fuel.create_cluster(&name, RELEASE)?;
            let roles = ctx.config.node_roles().map_err(anyhow::Error::from)?;
            fuel.update_nodes(cluster, &roles)?;
            ctx.write_attribute("cluster_id", &cluster.0)?;
            Ok(())
        })
        .action("deploy_cluster", "Deploy the cluster", |ctx| {
            let fuel = ctx
                .fuel
                .clone()
                .ok_or_else(|| anyhow::anyhow!("no fuel client wired in"))?;
            let cluster = ClusterId(ctx.read_attribute("cluster_id")?);
            fuel.deploy_cluster(cluster)?;
            Ok(())
        })
        .action("verify", "Verify the network and run health checks", |ctx| {
            let fuel = ctx
                .fuel
                .clone()
                .ok_or_else(|| anyhow::anyhow!("no fuel client wired in"))?;
            let cluster = ClusterId(ctx.read_attribute("cluster_id")?);
            fuel.verify_network(cluster)?;
            fuel.run_health_checks(cluster)?;
            Ok(())
        })
        .actions_order(["prepare", "create_cluster", "deploy_cluster", "verify"])
        .build()
        .expect("deploy_basic definition is well-formed")
}

fn main() -> Result<()> {
    Harness::new()
        .with_environment(Arc::new(MockEnvironment::new()))
        .with_fuel_client(Arc::new(MockFuelWebClient::new()))
        .with_remote_executor(Arc::new(MockRemoteExecutor::new()))
        .with_bundler(Arc::new(MockBundler::new()))
        .register(deploy_basic())
        .add_config(Config::from_yaml_str(
            "simple",
            "slaves: 3\ncluster_name: basic\nnodes:\n  - name: slave-01\n    roles: [controller]\n  - name: slave-02\n    roles: [compute]\n  - name: slave-03\n    roles: [cinder]\n",
        )?)
        .execute_from_args()
}
