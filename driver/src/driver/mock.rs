//! In-memory collaborator implementations. Used by the driver's own tests
//! and by suites that exercise orchestration logic without real
//! infrastructure. Failure toggles let tests force individual capabilities
//! to break.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};

use super::env_api::{
    ClusterId, CommandOutput, DiagnosticBundler, Environment, FuelWebClient, RemoteExecutor,
};

#[derive(Default)]
pub struct MockEnvironment {
    snapshots: Mutex<BTreeSet<String>>,
    reverted: Mutex<Vec<String>>,
    fail_reverts: AtomicBool,
    fail_snapshots: AtomicBool,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reverts(&self, fail: bool) {
        self.fail_reverts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_snapshots(&self, fail: bool) {
        self.fail_snapshots.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot_names(&self) -> Vec<String> {
        self.snapshots.lock().unwrap().iter().cloned().collect()
    }

    pub fn reverted(&self) -> Vec<String> {
        self.reverted.lock().unwrap().clone()
    }
}

impl Environment for MockEnvironment {
    fn has_snapshot(&self, name: &str) -> bool {
        self.snapshots.lock().unwrap().contains(name)
    }

    fn revert_snapshot(&self, name: &str) -> Result<()> {
        if self.fail_reverts.load(Ordering::SeqCst) {
            bail!("revert of '{name}' failed: snapshot is corrupt");
        }
        if !self.has_snapshot(name) {
            bail!("revert of '{name}' failed: no such snapshot");
        }
        self.reverted.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn make_snapshot(&self, name: &str, is_make: bool) -> Result<()> {
        if self.fail_snapshots.load(Ordering::SeqCst) {
            bail!("snapshot '{name}' could not be created");
        }
        if is_make {
            self.snapshots.lock().unwrap().insert(name.to_string());
        }
        Ok(())
    }

    fn resume_environment(&self) -> Result<()> {
        Ok(())
    }

    fn sync_time(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MockFuelWebClient {
    next_id: AtomicU32,
    clusters: Mutex<BTreeMap<u32, String>>,
    deployed: Mutex<BTreeSet<u32>>,
    fail_deploy: AtomicBool,
}

impl MockFuelWebClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_deploy(&self, fail: bool) {
        self.fail_deploy.store(fail, Ordering::SeqCst);
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.lock().unwrap().len()
    }

    pub fn is_deployed(&self, cluster: ClusterId) -> bool {
        self.deployed.lock().unwrap().contains(&cluster.0)
    }
}

impl FuelWebClient for MockFuelWebClient {
    fn create_cluster(&self, name: &str, _release: &str) -> Result<ClusterId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.clusters.lock().unwrap().insert(id, name.to_string());
        Ok(ClusterId(id))
    }

    fn update_nodes(
        &self,
        cluster: ClusterId,
        _roles: &BTreeMap<String, Vec<String>>,
    ) -> Result<()> {
        if !self.clusters.lock().unwrap().contains_key(&cluster.0) {
            bail!("cluster {cluster} does not exist");
        }
        Ok(())
    }

    fn deploy_cluster(&self, cluster: ClusterId) -> Result<()> {
        if self.fail_deploy.load(Ordering::SeqCst) {
            bail!("deployment task for cluster {cluster} ended in error state");
        }
        self.deployed.lock().unwrap().insert(cluster.0);
        Ok(())
    }

    fn verify_network(&self, cluster: ClusterId) -> Result<()> {
        if !self.is_deployed(cluster) {
            bail!("network verification requires a deployed cluster");
        }
        Ok(())
    }

    fn run_health_checks(&self, cluster: ClusterId) -> Result<()> {
        if !self.is_deployed(cluster) {
            bail!("health checks require a deployed cluster");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockRemoteExecutor {
    commands: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl MockRemoteExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.commands.lock().unwrap().clone()
    }
}

impl RemoteExecutor for MockRemoteExecutor {
    fn execute(&self, node: &str, command: &str) -> Result<CommandOutput> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("ssh connection to '{node}' refused");
        }
        self.commands
            .lock()
            .unwrap()
            .push((node.to_string(), command.to_string()));
        Ok(CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

#[derive(Default)]
pub struct MockBundler {
    collected: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MockBundler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn collected(&self) -> Vec<String> {
        self.collected.lock().unwrap().clone()
    }
}

impl DiagnosticBundler for MockBundler {
    fn collect(&self, _env: &dyn Environment, status: &str, name: &str) -> Result<PathBuf> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("log collection endpoint timed out");
        }
        self.collected.lock().unwrap().push(name.to_string());
        Ok(PathBuf::from(format!("/tmp/{status}_{name}.tar.gz")))
    }
}
