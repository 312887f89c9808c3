//! Contracts of the external collaborators the engine drives. All calls are
//! blocking; implementations must raise on failure rather than return a
//! sentinel value.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

/// The virtualization-control capability: a set of virtual nodes plus their
/// named snapshots. Snapshot names are opaque cache keys to the engine.
pub trait Environment: Send + Sync {
    fn has_snapshot(&self, name: &str) -> bool;

    /// Revert the whole environment to the named snapshot.
    fn revert_snapshot(&self, name: &str) -> Result<()>;

    /// Capture the current environment state under `name`, overwriting a
    /// same-named snapshot. `is_make` follows the underlying layer's
    /// convention: when false the call is a no-op.
    fn make_snapshot(&self, name: &str, is_make: bool) -> Result<()>;

    /// Resume all virtual nodes after a revert.
    fn resume_environment(&self) -> Result<()>;

    /// Re-synchronize guest clocks, which drift across revert boundaries.
    fn sync_time(&self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClusterId(pub u32);

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// REST client for the deployment manager. Task-style operations block until
/// the underlying task reaches a terminal state.
pub trait FuelWebClient: Send + Sync {
    fn create_cluster(&self, name: &str, release: &str) -> Result<ClusterId>;

    /// Assign roles to nodes: node name -> role list.
    fn update_nodes(&self, cluster: ClusterId, roles: &BTreeMap<String, Vec<String>>)
        -> Result<()>;

    fn deploy_cluster(&self, cluster: ClusterId) -> Result<()>;

    fn verify_network(&self, cluster: ClusterId) -> Result<()>;

    fn run_health_checks(&self, cluster: ClusterId) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Shell execution on a named or IP-addressed node. Only the recovery
/// interceptor's degraded log pull uses this; the sequencing logic does not.
pub trait RemoteExecutor: Send + Sync {
    fn execute(&self, node: &str, command: &str) -> Result<CommandOutput>;
}

/// Produces and downloads a compressed diagnostic archive to a local
/// directory. Failures must surface as errors; the recovery interceptor
/// decides what to do with them.
pub trait DiagnosticBundler: Send + Sync {
    fn collect(&self, env: &dyn Environment, status: &str, name: &str) -> Result<PathBuf>;
}
