//! Snapshot naming and the revert-or-execute checkpoint policy.
//!
//! The caching invariant everything rests on: if a snapshot with a derived
//! name exists, the phase that derives that name has already completed
//! successfully. Names are therefore derived deterministically from the
//! semantic inputs of each phase and never from anything run-dependent.

use std::sync::Arc;

use anyhow::Result;
use sha2::{Digest, Sha256};
use slog::{info, Logger};

use super::env_api::Environment;

/// Master node provisioned, no release configured yet.
pub const EMPTY_SNAPSHOT: &str = "empty";

/// Master node fully configured and ready to bootstrap slaves.
pub const READY_SNAPSHOT: &str = "ready";

/// Upper bound imposed by the underlying virtualization layer on snapshot
/// names. Derived names are truncated to fit; see `diagnostic_snapshot_name`.
pub const MAX_SNAPSHOT_NAME_LEN: usize = 50;

const SHORT_HASH_LEN: usize = 8;

/// Different slave counts are different virtual topologies, so each count is
/// its own cache entry.
pub fn ready_with_slaves(count: usize) -> String {
    format!("ready_with_{count}_slaves")
}

/// Per-cluster cache entry, allowing several topologies to coexist within
/// one environment lineage.
pub fn cluster_ready(cluster: &str) -> String {
    format!("cluster_{cluster}_ready")
}

/// Name of the post-mortem snapshot taken when a step fails: base-class
/// name, a short hash of the configuration name, and the zero-padded step
/// ordinal, truncated to the name-length bound. Truncation can collide;
/// collisions are accepted.
pub fn diagnostic_snapshot_name(base_name: &str, config_name: &str, ordinal: usize) -> String {
    let digest = hex::encode(Sha256::digest(format!("{base_name}:{config_name}").as_bytes()));
    let short = &digest[..SHORT_HASH_LEN];
    let mut name = format!("fail_{base_name}_{short}_step{ordinal:03}");
    name.truncate(MAX_SNAPSHOT_NAME_LEN);
    name
}

/// Thin wrapper over the environment's named-snapshot capability with
/// create-or-overwrite and revert-and-resume semantics.
pub struct SnapshotStore {
    env: Arc<dyn Environment>,
    logger: Logger,
}

impl SnapshotStore {
    pub fn new(env: Arc<dyn Environment>, logger: Logger) -> Self {
        Self { env, logger }
    }

    /// Pure existence query; callers decide what to do with the answer.
    pub fn check_run(&self, name: &str) -> bool {
        self.env.has_snapshot(name)
    }

    /// Revert to a snapshot and bring the environment back to a usable
    /// state. A revert failure propagates unchanged: silently
    /// re-provisioning would break the snapshot-implies-success invariant
    /// and mask flaky infrastructure.
    pub fn revert(&self, name: &str) -> Result<()> {
        info!(self.logger, "Reverting to snapshot '{name}'");
        self.env.revert_snapshot(name)?;
        self.env.resume_environment()?;
        self.env.sync_time()?;
        Ok(())
    }

    pub fn capture(&self, name: &str) -> Result<()> {
        info!(self.logger, "Creating snapshot '{name}'");
        self.env.make_snapshot(name, true)
    }

    /// The pervasive phase contract: revert when the named snapshot exists,
    /// otherwise perform the work and snapshot the result. Returns whether
    /// the cache was hit.
    pub fn run_or_revert<F>(&self, name: &str, work: F) -> Result<bool>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.check_run(name) {
            self.revert(name)?;
            Ok(true)
        } else {
            work()?;
            self.capture(name)?;
            Ok(false)
        }
    }
}
