//! Snapshot-driven orchestration engine for acceptance testing an OpenStack
//! deployment manager.
//!
//! A suite binary registers case definitions, wires in the virtualization,
//! deployment-manager and remote-execution collaborators, and hands control
//! to the harness:
//!
//! ```ignore
//! Harness::new()
//!     .with_environment(env)
//!     .with_fuel_client(fuel)
//!     .register(deploy_simple())
//!     .execute_from_args()
//! ```

pub mod driver;

pub use driver::case::{synthesize, synthesize_all, Case, CaseDefinition, Step};
pub use driver::checkpoint::SnapshotStore;
pub use driver::config::{Config, ConfigStore};
pub use driver::error::{ConfigError, StepError, StepResult};
pub use driver::harness::Harness;
pub use driver::middleware::StepContext;
