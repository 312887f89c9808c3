use std::path::PathBuf;

use thiserror::Error;

/// Authoring mistakes that must surface before any virtual-environment cost
/// is incurred. None of these are ever retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "case '{case}' ({file}:{line}): actions_order references unknown action '{action}'"
    )]
    UnknownAction {
        case: String,
        action: String,
        file: &'static str,
        line: u32,
    },

    #[error("case '{case}' ({file}:{line}): actions_order is not declared")]
    MissingActionsOrder {
        case: String,
        file: &'static str,
        line: u32,
    },

    #[error(
        "case '{case}' ({file}:{line}): nested action '{action}' expands into itself"
    )]
    CyclicAction {
        case: String,
        action: String,
        file: &'static str,
        line: u32,
    },

    #[error("duplicate configuration basename '{name}': {first} and {second}")]
    DuplicateConfig {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("malformed group spec '{spec}', expected 'group' or 'group(config)'")]
    MalformedGroupSpec { spec: String },

    #[error("group spec '{spec}' resolves to no cases")]
    EmptyGroup { spec: String },

    #[error("unknown configuration '{name}'")]
    UnknownConfig { name: String },

    #[error("configuration '{config}' is missing required field '{field}'")]
    MissingField { config: String, field: String },
}

/// Outcome of one step body. A skip is a control-flow signal, not a failure:
/// it propagates through the recovery interceptor untouched and triggers no
/// diagnostic capture.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step skipped: {reason}")]
    Skipped { reason: String },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl StepError {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

pub type StepResult = Result<(), StepError>;
