//! Translation of a human-supplied `group` / `group(config)` selection into
//! the concrete set of cases to run. The registry is an explicit object
//! populated by `register` calls at composition time, so registration order
//! and contents are deterministic and testable in isolation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;

use super::case::CaseDefinition;
use super::config::{Config, ConfigStore};
use super::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSpec {
    pub group: String,
    pub config: Option<String>,
}

impl GroupSpec {
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^(?P<group>[A-Za-z0-9_.-]+)(?:\((?P<config>[A-Za-z0-9_.-]+)\))?$")
                .expect("group spec pattern is valid")
        });
        let captures = pattern
            .captures(spec)
            .ok_or_else(|| ConfigError::MalformedGroupSpec {
                spec: spec.to_string(),
            })?;
        Ok(Self {
            group: captures["group"].to_string(),
            config: captures.name("config").map(|m| m.as_str().to_string()),
        })
    }
}

impl std::fmt::Display for GroupSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.config {
            Some(config) => write!(f, "{}({})", self.group, config),
            None => write!(f, "{}", self.group),
        }
    }
}

#[derive(Default)]
pub struct CaseRegistry {
    definitions: BTreeMap<String, Arc<CaseDefinition>>,
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: Arc<CaseDefinition>) {
        for group in def.groups() {
            self.groups
                .entry(group.clone())
                .or_default()
                .insert(def.name().to_string());
        }
        self.definitions.insert(def.name().to_string(), def);
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<CaseDefinition>> {
        self.definitions.values()
    }

    /// Expand a group spec into concrete (definition, configuration) pairs.
    /// A bare group resolves against every configuration each member is
    /// compatible with; a parenthesized config pins exactly one. An empty
    /// result is an error surfaced before any virtual-environment cost.
    pub fn resolve(
        &self,
        spec: &GroupSpec,
        store: &ConfigStore,
    ) -> Result<Vec<(Arc<CaseDefinition>, Config)>, ConfigError> {
        let empty = || ConfigError::EmptyGroup {
            spec: spec.to_string(),
        };
        let members = self.groups.get(&spec.group).ok_or_else(empty)?;
        let mut pairs = Vec::new();
        for name in members {
            let def = &self.definitions[name];
            match &spec.config {
                Some(config_name) => {
                    let config = store.get(config_name)?;
                    if def.is_compatible_with(config_name) {
                        pairs.push((def.clone(), config.clone()));
                    }
                }
                None => {
                    for config in def.compatible_configs(store) {
                        pairs.push((def.clone(), config.clone()));
                    }
                }
            }
        }
        if pairs.is_empty() {
            return Err(empty());
        }
        Ok(pairs)
    }
}
