//! Externally supplied, read-only configuration documents. The engine only
//! dereferences the few fields that drive naming and branching; everything
//! else is opaque payload for the action bodies.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_yaml::Value;

use super::error::ConfigError;

#[derive(Clone, Debug)]
pub struct Config {
    name: String,
    doc: Value,
}

impl Config {
    pub fn new(name: impl Into<String>, doc: Value) -> Self {
        Self {
            name: name.into(),
            doc,
        }
    }

    pub fn from_yaml_str(name: impl Into<String>, yaml: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(yaml).context("invalid configuration document")?;
        Ok(Self::new(name, doc))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.doc.get(field)
    }

    /// Number of slave nodes the topology requests. Drives the
    /// `ready_with_<N>_slaves` snapshot lineage.
    pub fn slave_count(&self) -> Result<usize, ConfigError> {
        self.doc
            .get("slaves")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| ConfigError::MissingField {
                config: self.name.clone(),
                field: "slaves".to_string(),
            })
    }

    /// Logical cluster name; falls back to the invoking case's base name
    /// when the document does not pin one.
    pub fn cluster_name(&self, default: &str) -> String {
        self.doc
            .get("cluster_name")
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Node-role assignment: node name -> role list.
    pub fn node_roles(&self) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
        let missing = |field: &str| ConfigError::MissingField {
            config: self.name.clone(),
            field: field.to_string(),
        };
        let nodes = self
            .doc
            .get("nodes")
            .and_then(Value::as_sequence)
            .ok_or_else(|| missing("nodes"))?;
        let mut roles = BTreeMap::new();
        for node in nodes {
            let name = node
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| missing("nodes[].name"))?;
            let node_roles = node
                .get("roles")
                .and_then(Value::as_sequence)
                .ok_or_else(|| missing("nodes[].roles"))?
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            roles.insert(name.to_string(), node_roles);
        }
        Ok(roles)
    }
}

/// All configurations known to one harness invocation, keyed by the file
/// basename. Two files with the same stem (e.g. `ha.yaml` and `ha.yml`)
/// would silently shadow each other, so loading fails fast on duplicates.
#[derive(Default)]
pub struct ConfigStore {
    configs: BTreeMap<String, Config>,
    sources: BTreeMap<String, PathBuf>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, config: Config) {
        self.configs.insert(config.name().to_string(), config);
    }

    pub fn load_dir(&mut self, dir: &Path) -> Result<()> {
        for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
            let path = entry?.path();
            let ext = path.extension().and_then(OsStr::to_str);
            if !matches!(ext, Some("yaml") | Some("yml")) {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(OsStr::to_str)
                .with_context(|| format!("non-utf8 file name: {}", path.display()))?
                .to_string();
            if let Some(first) = self.sources.get(&name) {
                return Err(ConfigError::DuplicateConfig {
                    name,
                    first: first.clone(),
                    second: path,
                }
                .into());
            }
            let yaml = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config = Config::from_yaml_str(name.clone(), &yaml)
                .with_context(|| format!("parsing {}", path.display()))?;
            self.sources.insert(name, path);
            self.insert(config);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Config, ConfigError> {
        self.configs.get(name).ok_or_else(|| ConfigError::UnknownConfig {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Config> {
        self.configs.values()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
