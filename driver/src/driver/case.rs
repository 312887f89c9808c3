//! Case synthesis: one independently runnable case per definition ×
//! configuration pair.
//!
//! A definition is authored once through the builder; synthesis copies each
//! action of the resolved plan into a `Step` value object carrying its
//! ordinal, owning definition and configuration names. That triple is the
//! cache key for diagnostic snapshot naming, and the deterministic step name
//! keeps failure messages greppable.

use std::panic::Location;
use std::sync::Arc;

use super::action::{Action, ActionBody, ActionCatalog, ActionFn, ExpandFn};
use super::config::{Config, ConfigStore};
use super::error::ConfigError;

/// The authored base of a family of cases: actions, their order, groups the
/// case belongs to, and optional setup/teardown hooks.
pub struct CaseDefinition {
    name: String,
    summary: String,
    groups: Vec<String>,
    /// Allow-list of compatible configuration names; empty means every
    /// known configuration is compatible.
    configs: Vec<String>,
    setup: Option<ActionFn>,
    teardown: Option<ActionFn>,
    catalog: ActionCatalog,
    plan: Vec<String>,
}

impl std::fmt::Debug for CaseDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseDefinition")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .field("groups", &self.groups)
            .field("configs", &self.configs)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl CaseDefinition {
    #[track_caller]
    pub fn builder(name: impl Into<String>) -> CaseDefinitionBuilder {
        let location = Location::caller();
        CaseDefinitionBuilder {
            name: name.into(),
            summary: String::new(),
            groups: Vec::new(),
            configs: Vec::new(),
            setup: None,
            teardown: None,
            actions: Vec::new(),
            order: None,
            file: location.file(),
            line: location.line(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// The flattened action plan, resolved once at build time.
    pub fn plan(&self) -> &[String] {
        &self.plan
    }

    pub fn compatible_configs<'a>(&self, store: &'a ConfigStore) -> Vec<&'a Config> {
        if self.configs.is_empty() {
            store.iter().collect()
        } else {
            store
                .iter()
                .filter(|c| self.configs.iter().any(|n| n == c.name()))
                .collect()
        }
    }

    pub fn is_compatible_with(&self, config_name: &str) -> bool {
        self.configs.is_empty() || self.configs.iter().any(|n| n == config_name)
    }
}

pub struct CaseDefinitionBuilder {
    name: String,
    summary: String,
    groups: Vec<String>,
    configs: Vec<String>,
    setup: Option<ActionFn>,
    teardown: Option<ActionFn>,
    actions: Vec<Action>,
    order: Option<Vec<String>>,
    file: &'static str,
    line: u32,
}

impl CaseDefinitionBuilder {
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Restrict the definition to the named configuration.
    pub fn config(mut self, config: impl Into<String>) -> Self {
        self.configs.push(config.into());
        self
    }

    pub fn action<F>(mut self, name: impl Into<String>, summary: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut super::middleware::StepContext) -> super::error::StepResult
            + Send
            + Sync
            + 'static,
    {
        self.actions.push(Action {
            name: name.into(),
            summary: summary.into(),
            body: ActionBody::Plain(Arc::new(f)),
        });
        self
    }

    pub fn nested_action<F>(
        mut self,
        name: impl Into<String>,
        summary: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        let expand: ExpandFn = Arc::new(f);
        self.actions.push(Action {
            name: name.into(),
            summary: summary.into(),
            body: ActionBody::Nested(expand),
        });
        self
    }

    pub fn case_setup<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut super::middleware::StepContext) -> super::error::StepResult
            + Send
            + Sync
            + 'static,
    {
        self.setup = Some(Arc::new(f));
        self
    }

    pub fn case_teardown<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut super::middleware::StepContext) -> super::error::StepResult
            + Send
            + Sync
            + 'static,
    {
        self.teardown = Some(Arc::new(f));
        self
    }

    pub fn actions_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Resolve the plan eagerly so that ordering typos surface here, at
    /// construction time, rather than hours into a deployment.
    pub fn build(self) -> Result<Arc<CaseDefinition>, ConfigError> {
        let mut catalog = ActionCatalog::new(self.name.clone(), self.file, self.line);
        for action in self.actions {
            catalog.insert(action);
        }
        if let Some(order) = self.order {
            catalog.set_order(order);
        }
        let plan = catalog.resolve_order()?;
        Ok(Arc::new(CaseDefinition {
            name: self.name,
            summary: self.summary,
            groups: self.groups,
            configs: self.configs,
            setup: self.setup,
            teardown: self.teardown,
            catalog,
            plan,
        }))
    }
}

/// One action bound into a specific case at a specific ordinal position.
pub struct Step {
    pub name: String,
    pub ordinal: usize,
    pub base_name: String,
    pub config_name: String,
    pub summary: String,
    pub run: ActionFn,
}

/// One synthesized case: a definition's plan bound to one configuration.
pub struct Case {
    pub name: String,
    pub base_name: String,
    pub config: Config,
    pub groups: Vec<String>,
    pub scenario: String,
    pub steps: Vec<Step>,
    pub setup: Option<ActionFn>,
    pub teardown: Option<ActionFn>,
}

pub fn case_class_name(base_name: &str, config_name: &str) -> String {
    format!("Case_{base_name}__Config_{config_name}")
}

pub fn synthesize(def: &Arc<CaseDefinition>, config: &Config) -> Case {
    let class_name = case_class_name(&def.name, config.name());
    let mut steps = Vec::with_capacity(def.plan.len());
    let mut scenario_lines = Vec::with_capacity(def.plan.len());
    for (ordinal, action_name) in def.plan.iter().enumerate() {
        let action = def
            .catalog
            .get(action_name)
            .expect("plan only contains resolved actions");
        let run = match &action.body {
            ActionBody::Plain(f) => f.clone(),
            ActionBody::Nested(_) => unreachable!("nested actions never survive plan resolution"),
        };
        scenario_lines.push(format!("{:3}. {}", ordinal + 1, action.summary));
        steps.push(Step {
            name: format!("{class_name}.Step{ordinal:03}_{action_name}"),
            ordinal,
            base_name: def.name.clone(),
            config_name: config.name().to_string(),
            summary: action.summary.clone(),
            run,
        });
    }
    // Each declared group plus its config-pinned variant, so that one
    // group × config combination is selectable as a single unit.
    let mut groups = Vec::with_capacity(def.groups.len() * 2);
    for group in &def.groups {
        groups.push(group.clone());
        groups.push(format!("{group}({})", config.name()));
    }
    Case {
        name: class_name,
        base_name: def.name.clone(),
        config: config.clone(),
        groups,
        scenario: scenario_lines.join("\n"),
        steps,
        setup: def.setup.clone(),
        teardown: def.teardown.clone(),
    }
}

/// The case × configuration Cartesian product for one definition.
pub fn synthesize_all(def: &Arc<CaseDefinition>, store: &ConfigStore) -> Vec<Case> {
    def.compatible_configs(store)
        .into_iter()
        .map(|config| synthesize(def, config))
        .collect()
}
