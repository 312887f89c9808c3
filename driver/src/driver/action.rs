//! Discovery and ordering of the actions a case executes.
//!
//! A case declares its actions plus an explicit `actions_order`. Nested
//! actions expand into further action names and are spliced in place,
//! recursively, producing the flat linear plan the sequencer consumes.
//! Ordering mistakes are authoring errors and surface at case-construction
//! time, before any virtual-machine cost is incurred.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{ConfigError, StepResult};
use super::middleware::StepContext;

/// One unit of work, bound to the execution context at run time.
pub type ActionFn = Arc<dyn Fn(&mut StepContext) -> StepResult + Send + Sync>;

/// Expansion body of a nested action: yields an ordered sequence of further
/// action names instead of performing work.
pub type ExpandFn = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

pub enum ActionBody {
    Plain(ActionFn),
    Nested(ExpandFn),
}

pub struct Action {
    pub name: String,
    /// One-line summary, used for scenario text and step naming.
    pub summary: String,
    pub body: ActionBody,
}

/// The complete set of actions declared by one case definition, plus the
/// author-declared order. Registered once, never mutated afterwards, and
/// shared read-only by every case synthesized from the definition.
pub struct ActionCatalog {
    case_name: String,
    file: &'static str,
    line: u32,
    actions: BTreeMap<String, Arc<Action>>,
    order: Option<Vec<String>>,
}

impl ActionCatalog {
    pub fn new(case_name: impl Into<String>, file: &'static str, line: u32) -> Self {
        Self {
            case_name: case_name.into(),
            file,
            line,
            actions: BTreeMap::new(),
            order: None,
        }
    }

    pub fn insert(&mut self, action: Action) {
        self.actions.insert(action.name.clone(), Arc::new(action));
    }

    pub fn set_order(&mut self, order: Vec<String>) {
        self.order = Some(order);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Action>> {
        self.actions.get(name)
    }

    /// Flatten `actions_order` into the linear plan, expanding nested
    /// actions recursively. Fails fast on an undeclared order, an unknown
    /// action name, or a nested action that (transitively) expands into
    /// itself.
    pub fn resolve_order(&self) -> Result<Vec<String>, ConfigError> {
        let order = self.order.as_ref().ok_or(ConfigError::MissingActionsOrder {
            case: self.case_name.clone(),
            file: self.file,
            line: self.line,
        })?;
        let mut plan = Vec::new();
        let mut expanding = Vec::new();
        for name in order {
            self.expand_into(name, &mut expanding, &mut plan)?;
        }
        Ok(plan)
    }

    fn expand_into(
        &self,
        name: &str,
        expanding: &mut Vec<String>,
        plan: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        let action = self.actions.get(name).ok_or_else(|| ConfigError::UnknownAction {
            case: self.case_name.clone(),
            action: name.to_string(),
            file: self.file,
            line: self.line,
        })?;
        match &action.body {
            ActionBody::Plain(_) => plan.push(name.to_string()),
            ActionBody::Nested(expand) => {
                if expanding.iter().any(|n| n == name) {
                    return Err(ConfigError::CyclicAction {
                        case: self.case_name.clone(),
                        action: name.to_string(),
                        file: self.file,
                        line: self.line,
                    });
                }
                expanding.push(name.to_string());
                for sub in expand() {
                    self.expand_into(&sub, expanding, plan)?;
                }
                expanding.pop();
            }
        }
        Ok(())
    }
}
