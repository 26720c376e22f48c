//! Action registry: name → behavior dispatch table.
//!
//! The registry is an explicitly constructed, injectable component — tests
//! build their own with [`ActionRegistry::empty`] or override entries on a
//! fresh [`ActionRegistry::with_defaults`]. Production wiring goes through
//! [`ActionRegistry::global`], a process-wide instance initialized on first
//! access and never torn down.
//!
//! Registration overwrites by name (last write wins), which is what makes
//! test doubles and runtime extension possible without touching dispatch
//! code. Lookups are concurrent-safe; writes are expected at startup or test
//! setup only.

use crate::actions::{self, Action};
use crate::error::{PipelineError, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

static GLOBAL: LazyLock<ActionRegistry> = LazyLock::new(ActionRegistry::with_defaults);

pub struct ActionRegistry {
    actions: RwLock<HashMap<String, Arc<dyn Action>>>,
}

impl ActionRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            actions: RwLock::new(HashMap::new()),
        }
    }

    /// A registry with every built-in action registered.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        for action in actions::builtin() {
            registry.register(action);
        }
        registry
    }

    /// The process-wide instance.
    pub fn global() -> &'static ActionRegistry {
        &GLOBAL
    }

    /// Insert or overwrite by `action.name()`.
    pub fn register(&self, action: Arc<dyn Action>) {
        debug!("registering action {}", action.name());
        self.actions
            .write()
            .unwrap()
            .insert(action.name().to_string(), action);
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Action>> {
        self.actions
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::not_found(format!("unknown action {name}")))
    }

    /// Registered names, sorted for display.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.read().unwrap().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
