use std::collections::HashMap;
use std::env as stdenv;
use std::process::Command;

/// Session view of the environment.
///
/// Lookups consult the session's own overrides first and fall back to the
/// process environment. An override of `None` hides a process variable, so a
/// session can behave as if e.g. `PATH` were unset without touching the real
/// process state.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    overrides: HashMap<String, Option<String>>,
}

impl Environment {
    /// Environment backed by the process variables with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of a variable.
    pub fn get_var(&self, key: &str) -> Option<String> {
        match self.overrides.get(key) {
            Some(value) => value.clone(),
            None => stdenv::var(key).ok(),
        }
    }

    /// Set or override a variable for this session.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.overrides.insert(key.into(), Some(val.into()));
    }

    /// Hide a variable for this session.
    pub fn unset_var(&mut self, key: impl Into<String>) {
        self.overrides.insert(key.into(), None);
    }

    /// Applies the overrides to a child process about to be spawned.
    pub fn apply_to(&self, command: &mut Command) {
        for (key, value) in &self.overrides {
            match value {
                Some(v) => {
                    command.env(key, v);
                }
                None => {
                    command.env_remove(key);
                }
            }
        }
    }
}
