use std::path::{Path, PathBuf};

use crate::env::Environment;
use crate::history::{History, HistoryError};
use crate::store::{StoreError, User, UserStore};

/// Mutable state shared by the dispatcher and the builtins for the lifetime
/// of one shell process.
pub struct Session {
    /// Whether prompts and errors are colorized.
    pub color: bool,
    pub env: Environment,
    root_dir: PathBuf,
    user: Option<User>,
    anonymous: History,
    store: Box<dyn UserStore>,
}

impl Session {
    pub fn new(root_dir: impl Into<PathBuf>, store: Box<dyn UserStore>) -> Self {
        Self {
            color: false,
            env: Environment::new(),
            root_dir: root_dir.into(),
            user: None,
            anonymous: History::new(),
            store,
        }
    }

    /// Directory the shell started in; `cd` with no argument returns here.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn store(&mut self) -> &mut dyn UserStore {
        self.store.as_mut()
    }

    /// The history selected by the current login state.
    pub fn history(&self) -> &History {
        match &self.user {
            Some(user) => &user.history,
            None => &self.anonymous,
        }
    }

    fn history_mut(&mut self) -> &mut History {
        match &mut self.user {
            Some(user) => &mut user.history,
            None => &mut self.anonymous,
        }
    }

    pub fn record(&mut self, line: &str) {
        let logged_in = self.user.is_some();
        self.history_mut().record(line);
        tracing::debug!(target: "history", line, logged_in, "recorded line");
    }

    pub fn list_history(&self) -> Result<Vec<(String, u64)>, HistoryError> {
        self.history().list()
    }

    /// Clears only the active history. A logged-in user's cleared history is
    /// persisted immediately.
    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        self.history_mut().clear();
        if let Some(user) = &self.user {
            self.store.update_user(user)?;
        }
        Ok(())
    }

    /// Logs in, flushing the previously logged-in user first so that logging
    /// in again as the same user reloads everything recorded so far.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), StoreError> {
        self.flush()?;
        let user = self.store.get_user(username, password)?;
        tracing::info!(target: "store", username, "logged in");
        self.user = Some(user);
        Ok(())
    }

    /// Flushes and drops the logged-in user. Returns whether anyone was
    /// logged in.
    pub fn logout(&mut self) -> Result<bool, StoreError> {
        self.flush()?;
        Ok(self.user.take().is_some())
    }

    /// Writes the logged-in user's history back to the store.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if let Some(user) = &self.user {
            self.store.update_user(user)?;
            tracing::debug!(target: "store", username = %user.username, "flushed history");
        }
        Ok(())
    }
}
