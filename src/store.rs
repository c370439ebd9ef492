//! Persistence of registered users and their command history.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::History;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username is required")]
    UsernameRequired,
    #[error("user not found")]
    UserNotFound,
    #[error("password required")]
    PasswordRequired,
    #[error("wrong password")]
    WrongPassword,
    #[error("duplicate user exists with this username")]
    DuplicateUser,
    #[error("failed to access user store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed user store {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A logged-in (or registrable) user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
    pub history: History,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            history: History::new(),
        }
    }
}

/// Backing store for users.
pub trait UserStore {
    /// Loads a user after checking the password. An empty stored password
    /// accepts any input.
    fn get_user(&self, username: &str, password: &str) -> Result<User, StoreError>;

    /// Persists the user's current history.
    fn update_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// Creates a user with an empty history.
    fn register_user(&mut self, username: &str, password: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredUser {
    #[serde(default)]
    password: String,
    #[serde(default)]
    history: History,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Users {
    #[serde(default)]
    users: BTreeMap<String, StoredUser>,
}

impl Users {
    fn get(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let stored = self.users.get(username).ok_or(StoreError::UserNotFound)?;
        if !stored.password.is_empty() && stored.password != password {
            if password.is_empty() {
                return Err(StoreError::PasswordRequired);
            }
            return Err(StoreError::WrongPassword);
        }
        Ok(User {
            username: username.to_string(),
            password: stored.password.clone(),
            history: stored.history.clone(),
        })
    }

    fn update(&mut self, user: &User) -> Result<(), StoreError> {
        validate(&user.username)?;
        let stored = self.users.entry(user.username.clone()).or_default();
        stored.password = user.password.clone();
        stored.history = user.history.clone();
        Ok(())
    }

    fn register(&mut self, username: &str, password: &str) -> Result<(), StoreError> {
        validate(username)?;
        if self.users.contains_key(username) {
            return Err(StoreError::DuplicateUser);
        }
        self.users.insert(
            username.to_string(),
            StoredUser {
                password: password.to_string(),
                history: History::new(),
            },
        );
        Ok(())
    }
}

fn validate(username: &str) -> Result<(), StoreError> {
    if username.is_empty() {
        return Err(StoreError::UsernameRequired);
    }
    Ok(())
}

/// Store kept only in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Users,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn get_user(&self, username: &str, password: &str) -> Result<User, StoreError> {
        self.users.get(username, password)
    }

    fn update_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.users.update(user)
    }

    fn register_user(&mut self, username: &str, password: &str) -> Result<(), StoreError> {
        self.users.register(username, password)
    }
}

/// Store persisted as a JSON document. Every operation re-reads the file so
/// that concurrent shells see each other's registrations.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Users, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Users::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Users::default());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, users: &Users) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(users).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(target: "store", path = %self.path.display(), "saved user store");
        Ok(())
    }
}

impl UserStore for JsonFileStore {
    fn get_user(&self, username: &str, password: &str) -> Result<User, StoreError> {
        self.load()?.get(username, password)
    }

    fn update_user(&mut self, user: &User) -> Result<(), StoreError> {
        let mut users = self.load()?;
        users.update(user)?;
        self.save(&users)
    }

    fn register_user(&mut self, username: &str, password: &str) -> Result<(), StoreError> {
        let mut users = self.load()?;
        users.register(username, password)?;
        self.save(&users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn exercise(store: &mut dyn UserStore) {
        store.register_user("alice", "secret").unwrap();
        store.register_user("bob", "").unwrap();

        assert!(matches!(
            store.register_user("alice", "x"),
            Err(StoreError::DuplicateUser)
        ));
        assert!(matches!(
            store.register_user("", "x"),
            Err(StoreError::UsernameRequired)
        ));
        assert!(matches!(
            store.get_user("carol", ""),
            Err(StoreError::UserNotFound)
        ));
        assert!(matches!(
            store.get_user("alice", ""),
            Err(StoreError::PasswordRequired)
        ));
        assert!(matches!(
            store.get_user("alice", "nope"),
            Err(StoreError::WrongPassword)
        ));
        assert!(store.get_user("bob", "anything").is_ok());

        let mut alice = store.get_user("alice", "secret").unwrap();
        assert!(alice.history.is_empty());
        alice.history.record("ls");
        alice.history.record("ls");
        store.update_user(&alice).unwrap();

        let reloaded = store.get_user("alice", "secret").unwrap();
        assert_eq!(reloaded.history.count("ls"), 2);
    }

    #[test]
    fn test_memory_store() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn test_json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        exercise(&mut JsonFileStore::new(&path));

        let other = JsonFileStore::new(&path);
        let alice = other.get_user("alice", "secret").unwrap();
        assert_eq!(alice.history.count("ls"), 2);
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get_user("alice", ""),
            Err(StoreError::Format { .. })
        ));
    }
}
