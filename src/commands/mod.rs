//! Builtin commands and the registry the dispatcher resolves them from.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::history::HistoryError;
use crate::search::SearchError;
use crate::session::Session;
use crate::store::StoreError;

mod account;
mod fs;
mod shell;

pub use account::{AddUser, HISTORY, HistoryCmd, Login, Logout};
pub use fs::{Cat, Cd, Ls, Pwd};
pub use shell::{Color, Echo, Exit, Help, Type};

/// Shell keywords and bash builtins that are recognized but not implemented.
pub const RESERVED: &[&str] = &[
    "alias", "bg", "bind", "break", "builtin", "caller", "case", "command", "compgen",
    "complete", "continue", "declare", "dirs", "disown", "do", "done", "elif", "else",
    "enable", "esac", "eval", "exec", "export", "fc", "fg", "fi", "for", "function",
    "getopts", "hash", "if", "jobs", "kill", "let", "local", "mapfile",
    "popd", "printf", "pushd", "read", "readonly", "return", "select", "set", "shift",
    "shopt", "source", "suspend", "test", "then", "time", "times", "trap", "typeset",
    "ulimit", "umask", "unalias", "unset", "until", "wait", "while",
];

/// What the shell should do after a command finished successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Terminate the shell with this status once state has been flushed.
    Exit(i32),
}

/// Errors returned by builtins. Presentation is left to the caller.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("too many arguments")]
    TooManyArgs,
    #[error("not enough arguments")]
    NotEnoughArgs,
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("invalid option: {0}")]
    InvalidOption(char),
    #[error("username required")]
    UsernameRequired,
    #[error("no user is logged in")]
    NotLoggedIn,
    #[error("color is already set")]
    ColorAlreadySet,
    #[error("color is not set")]
    ColorUnset,
    #[error("HOME not set")]
    HomeNotSet,
    #[error("{}: no such file or directory", .0.display())]
    NoSuchDirectory(PathBuf),
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: SearchError,
    },
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A command implemented inside the shell process.
pub trait Command {
    fn name(&self) -> &'static str;

    /// One-line summary shown by `help`.
    fn description(&self) -> &'static str;

    /// Usage synopsis shown by `help`.
    fn usage(&self) -> &'static str;

    /// Runs the command. Regular output goes to `out`; failures are returned,
    /// never printed.
    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError>;
}

/// Name to handler lookup table. Registering an existing name replaces it.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every builtin this shell ships.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Echo));
        registry.register(Box::new(Cat));
        registry.register(Box::new(Pwd));
        registry.register(Box::new(Cd));
        registry.register(Box::new(Ls));
        registry.register(Box::new(Color));
        registry.register(Box::new(Exit));
        registry.register(Box::new(HistoryCmd));
        registry.register(Box::new(Login));
        registry.register(Box::new(Logout));
        registry.register(Box::new(AddUser));

        // `type` and `help` describe the others, so they go last.
        let mut names: Vec<String> = registry.names().into_iter().map(String::from).collect();
        names.extend([Type::NAME, Help::NAME].map(String::from));
        registry.register(Box::new(Type::new(names)));

        let mut topics: Vec<_> = registry
            .commands
            .values()
            .map(|c| (c.name(), c.description(), c.usage()))
            .collect();
        topics.push((Help::NAME, Help::DESCRIPTION, Help::USAGE));
        registry.register(Box::new(Help::new(topics)));

        registry
    }

    /// Adds `command`, returning any handler previously registered under the
    /// same name.
    pub fn register(&mut self, command: Box<dyn Command>) -> Option<Box<dyn Command>> {
        self.commands.insert(command.name().to_string(), command)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Fails unless `args` has between `min` and `max` entries.
fn check_arity(args: &[String], min: usize, max: usize) -> Result<(), CommandError> {
    if args.len() < min {
        Err(CommandError::NotEnoughArgs)
    } else if args.len() > max {
        Err(CommandError::TooManyArgs)
    } else {
        Ok(())
    }
}
