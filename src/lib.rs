//! Line interpretation and dispatch for a small interactive shell.
//!
//! A line is tokenized, split into a command and an optional redirection,
//! recorded in the active history and then run either as a builtin or as an
//! executable found on `PATH`.

pub mod color;
pub mod commands;
pub mod completion;
pub mod config;
pub mod env;
pub mod executor;
pub mod history;
pub mod redirection;
pub mod repl;
pub mod search;
pub mod session;
pub mod sink;
pub mod store;
pub mod tokenize;

pub use commands::{Command, CommandError, CommandRegistry, Flow};
pub use executor::{ExecutionError, Executor};
pub use session::Session;
