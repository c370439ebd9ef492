//! Command line parsing and logging setup.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::store::{JsonFileStore, MemoryStore, UserStore};

/// File name of the default user store, under `$HOME`.
pub const DEFAULT_USERS_FILE: &str = ".asa_shell_users.json";

/// Presence of this variable keeps color on even with `--no-color`.
pub const COLOR_VAR: &str = "SHELLCOLOR";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[clap(name = "asa-shell", version, about = "A small interactive shell")]
pub struct Args {
    /// Execute the provided command line and then exit.
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    pub command: Option<String>,

    /// Start with plain prompt and errors instead of colored ones.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// User store file.
    #[arg(long = "users", value_name = "FILE", env = "ASA_SHELL_USERS")]
    pub users: Option<PathBuf>,

    /// Keep registered users in memory only.
    #[arg(long = "no-store", conflicts_with = "users")]
    pub no_store: bool,

    /// Minimum level of log events written to stderr.
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

/// Where registered users live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    pub fn open(&self) -> Box<dyn UserStore> {
        match self {
            Self::Memory => Box::new(MemoryStore::new()),
            Self::File(path) => Box::new(JsonFileStore::new(path)),
        }
    }
}

/// Startup settings resolved from the arguments and the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub color: bool,
    pub store: StoreLocation,
    pub command: Option<String>,
}

impl ShellConfig {
    pub fn resolve<F>(args: Args, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let color = !args.no_color || lookup(COLOR_VAR).is_some();
        let store = if args.no_store {
            StoreLocation::Memory
        } else if let Some(path) = args.users {
            StoreLocation::File(path)
        } else if let Some(home) = lookup("HOME") {
            StoreLocation::File(PathBuf::from(home).join(DEFAULT_USERS_FILE))
        } else {
            tracing::warn!(target: "store", "HOME not set; users are kept in memory");
            StoreLocation::Memory
        };
        Self {
            color,
            store,
            command: args.command,
        }
    }
}

/// Installs the stderr log subscriber.
pub fn init_tracing(level: LogLevel) {
    let filter = Targets::new().with_default(LevelFilter::from(level));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(true)
        .with_filter(filter);

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        eprintln!("warning: failed to initialize tracing.");
    }
}
