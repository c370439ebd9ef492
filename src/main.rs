use std::env;
use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;

use asa_shell::commands::{CommandRegistry, Flow};
use asa_shell::config::{self, Args, ShellConfig};
use asa_shell::executor::Executor;
use asa_shell::repl::{self, Repl};
use asa_shell::session::Session;

fn main() {
    let args = Args::parse();
    config::init_tracing(args.log_level);

    let status = match run(args) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("asa-shell: {e:#}");
            1
        }
    };
    let _ = io::stdout().flush();
    std::process::exit(status);
}

fn run(args: Args) -> anyhow::Result<i32> {
    let config = ShellConfig::resolve(args, |name| env::var(name).ok());
    tracing::debug!(?config, "starting shell");

    let root_dir = env::current_dir().context("failed to read current directory")?;
    let mut session = Session::new(root_dir, config.store.open());
    session.color = config.color;
    let mut executor = Executor::new(CommandRegistry::with_builtins(), session);

    let Some(line) = config.command else {
        return Repl::new(executor)?.run();
    };

    let status = match repl::run_line(&mut executor, &line, &mut io::stderr()) {
        Ok(Flow::Exit(status)) => status,
        Ok(Flow::Continue) => 0,
        Err(_) => 1,
    };
    executor
        .session_mut()
        .flush()
        .context("failed to save history")?;
    Ok(status)
}
