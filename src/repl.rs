//! The interactive read/dispatch loop and the pieces of it that print.

use std::env;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

use crate::color::{self, BLUE, GREEN, RED};
use crate::commands::Flow;
use crate::completion::ShellCompleter;
use crate::executor::{ExecutionError, Executor};
use crate::session::Session;

/// Runs one line and reports any failure before handing it back.
///
/// The report goes to the command's own stderr file when it carried a `2>` or
/// `2>>` redirection that was opened, to `stderr` otherwise.
pub fn run_line(
    executor: &mut Executor,
    line: &str,
    stderr: &mut dyn Write,
) -> Result<Flow, ExecutionError> {
    let mut invocation = match executor.prepare(line) {
        Ok(Some(invocation)) => invocation,
        Ok(None) => return Ok(Flow::Continue),
        Err(e) => {
            report(executor, line, &e, stderr, false);
            return Err(e);
        }
    };

    let result = executor.dispatch(&mut invocation);
    if let Err(e) = &result {
        if invocation.stderr.is_redirected() {
            report(executor, line, e, &mut invocation.stderr, true);
        } else {
            report(executor, line, e, stderr, false);
        }
    }
    result
}

fn report(
    executor: &Executor,
    line: &str,
    err: &ExecutionError,
    out: &mut dyn Write,
    redirected: bool,
) {
    tracing::debug!(target: "commands", line, error = %err, "command failed");

    let message = format!("{line}: {err}");
    let painted = color::paint_if(executor.session().color && !redirected, &message, &[RED]);
    let mut written = writeln!(out, "{painted}");
    if let ExecutionError::NotSupported(_) = err {
        written = written.and_then(|()| {
            writeln!(out, "List of supported builtin commands:")?;
            for name in executor.registry().names() {
                writeln!(out, "{name}")?;
            }
            Ok(())
        });
    }
    if let Err(e) = written.and_then(|()| out.flush()) {
        tracing::warn!(target: "commands", error = %e, "failed to report error");
    }
}

/// `cwd` relative to the startup directory: `~`, `~/<rest>`, or absolute.
pub fn display_address(root: &Path, cwd: &Path) -> String {
    match cwd.strip_prefix(root) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => cwd.display().to_string(),
    }
}

/// `[<user>:]<addr>$ `
pub fn render_prompt(session: &Session, cwd: &Path) -> String {
    let addr = color::paint_if(
        session.color,
        &display_address(session.root_dir(), cwd),
        &[BLUE],
    );
    match session.username() {
        Some(user) => format!("{}:{addr}$ ", color::paint_if(session.color, user, &[GREEN])),
        None => format!("{addr}$ "),
    }
}

/// Runs `lines` until one of them exits, or until they run out, which exits
/// with 0. The logged-in user's history is saved before returning.
pub fn drive<I>(executor: &mut Executor, lines: I, stderr: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = String>,
{
    let status = lines
        .into_iter()
        .find_map(|line| step(executor, &line, stderr))
        .unwrap_or(0);
    shutdown(executor);
    status
}

/// One loop iteration. Returns the exit status once the shell should stop.
fn step(executor: &mut Executor, line: &str, stderr: &mut dyn Write) -> Option<i32> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match run_line(executor, line, stderr) {
        Ok(Flow::Exit(status)) => Some(status),
        _ => None,
    }
}

fn shutdown(executor: &mut Executor) {
    if let Err(e) = executor.session_mut().flush() {
        tracing::error!(target: "store", error = %e, "failed to save history");
    }
}

/// Line-editing front end around an [`Executor`].
pub struct Repl {
    executor: Executor,
    editor: Editor<ShellCompleter, DefaultHistory>,
}

impl Repl {
    pub fn new(executor: Executor) -> anyhow::Result<Self> {
        let mut editor = Editor::new().context("failed to initialize line editor")?;
        let builtins = executor.registry().names().into_iter().map(String::from);
        editor.set_helper(Some(ShellCompleter::new(builtins)));
        Ok(Self { executor, editor })
    }

    /// Reads and runs lines until `exit` or end of input, returning the
    /// status to terminate with.
    pub fn run(&mut self) -> anyhow::Result<i32> {
        loop {
            let cwd = env::current_dir()
                .unwrap_or_else(|_| self.executor.session().root_dir().to_path_buf());
            let prompt = render_prompt(self.executor.session(), &cwd);

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = self.editor.add_history_entry(line.trim());
                    }
                    if let Some(status) = step(&mut self.executor, &line, &mut io::stderr()) {
                        shutdown(&mut self.executor);
                        return Ok(status);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    shutdown(&mut self.executor);
                    return Ok(0);
                }
                Err(e) => {
                    shutdown(&mut self.executor);
                    return Err(e).context("failed to read input");
                }
            }
        }
    }
}
