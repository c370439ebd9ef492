use std::io::{self, Write};
use std::path::Path;
use std::process::{self, ExitStatus};

use thiserror::Error;

use crate::commands::{CommandError, CommandRegistry, Flow, HISTORY, RESERVED};
use crate::redirection::{OpenFileError, ParsedCommand, RedirectionError, parse_command};
use crate::search::{SearchError, find_command};
use crate::session::Session;
use crate::sink::OutputSink;
use crate::tokenize::{TokenizeError, tokenize_with};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Redirection(#[from] RedirectionError),
    #[error(transparent)]
    OpenFile(#[from] OpenFileError),
    #[error(transparent)]
    Builtin(#[from] CommandError),
    #[error("command not supported")]
    NotSupported(String),
    #[error("command not found")]
    NotFound(String),
    #[error("PATH environment variable is not set")]
    NoSearchPath,
    #[error("failed to execute {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("{name} failed with {status}")]
    ExitStatus { name: String, status: ExitStatus },
}

/// One parsed line with its streams opened, ready to dispatch.
///
/// Dropping it closes any redirection target.
#[derive(Debug)]
pub struct Invocation {
    pub command: ParsedCommand,
    pub stdout: OutputSink,
    pub stderr: OutputSink,
}

/// Resolves and runs one input line at a time.
pub struct Executor {
    registry: CommandRegistry,
    session: Session,
}

impl Executor {
    pub fn new(registry: CommandRegistry, session: Session) -> Self {
        Self { registry, session }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Runs one input line to completion.
    pub fn execute(&mut self, line: &str) -> Result<Flow, ExecutionError> {
        match self.prepare(line)? {
            Some(mut invocation) => self.dispatch(&mut invocation),
            None => Ok(Flow::Continue),
        }
    }

    /// Tokenizes and parses `line`, records it in the active history and opens
    /// the redirection target. Returns `None` for a blank line.
    ///
    /// Every non-blank line is recorded exactly once, even when it fails to
    /// parse, unless it invokes `history`.
    pub fn prepare(&mut self, line: &str) -> Result<Option<Invocation>, ExecutionError> {
        let env = &self.session.env;
        let tokens = match tokenize_with(line, |name| env.get_var(name)) {
            Ok(tokens) => tokens,
            Err(e) => {
                self.session.record(line);
                return Err(e.into());
            }
        };
        if tokens.is_empty() {
            return Ok(None);
        }

        let parsed = parse_command(&tokens);
        if !matches!(&parsed, Ok(command) if command.name == HISTORY) {
            self.session.record(line);
        }
        let command = parsed?;

        let (stdout, stderr) = match &command.redirection {
            Some(redirection) => {
                let file = OutputSink::File(redirection.open()?);
                if redirection.kind.is_stderr() {
                    (OutputSink::Stdout, file)
                } else {
                    (file, OutputSink::Stderr)
                }
            }
            None => (OutputSink::Stdout, OutputSink::Stderr),
        };

        Ok(Some(Invocation {
            command,
            stdout,
            stderr,
        }))
    }

    /// Resolves the command name and runs it: builtin first, then reserved
    /// names, then the `PATH` search.
    pub fn dispatch(&mut self, invocation: &mut Invocation) -> Result<Flow, ExecutionError> {
        let name = invocation.command.name.as_str();

        if let Some(builtin) = self.registry.get(name) {
            tracing::debug!(target: "commands", name, "running builtin");
            let result = builtin.execute(
                &invocation.command.args,
                &mut self.session,
                &mut invocation.stdout,
            );
            let flushed = invocation.stdout.flush();
            return Ok(settle(result, flushed)?);
        }

        if RESERVED.contains(&name) {
            return Err(ExecutionError::NotSupported(name.to_string()));
        }

        let search_path = self.session.env.get_var("PATH");
        let path = find_command(name, search_path.as_deref()).map_err(|e| match e {
            SearchError::NoSearchPath => ExecutionError::NoSearchPath,
            SearchError::NotFound => ExecutionError::NotFound(name.to_string()),
        })?;

        self.run_external(&path, invocation)
    }

    fn run_external(&self, path: &Path, invocation: &Invocation) -> Result<Flow, ExecutionError> {
        let name = &invocation.command.name;
        let spawn_err = |source| ExecutionError::Spawn {
            name: name.clone(),
            source,
        };

        let mut child = process::Command::new(path);
        child
            .args(&invocation.command.args)
            .stdout(invocation.stdout.stdio().map_err(spawn_err)?)
            .stderr(invocation.stderr.stdio().map_err(spawn_err)?);
        self.session.env.apply_to(&mut child);

        // Keep our own buffered output ahead of the child's.
        let _ = io::stdout().flush();

        tracing::debug!(target: "commands", path = %path.display(), "spawning external command");
        let status = child.status().map_err(spawn_err)?;
        if status.success() {
            Ok(Flow::Continue)
        } else {
            Err(ExecutionError::ExitStatus {
                name: name.clone(),
                status,
            })
        }
    }
}

/// A builtin's own failure takes precedence over failing to flush its output.
fn settle(
    result: Result<Flow, CommandError>,
    flushed: io::Result<()>,
) -> Result<Flow, CommandError> {
    let flow = result?;
    flushed?;
    Ok(flow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn executor() -> Executor {
        let session = Session::new(std::env::temp_dir(), Box::new(MemoryStore::new()));
        Executor::new(CommandRegistry::with_builtins(), session)
    }

    #[test]
    fn test_blank_line_is_ignored() {
        let mut ex = executor();
        assert!(matches!(ex.execute("   "), Ok(Flow::Continue)));
        assert!(ex.session().history().is_empty());
    }

    #[test]
    fn test_every_line_recorded_once() {
        let mut ex = executor();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let redirect = format!("echo hi > {}", out.display());

        for line in [redirect.as_str(), "echo 'open", "nosuchcmd_asa_shell", "exit x"] {
            let _ = ex.execute(line);
            assert_eq!(ex.session().history().count(line), 1, "{line}");
            let _ = ex.execute(line);
            assert_eq!(ex.session().history().count(line), 2, "{line}");
        }
    }

    #[test]
    fn test_history_lines_not_recorded() {
        let mut ex = executor();
        ex.execute("echo a").unwrap();
        ex.execute("history").unwrap();
        ex.execute("history > /dev/null").unwrap();
        assert_eq!(ex.session().list_history().unwrap(), vec![("echo a".to_string(), 1)]);
    }

    #[test]
    fn test_tokenize_error_aborts_before_dispatch() {
        let mut ex = executor();
        assert!(matches!(
            ex.execute("exit 'unterminated"),
            Err(ExecutionError::Tokenize(TokenizeError::UnterminatedSingleQuote))
        ));
    }

    #[test]
    fn test_missing_redirect_file() {
        let mut ex = executor();
        assert!(matches!(
            ex.execute("echo hi >"),
            Err(ExecutionError::Redirection(RedirectionError::MissingFile))
        ));
    }

    #[test]
    fn test_open_failure_aborts() {
        let mut ex = executor();
        assert!(matches!(
            ex.execute("exit 3 > /definitely/not/here/out.txt"),
            Err(ExecutionError::OpenFile(_))
        ));
    }

    #[test]
    fn test_builtin_error_is_wrapped() {
        let mut ex = executor();
        assert!(matches!(
            ex.execute("exit abc"),
            Err(ExecutionError::Builtin(CommandError::InvalidArg(_)))
        ));
    }

    #[test]
    fn test_builtin_error_outranks_flush_error() {
        let broken = || Err(io::Error::other("disk full"));
        assert!(matches!(
            settle(Err(CommandError::NotLoggedIn), broken()),
            Err(CommandError::NotLoggedIn)
        ));
        assert!(matches!(
            settle(Ok(Flow::Continue), broken()),
            Err(CommandError::Io(_))
        ));
        assert_eq!(settle(Ok(Flow::Exit(2)), Ok(())).unwrap(), Flow::Exit(2));
    }

    #[test]
    fn test_exit_flows_back_to_caller() {
        let mut ex = executor();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exit.txt");
        let flow = ex.execute(&format!("exit 7 > {}", out.display())).unwrap();
        assert_eq!(flow, Flow::Exit(7));
        assert_eq!(fs::read_to_string(out).unwrap(), "exit status 7\n");
    }

    #[test]
    fn test_reserved_name_not_supported() {
        let mut ex = executor();
        assert!(matches!(
            ex.execute("export A=1"),
            Err(ExecutionError::NotSupported(name)) if name == "export"
        ));
    }

    #[test]
    fn test_unknown_command_not_found() {
        let mut ex = executor();
        let dir = tempfile::tempdir().unwrap();
        ex.session_mut()
            .env
            .set_var("PATH", dir.path().to_string_lossy());
        assert!(matches!(
            ex.execute("nosuchcmd_asa_shell"),
            Err(ExecutionError::NotFound(name)) if name == "nosuchcmd_asa_shell"
        ));
    }

    #[test]
    fn test_missing_search_path() {
        let mut ex = executor();
        ex.session_mut().env.unset_var("PATH");
        assert!(matches!(
            ex.execute("nosuchcmd_asa_shell"),
            Err(ExecutionError::NoSearchPath)
        ));
        // Builtins never need PATH.
        assert!(ex.execute("echo still works > /dev/null").is_ok());
    }

    #[test]
    fn test_truncate_and_append_redirects() {
        let mut ex = executor();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("f.txt");

        let truncate = format!("echo hi > {}", out.display());
        ex.execute(&truncate).unwrap();
        ex.execute(&truncate).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");

        let append = format!("echo hi >> {}", out.display());
        ex.execute(&append).unwrap();
        ex.execute(&append).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\nhi\nhi\n");
    }

    #[test]
    fn test_stderr_redirect_leaves_stdout_alone() {
        let mut ex = executor();
        let dir = tempfile::tempdir().unwrap();
        let err = dir.path().join("err.txt");
        let mut invocation = ex
            .prepare(&format!("echo hi 2> {}", err.display()))
            .unwrap()
            .unwrap();
        assert!(!invocation.stdout.is_redirected());
        assert!(invocation.stderr.is_redirected());
        invocation.stdout = OutputSink::File(fs::File::create(dir.path().join("o")).unwrap());
        ex.dispatch(&mut invocation).unwrap();
        drop(invocation);
        assert_eq!(fs::read_to_string(&err).unwrap(), "");
    }

    #[cfg(unix)]
    mod external {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        #[test]
        fn test_external_output_redirect() {
            let mut ex = executor();
            let bin = tempfile::tempdir().unwrap();
            script(bin.path(), "greet", r#"echo "hello $1""#);
            ex.session_mut()
                .env
                .set_var("PATH", bin.path().to_string_lossy());

            let out = bin.path().join("out.txt");
            ex.execute(&format!("greet 'big world' > {}", out.display()))
                .unwrap();
            assert_eq!(fs::read_to_string(&out).unwrap(), "hello big world\n");
        }

        #[test]
        fn test_external_stderr_redirect() {
            let mut ex = executor();
            let bin = tempfile::tempdir().unwrap();
            script(bin.path(), "complain", "echo oops >&2");
            ex.session_mut()
                .env
                .set_var("PATH", bin.path().to_string_lossy());

            let err = bin.path().join("err.txt");
            ex.execute(&format!("complain 2>> {}", err.display())).unwrap();
            ex.execute(&format!("complain 2>> {}", err.display())).unwrap();
            assert_eq!(fs::read_to_string(&err).unwrap(), "oops\noops\n");
        }

        #[test]
        fn test_external_failure_keeps_status() {
            let mut ex = executor();
            let bin = tempfile::tempdir().unwrap();
            script(bin.path(), "fail", "exit 4");
            ex.session_mut()
                .env
                .set_var("PATH", bin.path().to_string_lossy());

            match ex.execute("fail") {
                Err(ExecutionError::ExitStatus { name, status }) => {
                    assert_eq!(name, "fail");
                    assert_eq!(status.code(), Some(4));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_spawn_failure_is_distinct() {
            let mut ex = executor();
            let bin = tempfile::tempdir().unwrap();
            // Executable bit set but not a runnable image.
            let path = bin.path().join("broken");
            fs::write(&path, [0u8, 1, 2, 3]).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            ex.session_mut()
                .env
                .set_var("PATH", bin.path().to_string_lossy());

            assert!(matches!(
                ex.execute("broken"),
                Err(ExecutionError::Spawn { .. })
            ));
        }

        #[test]
        fn test_session_vars_reach_children() {
            let mut ex = executor();
            let bin = tempfile::tempdir().unwrap();
            script(bin.path(), "show", r#"printf '%s' "$ASA_SHELL_TEST_VAR""#);
            ex.session_mut()
                .env
                .set_var("PATH", bin.path().to_string_lossy());
            ex.session_mut().env.set_var("ASA_SHELL_TEST_VAR", "visible");

            let out = bin.path().join("out.txt");
            ex.execute(&format!("show > {}", out.display())).unwrap();
            assert_eq!(fs::read_to_string(&out).unwrap(), "visible");
        }
    }
}
