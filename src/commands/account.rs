use std::io::Write;

use super::{Command, CommandError, Flow, check_arity};
use crate::session::Session;

pub const HISTORY: &str = "history";

/// Lists or clears the active history. Not recorded in history itself.
pub struct HistoryCmd;

impl Command for HistoryCmd {
    fn name(&self) -> &'static str {
        HISTORY
    }

    fn description(&self) -> &'static str {
        "history of executed commands"
    }

    fn usage(&self) -> &'static str {
        "history | history clean"
    }

    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 0, 1)?;
        if let Some(arg) = args.first() {
            if arg != "clean" {
                return Err(CommandError::InvalidArg(arg.clone()));
            }
            session.clear_history()?;
            return Ok(Flow::Continue);
        }
        for (line, count) in session.list_history()? {
            writeln!(out, "{line}: {count}")?;
        }
        Ok(Flow::Continue)
    }
}

/// Splits `<username> [password]`.
fn credentials(args: &[String]) -> Result<(&str, &str), CommandError> {
    match args {
        [] => Err(CommandError::UsernameRequired),
        [user] => Ok((user.as_str(), "")),
        [user, password] => Ok((user.as_str(), password.as_str())),
        _ => Err(CommandError::TooManyArgs),
    }
}

pub struct Login;

impl Command for Login {
    fn name(&self) -> &'static str {
        "login"
    }

    fn description(&self) -> &'static str {
        "login to shell as user"
    }

    fn usage(&self) -> &'static str {
        "login <username> [password]"
    }

    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        _out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        let (username, password) = credentials(args)?;
        session.login(username, password)?;
        Ok(Flow::Continue)
    }
}

pub struct Logout;

impl Command for Logout {
    fn name(&self) -> &'static str {
        "logout"
    }

    fn description(&self) -> &'static str {
        "logout the shell"
    }

    fn usage(&self) -> &'static str {
        "logout"
    }

    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        _out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 0, 0)?;
        if !session.logout()? {
            return Err(CommandError::NotLoggedIn);
        }
        Ok(Flow::Continue)
    }
}

pub struct AddUser;

impl Command for AddUser {
    fn name(&self) -> &'static str {
        "adduser"
    }

    fn description(&self) -> &'static str {
        "register user to shell"
    }

    fn usage(&self) -> &'static str {
        "adduser <username> [password]"
    }

    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        _out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        let (username, password) = credentials(args)?;
        session.store().register_user(username, password)?;
        tracing::info!(target: "store", username, "registered user");
        Ok(Flow::Continue)
    }
}
