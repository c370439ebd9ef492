use std::collections::HashSet;
use std::io::Write;

use super::{Command, CommandError, Flow, check_arity};
use crate::color::{self, BLUE, BOLD};
use crate::search::find_command;
use crate::session::Session;

pub struct Echo;

impl Command for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "write text/variables to output"
    }

    fn usage(&self) -> &'static str {
        "echo <text>"
    }

    fn execute(
        &self,
        args: &[String],
        _session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        writeln!(out, "{}", args.join(" "))?;
        Ok(Flow::Continue)
    }
}

/// Requests termination; the REPL performs it after flushing state.
pub struct Exit;

impl Command for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn description(&self) -> &'static str {
        "exit the shell"
    }

    fn usage(&self) -> &'static str {
        "exit [status code]"
    }

    fn execute(
        &self,
        args: &[String],
        _session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 0, 1)?;
        let status = match args.first() {
            Some(arg) => arg
                .parse::<i32>()
                .map_err(|_| CommandError::InvalidArg(arg.clone()))?,
            None => 0,
        };
        writeln!(out, "exit status {status}")?;
        Ok(Flow::Exit(status))
    }
}

pub struct Color;

impl Command for Color {
    fn name(&self) -> &'static str {
        "color"
    }

    fn description(&self) -> &'static str {
        "set on/off color mode"
    }

    fn usage(&self) -> &'static str {
        "color [on|off]"
    }

    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 1, 1)?;
        match args[0].to_lowercase().as_str() {
            "on" => {
                if session.color {
                    return Err(CommandError::ColorAlreadySet);
                }
                session.color = true;
                writeln!(out, "{}", color::paint("Color is set on", &[BLUE]))?;
            }
            "off" => {
                if !session.color {
                    return Err(CommandError::ColorUnset);
                }
                session.color = false;
                writeln!(out, "Color is set off")?;
            }
            _ => return Err(CommandError::InvalidArg(args[0].clone())),
        }
        Ok(Flow::Continue)
    }
}

/// Reports whether each name is a builtin or where it lives on `PATH`.
pub struct Type {
    builtins: HashSet<String>,
}

impl Type {
    pub const NAME: &'static str = "type";

    pub fn new(builtins: impl IntoIterator<Item = String>) -> Self {
        Self {
            builtins: builtins.into_iter().collect(),
        }
    }
}

impl Command for Type {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "type of a command"
    }

    fn usage(&self) -> &'static str {
        "type <command>..."
    }

    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 1, usize::MAX)?;
        let search_path = session.env.get_var("PATH");
        for name in args {
            if self.builtins.contains(name) {
                writeln!(out, "{name} is a shell builtin")?;
                continue;
            }
            let path = find_command(name, search_path.as_deref()).map_err(|source| {
                CommandError::Lookup {
                    name: name.clone(),
                    source,
                }
            })?;
            writeln!(out, "{name} is {}", path.display())?;
        }
        Ok(Flow::Continue)
    }
}

/// Prints a table of the builtins.
pub struct Help {
    topics: Vec<(&'static str, &'static str, &'static str)>,
}

impl Help {
    pub const NAME: &'static str = "help";
    pub const DESCRIPTION: &'static str = "show this table";
    pub const USAGE: &'static str = "help";

    pub fn new(mut topics: Vec<(&'static str, &'static str, &'static str)>) -> Self {
        topics.sort_unstable();
        Self { topics }
    }
}

impl Command for Help {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn usage(&self) -> &'static str {
        Self::USAGE
    }

    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 0, 0)?;
        let rule = "-".repeat(78);
        let header = format!("{:<10} {:<36} {}", "Command", "Description", "Usage");
        writeln!(out, "{rule}")?;
        writeln!(out, "{}", color::paint_if(session.color, &header, &[BOLD, BLUE]))?;
        writeln!(out, "{rule}")?;
        for (name, description, usage) in &self.topics {
            writeln!(out, "{name:<10} {description:<36} {usage}")?;
        }
        writeln!(out, "{rule}")?;
        Ok(Flow::Continue)
    }
}
