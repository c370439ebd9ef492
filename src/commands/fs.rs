use std::env;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::{Command, CommandError, Flow, check_arity};
use crate::session::Session;

pub struct Pwd;

impl Command for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn description(&self) -> &'static str {
        "current directory path"
    }

    fn usage(&self) -> &'static str {
        "pwd"
    }

    fn execute(
        &self,
        args: &[String],
        _session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 0, 0)?;
        writeln!(out, "{}", env::current_dir()?.display())?;
        Ok(Flow::Continue)
    }
}

pub struct Cd;

impl Cd {
    fn target(args: &[String], session: &Session) -> Result<PathBuf, CommandError> {
        let Some(arg) = args.first() else {
            return Ok(session.root_dir().to_path_buf());
        };
        let home = || {
            session
                .env
                .get_var("HOME")
                .map(PathBuf::from)
                .ok_or(CommandError::HomeNotSet)
        };
        if arg == "~" {
            home()
        } else if let Some(rest) = arg.strip_prefix("~/") {
            Ok(home()?.join(rest))
        } else {
            Ok(PathBuf::from(arg))
        }
    }
}

impl Command for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn description(&self) -> &'static str {
        "change your directory"
    }

    fn usage(&self) -> &'static str {
        "cd [path]"
    }

    fn execute(
        &self,
        args: &[String],
        session: &mut Session,
        _out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 0, 1)?;
        let target = Self::target(args, session)?;
        env::set_current_dir(&target).map_err(|_| CommandError::NoSuchDirectory(target))?;
        Ok(Flow::Continue)
    }
}

pub struct Cat;

impl Command for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn description(&self) -> &'static str {
        "see the content of the files"
    }

    fn usage(&self) -> &'static str {
        "cat <file>..."
    }

    fn execute(
        &self,
        args: &[String],
        _session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        check_arity(args, 1, usize::MAX)?;
        for name in args {
            let file_err = |source| CommandError::File {
                path: PathBuf::from(name),
                source,
            };
            let mut file = File::open(name).map_err(file_err)?;
            io::copy(&mut file, out).map_err(file_err)?;
        }
        Ok(Flow::Continue)
    }
}

pub struct Ls;

#[derive(Debug, Default, PartialEq, Eq)]
struct LsOptions {
    show_all: bool,
    long_format: bool,
    dir: Option<String>,
}

impl Ls {
    fn parse(args: &[String]) -> Result<LsOptions, CommandError> {
        let mut opts = LsOptions::default();
        for arg in args {
            if let Some(flags) = arg.strip_prefix('-').filter(|f| !f.is_empty()) {
                for flag in flags.chars() {
                    match flag {
                        'a' => opts.show_all = true,
                        'l' => opts.long_format = true,
                        other => return Err(CommandError::InvalidOption(other)),
                    }
                }
            } else if opts.dir.replace(arg.clone()).is_some() {
                return Err(CommandError::TooManyArgs);
            }
        }
        Ok(opts)
    }

    /// `<mode> <size> <modified> <name>`
    fn write_long(path: &Path, name: &str, out: &mut dyn Write) -> Result<(), CommandError> {
        let file_err = |source| CommandError::File {
            path: path.to_path_buf(),
            source,
        };
        let meta = fs::symlink_metadata(path).map_err(file_err)?;
        let modified = meta.modified().map_err(file_err)?;
        writeln!(
            out,
            "{} {:>8} {} {}",
            mode_string(&meta),
            meta.len(),
            format_time(modified.into()),
            name
        )?;
        Ok(())
    }
}

fn format_time(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(unix)]
fn mode_string(meta: &fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let kind = if meta.is_dir() {
        'd'
    } else if meta.file_type().is_symlink() {
        'l'
    } else {
        '-'
    };
    let mode = meta.permissions().mode();
    let mut s = String::with_capacity(10);
    s.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(not(unix))]
fn mode_string(meta: &fs::Metadata) -> String {
    let kind = if meta.is_dir() { 'd' } else { '-' };
    let write = if meta.permissions().readonly() { '-' } else { 'w' };
    format!("{kind}r{write}-------")
}

impl Command for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn description(&self) -> &'static str {
        "see the content of the directory"
    }

    fn usage(&self) -> &'static str {
        "ls [-a] [-l] [dir]"
    }

    fn execute(
        &self,
        args: &[String],
        _session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        let opts = Self::parse(args)?;
        let dir = PathBuf::from(opts.dir.as_deref().unwrap_or("."));
        let entries = fs::read_dir(&dir).map_err(|source| CommandError::File {
            path: dir.clone(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| opts.show_all || !name.starts_with('.'))
            .collect();
        names.sort();

        for name in names {
            if opts.long_format {
                Self::write_long(&dir.join(&name), &name, out)?;
            } else {
                writeln!(out, "{name}")?;
            }
        }
        Ok(Flow::Continue)
    }
}
