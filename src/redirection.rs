use std::fs::{File, OpenOptions};
use std::io;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use thiserror::Error;

/// Kind of redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionKind {
    /// `>`
    OutputTruncate,
    /// `>>`
    OutputAppend,
    /// `2>`
    ErrorTruncate,
    /// `2>>`
    ErrorAppend,
}

impl RedirectionKind {
    /// Recognizes an operator token. Only exact matches count.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            ">" => Some(Self::OutputTruncate),
            ">>" => Some(Self::OutputAppend),
            "2>" => Some(Self::ErrorTruncate),
            "2>>" => Some(Self::ErrorAppend),
            _ => None,
        }
    }

    pub fn is_append(self) -> bool {
        matches!(self, Self::OutputAppend | Self::ErrorAppend)
    }

    pub fn is_stderr(self) -> bool {
        matches!(self, Self::ErrorTruncate | Self::ErrorAppend)
    }
}

/// Represents a redirection operator and its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectionKind,
    pub file: String,
}

impl Redirection {
    pub fn new(kind: RedirectionKind, file: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.into(),
        }
    }

    /// Opens the target write-only, creating it with mode 0644 if missing and
    /// truncating or appending according to the kind.
    pub fn open(&self) -> Result<File, OpenFileError> {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if self.kind.is_append() {
            options.append(true);
        } else {
            options.truncate(true);
        }
        #[cfg(unix)]
        options.mode(0o644);

        options.open(&self.file).map_err(|source| OpenFileError {
            path: PathBuf::from(&self.file),
            source,
        })
    }
}

/// Errors found while separating redirections from command words.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RedirectionError {
    #[error("missing file for redirection")]
    MissingFile,
    #[error("missing command for redirection")]
    MissingCommand,
}

/// The redirection target could not be opened.
#[derive(Debug, Error)]
#[error("failed to open redirection file {}: {source}", path.display())]
pub struct OpenFileError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A parsed command with arguments and an optional redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
    pub redirection: Option<Redirection>,
}

fn find_operator(tokens: &[String]) -> Option<(usize, RedirectionKind)> {
    tokens
        .iter()
        .enumerate()
        .find_map(|(i, t)| RedirectionKind::from_token(t).map(|kind| (i, kind)))
}

/// Separates the first redirection operator from `tokens`.
///
/// Only the first operator is honoured. The words before it are returned as
/// the cleaned list; anything after the target file is discarded. When the
/// operator is the very first token, the cleaned list is instead the words
/// following the target, up to the next operator.
pub fn parse_redirection(
    tokens: &[String],
) -> Result<(Vec<String>, Option<Redirection>), RedirectionError> {
    let Some((pos, kind)) = find_operator(tokens) else {
        return Ok((tokens.to_vec(), None));
    };

    let file = tokens.get(pos + 1).ok_or(RedirectionError::MissingFile)?;
    let redirection = Redirection::new(kind, file.clone());

    let words = if pos > 0 {
        tokens[..pos].to_vec()
    } else {
        let rest = &tokens[pos + 2..];
        let end = find_operator(rest).map_or(rest.len(), |(i, _)| i);
        rest[..end].to_vec()
    };

    Ok((words, Some(redirection)))
}

/// Parses a full token stream (command name included) into a
/// [`ParsedCommand`]. The redirection may appear anywhere, including before
/// the command name.
pub fn parse_command(tokens: &[String]) -> Result<ParsedCommand, RedirectionError> {
    let (mut words, redirection) = parse_redirection(tokens)?;
    if words.is_empty() {
        return Err(RedirectionError::MissingCommand);
    }
    let name = words.remove(0);
    Ok(ParsedCommand {
        name,
        args: words,
        redirection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_no_operator_passes_through() {
        let tokens = strings(&["ls", "-l", "dir"]);
        assert_eq!(parse_redirection(&tokens).unwrap(), (tokens.clone(), None));
    }

    #[test]
    fn test_parse_stdout_redirect() {
        let tokens = strings(&["x", ">", "out.txt"]);
        let (args, redir) = parse_redirection(&tokens).unwrap();
        assert_eq!(args, vec!["x"]);
        assert_eq!(
            redir,
            Some(Redirection::new(RedirectionKind::OutputTruncate, "out.txt"))
        );
    }

    #[test]
    fn test_parse_all_operator_kinds() {
        for (op, kind) in [
            (">", RedirectionKind::OutputTruncate),
            (">>", RedirectionKind::OutputAppend),
            ("2>", RedirectionKind::ErrorTruncate),
            ("2>>", RedirectionKind::ErrorAppend),
        ] {
            let tokens = strings(&["ls", op, "f"]);
            let (_, redir) = parse_redirection(&tokens).unwrap();
            assert_eq!(redir.map(|r| r.kind), Some(kind), "operator {op}");
        }
    }

    #[test]
    fn test_operators_need_exact_match() {
        let tokens = strings(&["echo", "1>", ">x", "&>"]);
        assert_eq!(parse_redirection(&tokens).unwrap(), (tokens.clone(), None));
    }

    #[test]
    fn test_missing_file() {
        let tokens = strings(&["x", ">"]);
        assert_eq!(parse_redirection(&tokens), Err(RedirectionError::MissingFile));
    }

    #[test]
    fn test_trailing_words_are_dropped() {
        let tokens = strings(&["cmd", ">", "out.txt", "extra"]);
        let parsed = parse_command(&tokens).unwrap();
        assert_eq!(parsed.name, "cmd");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn test_first_operator_wins() {
        let tokens = strings(&["echo", "hi", "2>", "err.txt", ">", "out.txt"]);
        let parsed = parse_command(&tokens).unwrap();
        assert_eq!(parsed.args, vec!["hi"]);
        assert_eq!(
            parsed.redirection,
            Some(Redirection::new(RedirectionKind::ErrorTruncate, "err.txt"))
        );
    }

    #[test]
    fn test_leading_operator() {
        let tokens = strings(&[">", "file3", "cat", "file2", ">>", "ignored", "x"]);
        let parsed = parse_command(&tokens).unwrap();
        assert_eq!(parsed.name, "cat");
        assert_eq!(parsed.args, vec!["file2"]);
        assert_eq!(
            parsed.redirection,
            Some(Redirection::new(RedirectionKind::OutputTruncate, "file3"))
        );
    }

    #[test]
    fn test_redirection_without_command() {
        let tokens = strings(&[">", "out.txt"]);
        assert_eq!(parse_command(&tokens), Err(RedirectionError::MissingCommand));
    }

    #[test]
    fn test_open_truncate_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let file = path.to_string_lossy().to_string();

        for _ in 0..2 {
            let mut f = Redirection::new(RedirectionKind::OutputTruncate, &file)
                .open()
                .unwrap();
            f.write_all(b"hi\n").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi\n");

        for _ in 0..2 {
            let mut f = Redirection::new(RedirectionKind::ErrorAppend, &file)
                .open()
                .unwrap();
            f.write_all(b"more\n").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi\nmore\nmore\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_open_creates_with_0644() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        Redirection::new(RedirectionKind::OutputTruncate, path.to_string_lossy())
            .open()
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        // umask may only clear bits.
        assert_eq!(mode & !0o644 & 0o777, 0);
    }

    #[test]
    fn test_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        let err = Redirection::new(RedirectionKind::OutputTruncate, path.to_string_lossy())
            .open()
            .unwrap_err();
        assert_eq!(err.path, path);
    }
}
