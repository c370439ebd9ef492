use std::collections::BTreeSet;
use std::env;
use std::fs;

use rustyline::Helper;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;

use crate::search::is_executable;

/// Tab completion: command names in the first word, file names after it.
pub struct ShellCompleter {
    builtins: Vec<String>,
    filename_completer: FilenameCompleter,
}

impl ShellCompleter {
    pub fn new(builtins: impl IntoIterator<Item = String>) -> Self {
        Self {
            builtins: builtins.into_iter().collect(),
            filename_completer: FilenameCompleter::new(),
        }
    }

    /// Builtins and executables on `search_path` starting with `word`, sorted
    /// and without duplicates.
    pub fn command_candidates(&self, word: &str, search_path: Option<&str>) -> Vec<String> {
        let mut names: BTreeSet<String> = self
            .builtins
            .iter()
            .filter(|b| b.starts_with(word))
            .cloned()
            .collect();

        for dir in search_path.unwrap_or_default().split(':').filter(|d| !d.is_empty()) {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            names.extend(
                entries
                    .flatten()
                    .filter(|e| is_executable(&e.path()))
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|name| name.starts_with(word)),
            );
        }

        names.into_iter().collect()
    }
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &rustyline::Context<'_>,
    ) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        let (start, word) = extract_word(line, pos);
        if !is_first_word(line, start) {
            return self.filename_completer.complete(line, pos, ctx);
        }

        let search_path = env::var("PATH").ok();
        let candidates = self
            .command_candidates(word, search_path.as_deref())
            .into_iter()
            .map(|name| Pair {
                replacement: format!("{name} "),
                display: name,
            })
            .collect();
        tracing::trace!(target: "completion", word, "completing command name");
        Ok((start, candidates))
    }
}

/// Start offset and text of the word ending at `pos`.
fn extract_word(line: &str, pos: usize) -> (usize, &str) {
    let before = &line[..pos];
    let start = before
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8());
    (start, &line[start..pos])
}

fn is_first_word(line: &str, start: usize) -> bool {
    line[..start].trim().is_empty()
}

impl Helper for ShellCompleter {}
impl Hinter for ShellCompleter {
    type Hint = String;
}
impl Highlighter for ShellCompleter {}
impl Validator for ShellCompleter {}
