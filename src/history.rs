use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history is empty")]
    Empty,
}

/// Execution counts keyed by the raw input line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    counts: HashMap<String, u64>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, line: &str) {
        *self.counts.entry(line.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, line: &str) -> u64 {
        self.counts.get(line).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Entries ordered by count, highest first; ties by line.
    pub fn list(&self) -> Result<Vec<(String, u64)>, HistoryError> {
        if self.counts.is_empty() {
            return Err(HistoryError::Empty);
        }
        let mut entries: Vec<_> = self
            .counts
            .iter()
            .map(|(line, count)| (line.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(entries)
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for History {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        Self {
            counts: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
