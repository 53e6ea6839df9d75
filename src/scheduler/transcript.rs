//! Bounded, append-only conversation transcript.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::generator::ContextLine;

/// One line of dialogue as viewers see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Persona name
    pub source: String,
    pub text: String,
    /// Elapsed session time, `HH:MM:SS`
    pub timestamp: String,
}

impl From<&TranscriptEntry> for ContextLine {
    fn from(entry: &TranscriptEntry) -> Self {
        ContextLine::new(entry.source.clone(), entry.text.clone())
    }
}

/// Ordered entries; once longer than `limit`, only the trailing `keep` survive.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    limit: usize,
    keep: usize,
}

impl Transcript {
    pub fn new(limit: usize, keep: usize) -> Self {
        let keep = keep.clamp(1, limit.max(1));
        Self {
            entries: Vec::with_capacity(limit + 1),
            limit,
            keep,
        }
    }

    /// Append an entry, truncating if the limit is exceeded.
    /// Returns whether truncation happened.
    pub fn push(&mut self, entry: TranscriptEntry) -> bool {
        self.entries.push(entry);
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.keep;
            self.entries.drain(..excess);
            true
        } else {
            false
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Up to `n` most recent entries, oldest first
    pub fn recent(&self, n: usize) -> &[TranscriptEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `HH:MM:SS` for an elapsed duration; hours keep counting past 24.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
