//! Persistent per-day usage counter.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Ledger shared between the scheduler and the reporters
pub type SharedLedger = Arc<Mutex<UsageLedger>>;

// ─────────────────────────────────────────────────────────────────
// Calendar
// ─────────────────────────────────────────────────────────────────

/// Where "today" comes from.
pub trait DateSource: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDate;

impl DateSource for LocalDate {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable date for tests
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FixedDate(Arc<Mutex<NaiveDate>>);

#[cfg(test)]
impl FixedDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(Arc::new(Mutex::new(date)))
    }

    pub fn set(&self, date: NaiveDate) {
        *self.0.lock() = date;
    }
}

#[cfg(test)]
impl DateSource for FixedDate {
    fn today(&self) -> NaiveDate {
        *self.0.lock()
    }
}

// ─────────────────────────────────────────────────────────────────
// Counter
// ─────────────────────────────────────────────────────────────────

/// Successful generator calls on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub count: u32,
    pub day: NaiveDate,
}

impl UsageCounter {
    pub fn fresh(day: NaiveDate) -> Self {
        Self { count: 0, day }
    }
}

// ─────────────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────────────

/// Usage counter with day rollover and best-effort persistence.
///
/// Every read goes through [`UsageLedger::refresh`], so a counter from a
/// previous day is never observed. Write failures are logged and the ledger
/// keeps counting in memory; the next mutation writes the full state again.
pub struct UsageLedger {
    counter: UsageCounter,
    path: Option<PathBuf>,
    dates: Box<dyn DateSource>,
    write_pending: bool,
}

impl UsageLedger {
    /// Restore the counter from `path`, starting fresh when the file is
    /// missing, unreadable or from another day.
    pub fn load(path: impl Into<PathBuf>, dates: Box<dyn DateSource>) -> Self {
        let path = path.into();
        let today = dates.today();

        let (counter, needs_write) = match read_counter(&path) {
            Ok(Some(counter)) if counter.day == today => (counter, false),
            Ok(Some(stale)) => {
                info!(day = %stale.day, count = stale.count, "Usage counter is from a previous day, resetting");
                (UsageCounter::fresh(today), true)
            }
            Ok(None) => {
                info!(path = %path.display(), "No usage ledger found, starting a new one");
                (UsageCounter::fresh(today), true)
            }
            Err(e) => {
                warn!(error = %e.format_for_log(), "Usage ledger unreadable, starting a new one");
                (UsageCounter::fresh(today), true)
            }
        };

        let mut ledger = Self {
            counter,
            path: Some(path),
            dates,
            write_pending: false,
        };

        if needs_write {
            ledger.persist();
        }

        debug!(count = ledger.counter.count, day = %ledger.counter.day, "Usage ledger ready");
        ledger
    }

    /// Ledger that never touches disk
    pub fn in_memory(dates: Box<dyn DateSource>) -> Self {
        let today = dates.today();
        Self {
            counter: UsageCounter::fresh(today),
            path: None,
            dates,
            write_pending: false,
        }
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    /// Reset the counter if the calendar day changed since it was last touched
    pub fn refresh(&mut self) {
        let today = self.dates.today();
        if self.counter.day != today {
            info!(
                previous_day = %self.counter.day,
                previous_count = self.counter.count,
                "Usage counter rolled over"
            );
            self.counter = UsageCounter::fresh(today);
            self.persist();
        }
    }

    /// Current counter, after rollover
    pub fn counter(&mut self) -> UsageCounter {
        self.refresh();
        self.counter
    }

    /// Calls left today under `limit`
    pub fn remaining(&mut self, limit: u32) -> u32 {
        limit.saturating_sub(self.counter().count)
    }

    /// Count one successful generator call
    pub fn record_call(&mut self) -> u32 {
        self.refresh();
        self.counter.count += 1;
        self.counter.day = self.dates.today();
        self.persist();
        self.counter.count
    }

    /// Whether the last write attempt failed
    pub fn write_pending(&self) -> bool {
        self.write_pending
    }

    fn persist(&mut self) {
        let Some(path) = self.path.as_deref() else {
            return;
        };

        match write_counter(path, &self.counter) {
            Ok(()) => {
                if self.write_pending {
                    info!(path = %path.display(), "Usage ledger write recovered");
                }
                self.write_pending = false;
            }
            Err(e) => {
                warn!(error = %e.format_for_log(), "Usage ledger not persisted, continuing in memory");
                self.write_pending = true;
            }
        }
    }
}

fn read_counter(path: &Path) -> Result<Option<UsageCounter>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::IoRead {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::persistence(path, format!("invalid ledger contents: {}", e)))
}

/// Write via a sibling temp file and rename so readers never see a partial file
fn write_counter(path: &Path, counter: &UsageCounter) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::persistence(path, e.to_string()))?;
    }

    let json = serde_json::to_string_pretty(counter)?;
    let tmp = path.with_extension("json.tmp");

    fs::write(&tmp, json).map_err(|e| Error::persistence(&tmp, e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| Error::persistence(path, e.to_string()))?;
    Ok(())
}
