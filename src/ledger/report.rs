//! Budget reporting derived from the usage ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::store::SharedLedger;

/// How much of the daily budget is left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    /// More than a fifth of the budget left
    Ok,
    /// A fifth or less left
    Low,
    /// Nothing left; generated personas speak canned lines
    Exhausted,
}

impl BudgetStatus {
    pub fn classify(remaining: u32, limit: u32) -> Self {
        if remaining == 0 {
            BudgetStatus::Exhausted
        } else if u64::from(remaining) * 5 <= u64::from(limit) {
            BudgetStatus::Low
        } else {
            BudgetStatus::Ok
        }
    }
}

/// Answer to the usage query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub count: u32,
    pub limit: u32,
    pub date: NaiveDate,
    #[serde(rename = "remainingCalls")]
    pub remaining_calls: u32,
    pub status: BudgetStatus,
}

/// Usage pushed to each new subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
}

/// Read-only view of the ledger against the configured daily limit
#[derive(Clone)]
pub struct UsageReporter {
    ledger: SharedLedger,
    limit: u32,
}

impl UsageReporter {
    pub fn new(ledger: SharedLedger, limit: u32) -> Self {
        Self { ledger, limit }
    }

    pub fn report(&self) -> UsageReport {
        let counter = self.ledger.lock().counter();
        let remaining_calls = self.limit.saturating_sub(counter.count);

        UsageReport {
            count: counter.count,
            limit: self.limit,
            date: counter.day,
            remaining_calls,
            status: BudgetStatus::classify(remaining_calls, self.limit),
        }
    }

    pub fn info(&self) -> UsageInfo {
        let count = self.ledger.lock().counter().count;
        UsageInfo {
            count,
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{FixedDate, UsageLedger};

    fn reporter(calls: u32, limit: u32) -> UsageReporter {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut ledger = UsageLedger::in_memory(Box::new(FixedDate::new(date)));
        for _ in 0..calls {
            ledger.record_call();
        }
        UsageReporter::new(ledger.into_shared(), limit)
    }

    #[test]
    fn test_classify() {
        assert_eq!(BudgetStatus::classify(25, 25), BudgetStatus::Ok);
        assert_eq!(BudgetStatus::classify(6, 25), BudgetStatus::Ok);
        assert_eq!(BudgetStatus::classify(5, 25), BudgetStatus::Low);
        assert_eq!(BudgetStatus::classify(1, 25), BudgetStatus::Low);
        assert_eq!(BudgetStatus::classify(0, 25), BudgetStatus::Exhausted);
    }

    #[test]
    fn test_report_json_shape() {
        let report = reporter(3, 25).report();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["count"], 3);
        assert_eq!(json["limit"], 25);
        assert_eq!(json["date"], "2026-10-16");
        assert_eq!(json["remainingCalls"], 22);
        assert_eq!(json["status"], "ok");
    }

    #[test]
    fn test_info_saturates() {
        let info = reporter(30, 25).info();
        assert_eq!(info.count, 30);
        assert_eq!(info.remaining, 0);
    }

    #[test]
    fn test_exhausted_status() {
        let report = reporter(25, 25).report();
        assert_eq!(report.status, BudgetStatus::Exhausted);
        assert_eq!(report.remaining_calls, 0);
    }
}
