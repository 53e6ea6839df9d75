//! Daily call budget: the persisted usage counter and the reports derived
//! from it.

mod report;
mod store;

pub use report::{BudgetStatus, UsageInfo, UsageReport, UsageReporter};
#[cfg(test)]
pub use store::FixedDate;
pub use store::{DateSource, LocalDate, SharedLedger, UsageCounter, UsageLedger};
