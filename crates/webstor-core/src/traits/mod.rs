//! Seam traits implemented by the infrastructure crates.

pub mod cache;
pub mod usage_ledger;

pub use cache::CacheProvider;
pub use usage_ledger::{ReleaseOutcome, UsageLedger};
