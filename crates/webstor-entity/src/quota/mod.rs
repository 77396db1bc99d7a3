//! Quota value objects.

pub mod snapshot;

pub use snapshot::QuotaSnapshot;
