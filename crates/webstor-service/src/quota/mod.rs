//! Quota accounting.

pub mod memory;
pub mod service;

pub use memory::MemoryUsageLedger;
pub use service::QuotaService;
