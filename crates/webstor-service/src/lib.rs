//! # webstor-service
//!
//! Business logic service layer for WebStor. Each service orchestrates
//! repositories and the cache to implement application-level use cases.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references. Domain failures (quota,
//! subscription, folder placement) are typed [`StorageError`] values that
//! travel unchanged through every layer; only the outermost boundary
//! turns them into user-facing messages.

pub mod error;
pub mod file;
pub mod folder;
pub mod plan;
pub mod quota;
pub mod subscription;

pub use error::{ServiceResult, StorageError};
pub use file::{CachedFileService, FileProvider, FileService, UploadRequest};
pub use folder::FolderService;
pub use plan::PlanService;
pub use quota::{MemoryUsageLedger, QuotaService};
pub use subscription::{PlanResolver, SubscriptionService};
