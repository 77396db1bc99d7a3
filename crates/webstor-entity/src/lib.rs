//! # webstor-entity
//!
//! Domain entity models for WebStor. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod event;
pub mod file;
pub mod folder;
pub mod plan;
pub mod quota;
pub mod subscription;
pub mod user;
