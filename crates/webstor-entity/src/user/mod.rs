//! User entity (storage-accounting subset).

pub mod model;

pub use model::User;
