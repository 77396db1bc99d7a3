//! Plan catalog administration.

pub mod service;

pub use service::PlanService;
