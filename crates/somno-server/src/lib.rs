//! Sleep tracker REST server library.
//!
//! This crate wires the domain logic, store, and advice bridge into an
//! axum application.

mod config;
pub mod error;
pub mod routes;
pub mod service;

pub use config::Config;
pub use service::RecordService;
