//! Client-side state orchestration for an OKR tracker.
//!
//! - [`engine`]: requests in, outcomes reduced into immutable snapshots.
//! - [`services`]: the CRUD boundary the engine persists through.
//! - [`db`]: the SQLite store behind the default services.
//! - [`api`]: HTTP surface to dispatch requests and read snapshots.

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod services;
