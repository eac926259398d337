//! # Data Bundle Reselling Service
//!
//! Vendor accounts, the network/bundle catalog, and the order and withdrawal
//! ledgers behind a role-guarded HTTP API.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
