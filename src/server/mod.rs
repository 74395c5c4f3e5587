// src/server/mod.rs

//! Server-side components.
//!
//! This module contains:
//! - `database` → DB abstraction over SQLite/Postgres, implements `TrafficStore`
//! - `logging`  → subscriber setup and per-client traffic events

pub mod database;
pub mod logging;

pub use database::{Database, DatabaseTransaction};
pub use logging::{generate_run_id, init_logging, log_traffic_event, TrafficEvent};
