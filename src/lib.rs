//! Traffic Reset - scheduled per-client traffic counter resets
//!
//! Clients either reset on a fixed day of the month or every 30 days since
//! their last reset. Expired clients are skipped on their fixed reset day.
//!
//! # Features
//!
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `background-jobs` - Cron scheduler and the `traffic-reset` binary. Enabled by default.
//!
//! # Example
//!
//! ```rust,ignore
//! use chrono::Utc;
//! use traffic_reset::{policy::should_reset, Client};
//!
//! let client = Client { traffic_reset_day: 22, ..Default::default() };
//! let due = should_reset(&client, &Utc::now());
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod policy;
pub mod store;

#[path = "server/mod.rs"]
pub mod server;

pub use client::Client;
pub use policy::{should_reset, ResetPolicy, PERIODIC_RESET_INTERVAL_SECS};
pub use store::TrafficStore;
