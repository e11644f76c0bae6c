//! Semester grade ledger: per-user, per-branch semester records with derived
//! letter grades, SGPA/CGPA, and the payload sent to the performance analyzer.

pub mod aggregate;
pub mod analysis;
pub mod branch;
pub mod config;
pub mod db;
pub mod error;
pub mod grade_scale;
pub mod ipc;
pub mod kv;
pub mod ledger;
pub mod metrics;
pub mod model;

pub use error::{LedgerError, Result};
