pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use error::{CommitError, ScanError, StationError};
pub use service::{ReconciliationCommitter, ScanSession, ScanStation, StationHandle};
