//! pinsync core library.
//!
//! This crate provides the components for bulk voicemail PIN updates against
//! a Unity-style directory service: configuration, the directory REST client,
//! the append-only outcome ledger, input parsing, pacing, and the batch
//! runner that ties them together.

pub mod config;
pub mod directory;
pub mod errors;
pub mod input;
pub mod ledger;
pub mod models;
pub mod pacing;
pub mod runner;

// Re-exports for convenience.
pub use config::AppConfig;
pub use directory::{DirectoryApi, DirectoryClient};
pub use ledger::Ledger;
pub use runner::BatchRunner;
