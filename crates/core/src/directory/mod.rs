//! Remote directory service access.

pub mod client;

pub use client::{DirectoryApi, DirectoryClient};
