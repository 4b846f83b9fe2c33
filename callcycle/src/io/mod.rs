//! I/O helpers for cycle commands.

pub mod analysis;
pub mod config;
pub mod http;
pub mod init;
pub mod script_store;
pub mod synthesis;
pub mod transcription;
