//! Command handler modules
//!
//! Each handler takes already-parsed arguments, prints colored output for
//! the user and returns the run report when the command has one.

pub mod config;
pub mod sync;
pub mod transfer;

// Re-export all public handler functions for convenient use
pub use config::{apply_location, handle_init, load_config};
pub use sync::{handle_status, handle_sync, handle_unsync};
pub use transfer::{handle_export, handle_import};
