//! # konsync
//!
//! A command-line tool for keeping dotfiles and desktop configuration in a
//! single sync directory.
//!
//! ## Overview
//!
//! `konsync` moves every configured entry (a file or directory under some
//! base location such as `~/.config`) into a sync directory and leaves a
//! symlink behind. The sync directory can then be shared between machines
//! with any file synchronization tool. Entries can also be archived into a
//! single zpaq file and restored from it.
//!
//! ## Key Features
//!
//! - **Idempotent sync**: every run inspects the filesystem again, so a run
//!   interrupted halfway is finished by the next one
//! - **Conflict safety**: content present on both sides is never replaced
//!   unless a side is chosen with `--force local` or `--force sync`
//! - **Recoverable deletes**: anything removed goes to the desktop trash
//! - **Tokens**: locations may use `$HOME`, `$CONFIG_DIR` and lookup
//!   functions such as `${ENDS_WITH='.default-release'}`
//! - **Unsync**: turns every link back into a real copy
//!
//! ## Architecture
//!
//! - Configuration ([`config`], [`model`], [`tokens`])
//! - Filesystem primitives ([`copy`], [`fsops`], [`trash`])
//! - Sync engine ([`sync`]) and its per-entry [`report`]
//! - Archiving ([`archive`])
//! - Command-line glue ([`handlers`], [`logger`])

/// Zpaq archiver used by export and import.
pub mod archive;

/// Platform-agnostic configuration directory management for konsync.
///
/// Locates the config directory, the default config file and the log file
/// following platform conventions, and holds the built-in config templates.
pub mod config;

/// Merge-copy of files and directory trees.
pub mod copy;

/// Error types and the crate `Result` alias.
pub mod error;

/// Small filesystem helpers shared by the sync engine.
pub mod fsops;

/// Command handlers called by the binary.
pub mod handlers;

/// Logging configuration and utilities.
///
/// Sets up console logging through `env_logger` and a persistent log file in
/// the config directory with automatic rotation.
pub mod logger;

/// Typed configuration and its loader.
///
/// Parses YAML or TOML, normalizes nulls, resolves tokens in every location
/// and validates entries before any command touches the filesystem.
pub mod model;

/// Per-entry outcomes of a run.
pub mod report;

/// Core synchronization logic.
///
/// - **Reconcile**: moves entries into the sync directory and links them back
/// - **Unsync**: replaces the links with real copies
/// - **Export / import**: archives entries and restores them
/// - **Status**: inspects entries without changing anything
pub mod sync;

/// `$KEYWORD` and `${FUNCTION='arg'}` substitution in config locations.
pub mod tokens;

/// Recoverable deletion.
pub mod trash;

pub use error::{Error, Result};
