//! # FileCabinet
//!
//! A single-process employee record manager with:
//! - Interchangeable in-memory and flat-file backends
//! - Fixed 278-byte binary slots with soft delete, purge and restore
//! - Case-insensitive field indexes kept in step with every write
//! - A small filter language for select, update and delete
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CLI (REPL)                            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command::parse
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Cabinet                               │
//! │              (commands → store calls → replies)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Box<dyn RecordStore>
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │            LoggingStore → TimedStore (optional)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ MemoryStore │          │  FileStore  │
//!   │ (Vec, ids)  │          │ (278 B slot)│
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          └──────────┬─────────────┘
//!                     ▼
//!   ┌─────────────────────────────────────┐
//!   │  IndexManager · Validator · query   │
//!   └─────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod index;
pub mod validation;
pub mod query;
pub mod store;
pub mod snapshot;
pub mod command;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CabinetError, Result};
pub use config::{Config, StorageKind};
pub use engine::{Cabinet, Reply};
pub use record::{Record, RecordParams};
pub use store::RecordStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FileCabinet
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
