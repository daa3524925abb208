//! Shared infrastructure utilities for the PTT crawler.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename) for CSV exports
//! - **`append_log`**: Append-only error logs under `errors/`

pub mod append_log;
pub mod atomic_write;

pub use append_log::append_line;
pub use atomic_write::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, atomic_write,
    atomic_write_with_options,
};
