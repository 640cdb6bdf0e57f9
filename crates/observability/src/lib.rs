//! Tracing and logging setup shared by the binaries.
//!
//! `init` is safe to call multiple times; subsequent calls become no-ops.

pub mod tracing;

pub use self::tracing::{DEFAULT_FILTER, LogFormat, init};
