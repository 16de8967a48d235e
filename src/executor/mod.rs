//! Command execution module
//!
//! Provides async subprocess execution with:
//! - Buffered (merged stdout/stderr) or streamed output
//! - Working directory control
//! - Kill-on-abort tied to a target's signal

pub mod shell;

pub use shell::*;
