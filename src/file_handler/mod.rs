//! File handler module for Orca Card
//!
//! Handles all file system operations including:
//! - Reading markdown files with encoding detection
//! - Atomic save operations for documents and exported images

pub mod io;

pub use io::*;
