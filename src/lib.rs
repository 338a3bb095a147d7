//! Orca Card - markdown-to-social-image card toolkit
//!
//! The library behind the card editor:
//! - [`text`]: spacing normalization and other pure text transforms
//! - [`export`]: slice planning and the capture loop for tall cards
//! - [`storage`]: persistence of the card being edited
//! - [`viewport`]: viewport height tracking for the editor layout

pub mod config;
pub mod error;
pub mod export;
pub mod file_handler;
pub mod storage;
pub mod text;
pub mod viewport;

pub use config::Config;
pub use error::{AppError, AppResult, ExportError, RasterizeError};
pub use text::spacing::normalize;
