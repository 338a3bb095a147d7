//! Error types for Orca Card
//!
//! This module defines all custom error types used throughout the crate.
//! Error types are organized by category for clear error handling and user-friendly messages.

use std::path::PathBuf;
use thiserror::Error;

/// Main application error type encompassing all error categories
#[derive(Error, Debug)]
pub enum AppError {
    /// File I/O related errors
    #[error(transparent)]
    FileIO(#[from] FileError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Export errors
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Persistence errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Generic unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// File I/O related errors
#[derive(Error, Debug)]
pub enum FileError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied when accessing file
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// File is too large to open
    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    TooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Error reading file
    #[error("Could not read file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing file
    #[error("Could not save file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory operation error
    #[error("Directory error: {path}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Could not load configuration: {0}")]
    LoadError(String),

    /// Error saving configuration
    #[error("Could not save configuration: {0}")]
    SaveError(String),

    /// Error parsing configuration
    #[error("Invalid configuration format: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration directory error
    #[error("Could not access configuration directory")]
    DirectoryError,
}

/// Failure reported by an external rasterizer for a single slice
#[derive(Error, Debug)]
pub enum RasterizeError {
    /// The capture routine rejected
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The capture produced no usable image data
    #[error("Capture produced an empty image")]
    EmptyImage,

    /// Emitting the captured image failed
    #[error("Could not write image: {0}")]
    Emit(#[from] FileError),
}

/// Errors that can occur while planning or running an export
#[derive(Error, Debug)]
pub enum ExportError {
    /// A dimension was zero or negative
    #[error("Invalid dimension: {name} must be positive (got {value})")]
    InvalidDimension { name: &'static str, value: f64 },

    /// A slice failed to capture; no further slices were attempted
    #[error("Failed to capture slice {part} of {total}")]
    SliceCapture {
        /// 1-indexed part number of the failing slice
        part: usize,
        total: usize,
        #[source]
        source: RasterizeError,
    },
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Could not determine where to store data
    #[error("Could not access data directory")]
    DirectoryError,

    /// Error reading stored data
    #[error("Could not load stored data: {0}")]
    LoadError(String),

    /// Error writing stored data
    #[error("Could not save data: {0}")]
    SaveError(String),

    /// Stored data is not valid JSON for the current schema
    #[error("Stored data is corrupt: {0}")]
    ParseError(String),
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for file operations
pub type FileResult<T> = Result<T, FileError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl FileError {
    /// Create a user-friendly error message suitable for display in dialogs
    pub fn user_message(&self) -> String {
        match self {
            FileError::NotFound { .. } => {
                "The file could not be found. It may have been moved or deleted.".to_string()
            }
            FileError::PermissionDenied { .. } => {
                "You don't have permission to access this file. Check file permissions.".to_string()
            }
            FileError::TooLarge { max_size, .. } => {
                format!(
                    "This file is too large to open. Maximum file size is {} bytes.",
                    max_size
                )
            }
            FileError::WriteError { .. } => {
                "Could not save the file. Check disk space and permissions.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl ExportError {
    /// Create a user-friendly error message for the export toast
    pub fn user_message(&self) -> String {
        match self {
            ExportError::InvalidDimension { .. } => {
                "The card has no visible size yet. Wait for the preview to render and try again."
                    .to_string()
            }
            ExportError::SliceCapture { part, total, .. } => {
                format!(
                    "Failed to generate image part {} of {}. Earlier parts were saved; please try again.",
                    part, total
                )
            }
        }
    }
}
