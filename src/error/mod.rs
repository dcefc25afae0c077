//! # Error Module
//!
//! Error types for the photo catalog.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **User-friendly messages** - non-technical users should understand
//! - **Recovery hints** - suggest how to fix when possible

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Image error: {0}")]
    Imaging(#[from] ImagingError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cataloging was cancelled")]
    Cancelled,
}

impl CatalogError {
    /// Shorthand for argument validation failures
    pub fn argument(message: impl Into<String>) -> Self {
        CatalogError::Argument(message.into())
    }
}

/// Errors raised by the catalog database
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open catalog database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Catalog corruption detected at {path}. Restore a backup and try again.")]
    Corrupted { path: PathBuf },

    #[error("Failed to write backup {path}: {reason}")]
    BackupFailed { path: PathBuf, reason: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        StorageError::QueryFailed(error.to_string())
    }
}

/// Errors that occur while listing directories
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while hashing asset files
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },
}

/// Errors from decoding images and generating thumbnails
#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("Image has no pixels: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Thumbnail generation failed: {0}")]
    ThumbnailFailed(String),
}

/// Errors from moving, copying and deleting asset files
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Failed to copy {from} to {to}: {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {path}: source {expected} bytes, destination {actual} bytes")]
    VerificationFailed {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to delete {path}: {source}")]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading or saving user settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {path} is not valid: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("Could not determine the application data directory")]
    NoDataDirectory,
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;
