//! # Photo Catalog
//!
//! Catalogs a directory tree of photos: folders, assets, thumbnails and
//! content hashes, kept in a SQLite database with dated backups.
//!
//! ## Features
//! - **Incremental cataloging** - only new or modified files are processed
//! - **Duplicate finder** - exact hash or perceptual (dHash) matching
//! - **Safe transfers** - copies are verified before a source is removed
//! - **Directory sync** - one-way mirroring of configured directory pairs
//!
//! ## Architecture
//! - `core` - The catalog engine
//! - `app` - Facade wiring the engine together
//! - `config` - User settings
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - User-friendly error types

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use app::Application;
pub use config::AppSettings;
pub use error::{CatalogError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG`
/// overrides the default filter.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "photo_catalog=debug"
    } else {
        "photo_catalog=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber may already be installed (tests, embedding applications)
    let _ = tracing::subscriber::set_global_default(subscriber);
}
