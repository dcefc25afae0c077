//! # Events Module
//!
//! Event-driven progress reporting for the catalog services.
//!
//! ## Design
//! Services emit events through channels, allowing any front end
//! (CLI, GUI) to subscribe and display progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Catalog(CatalogChange::AssetCreated(p)) = event {
//!             println!("{}/{} {}", p.processed, p.total, p.path.display());
//!         }
//!     }
//! });
//!
//! app.catalog_assets(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
