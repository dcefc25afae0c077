//! # photo-catalog CLI
//!
//! Command-line interface for the photo catalog.
//!
//! ## Usage
//! ```bash
//! photo-catalog --assets-dir ~/Pictures catalog
//! photo-catalog duplicates --output json
//! ```

mod cli;

use photo_catalog::Result;

fn main() -> Result<()> {
    cli::run()
}
