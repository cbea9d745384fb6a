//! # media-lib CLI
//!
//! Command-line interface for the media library core.
//!
//! ## Usage
//! ```bash
//! media-lib import ~/Pictures --query "type:image -screenshot"
//! media-lib import ~/Pictures --output json
//! RUST_LOG=media_library=debug media-lib import ~/Pictures
//! ```

mod cli;

use media_library::Result;

fn main() -> Result<()> {
    media_library::init_tracing()?;
    cli::run()
}
