//! Regenerates `tests/golden/datapackage.wisent` from `datapackage.json`
//! and `deaths.csv` in the same directory.
//!
//! Run it after changing the source documents, then review the golden
//! snapshots with `cargo insta review`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_golden -p wisent-tests
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};

fn main() -> Result<()> {
    let golden_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/golden");
    let buf = wisent_tests::producer::produce(&golden_dir)?;

    let path = golden_dir.join("datapackage.wisent");
    std::fs::write(&path, &buf).with_context(|| format!("cannot write {}", path.display()))?;
    println!("wrote {} ({} bytes)", path.display(), buf.len());
    Ok(())
}
