//! Shared helpers for the integration tests and benches.
//!
//! The golden fixtures under `tests/golden/` are committed buffers laid
//! out the way the load service lays them out: expressions numbered in
//! document order, arguments grouped by nesting layer, runs of five or
//! more equal scalar tags compressed. `datapackage.json` and `deaths.csv`
//! next to them are the source the buffer was produced from, by
//! [`producer::produce`].

#![allow(clippy::pedantic)]

pub mod producer;

use std::path::Path;

use wisent_decoder::{DecodeError, LazyValue, LazyView};
use wisent_types::Value;

/// Read a golden fixture by file name.
pub fn golden(name: &str) -> Vec<u8> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let fixture_path = manifest_dir.join("tests/golden").join(name);
    std::fs::read(&fixture_path)
        .unwrap_or_else(|e| panic!("failed to read golden fixture {}: {e}", fixture_path.display()))
}

/// Drain `view.arguments()` into owned values, recursing into nested
/// views, without applying any container promotion.
pub fn drain_raw(view: &LazyView<'_>) -> Result<Vec<Value>, DecodeError> {
    view.arguments()
        .map(|argument| match argument? {
            LazyValue::Expression(child) => Ok(Value::Expression(wisent_types::Expression {
                head: child.head()?.to_owned(),
                arguments: drain_raw(&child)?,
            })),
            scalar => scalar.to_value(),
        })
        .collect()
}
