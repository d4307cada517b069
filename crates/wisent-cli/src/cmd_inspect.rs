/// Implementation of `wisent inspect`.
///
/// Decodes a buffer dump from disk without involving the load service.
///
/// # Output format
///
/// ```text
/// Header: 12 args, 4 expressions
/// Regions: args=96 argTypes=96 exprs=96 strings=57 (bytes)
/// {name: "datapackage", resources: [...]}
/// ```
use std::fs;
use std::time::Instant;

use anyhow::{Context, Result};
use wisent_decoder::{EagerDecoder, LazyView};
use wisent_wire::Regions;

use crate::{InspectArgs, output};

/// Run the `wisent inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not decode.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let regions = Regions::parse(&bytes)
        .with_context(|| format!("invalid buffer layout in {}", args.file.display()))?;
    println!(
        "Header: {} arg{}, {} expression{}",
        regions.arg_count(),
        if regions.arg_count() == 1 { "" } else { "s" },
        regions.expr_count(),
        if regions.expr_count() == 1 { "" } else { "s" },
    );
    println!(
        "Regions: args={} argTypes={} exprs={} strings={} (bytes)",
        regions.args().len(),
        regions.arg_types().len(),
        regions.exprs().len(),
        regions.strings().len(),
    );

    let started = Instant::now();
    let root = if args.lazy {
        LazyView::new(regions, 0).and_then(|view| view.materialize())
    } else {
        EagerDecoder::new().decode_regions(&regions)
    }
    .with_context(|| format!("failed to decode {}", args.file.display()))?;
    tracing::info!(
        lazy = args.lazy,
        elapsed_us = started.elapsed().as_micros(),
        "decoded buffer"
    );

    output::print_value(&root, args.json)
}
