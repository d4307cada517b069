/// Implementation of `wisent lazy`.
///
/// Runs one session and sums a column by walking lazy views from the
/// root; only the cells of that column are decoded.
use anyhow::{Context, Result};
use wisent_decoder::LazyView;
use wisent_session::{Session, sum_column_lazy};

use crate::{LazyArgs, output};

/// Run the `wisent lazy` command.
///
/// # Errors
///
/// Session setup, service, shared memory, and decode failures, including
/// `KeyNotFound` when the dataset has no such column.
pub fn run(args: &LazyArgs) -> Result<()> {
    let config = args.session.to_config();
    let dataset = config.dataset_path();
    let session = Session::connect(config)?;

    let aggregate = session
        .run(|bytes| {
            let root = LazyView::root(bytes)?;
            Ok(sum_column_lazy(&root, &args.column)?)
        })
        .with_context(|| format!("cannot aggregate {:?} of {}", args.column, dataset.display()))?;

    output::print_aggregate(&args.column, &aggregate);
    Ok(())
}
