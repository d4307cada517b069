/// Implementation of `wisent eager`.
///
/// Runs one session and materializes the whole buffer with the eager
/// decoder. Without `--column` the tree is printed; with it, only the
/// column aggregate.
use anyhow::{Context, Result};
use wisent_decoder::EagerDecoder;
use wisent_session::{Session, sum_column_eager};

use crate::{EagerArgs, output};

/// Run the `wisent eager` command.
///
/// # Errors
///
/// Session setup, service, shared memory, and decode failures.
pub fn run(args: &EagerArgs) -> Result<()> {
    let config = args.session.to_config();
    let dataset = config.dataset_path();
    let session = Session::connect(config)?;

    if let Some(column) = &args.column {
        let aggregate = session
            .run(|bytes| {
                let root = EagerDecoder::decode(bytes)?;
                Ok(sum_column_eager(&root, column)?)
            })
            .with_context(|| format!("cannot aggregate {column:?} of {}", dataset.display()))?;
        output::print_aggregate(column, &aggregate);
        return Ok(());
    }

    let root = session
        .run(|bytes| Ok(EagerDecoder::decode(bytes)?))
        .with_context(|| format!("cannot decode {}", dataset.display()))?;
    output::print_value(&root, args.json)
}
