use std::path::Path;

use anyhow::{Context, Result, ensure};
use interview_flow::flow::{BlockAggregator, Dataset};
use tracing::info;

/// Reads one or more dataset files into a single aggregator, merging later
/// files into earlier ones by block id.
pub(crate) fn load_aggregator(paths: &[impl AsRef<Path>]) -> Result<BlockAggregator> {
    ensure!(!paths.is_empty(), "no dataset given");

    let mut aggregator = BlockAggregator::default();
    for path in paths {
        let path = path.as_ref();
        let dataset = Dataset::load(path)
            .with_context(|| format!("failed to read dataset {}", path.display()))?;
        aggregator
            .extend(&dataset)
            .with_context(|| format!("dataset {} violates the interview contract", path.display()))?;
        info!(path = %path.display(), "loaded dataset");
    }
    Ok(aggregator)
}
