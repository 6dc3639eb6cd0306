use tracing::{info, instrument};

use super::assembler::assemble;
use super::catalog::build_catalog;
use super::transactions::generate_transactions;
use crate::config::GeneratorConfig;
use crate::context::GenerationContext;
use crate::errors::GenerationError;
use crate::models::Dataset;

/// Runs catalog → transactions → assembly with one context seeded from `config.seed`.
///
/// Pure and repeatable: the same configuration always yields the same dataset. Nothing is
/// written here; persisting is the caller's job.
#[instrument(skip_all, fields(seed = config.seed, start = %config.start_date, end = %config.end_date))]
pub fn generate_dataset(config: &GeneratorConfig) -> Result<Dataset, GenerationError> {
    let mut ctx = GenerationContext::new(config.seed);
    generate_with_context(config, &mut ctx)
}

/// Same as [`generate_dataset`] with a caller-provided context.
pub fn generate_with_context(
    config: &GeneratorConfig,
    ctx: &mut GenerationContext,
) -> Result<Dataset, GenerationError> {
    let catalog = build_catalog(config, ctx)?;
    let drafts = generate_transactions(config, &catalog, ctx)?;
    let dataset = assemble(config, catalog, drafts)?;
    info!(tables = ?dataset.table_counts(), "Dataset generated");
    Ok(dataset)
}
