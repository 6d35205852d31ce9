//! Parallel batch driver.

use rayon::prelude::*;

use rf_core::{Merge, Result};

use crate::batch::EventBatch;
use crate::config::{ProcessorKind, RunConfig};
use crate::processor::{Outputs, Processor};
use crate::schema::SchemaAdapter;
use crate::trigger_efficiency::TriggerEfficiencyProcessor;
use crate::ttbar::TTBarControlRegionProcessor;

/// Build the configured processor, loading the lumi mask if one is set.
pub fn build_processor(config: &RunConfig) -> Result<Box<dyn Processor>> {
    config.validate()?;
    let lumi = config.load_lumi_mask()?;
    Ok(match config.processor {
        ProcessorKind::TriggerEfficiency => Box::new(TriggerEfficiencyProcessor::new(config, lumi)?),
        ProcessorKind::Ttbar => Box::new(TTBarControlRegionProcessor::new(config, lumi)?),
    })
}

/// Apply the schema adapter to every batch.
pub fn prepare_batches(adapter: &SchemaAdapter, batches: &mut [EventBatch]) -> Result<()> {
    batches.iter_mut().try_for_each(|b| adapter.apply(b))
}

/// Process independent batches on the rayon pool and merge their outputs.
///
/// Histograms, cutflows and `sumw` do not depend on batch order. Selected
/// columns are concatenated in input order.
pub fn run_batches(processor: &dyn Processor, batches: &[EventBatch]) -> Result<Outputs> {
    let merged = batches
        .par_iter()
        .map(|batch| processor.process(batch))
        .try_reduce(Outputs::new, |mut acc, next| {
            acc.merge(next)?;
            Ok(acc)
        })?;
    tracing::info!(
        processor = processor.name(),
        batches = batches.len(),
        datasets = merged.len(),
        "run complete"
    );
    Ok(merged)
}

/// Sequential reference implementation of [`run_batches`].
pub fn run_batches_sequential(processor: &dyn Processor, batches: &[EventBatch]) -> Result<Outputs> {
    let mut merged = Outputs::new();
    for batch in batches {
        merged.merge(processor.process(batch)?)?;
    }
    Ok(merged)
}
