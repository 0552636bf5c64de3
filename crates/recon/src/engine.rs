use chrono::NaiveDate;
use log::debug;

use crate::aggregate::Aggregator;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::model::{AggregateResult, ReconInput, ReconMeta, SourceKind};
use crate::reconcile::MapReconciler;
use crate::table::SourceSet;

/// Run one reconciliation pass over `input`, anchored at `today`.
///
/// The pass is pure: the same config, input and anchor date always produce
/// an equal result. The only failure is an input with no sources at all.
pub fn run(
    config: &ReconConfig,
    input: &ReconInput,
    today: NaiveDate,
) -> Result<AggregateResult, ReconError> {
    if input.is_empty() {
        return Err(ReconError::NoRecognizedSources {
            expected: SourceKind::ALL
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    let sources = SourceSet::from_input(input);
    let maps = MapReconciler::new(config, &sources).reconcile_all();
    debug!("reconciled {} maps from {} sources", maps.len(), sources.loaded.len());

    let mut aggregator = Aggregator::new(today);
    for map in maps {
        aggregator.push(map);
    }

    Ok(aggregator.finish(
        &config.labels,
        ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            today,
            sources_loaded: sources.loaded,
        },
    ))
}
