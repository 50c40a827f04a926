//! Pure verdict-aggregation strategies.
//!
//! Free functions over a slice of successful per-backend results, with no
//! async or network dependency, so they stay trivially unit- and
//! property-testable in isolation from the fan-out path.

use crate::schema::ModelResult;

/// How per-backend predictions are folded into one flagged/not-flagged
/// verdict. Configured globally for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStrategy {
    /// Flagged if any backend flagged it.
    AnyFlag,
    /// Flagged only if every backend flagged it.
    AllFlag,
    /// Flagged if strictly more than half of backends flagged it; ties
    /// resolve to not-flagged.
    Majority,
    /// Flagged if the mean score across backends exceeds 0.5.
    Threshold,
}

/// Aggregates `results` (successful predictions only — failed backends are
/// excluded by the caller, see [`crate::orchestrator::Orchestrator::validate`])
/// per `strategy`. An empty slice is never flagged, regardless of strategy.
pub fn aggregate(strategy: AggregationStrategy, results: &[(&str, &ModelResult)]) -> bool {
    if results.is_empty() {
        return false;
    }
    match strategy {
        AggregationStrategy::AnyFlag => results.iter().any(|(_, r)| r.flagged),
        AggregationStrategy::AllFlag => results.iter().all(|(_, r)| r.flagged),
        AggregationStrategy::Majority => {
            let flagged_count = results.iter().filter(|(_, r)| r.flagged).count();
            flagged_count * 2 > results.len()
        }
        AggregationStrategy::Threshold => {
            let mean: f64 =
                results.iter().map(|(_, r)| r.score).sum::<f64>() / results.len() as f64;
            mean > 0.5
        }
    }
}

/// One `"{backend_name}_flagged"` entry per successfully-responded backend
/// that flagged, in input order. Used to populate
/// `ValidateResponse::flag_reasons`.
pub fn flag_reasons(results: &[(&str, &ModelResult)]) -> Vec<String> {
    results
        .iter()
        .filter(|(_, r)| r.flagged)
        .map(|(name, _)| format!("{name}_flagged"))
        .collect()
}
