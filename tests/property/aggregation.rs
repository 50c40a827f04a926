//! Property tests: empty input never flags, flag reasons match flagged
//! entries one-to-one, and a majority vote never flags on an exact tie.

use guardrail_gateway::aggregation::{aggregate, flag_reasons, AggregationStrategy};
use guardrail_gateway::schema::ModelResult;
use proptest::prelude::*;

fn strategy() -> impl Strategy<Value = AggregationStrategy> {
    prop_oneof![
        Just(AggregationStrategy::AnyFlag),
        Just(AggregationStrategy::AllFlag),
        Just(AggregationStrategy::Majority),
        Just(AggregationStrategy::Threshold),
    ]
}

fn model_results() -> impl Strategy<Value = Vec<(String, bool, f64)>> {
    proptest::collection::vec(
        (
            "[a-z]{3,8}",
            any::<bool>(),
            (0.0f64..=1.0f64),
        ),
        0..8,
    )
}

proptest! {
    #[test]
    fn empty_input_never_flags_under_any_strategy(strategy in strategy()) {
        prop_assert!(!aggregate(strategy, &[]));
    }

    #[test]
    fn flag_reasons_match_flagged_entries_one_to_one(entries in model_results()) {
        let results: Vec<ModelResult> = entries
            .iter()
            .map(|(_, flagged, score)| ModelResult {
                flagged: *flagged,
                score: *score,
                details: vec![],
                latency_ms: 1,
            })
            .collect();
        let refs: Vec<(&str, &ModelResult)> = entries
            .iter()
            .zip(results.iter())
            .map(|((name, _, _), result)| (name.as_str(), result))
            .collect();

        let reasons = flag_reasons(&refs);
        let expected_flagged_count = entries.iter().filter(|(_, flagged, _)| *flagged).count();
        prop_assert_eq!(reasons.len(), expected_flagged_count);
        for (name, flagged, _) in &entries {
            let reason = format!("{name}_flagged");
            prop_assert_eq!(reasons.contains(&reason), *flagged);
        }
    }

    #[test]
    fn majority_is_never_true_on_an_exact_tie(pairs in proptest::collection::vec(any::<bool>(), 0..6)) {
        // Build an even-length vector so true/false counts can tie exactly.
        let mut flags = pairs.clone();
        flags.extend(pairs.iter().map(|f| !f));
        let results: Vec<ModelResult> = flags
            .iter()
            .map(|f| ModelResult { flagged: *f, score: 0.0, details: vec![], latency_ms: 1 })
            .collect();
        let refs: Vec<(&str, &ModelResult)> = results.iter().map(|r| ("x", r)).collect();
        let flagged_count = flags.iter().filter(|f| **f).count();
        if flagged_count * 2 == flags.len() && !flags.is_empty() {
            prop_assert!(!aggregate(AggregationStrategy::Majority, &refs));
        }
    }
}
