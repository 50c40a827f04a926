//! Aggregation truth table: three successful backends with flags
//! `[T,F,F]` and scores `[0.9,0.1,0.2]`.

use guardrail_gateway::aggregation::{aggregate, AggregationStrategy};
use guardrail_gateway::schema::ModelResult;

fn result(flagged: bool, score: f64) -> ModelResult {
    ModelResult {
        flagged,
        score,
        details: vec![],
        latency_ms: 5,
    }
}

#[test]
fn truth_table_three_backends() {
    let a = result(true, 0.9);
    let b = result(false, 0.1);
    let c = result(false, 0.2);
    let results = [("prompt-guard", &a), ("pii-detect", &b), ("hate-detect", &c)];

    assert!(aggregate(AggregationStrategy::AnyFlag, &results));
    assert!(!aggregate(AggregationStrategy::AllFlag, &results));
    assert!(!aggregate(AggregationStrategy::Majority, &results));
    assert!(!aggregate(AggregationStrategy::Threshold, &results));
}
