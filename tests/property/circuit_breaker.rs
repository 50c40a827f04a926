//! Property tests: for any sequence of events the breaker stays in a legal
//! state, and a rejected call never mutates the breaker that rejected it.

use std::time::Duration;

use guardrail_gateway::circuit_breaker::{Breaker, CircuitState, Outcome};
use guardrail_gateway::config::CircuitBreakerPolicy;
use proptest::prelude::*;

fn policy() -> CircuitBreakerPolicy {
    CircuitBreakerPolicy {
        failure_threshold: 4,
        recovery_timeout: Duration::from_secs(3600),
        success_threshold: 3,
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Success,
    Failure,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![Just(Event::Success), Just(Event::Failure)]
}

proptest! {
    #[test]
    fn state_is_always_one_of_the_three_legal_values(events in proptest::collection::vec(event(), 0..200)) {
        let breaker = Breaker::new(policy());
        for event in events {
            if !breaker.allow_request() {
                // Open: no event is recorded for a rejected call.
                continue;
            }
            let outcome = match event {
                Event::Success => Outcome::Success,
                Event::Failure => Outcome::Failure,
            };
            breaker.on_result(outcome);
            let state = breaker.state_sync();
            prop_assert!(matches!(
                state,
                CircuitState::Closed | CircuitState::Open | CircuitState::HalfOpen
            ));
        }
    }

    #[test]
    fn forced_open_breaker_never_admits_a_call_that_mutates_it(events in proptest::collection::vec(event(), 0..50)) {
        // Recovery timeout is an hour, so within this test it can never elapse
        // and flip Open -> Half-Open on its own.
        let breaker = Breaker::new(policy());
        breaker.force_open();
        for _ in events {
            prop_assert!(!breaker.allow_request());
            prop_assert_eq!(breaker.state_sync(), CircuitState::Open);
        }
    }
}
