//! Property-based tests for the turn state machine

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_turn_end() -> impl Strategy<Value = TurnEnd> {
    prop_oneof![
        Just(TurnEnd::Replied),
        Just(TurnEnd::Terminated),
        Just(TurnEnd::Failed),
    ]
}

fn arb_event() -> impl Strategy<Value = TurnEvent> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|text| TurnEvent::Request { text }),
        arb_turn_end().prop_map(TurnEvent::Finished),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // An active turn always carries a non-blank request
    #[test]
    fn prop_active_turn_has_request(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = TurnState::Idle;
        for event in events {
            if let Ok(next) = transition(&state, event) {
                state = next;
            }
            if let TurnState::TurnActive { request } = &state {
                prop_assert!(!request.trim().is_empty());
            }
        }
    }

    // Only one request can be in flight at a time
    #[test]
    fn prop_no_overlapping_turns(first in "[a-z]{1,20}", second in "[a-z ]{0,20}") {
        let active = transition(&TurnState::Idle, TurnEvent::Request { text: first }).unwrap();
        prop_assert_eq!(
            transition(&active, TurnEvent::Request { text: second }),
            Err(TransitionError::TurnInProgress)
        );
    }

    // Finishing an active turn always lands in Idle
    #[test]
    fn prop_finish_reaches_idle(text in "[a-z]{1,20}", end in arb_turn_end()) {
        let active = transition(&TurnState::Idle, TurnEvent::Request { text }).unwrap();
        let next = transition(&active, TurnEvent::Finished(end)).unwrap();
        prop_assert_eq!(next, TurnState::Idle);
    }
}
