//! Property tests for emission ordering and targeted removal.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use eventry::{Emitter, EventRegistry};

proptest! {
    /// Invocation order equals registration order, for any listener count.
    #[test]
    fn emission_order_matches_registration_order(count in 1usize..48) {
        let registry = EventRegistry::new();
        let ev = registry.mint::<u8>("prop.ordered").unwrap();
        let emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for index in 0..count {
            let log = Arc::clone(&log);
            emitter.on(&ev, move |_: &u8| log.lock().unwrap().push(index));
        }

        emitter.emit(&ev, 0);
        prop_assert_eq!(&*log.lock().unwrap(), &(0..count).collect::<Vec<_>>());
    }

    /// Unsubscribing any subset removes exactly those listeners; the rest
    /// still run, in their original relative order.
    #[test]
    fn removal_only_affects_the_targeted_subset(keep in proptest::collection::vec(any::<bool>(), 1..48)) {
        let registry = EventRegistry::new();
        let ev = registry.mint::<u8>("prop.removal").unwrap();
        let emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let subscriptions: Vec<_> = (0..keep.len())
            .map(|index| {
                let log = Arc::clone(&log);
                emitter.on(&ev, move |_: &u8| log.lock().unwrap().push(index))
            })
            .collect();

        for (subscription, keep) in subscriptions.iter().zip(&keep) {
            if !keep {
                subscription.unsubscribe();
            }
        }

        emitter.emit(&ev, 0);

        let expected: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(index, keep)| keep.then_some(index))
            .collect();
        prop_assert_eq!(&*log.lock().unwrap(), &expected);
        prop_assert_eq!(emitter.listener_count(&ev), expected.len());
    }

    /// Every payload value round-trips to every listener unchanged.
    #[test]
    fn payload_is_delivered_verbatim(payloads in proptest::collection::vec(any::<i64>(), 0..32)) {
        let registry = EventRegistry::new();
        let ev = registry.mint::<i64>("prop.payloads").unwrap();
        let emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        {
            let log = Arc::clone(&log);
            emitter.on(&ev, move |value: &i64| log.lock().unwrap().push(*value));
        }

        for payload in &payloads {
            emitter.emit(&ev, *payload);
        }
        prop_assert_eq!(&*log.lock().unwrap(), &payloads);
    }
}
