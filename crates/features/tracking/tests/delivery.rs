pub mod fixtures;

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use cadmin_domain::constants::{FACTORY_PID, SERVICE_PID};
    use cadmin_domain::{Owner, Pid, PropertyValue};
    use cadmin_queue::ShutdownMode;
    use cadmin_store::{AllowAll, MemoryStore};
    use cadmin_tracking::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_at_most_one_binding_under_racing_arrivals() {
        let harness = Arc::new(Harness::new());
        harness.put("contended", props(&[("v", 1)]));
        let journal = journal();

        let winners: Vec<usize> = (0..8)
            .map(|i| {
                let harness = harness.clone();
                let consumer = service("racer", &journal);
                thread::spawn(move || {
                    harness
                        .services
                        .arrived(&pid("contended"), &owner(&format!("bundle:{i}")), consumer)
                        .is_ok()
                        .then_some(i)
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(winners.len(), 1);
        harness.flush();
        assert_eq!(journal.lock().len(), 1, "exactly one updated for the winner");
        assert_eq!(
            harness.bound_owner("contended"),
            Some(owner(&format!("bundle:{}", winners[0])))
        );
    }

    #[test]
    fn test_departure_releases_the_binding() {
        let harness = Harness::new();
        harness.put("a", props(&[("v", 1)]));
        let journal = journal();
        let first = service("first", &journal);

        harness.services.arrived(&pid("a"), &owner("bundle:1"), first.clone()).unwrap();
        assert!(harness.services.departed(&pid("a"), &first));
        assert_eq!(harness.bound_owner("a"), None);

        let arrival =
            harness.services.arrived(&pid("a"), &owner("bundle:2"), service("second", &journal)).unwrap();
        assert_eq!(arrival.bound, vec![pid("a")]);
        assert!(arrival.denied.is_empty());

        harness.put("a", props(&[("v", 2)]));
        harness.flush();
        let consumers: Vec<_> = journal
            .lock()
            .iter()
            .map(|d| match d {
                Delivery::Updated { consumer, .. } => *consumer,
                other => panic!("unexpected delivery {other:?}"),
            })
            .collect();
        assert_eq!(consumers, vec!["first", "second", "second"]);
        assert_eq!(harness.bound_owner("a"), Some(owner("bundle:2")));
    }

    #[test]
    fn test_departure_keeps_bindings_of_other_owners() {
        let harness = Harness::new();
        harness.put("a", props(&[("v", 1)]));
        assert!(harness.store.get(&pid("a")).unwrap().lock().try_bind(&owner("bundle:1"), &AllowAll));
        let journal = journal();
        let second = service("second", &journal);

        let arrival = harness.services.arrived(&pid("a"), &owner("bundle:2"), second.clone()).unwrap();
        assert_eq!(arrival.denied, vec![pid("a")]);

        assert!(harness.services.departed(&pid("a"), &second));
        assert_eq!(harness.bound_owner("a"), Some(owner("bundle:1")));
    }

    #[test]
    fn test_arrival_racing_updates_sees_them_in_order() {
        let harness = Arc::new(Harness::new());
        harness.put("race", props(&[("v", -1)]));
        let journal = journal();
        let start = Arc::new(Barrier::new(2));

        let writer = {
            let harness = harness.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                for v in 0..200 {
                    harness.put("race", props(&[("v", v)]));
                }
            })
        };
        start.wait();
        harness.services.arrived(&pid("race"), &owner("o"), service("race", &journal)).unwrap();
        writer.join().unwrap();
        harness.flush();

        let seen: Vec<i64> = journal
            .lock()
            .iter()
            .filter_map(|d| match d.value("v") {
                Some(PropertyValue::Integer(v)) => Some(*v),
                _ => None,
            })
            .collect();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "out of order: {seen:?}");
        assert_eq!(seen.last(), Some(&199), "the final commit is always delivered");
    }

    #[test]
    fn test_member_created_during_arrival_is_delivered() {
        let store = HookedStore::new(Arc::new(MemoryStore::new()));
        let tracker =
            Arc::new(ManagedServiceFactoryTracker::new(store.clone(), Arc::new(AllowAll)).unwrap());
        store.inner.create(pid("F.r1"), Some(pid("F"))).unwrap();
        store.inner.update(&pid("F.r1"), props(&[("a", 1)]), &*tracker).unwrap();

        let (inner, listener) = (store.inner.clone(), tracker.clone());
        store.after_next_lookup(move || {
            inner.create(pid("F.r2"), Some(pid("F"))).unwrap();
            inner.update(&pid("F.r2"), props(&[("a", 2)]), &*listener).unwrap();
        });
        let journal = journal();
        let arrival = tracker.arrived(&pid("F"), &owner("o"), factory("F", &journal)).unwrap();
        tracker.flush().unwrap();

        assert_eq!(arrival.bound, vec![pid("F.r1")]);
        let mut delivered: Vec<_> = journal
            .lock()
            .iter()
            .map(|d| match d {
                Delivery::FactoryUpdated { pid, .. } => pid.clone(),
                other => panic!("unexpected delivery {other:?}"),
            })
            .collect();
        delivered.sort();
        assert_eq!(delivered, vec![pid("F.r1"), pid("F.r2")]);
        assert_eq!(store.inner.get(&pid("F.r2")).unwrap().lock().bound_owner(), Some(&owner("o")));
    }

    #[test]
    fn test_shutdown_during_arrival_rolls_it_back() {
        let store = HookedStore::new(Arc::new(MemoryStore::new()));
        let tracker = Arc::new(ManagedServiceTracker::new(store.clone(), Arc::new(AllowAll)).unwrap());
        store.inner.get_or_create(&pid("a"));
        store.inner.update(&pid("a"), props(&[("v", 1)]), &()).unwrap();

        let stopping = tracker.clone();
        store.after_next_lookup(move || stopping.shutdown(ShutdownMode::Drain).unwrap());
        let err = tracker.arrived(&pid("a"), &owner("o"), service("a", &journal())).unwrap_err();

        assert_eq!(err.kind(), "Queue");
        assert!(tracker.registry().is_empty());
        assert_eq!(store.inner.get(&pid("a")).unwrap().lock().bound_owner(), None);
    }

    #[test]
    fn test_deliveries_follow_commit_order() {
        let harness = Harness::new();
        harness.put("seq", props(&[("v", 0)]));
        let journal = journal();
        harness.services.arrived(&pid("seq"), &owner("o"), service("seq", &journal)).unwrap();

        for v in 1..=50 {
            harness.put("seq", props(&[("v", v)]));
        }
        harness.flush();

        let seen: Vec<_> = journal.lock().iter().filter_map(|d| d.value("v").cloned()).collect();
        let expected: Vec<_> = (0..=50).map(PropertyValue::Integer).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_concurrent_writers_are_observed_in_their_own_order() {
        let harness = Arc::new(Harness::new());
        harness.put("hot", props(&[("v", -1)]));
        let journal = journal();
        harness.services.arrived(&pid("hot"), &owner("o"), service("hot", &journal)).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let harness = harness.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        harness.put("hot", props(&[("v", t * 1000 + i)]));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        harness.flush();

        let seen: Vec<i64> = journal
            .lock()
            .iter()
            .filter_map(|d| match d.value("v") {
                Some(PropertyValue::Integer(v)) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(seen.len(), 101);
        for t in 0..4 {
            let per_writer: Vec<_> = seen.iter().filter(|v| **v >= 0 && **v / 1000 == t).collect();
            assert!(per_writer.windows(2).all(|w| w[0] < w[1]), "writer {t} out of order");
            assert_eq!(per_writer.len(), 25);
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let harness = Harness::new();
        let journal = journal();
        let first = service("first", &journal);

        harness.services.arrived(&pid("x"), &owner("o1"), first.clone()).unwrap();
        let err = harness.services.arrived(&pid("x"), &owner("o2"), service("second", &journal)).unwrap_err();

        assert_eq!(err.kind(), "AlreadyRegistered");
        let registered = harness.services.registry().lookup(&pid("x")).unwrap();
        assert!(Arc::ptr_eq(&registered.consumer, &first));
        assert_eq!(registered.owner, owner("o1"));
    }

    #[test]
    fn test_departure_of_rejected_duplicate_keeps_first_handle() {
        let harness = Harness::new();
        let journal = journal();
        let first = service("first", &journal);
        let second = service("second", &journal);

        harness.services.arrived(&pid("x"), &owner("o"), first.clone()).unwrap();
        assert!(harness.services.arrived(&pid("x"), &owner("o"), second.clone()).is_err());

        assert!(!harness.services.departed(&pid("x"), &second));
        assert!(harness.services.registry().is_registered(&pid("x"), &first));
    }

    #[test]
    fn test_failing_consumer_does_not_block_the_queue() {
        let harness = Harness::new();
        harness.put("bad", props(&[("v", 1)]));
        harness.put("worse", props(&[("v", 1)]));
        harness.put("good", props(&[("v", 1)]));
        let journal = journal();
        let failing = Arc::new(FailingService { calls: AtomicUsize::new(0), panic: false });
        let panicking = Arc::new(FailingService { calls: AtomicUsize::new(0), panic: true });

        harness.services.arrived(&pid("bad"), &owner("o"), failing.clone()).unwrap();
        harness.services.arrived(&pid("worse"), &owner("o"), panicking.clone()).unwrap();
        harness.services.arrived(&pid("good"), &owner("o"), service("good", &journal)).unwrap();
        harness.put("bad", props(&[("v", 2)]));
        harness.put("worse", props(&[("v", 2)]));
        harness.put("good", props(&[("v", 2)]));
        harness.flush();

        assert_eq!(failing.calls.load(Ordering::SeqCst), 2, "later notifications still delivered");
        assert_eq!(panicking.calls.load(Ordering::SeqCst), 2);
        assert_eq!(journal.lock().len(), 2);
        let stats = harness.services.stats();
        assert_eq!(stats.failed, 4);
        assert_eq!(stats.delivered, 2);
    }

    #[test]
    fn test_factory_partial_success() {
        let policy = |pid: &Pid, _: &Owner| pid.as_str() != "pool.b";
        let harness = Harness::with_policy(Arc::new(policy));
        for member in ["pool.a", "pool.b", "pool.c"] {
            harness.put_member("pool", member, props(&[("size", 1)]));
        }
        let journal = journal();

        let arrival =
            harness.factories.arrived(&pid("pool"), &owner("o"), factory("pool", &journal)).unwrap();
        harness.flush();

        assert_eq!(arrival.bound, vec![pid("pool.a"), pid("pool.c")]);
        assert_eq!(arrival.denied, vec![pid("pool.b")]);
        let delivered: Vec<_> = journal
            .lock()
            .iter()
            .map(|d| match d {
                Delivery::FactoryUpdated { pid, .. } => pid.clone(),
                other => panic!("unexpected delivery {other:?}"),
            })
            .collect();
        assert_eq!(delivered, vec![pid("pool.a"), pid("pool.c")]);
        assert_eq!(harness.bound_owner("pool.b"), None);
    }

    #[test]
    fn test_factory_end_to_end() {
        let harness = Harness::new();
        harness.put_member("F", "r1", props(&[("a", 1)]));
        harness.put_member("F", "r2", props(&[("a", 2)]));
        let journal = journal();

        harness.factories.arrived(&pid("F"), &owner("bundle:F"), factory("F", &journal)).unwrap();
        harness.flush();
        {
            let deliveries = journal.lock();
            assert_eq!(deliveries.len(), 2);
            for (delivery, (id, a)) in deliveries.iter().zip([("r1", 1), ("r2", 2)]) {
                let Delivery::FactoryUpdated { pid: got, properties, .. } = delivery else {
                    panic!("unexpected delivery {delivery:?}");
                };
                assert_eq!(got, &pid(id));
                assert_eq!(properties.get("a"), Some(&PropertyValue::Integer(a)));
                assert_eq!(properties.get(SERVICE_PID), Some(&PropertyValue::from(id)));
                assert_eq!(properties.get(FACTORY_PID), Some(&PropertyValue::from("F")));
            }
        }
        assert_eq!(harness.bound_owner("r1"), Some(owner("bundle:F")));
        assert_eq!(harness.bound_owner("r2"), Some(owner("bundle:F")));

        harness.delete("r1");
        harness.flush();

        let deliveries = journal.lock();
        assert_eq!(deliveries.len(), 3);
        assert_eq!(deliveries[2], Delivery::FactoryDeleted { consumer: "F", pid: pid("r1") });
    }

    #[test]
    fn test_singleton_deletion_delivers_none() {
        let harness = Harness::new();
        harness.put("a", props(&[("v", 1)]));
        let journal = journal();
        harness.services.arrived(&pid("a"), &owner("o"), service("a", &journal)).unwrap();

        harness.delete("a");
        harness.flush();

        let deliveries = journal.lock();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[1], Delivery::Updated { consumer: "a", properties: None });
    }

    #[test]
    fn test_missing_deleted_and_empty_records_are_silent() {
        let harness = Harness::new();
        harness.put("gone", props(&[("v", 1)]));
        harness.delete("gone");
        harness.store.create(pid("empty"), None).unwrap();
        let journal = journal();

        for id in ["absent", "gone", "empty"] {
            let arrival = harness.services.arrived(&pid(id), &owner("o"), service("s", &journal)).unwrap();
            assert!(arrival.bound.is_empty());
        }
        harness.flush();

        assert!(journal.lock().is_empty());
        assert_eq!(harness.bound_owner("empty"), None);
    }

    #[test]
    fn test_singleton_on_factory_record_is_a_mismatch() {
        let harness = Harness::new();
        harness.put_member("pool", "pool.1", props(&[("v", 1)]));
        let journal = journal();

        let arrival =
            harness.services.arrived(&pid("pool.1"), &owner("o"), service("s", &journal)).unwrap();
        harness.put_member("pool", "pool.1", props(&[("v", 2)]));
        harness.flush();

        assert_eq!(arrival.mismatched, vec![pid("pool.1")]);
        assert!(journal.lock().is_empty());
        assert_eq!(harness.bound_owner("pool.1"), None);
    }

    #[test]
    fn test_factory_on_singleton_record_is_a_mismatch() {
        let harness = Harness::new();
        harness.put("solo", props(&[("v", 1)]));
        let journal = journal();

        let arrival =
            harness.factories.arrived(&pid("solo"), &owner("o"), factory("solo", &journal)).unwrap();
        harness.flush();

        assert_eq!(arrival.mismatched, vec![pid("solo")]);
        assert!(arrival.bound.is_empty());
        assert!(journal.lock().is_empty());
        assert_eq!(harness.bound_owner("solo"), None);
    }

    #[test]
    fn test_store_changes_without_consumer_are_dropped() {
        let harness = Harness::new();
        harness.put("lonely", props(&[("v", 1)]));
        harness.put("lonely", props(&[("v", 2)]));
        harness.flush();

        assert_eq!(harness.services.stats().delivered, 0);
        assert_eq!(harness.bound_owner("lonely"), None);
    }

    #[test]
    fn test_arrival_after_shutdown_fails() {
        let harness = Harness::new();
        harness.services.shutdown(ShutdownMode::Drain).unwrap();

        let err = harness.services.arrived(&pid("late"), &owner("o"), service("late", &journal())).unwrap_err();
        assert_eq!(err.kind(), "Queue");
        assert!(harness.services.registry().is_empty());
    }
}
