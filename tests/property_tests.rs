//! Property-based tests for kitchen_pipeline using proptest

use kitchen_pipeline::prelude::*;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn backend_strategy() -> impl Strategy<Value = QueueBackend> {
    prop_oneof![Just(QueueBackend::Monitor), Just(QueueBackend::Channel)]
}

fn kind_strategy() -> impl Strategy<Value = DishKind> {
    prop_oneof![Just(DishKind::Pasta), Just(DishKind::Pizza)]
}

// ============================================================================
// Queue Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A single consumer sees pushes in exactly the order they were made
    #[test]
    fn test_fifo_single_consumer(
        values in prop::collection::vec(any::<u32>(), 0..200),
        backend in backend_strategy()
    ) {
        let queue = backend.create::<u32>();
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Pop::Item(v) = queue.pop_blocking() {
                    seen.push(v);
                }
                seen
            })
        };

        for v in &values {
            queue.push(*v);
        }
        queue.shutdown();

        prop_assert_eq!(consumer.join().unwrap(), values);
    }

    /// K producers × M items: nothing lost, each producer's order kept
    #[test]
    fn test_concurrent_producers(
        producers in 1usize..6,
        per_producer in 0usize..60,
        backend in backend_strategy()
    ) {
        let queue = backend.create::<(usize, usize)>();
        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        queue.push((p, i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        queue.shutdown();

        let mut next = vec![0usize; producers];
        while let Pop::Item((p, i)) = queue.pop_blocking() {
            prop_assert_eq!(i, next[p]);
            next[p] += 1;
        }
        prop_assert!(next.iter().all(|&n| n == per_producer));
    }
}

// ============================================================================
// Pipeline Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every item submitted before close is served exactly once
    #[test]
    fn test_drain_completeness(
        kinds in prop::collection::vec(kind_strategy(), 0..40),
        backend in backend_strategy()
    ) {
        let sink = Arc::new(RecordingSink::new());
        let pipeline = Arc::new(
            Pipeline::new(PipelineConfig::instant().with_queue_backend(backend), sink.clone()).unwrap()
        );
        let preparer = StageWorker::spawn(Role::Preparer, Arc::clone(&pipeline)).unwrap();
        let server = StageWorker::spawn(Role::Server, Arc::clone(&pipeline)).unwrap();

        let mut submitted = Vec::new();
        for (i, kind) in kinds.iter().enumerate() {
            let item = WorkItem::new(format!("dish {}", i), *kind);
            submitted.push(item.id());
            pipeline.submit(item);
        }
        pipeline.close();
        preparer.join().unwrap();
        server.join().unwrap();

        // Single preparer and server: FIFO end to end
        let served = sink.ids_where(|e| matches!(e, Event::Served { .. }));
        prop_assert_eq!(&served, &submitted);

        let unique: HashSet<_> = served.iter().collect();
        prop_assert_eq!(unique.len(), kinds.len());

        let stats = pipeline.stats();
        prop_assert_eq!(stats.served, kinds.len() as u64);
        prop_assert_eq!(stats.awaiting_preparation, 0);
        prop_assert_eq!(stats.awaiting_service, 0);
    }

    /// Sampled durations stay inside their range
    #[test]
    fn test_duration_range_sample(min in 0u64..50, extra in 0u64..50) {
        let range = DurationRange::new(min, min + extra);
        let d = range.sample().as_millis() as u64;
        prop_assert!(d >= min && d <= min + extra);
    }

    /// Ranges parse back from their display form
    #[test]
    fn test_duration_range_display_parses(min in 0u64..10_000, extra in 0u64..10_000) {
        let range = DurationRange::new(min, min + extra);
        let parsed: DurationRange = range.to_string().parse().unwrap();
        prop_assert_eq!(parsed, range);
    }
}
