//! Concurrency guarantees: no lost updates, no cross-registry leakage.

use std::time::Duration;

use vitals_core::{labels, FunctionMetrics, Opts, OutcomeTracker, Registry, SampleValue};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_counter_adds_are_not_lost() {
    let registry = Registry::new();
    let counter = registry
        .register_counter(Opts::new("hits_total", "Hits").with_labels(&["endpoint"]))
        .unwrap();

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let counter = counter.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    counter.inc(&labels! { "endpoint" => "/hello" }).unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(counter.value(&labels! { "endpoint" => "/hello" }), 6400.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_use_creates_exactly_one_series() {
    let registry = Registry::new();
    let counter = registry
        .register_counter(Opts::new("hits_total", "Hits").with_labels(&["endpoint"]))
        .unwrap();

    // Every task races to create the same series on first observation.
    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let counter = counter.clone();
            tokio::spawn(async move {
                counter.inc(&labels! { "endpoint" => "/race" }).unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let families = registry.gather();
    assert_eq!(families[0].samples.len(), 1);
    match &families[0].samples[0].value {
        SampleValue::Counter(v) => assert_eq!(*v, 32.0),
        other => panic!("unexpected sample {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_histogram_observations_keep_count_and_sum() {
    let registry = Registry::new();
    let histogram = registry
        .register_histogram(
            Opts::new("latency_seconds", "Latency").with_labels(&["endpoint"]),
            &[0.5, 1.0],
        )
        .unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let histogram = histogram.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    histogram
                        .observe(&labels! { "endpoint" => "/hello" }, 0.25)
                        .unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let snap = histogram
        .snapshot(&labels! { "endpoint" => "/hello" })
        .unwrap();
    assert_eq!(snap.count, 800);
    assert_eq!(snap.buckets, vec![(0.5, 800), (1.0, 800)]);
    assert_eq!(snap.sum, 200.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn gather_runs_concurrently_with_observations() {
    let registry = Registry::new();
    let counter = registry
        .register_counter(Opts::new("hits_total", "Hits").with_labels(&["endpoint"]))
        .unwrap();

    let writer = {
        let counter = counter.clone();
        tokio::spawn(async move {
            for _ in 0..1000 {
                counter.inc(&labels! { "endpoint" => "/hello" }).unwrap();
            }
        })
    };
    // Snapshots taken mid-flight must be well-formed, if possibly stale.
    for _ in 0..50 {
        for family in registry.gather() {
            for sample in &family.samples {
                if let SampleValue::Counter(v) = sample.value {
                    assert!((0.0..=1000.0).contains(&v));
                    assert_eq!(v.fract(), 0.0);
                }
            }
        }
    }
    writer.await.unwrap();
    assert_eq!(counter.value(&labels! { "endpoint" => "/hello" }), 1000.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn trackers_in_concurrent_tasks_do_not_share_state() {
    let registry = Registry::new();
    let metrics = FunctionMetrics::register(&registry).unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let metrics = metrics.clone();
            tokio::spawn(async move {
                let mut tracker = OutcomeTracker::new(metrics);
                // Double-mark inside one unit of work counts once.
                tracker.mark_success("validate_data");
                tracker.mark_success("validate_data");
                tracker.mark_latency("validate_data", Duration::from_millis(10));
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(
        metrics.calls("validate_data", vitals_core::Outcome::Success),
        32.0
    );
}
