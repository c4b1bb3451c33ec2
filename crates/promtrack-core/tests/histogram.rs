//! Histogram bucket accumulation.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::thread;

use promtrack_core::{MetricRegistry, DEFAULT_BUCKETS};

fn assert_cumulative(counts: &[u64], count: u64) {
    assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{counts:?}");
    assert_eq!(*counts.last().unwrap(), count);
}

#[test]
fn observations_fill_cumulative_buckets() {
    let reg = MetricRegistry::new();
    let h = reg
        .register_histogram("rt", "Response time", &[], &[0.1, 0.5, 1.0])
        .unwrap()
        .with_label_values(&[])
        .unwrap();

    h.observe(0.3).unwrap();
    assert_eq!(h.snapshot().bucket_counts, vec![0, 1, 1, 1]);

    h.reset();
    for v in [0.05, 0.3, 2.0] {
        h.observe(v).unwrap();
    }
    let s = h.snapshot();
    assert_eq!(s.bucket_counts, vec![1, 2, 2, 3]);
    assert!((s.sum - 2.35).abs() < 1e-9, "sum={}", s.sum);
    assert_eq!(s.count, 3);
    assert_cumulative(&s.bucket_counts, s.count);
}

#[test]
fn nan_is_rejected() {
    let reg = MetricRegistry::new();
    let h = reg
        .register_histogram("rt", "Response time", &[], &DEFAULT_BUCKETS)
        .unwrap()
        .with_label_values(&[])
        .unwrap();

    let err = h.observe(f64::NAN).unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_OBSERVATION");
    assert_eq!(h.snapshot().count, 0);

    // Infinities are numbers: only +Inf catches +inf.
    h.observe(f64::INFINITY).unwrap();
    let s = h.snapshot();
    assert_eq!(s.bucket_counts[DEFAULT_BUCKETS.len()], 1);
    assert_eq!(s.bucket_counts[DEFAULT_BUCKETS.len() - 1], 0);
}

#[test]
fn reset_keeps_series_retrievable() {
    let reg = MetricRegistry::new();
    let vec = reg
        .register_histogram("rt", "Response time", &["uri"], &[1.0])
        .unwrap();

    let before = vec.with_label_values(&["/a"]).unwrap();
    before.observe(0.5).unwrap();
    before.reset();

    let after = vec.with_label_values(&["/a"]).unwrap();
    assert!(before.same_series(&after));
    assert_eq!(after.snapshot().count, 0);
    assert_eq!(after.snapshot().sum, 0.0);
    assert_eq!(vec.family().series_count(), 1);
    assert!(reg.render().contains("rt_count{uri=\"/a\"} 0"));
}

#[test]
fn reset_all_zeroes_every_series() {
    let reg = MetricRegistry::new();
    let vec = reg
        .register_histogram("rt", "Response time", &["uri"], &[1.0])
        .unwrap();
    vec.with_label_values(&["/a"]).unwrap().observe(0.2).unwrap();
    vec.with_label_values(&["/b"]).unwrap().observe(3.0).unwrap();

    vec.reset_all();

    assert_eq!(vec.family().series_count(), 2);
    for uri in ["/a", "/b"] {
        assert_eq!(vec.with_label_values(&[uri]).unwrap().snapshot().count, 0);
    }
}

#[test]
fn timer_observes_once() {
    let reg = MetricRegistry::new();
    let h = reg
        .register_histogram("job_seconds", "Job duration", &[], &DEFAULT_BUCKETS)
        .unwrap()
        .with_label_values(&[])
        .unwrap();

    let secs = h.start_timer().observe_duration();
    assert!(secs >= 0.0);
    {
        let _t = h.start_timer();
    }
    assert_eq!(h.snapshot().count, 2);
}

#[test]
fn invariant_holds_under_concurrent_observe_and_reset() {
    let reg = MetricRegistry::new();
    let h = reg
        .register_histogram("busy", "Busy", &[], &[0.25, 0.5, 0.75])
        .unwrap()
        .with_label_values(&[])
        .unwrap();

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let h = h.clone();
            thread::spawn(move || {
                for n in 0..500 {
                    h.observe(((n + i) % 10) as f64 / 10.0).unwrap();
                    if n % 100 == 0 {
                        h.reset();
                    }
                }
            })
        })
        .collect();

    for _ in 0..200 {
        let s = h.snapshot();
        assert_cumulative(&s.bucket_counts, s.count);
    }
    for w in writers {
        w.join().unwrap();
    }
    let s = h.snapshot();
    assert_cumulative(&s.bucket_counts, s.count);
}
