//! Label-indexed series lookup: identity, arity, concurrency.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use promtrack_core::MetricRegistry;

#[test]
fn identical_labels_share_one_accumulator() {
    let reg = MetricRegistry::new();
    let hits = reg
        .register_counter("hits_total", "Hits", &["name", "uri"])
        .unwrap();

    let a = hits.with_label_values(&["svc", "/a"]).unwrap();
    let b = hits.with_label_values(&["svc", "/a"]).unwrap();
    assert!(a.same_series(&b));

    a.inc();
    b.inc_by(2.0).unwrap();
    assert_eq!(a.get(), 3.0);
    assert_eq!(b.get(), 3.0);

    let fam = hits.family();
    assert!(Arc::ptr_eq(
        &fam.labels(&["svc", "/a"]).unwrap(),
        &fam.labels(&["svc", "/a"]).unwrap()
    ));
    assert_eq!(fam.series_count(), 1);
}

#[test]
fn label_order_matters() {
    let reg = MetricRegistry::new();
    let g = reg.register_gauge("pairs", "Pairs", &["a", "b"]).unwrap();

    let ab = g.with_label_values(&["x", "y"]).unwrap();
    let ba = g.with_label_values(&["y", "x"]).unwrap();
    assert!(!ab.same_series(&ba));

    // Joined values must not collide with split ones.
    let g1 = reg.register_gauge("joined", "Joined", &["a"]).unwrap();
    let g2 = reg.register_gauge("split", "Split", &["a", "b"]).unwrap();
    g1.with_label_values(&["x,y"]).unwrap().set(1.0);
    g2.with_label_values(&["x", "y"]).unwrap().set(2.0);
    assert_eq!(g1.with_label_values(&["x,y"]).unwrap().get(), 1.0);
    assert_eq!(g1.family().series_count(), 1);
}

#[test]
fn arity_mismatch_names_expected_and_actual() {
    let reg = MetricRegistry::new();
    let h = reg
        .register_histogram("lat", "Latency", &["name", "uri", "method", "status"], &[0.1, 1.0])
        .unwrap();

    let err = h.with_label_values(&["svc", "/a"]).unwrap_err();
    assert_eq!(err.code().as_str(), "LABEL_ARITY");
    let msg = err.to_string();
    assert!(msg.contains("expected 4"), "{msg}");
    assert!(msg.contains("got 2"), "{msg}");
    assert_eq!(h.family().series_count(), 0);
}

#[test]
fn concurrent_increments_are_not_lost() {
    let reg = MetricRegistry::new();
    let c = reg.register_counter("work_total", "Work", &["kind"]).unwrap();

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let c = c.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    c.with_label_values(&["job"]).unwrap().inc_by(0.5).unwrap();
                    c.with_label_values(&[if i % 2 == 0 { "even" } else { "odd" }])
                        .unwrap()
                        .inc();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(c.with_label_values(&["job"]).unwrap().get(), 4000.0);
    assert_eq!(c.with_label_values(&["even"]).unwrap().get(), 4000.0);
    assert_eq!(c.with_label_values(&["odd"]).unwrap().get(), 4000.0);
    assert_eq!(c.family().series_count(), 3);
}

#[test]
fn concurrent_first_access_creates_one_series() {
    let reg = Arc::new(MetricRegistry::new());
    let h = reg
        .register_histogram("race", "Race", &["k"], &[1.0])
        .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let h = h.clone();
            thread::spawn(move || {
                let s = h.with_label_values(&["same"]).unwrap();
                s.observe(0.5).unwrap();
                s
            })
        })
        .collect();
    let series: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();

    assert!(series.windows(2).all(|w| w[0].same_series(&w[1])));
    assert_eq!(h.family().series_count(), 1);
    let snap = series[0].snapshot();
    assert_eq!(snap.count, 16);
    assert_eq!(snap.bucket_counts, vec![16, 16]);
}
