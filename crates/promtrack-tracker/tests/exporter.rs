#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use promtrack_core::MetricRegistry;
use promtrack_tracker::{Tracker, TrackerConfig};

fn local(name: &str) -> TrackerConfig {
    let mut cfg = TrackerConfig::new(name);
    cfg.listen_host = "127.0.0.1".into();
    cfg.port = 0;
    cfg.probe_interval_ms = 1000;
    cfg
}

/// Raw HTTP/1.1 exchange; returns once the server closes the connection.
async fn fetch(addr: SocketAddr, method: &str, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    tokio::time::timeout(std::time::Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .expect("server must close the connection")
        .unwrap();
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn scrape_returns_exposition_and_closes() {
    let registry = Arc::new(MetricRegistry::new());
    let (tracker, tasks) = Tracker::start(local("checkout"), Arc::clone(&registry))
        .await
        .unwrap();
    let addr = tasks.local_addr().expect("exporter bound");
    assert!(tasks.exporter_running());
    assert!(tasks.probe_running());

    tracker.track_request("/cart", "GET", 200, 0.02).unwrap();

    let resp = fetch(addr, "GET", "/metrics").await;
    let lower = resp.to_ascii_lowercase();
    assert!(resp.starts_with("HTTP/1.1 200"), "{resp}");
    assert!(lower.contains("content-type: text/plain; charset=utf-8"), "{resp}");
    assert!(lower.contains("connection: close"), "{resp}");
    assert!(resp.contains("# TYPE response_time_histogram histogram"));
    assert!(resp.contains(
        "response_time_histogram_count{name=\"checkout\",uri=\"/cart\",method=\"GET\",status=\"200\"} 1"
    ));
    assert!(resp.contains("# TYPE process_start_time_seconds gauge"));

    // Any path, any method.
    let resp = fetch(addr, "POST", "/whatever").await;
    assert!(resp.starts_with("HTTP/1.1 200"), "{resp}");
    assert!(resp.contains("# HELP response_time_histogram Response time histogram"));

    tasks.shutdown();
}

#[tokio::test]
async fn scrape_of_empty_families_succeeds() {
    let mut cfg = local("idle");
    cfg.collect_default_metrics = false;
    let (_tracker, tasks) = Tracker::start(cfg, Arc::new(MetricRegistry::new()))
        .await
        .unwrap();

    let resp = fetch(tasks.local_addr().unwrap(), "GET", "/").await;
    assert!(resp.starts_with("HTTP/1.1 200"), "{resp}");
    assert!(resp.ends_with(
        "# HELP response_time_histogram Response time histogram\n# TYPE response_time_histogram histogram\n"
    ), "{resp}");
    assert!(!tasks.probe_running());

    tasks.shutdown();
}

#[tokio::test]
async fn no_server_when_disabled() {
    let mut cfg = local("library-only");
    cfg.start_server = false;
    cfg.collect_default_metrics = false;
    let (_tracker, tasks) = Tracker::start(cfg, Arc::new(MetricRegistry::new()))
        .await
        .unwrap();
    assert!(tasks.local_addr().is_none());
    assert!(!tasks.exporter_running());
}

#[tokio::test]
async fn probe_fills_process_gauges() {
    let mut cfg = local("probe");
    cfg.start_server = false;
    let registry = Arc::new(MetricRegistry::new());
    let (_tracker, tasks) = Tracker::start(cfg, Arc::clone(&registry)).await.unwrap();

    // First tick fires immediately.
    let mut sampled = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let text = registry.render();
        let start = text
            .lines()
            .find_map(|l| l.strip_prefix("process_start_time_seconds "))
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);
        if start > 0.0 {
            sampled = true;
            break;
        }
    }
    assert!(sampled, "probe never sampled");

    tasks.shutdown();
}
