// tests/checker.rs

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use domain_checker::{
    BrowserLauncher, BrowserSession, CheckError, CheckerConfig, ConfigError, DomainCheckSnapshot,
    DomainChecker, JsonLinesStore, LoadedPage, MemoryStore, NO_HTTP_STATUS, NO_RESPONSE,
    ProgressCallback, RenderError, ReputationLabel,
};

const FLAGGED_REPORT: &str = r#"{"data":{"attributes":{
    "last_analysis_stats":{"malicious":2,"suspicious":0,"harmless":60,"undetected":10},
    "last_analysis_results":{
        "Kaspersky":{"category":"malicious","result":"phishing"},
        "BitDefender":{"category":"malicious","result":"malware"},
        "Sophos":{"category":"harmless","result":"clean"}
    }
}}}"#;

// --- Fixtures ---

#[derive(Default)]
struct BrowserCounters {
    launched: AtomicUsize,
    released: AtomicUsize,
}

struct StaticBrowser {
    counters: Arc<BrowserCounters>,
}

struct StaticSession {
    counters: Arc<BrowserCounters>,
}

#[async_trait]
impl BrowserLauncher for StaticBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticSession {
            counters: self.counters.clone(),
        }))
    }
}

#[async_trait]
impl BrowserSession for StaticSession {
    async fn open(&mut self, _url: &str) -> Result<LoadedPage, RenderError> {
        Ok(LoadedPage {
            title: Some("Static".to_string()),
            content_length: 64,
        })
    }

    async fn shutdown(self: Box<Self>) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn test_config() -> CheckerConfig {
    CheckerConfig {
        connection_timeout: Duration::from_millis(500),
        read_timeout: Duration::from_secs(2),
        http_timeout: Duration::from_secs(2),
        reachability_timeout: Duration::from_millis(500),
        render_timeout: Duration::from_secs(2),
        ..CheckerConfig::default()
    }
}

fn checker(config: CheckerConfig) -> (DomainChecker, Arc<BrowserCounters>) {
    let counters = Arc::new(BrowserCounters::default());
    let checker = DomainChecker::new(config).unwrap().with_browser(Arc::new(StaticBrowser {
        counters: counters.clone(),
    }));
    (checker, counters)
}

/// A loopback host:port nothing listens on.
async fn refused_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

type Requests = Arc<Mutex<Vec<String>>>;

/// Serves `status` with `body` to every request and records what arrived.
async fn canned_api(status: &'static str, body: &'static str) -> (String, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Requests = Arc::default();
    let seen = requests.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]).to_lowercase();
            seen.lock().unwrap().push(request);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{}/api/v3/domains/", addr), requests)
}

// --- Single checks ---

#[tokio::test]
async fn test_check_without_credential_never_calls_reputation_service() {
    let (api_url, requests) = canned_api("200 OK", FLAGGED_REPORT).await;
    let host = refused_host().await;
    let config = test_config().with_api_url(&api_url).unwrap();
    let (checker, counters) = checker(config);

    let raw = format!("  HTTP://{}/ignored/path  ", host);
    let snapshot = checker.check(&raw).await.unwrap();

    assert_eq!(snapshot.domain(), host);
    assert_eq!(snapshot.reputation(), ReputationLabel::NotChecked);
    assert_eq!(snapshot.reputation_details(), None);
    assert_eq!(snapshot.http_status(), NO_HTTP_STATUS);
    assert_eq!(snapshot.timing_summary(), NO_RESPONSE);
    assert!(snapshot.render().reachable);
    assert!(requests.lock().unwrap().is_empty());
    assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
    assert_eq!(counters.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_check_with_credential_reports_flagging_engines() {
    let (api_url, requests) = canned_api("200 OK", FLAGGED_REPORT).await;
    let host = refused_host().await;
    let config = test_config()
        .with_api_url(&api_url)
        .unwrap()
        .with_api_key(Some("test-key".to_string()));
    let (checker, _) = checker(config);

    let snapshot = checker.check(&host).await.unwrap();

    assert_eq!(snapshot.reputation(), ReputationLabel::Unsafe);
    assert_eq!(
        snapshot.reputation_details(),
        Some("BitDefender:malicious(malware); Kaspersky:malicious(phishing)")
    );
    let requests = requests.lock().unwrap();
    assert!(!requests.is_empty());
    for request in requests.iter() {
        assert!(request.starts_with(&format!("get /api/v3/domains/{} ", host)));
        assert!(request.contains("\r\nx-apikey: test-key\r\n"));
        assert!(request.contains("\r\naccept: application/json\r\n"));
    }
}

#[tokio::test]
async fn test_rejected_credential_is_an_error_label() {
    let (api_url, _) = canned_api("401 Unauthorized", r#"{"error":{"code":"WrongCredentialsError"}}"#).await;
    let host = refused_host().await;
    let config = test_config()
        .with_api_url(&api_url)
        .unwrap()
        .with_api_key(Some("revoked".to_string()));
    let (checker, _) = checker(config);

    let snapshot = checker.check(&host).await.unwrap();

    assert_eq!(snapshot.reputation(), ReputationLabel::Error);
    assert_eq!(snapshot.reputation_details(), None);
}

#[tokio::test]
async fn test_empty_input_is_rejected_before_probing() {
    let (checker, counters) = checker(test_config());

    for raw in ["", "   ", "https://", "http:///only-a-path"] {
        let result = checker.check(raw).await;
        assert!(
            matches!(result, Err(CheckError::EmptyDomain(ref input)) if input == raw),
            "input {raw:?} was not rejected"
        );
    }
    assert_eq!(counters.launched.load(Ordering::SeqCst), 0);
}

// --- Storage ---

#[tokio::test]
async fn test_snapshots_are_appended_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonLinesStore::new(dir.path().join("nested").join("results.jsonl"));
    let (checker, _) = checker(test_config());
    let first = refused_host().await;
    let second = refused_host().await;

    checker.check_and_store(&first, &store).await.unwrap();
    checker.check_and_store(&second, &store).await.unwrap();

    let text = std::fs::read_to_string(store.path()).unwrap();
    let stored: Vec<DomainCheckSnapshot> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].domain(), first);
    assert_eq!(stored[1].domain(), second);
    assert_eq!(stored[0].reputation(), ReputationLabel::NotChecked);
}

#[tokio::test]
async fn test_store_failure_fails_the_check() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be opened for appending.
    let store = JsonLinesStore::new(dir.path());
    let (checker, _) = checker(test_config());
    let host = refused_host().await;

    let result = checker.check_and_store(&host, &store).await;
    assert!(matches!(result, Err(CheckError::Store(_))));
}

// --- Bulk ---

#[tokio::test]
async fn test_bulk_isolates_failing_entries() {
    let store = MemoryStore::new();
    let (checker, _) = checker(test_config().with_concurrency(2).unwrap());
    let first = refused_host().await;
    let second = refused_host().await;

    let progress_calls = Arc::new(AtomicUsize::new(0));
    let calls = progress_calls.clone();
    let progress: ProgressCallback = Box::new(move |done: usize, total: usize, _raw: &str| {
        assert!(done <= total);
        calls.fetch_add(1, Ordering::SeqCst);
    });

    let summary = checker
        .check_bulk_with_progress(
            vec!["https://".to_string(), first.clone(), second.clone()],
            &store,
            Some(progress),
        )
        .await;

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.unsafe_count, 0);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "https://");
    assert_eq!(progress_calls.load(Ordering::SeqCst), 3);

    let mut stored: Vec<String> = store
        .snapshots()
        .iter()
        .map(|s| s.domain().to_string())
        .collect();
    stored.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(stored, expected);
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let config = CheckerConfig {
        concurrency: 0,
        ..test_config()
    };
    assert!(matches!(
        DomainChecker::new(config),
        Err(ConfigError::ZeroValue { .. })
    ));
}

#[tokio::test]
async fn test_bulk_with_no_entries() {
    let store = MemoryStore::new();
    let (checker, _) = checker(test_config());

    let summary = checker.check_bulk(Vec::new(), &store).await;

    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.succeeded, 0);
    assert!(store.snapshots().is_empty());
}
