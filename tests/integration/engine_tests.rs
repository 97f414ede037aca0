//! End-to-end job runs against mock servers

use regex_sweep::engine::{EngineSettings, FetchSettings, JobEngine, ReqwestFetcher};
use regex_sweep::output::{export_csv, RunStatistics};
use regex_sweep::state::JobParams;
use regex_sweep::storage::{JobStore, SqliteStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PATTERN: &str = r#"/https:\/\/cdn\.example\.com\/[^"']+/i"#;

fn create_engine(db_path: &Path) -> JobEngine {
    let store: Arc<dyn JobStore> = Arc::new(SqliteStore::new(db_path).unwrap());
    let fetcher = Arc::new(ReqwestFetcher::new(&FetchSettings::default()).unwrap());
    let settings = EngineSettings {
        retry_backoff: Duration::from_millis(10),
        ..EngineSettings::default()
    };
    JobEngine::new(store, fetcher, settings)
}

fn params(max_retries: u32) -> JobParams {
    JobParams {
        concurrency: 3,
        delay_ms: 20,
        max_retries,
    }
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_job_run_and_export() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(
        &mock_server,
        "/a",
        r#"<script src="https://cdn.example.com/app.js"></script>
           <script src="https://CDN.example.com/app.js"></script>
           <link href="https://cdn.example.com/site.css">"#,
    )
    .await;
    mount_page(&mock_server, "/b", "<p>nothing to see</p>").await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = create_engine(&dir.path().join("jobs.db"));
    let urls = vec![
        format!("{}/a", base),
        format!("{}/b", base),
        format!("{}/c", base),
    ];
    let job_id = engine.create_job(urls.clone(), PATTERN, params(1)).unwrap();

    let mut seen = Vec::new();
    loop {
        let progress = engine.poll(&job_id, 2).await.unwrap();
        seen.extend(progress.new_results.iter().map(|o| o.url.clone()));
        if progress.done {
            assert_eq!(progress.completed, 3);
            assert_eq!(progress.progress_percent, 100.0);
            break;
        }
    }
    // Deltas never repeat an outcome
    assert_eq!(seen, urls);

    let results = engine.finalize(&job_id).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].matches,
        vec![
            "https://cdn.example.com/app.js",
            "https://CDN.example.com/app.js",
            "https://cdn.example.com/site.css",
        ]
    );
    assert!(results[1].matches.is_empty());
    assert_eq!(results[1].http_status, 200);
    assert_eq!(results[2].http_status, 500);
    assert_eq!(results[2].error, "http_500");

    let stats = RunStatistics::from_results(&results);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.with_matches, 1);

    let csv_path = dir.path().join("out.csv");
    export_csv(&csv_path, &results, "|").unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "source_url,http_status,error,matched_links");
    assert!(lines[1].ends_with(
        "https://cdn.example.com/app.js|https://CDN.example.com/app.js|https://cdn.example.com/site.css"
    ));
    assert_eq!(lines[3], format!("{}/c,500,http_500,", base));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/flaky",
        "see https://cdn.example.com/lib.js'",
    )
    .await;

    let dir = TempDir::new().unwrap();
    let engine = create_engine(&dir.path().join("jobs.db"));
    let job_id = engine
        .create_job(vec![format!("{}/flaky", mock_server.uri())], PATTERN, params(2))
        .unwrap();

    let progress = engine.advance(&job_id, 1).await.unwrap();

    assert!(progress.done);
    assert_eq!(progress.new_results[0].http_status, 200);
    assert_eq!(
        progress.new_results[0].matches,
        vec!["https://cdn.example.com/lib.js"]
    );
}

#[tokio::test]
async fn test_job_resumes_from_another_engine() {
    let mock_server = MockServer::start().await;
    for route in ["/1", "/2", "/3"] {
        mount_page(&mock_server, route, "https://cdn.example.com/x.js\"").await;
    }

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");
    let urls: Vec<String> = ["/1", "/2", "/3"]
        .iter()
        .map(|route| format!("{}{}", mock_server.uri(), route))
        .collect();

    let job_id = {
        let engine = create_engine(&db_path);
        let job_id = engine.create_job(urls.clone(), PATTERN, params(0)).unwrap();
        let progress = engine.advance(&job_id, 1).await.unwrap();
        assert_eq!(progress.completed, 1);
        job_id
    };

    let engine = create_engine(&db_path);
    let snapshot = engine.snapshot(&job_id).unwrap();
    assert_eq!(snapshot.completed, 1);
    assert!(!snapshot.done);

    let progress = engine.advance(&job_id, 5).await.unwrap();
    assert!(progress.done);
    assert_eq!(progress.new_results.len(), 2);

    let history = engine.finalize(&job_id).unwrap();
    let processed: Vec<String> = history.into_iter().map(|o| o.url).collect();
    assert_eq!(processed, urls);
}

#[tokio::test]
async fn test_invalid_pattern_is_rejected_before_fetching() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = create_engine(&dir.path().join("jobs.db"));

    let err = engine
        .create_job(vec![mock_server.uri()], "/(unclosed/", params(0))
        .unwrap_err();
    assert!(matches!(err, regex_sweep::SweepError::InvalidInput(_)));
}

#[tokio::test]
async fn test_expired_job_polls_as_done() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(SqliteStore::new(&dir.path().join("jobs.db")).unwrap());
    let fetcher = Arc::new(ReqwestFetcher::new(&FetchSettings::default()).unwrap());
    let engine = JobEngine::new(
        store,
        fetcher,
        EngineSettings {
            ttl: Duration::ZERO,
            ..EngineSettings::default()
        },
    );

    let job_id = engine
        .create_job(vec!["https://example.com/".to_string()], "x", params(0))
        .unwrap();

    let progress = engine.poll(&job_id, 1).await.unwrap();
    assert!(progress.done);
    assert_eq!(progress.total, 0);
    assert!(progress.new_results.is_empty());
    assert!(engine.finalize(&job_id).unwrap_err().is_not_found());
}
