//! Fetcher behaviour against a live mock server

use regex_sweep::engine::{build_http_client, FetchSettings, Fetcher, ReqwestFetcher};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> ReqwestFetcher {
    ReqwestFetcher::new(&FetchSettings::default()).unwrap()
}

#[tokio::test]
async fn test_fetchers_share_one_client() {
    let mock_server = MockServer::start().await;
    for agent in ["AgentA/1.0", "AgentB/1.0"] {
        Mock::given(method("GET"))
            .and(path("/shared"))
            .and(header("user-agent", agent))
            .and(header("accept-language", "en-US,en;q=0.9"))
            .respond_with(ResponseTemplate::new(200).set_body_string(agent))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let client = build_http_client(&FetchSettings::default()).unwrap();
    let first = ReqwestFetcher::with_client(client.clone());
    let second = ReqwestFetcher::with_client(client);

    let url = format!("{}/shared", mock_server.uri());
    let a = first.fetch(&url, "AgentA/1.0").await;
    let b = second.fetch(&url, "AgentB/1.0").await;

    assert_eq!((a.status, a.body.as_str()), (200, "AgentA/1.0"));
    assert_eq!((b.status, b.body.as_str()), (200, "AgentB/1.0"));
}

#[tokio::test]
async fn test_fetch_sends_identity_and_browser_headers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", "SweepTest/1.0"))
        .and(header("accept-language", "en-US,en;q=0.9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/page", mock_server.uri());
    let result = fetcher().fetch(&url, "SweepTest/1.0").await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, "<html>hello</html>");
    assert!(result.error.is_empty());
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", mock_server.uri());
    let result = fetcher().fetch(&url, "SweepTest/1.0").await;

    assert_eq!(result.status, 404);
    assert_eq!(result.body, "not here");
    assert!(result.error.is_empty());
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved content"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/old", mock_server.uri());
    let result = fetcher().fetch(&url, "SweepTest/1.0").await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, "moved content");
}

#[tokio::test]
async fn test_redirect_loop_is_a_transport_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/loop", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/loop", mock_server.uri());
    let result = fetcher().fetch(&url, "SweepTest/1.0").await;

    assert_eq!(result.status, 0);
    assert!(result.error.starts_with("redirect"), "got {}", result.error);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let fetcher = ReqwestFetcher::new(&FetchSettings {
        request_timeout: Duration::from_millis(300),
        ..FetchSettings::default()
    })
    .unwrap();

    let url = format!("{}/slow", mock_server.uri());
    let result = fetcher.fetch(&url, "SweepTest/1.0").await;

    assert_eq!(result.status, 0);
    assert!(result.error.starts_with("timeout"), "got {}", result.error);
}
