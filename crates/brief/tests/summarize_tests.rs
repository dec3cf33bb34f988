//! Integration tests for the summarize endpoint and the completion relay
//!
//! Both the article origin and the completion service are wiremock servers.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

use brief::BriefError;
use brief::config::{CompletionConfig, Config, ServerConfig};
use brief::prompt::build_summary_prompt;
use brief::relay::{CompletionClient, CompletionRequest};
use brief::server::{AppState, SUMMARY_CACHE_CONTROL, create_router};

// =============================================================================
// Test Fixtures
// =============================================================================

const API_KEY: &str = "test-key";

const ARTICLE_HTML: &str = r#"<!doctype html>
<html>
  <head><title>Story</title></head>
  <body>
    <header>TechCrunch</header>
    <div class="article-content"><p>Acme raised a seed round.</p>
<p>It plans to hire.</p></div>
  </body>
</html>"#;

const ARTICLE_TEXT: &str = "Acme raised a seed round.It plans to hire.";

fn sse_event(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "cmpl-1",
            "object": "text_completion",
            "choices": [{"text": text, "index": 0, "logprobs": null, "finish_reason": null}],
            "model": "text-davinci-003"
        })
    )
}

fn sse_body(fragments: &[&str]) -> String {
    let mut body: String = fragments.iter().map(|f| sse_event(f)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn test_config(completion_server: &MockServer) -> Config {
    Config {
        server: ServerConfig {
            allowed_hosts: Vec::new(),
            ..ServerConfig::default()
        },
        completion: CompletionConfig {
            api_url: format!("{}/v1/completions", completion_server.uri()),
            ..CompletionConfig::default()
        },
    }
}

fn test_app(config: Config) -> axum::Router {
    let state = AppState::new(config, API_KEY.to_string()).unwrap();
    create_router(Arc::new(state))
}

async fn mount_article(server: &MockServer, html: &str) {
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/2023/01/05/acme/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

fn summarize_request(article_server: &MockServer) -> Request<Body> {
    let article_url = format!("{}/2023/01/05/acme/", article_server.uri());
    let encoded: String = url::form_urlencoded::byte_serialize(article_url.as_bytes()).collect();
    Request::builder()
        .uri(format!("/api/summarize?url={encoded}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Completion server that sends one event per delay, so the whole stream
/// outlasts a short timeout while no single gap does.
async fn spawn_slow_completion_server(fragments: Vec<&'static str>, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        for fragment in fragments {
            socket.write_all(sse_event(fragment).as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(gap).await;
        }
        socket.write_all(b"data: [DONE]\n\n").await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}")
}

/// Read headers and a `content-length` body off the socket
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending a request");
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + body_len {
            return;
        }
    }
}

// =============================================================================
// Endpoint Tests
// =============================================================================

mod summarize_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_streams_summary_from_article() {
        let article_server = MockServer::start().await;
        let completion_server = MockServer::start().await;
        mount_article(&article_server, ARTICLE_HTML).await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/completions"))
            .and(matchers::header("Authorization", "Bearer test-key"))
            .and(matchers::body_partial_json(serde_json::json!({
                "model": "text-davinci-003",
                "prompt": build_summary_prompt(ARTICLE_TEXT),
                "temperature": 0.5,
                "top_p": 1.0,
                "frequency_penalty": 0.0,
                "presence_penalty": 0.0,
                "max_tokens": 200,
                "stream": true,
                "n": 1
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["Acme", " raised", " money."]), "text/event-stream"),
            )
            .expect(1)
            .mount(&completion_server)
            .await;

        let app = test_app(test_config(&completion_server));
        let response = app.oneshot(summarize_request(&article_server)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            SUMMARY_CACHE_CONTROL
        );
        assert_eq!(body_string(response).await, "Acme raised money.");
    }

    #[tokio::test]
    async fn test_malformed_event_does_not_abort_stream() {
        let article_server = MockServer::start().await;
        let completion_server = MockServer::start().await;
        mount_article(&article_server, ARTICLE_HTML).await;

        let body = format!(
            "{}data: {{\"choices\": [\n\n{}data: [DONE]\n\n",
            sse_event("Hel"),
            sse_event("lo")
        );
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&completion_server)
            .await;

        let app = test_app(test_config(&completion_server));
        let response = app.oneshot(summarize_request(&article_server)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Hello");
    }

    #[tokio::test]
    async fn test_missing_url_returns_500_without_upstream_calls() {
        let completion_server = MockServer::start().await;
        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&completion_server)
            .await;

        let app = test_app(test_config(&completion_server));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/summarize")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("No url"));
    }

    #[tokio::test]
    async fn test_completion_error_status_returns_500() {
        let article_server = MockServer::start().await;
        let completion_server = MockServer::start().await;
        mount_article(&article_server, ARTICLE_HTML).await;

        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({"error": {"message": "slow down"}})),
            )
            .mount(&completion_server)
            .await;

        let app = test_app(test_config(&completion_server));
        let response = app.oneshot(summarize_request(&article_server)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
        let body = body_string(response).await;
        assert!(body.contains("Too Many Requests"), "body was: {body}");
        assert!(!body.contains("slow down"));
    }

    #[tokio::test]
    async fn test_article_without_content_region_returns_500() {
        let article_server = MockServer::start().await;
        let completion_server = MockServer::start().await;
        mount_article(&article_server, "<html><body><main>Nothing here</main></body></html>").await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&completion_server)
            .await;

        let app = test_app(test_config(&completion_server));
        let response = app.oneshot(summarize_request(&article_server)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.starts_with("Extraction error"));
    }

    #[tokio::test]
    async fn test_article_fetch_failure_returns_500() {
        let article_server = MockServer::start().await;
        let completion_server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&article_server)
            .await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&completion_server)
            .await;

        let app = test_app(test_config(&completion_server));
        let response = app.oneshot(summarize_request(&article_server)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.starts_with("Fetch error"));
    }

    #[tokio::test]
    async fn test_stream_longer_than_timeout_is_not_cut_off() {
        let article_server = MockServer::start().await;
        mount_article(&article_server, ARTICLE_HTML).await;
        let completion_base =
            spawn_slow_completion_server(vec!["One", " two", " three."], Duration::from_millis(600))
                .await;

        let config = Config {
            server: ServerConfig {
                allowed_hosts: Vec::new(),
                timeout_secs: 1,
                ..ServerConfig::default()
            },
            completion: CompletionConfig {
                api_url: format!("{completion_base}/v1/completions"),
                ..CompletionConfig::default()
            },
        };

        let app = test_app(config);
        let response = app.oneshot(summarize_request(&article_server)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "One two three.");
    }

    #[tokio::test]
    async fn test_allowlist_blocks_before_fetch() {
        let article_server = MockServer::start().await;
        let completion_server = MockServer::start().await;

        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
            .expect(0)
            .mount(&article_server)
            .await;

        let mut config = test_config(&completion_server);
        config.server.allowed_hosts = vec!["techcrunch.com".to_string()];

        let app = test_app(config);
        let response = app.oneshot(summarize_request(&article_server)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("not in the allowlist"));
    }
}

// =============================================================================
// Completion Client Tests
// =============================================================================

mod completion_client_tests {
    use super::*;

    fn client_for_url(base: &str) -> CompletionClient {
        let config = CompletionConfig {
            api_url: format!("{base}/v1/completions"),
            ..CompletionConfig::default()
        };
        CompletionClient::new(reqwest::Client::new(), &config, API_KEY.to_string())
    }

    fn client_for(server: &MockServer) -> CompletionClient {
        client_for_url(&server.uri())
    }

    #[tokio::test]
    async fn test_open_stream_yields_fragments_in_order() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::header("Authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(sse_body(&["Hel", "lo"]), "text/event-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = CompletionRequest::summary("text-davinci-003", "prompt");
        let stream = client_for(&server).open_stream(&request).await.unwrap();

        let fragments: Vec<String> = stream
            .map(|item| String::from_utf8(item.unwrap().to_vec()).unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_open_stream_non_success_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let request = CompletionRequest::summary("text-davinci-003", "prompt");
        let result = client_for(&server).open_stream(&request).await;

        match result {
            Err(BriefError::Upstream { status, message }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Unauthorized");
            }
            Err(other) => panic!("expected upstream error, got {other}"),
            Ok(_) => panic!("expected upstream error, got a stream"),
        }
    }

    #[tokio::test]
    async fn test_open_stream_connection_failure_is_network_error() {
        // Reserve a port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for_url(&format!("http://{addr}"));

        let request = CompletionRequest::summary("text-davinci-003", "prompt");
        let result = client.open_stream(&request).await;

        assert!(matches!(result, Err(BriefError::Network(_))));
    }
}
