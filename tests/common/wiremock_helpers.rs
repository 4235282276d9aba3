use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use std::time::Duration;

/// Creates a mock HTTP server that serves `html` at `url_path`.
pub async fn mock_html_page(url_path: &str, html: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_html_page(&server, url_path, html).await;
    server
}

/// Serves another page from an existing server.
pub async fn mount_html_page(server: &MockServer, url_path: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Creates a mock HTTP server that delays responses to simulate a page that never loads.
///
/// The server will wait for `delay_ms` milliseconds before responding with a 200 OK.
pub async fn mock_timeout_server(delay_ms: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><div>京ICP备12345678号</div></body></html>")
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(&server)
        .await;

    server
}

/// Creates a mock HTTP server that returns the specified HTTP error status code.
pub async fn mock_error_server(status_code: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status_code))
        .mount(&server)
        .await;

    server
}
