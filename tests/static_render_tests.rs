//! Static backend against local mock servers: fetch, readiness check,
//! footer location and field extraction end to end.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::fixtures::load_fixture;
use common::wiremock_helpers::{mock_error_server, mock_html_page, mock_timeout_server, mount_html_page};
use footerscan::result_sink::{CsvResultSink, CSV_HEADER};
use footerscan::worker::render_footer_text;
use footerscan::{Dispatcher, ExtractionResult, PageWorker, RenderError, ResultSink, StaticHtmlRenderer};
use tempfile::TempDir;

fn static_worker(timeout: Duration, selector: &str) -> PageWorker<StaticHtmlRenderer> {
    PageWorker::new(Arc::new(StaticHtmlRenderer::new("footerscan-tests/1.0")), timeout, selector)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_footer_page_yields_all_fields() {
    let server = mock_html_page("/", &load_fixture("footer_page.html")).await;
    let url = format!("{}/", server.uri());

    let record = static_worker(Duration::from_secs(10), "body").process(&url).await;

    assert_eq!(record.url, url);
    assert_eq!(record.icp, "京ICP备12345678号");
    assert_eq!(record.tech_support, "技术支持：某某科技有限公司");
    assert_eq!(record.copyright, "Copyright © 2023 某某公司");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hidden_candidates_are_skipped() {
    let server = mock_html_page("/hidden", &load_fixture("hidden_footer.html")).await;
    let url = format!("{}/hidden", server.uri());

    let record = static_worker(Duration::from_secs(10), "body").process(&url).await;

    assert_eq!(record.icp, "浙ICP备87654321号-1");
    assert!(record.tech_support.is_empty());
    assert!(record.copyright.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_short_inner_footer_beats_long_wrapper() {
    let server = mock_html_page("/long", &load_fixture("nested_footer.html")).await;
    let url = format!("{}/long", server.uri());

    let record = static_worker(Duration::from_secs(10), "body").process(&url).await;

    assert!(record.icp.is_empty());
    assert_eq!(record.copyright, "版权所有 © 2010-2023 杭州某某网络有限公司");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_page_without_footer_is_empty() {
    let server = mock_html_page("/plain", &load_fixture("no_footer.html")).await;
    let url = format!("{}/plain", server.uri());

    let record = static_worker(Duration::from_secs(10), "body").process(&url).await;
    assert_eq!(record, ExtractionResult::empty(&url));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_error_is_a_navigation_failure() {
    let server = mock_error_server(503).await;
    let url = format!("{}/down", server.uri());

    let result = tokio::task::spawn_blocking(move || {
        let renderer = StaticHtmlRenderer::new("footerscan-tests/1.0");
        render_footer_text(&renderer, &url, "body", Duration::from_secs(5))
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(RenderError::Navigation { .. })), "got {:?}", result);

    let record = static_worker(Duration::from_secs(5), "body")
        .process(&format!("{}/down", server.uri()))
        .await;
    assert!(record.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_ready_element_yields_empty_record() {
    let server = mock_html_page("/", &load_fixture("footer_page.html")).await;
    let url = format!("{}/", server.uri());

    let url_for_render = url.clone();
    let result = tokio::task::spawn_blocking(move || {
        let renderer = StaticHtmlRenderer::new("footerscan-tests/1.0");
        render_footer_text(&renderer, &url_for_render, "#app-root", Duration::from_secs(5))
    })
    .await
    .unwrap();
    assert!(matches!(result, Err(RenderError::NotReady { .. })), "got {:?}", result);

    let record = static_worker(Duration::from_secs(5), "#app-root").process(&url).await;
    assert_eq!(record, ExtractionResult::empty(&url));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_page_returns_at_deadline() {
    let server = mock_timeout_server(3_000).await;
    let url = format!("{}/slow", server.uri());

    let start = Instant::now();
    let record = static_worker(Duration::from_millis(500), "body").process(&url).await;
    let elapsed = start.elapsed();

    assert_eq!(record, ExtractionResult::empty(&url));
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_batch_to_csv_end_to_end() {
    let server = mock_html_page("/a", &load_fixture("footer_page.html")).await;
    mount_html_page(&server, "/b", &load_fixture("hidden_footer.html")).await;
    mount_html_page(&server, "/c", &load_fixture("no_footer.html")).await;

    let urls: Vec<String> = ["/a", "/b", "/c", "/missing"]
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("output.csv");
    let sink = CsvResultSink::create(&path).unwrap();

    let outcome = Dispatcher::new(static_worker(Duration::from_secs(10), "body"), 2)
        .run(urls.clone(), sink)
        .await
        .unwrap();
    let mut sink = outcome.sink;
    sink.finalize().unwrap();

    assert_eq!(sink.count(), 4);
    assert_eq!(outcome.summary.total_urls, 4);
    assert_eq!(outcome.summary.with_icp, 2);
    assert_eq!(outcome.summary.empty_records, 2);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), CSV_HEADER);

    let rows: Vec<ExtractionResult> = reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            ExtractionResult {
                url: r[0].to_string(),
                icp: r[1].to_string(),
                tech_support: r[2].to_string(),
                copyright: r[3].to_string(),
            }
        })
        .collect();

    let mut seen: Vec<&str> = rows.iter().map(|r| r.url.as_str()).collect();
    seen.sort();
    let mut expected: Vec<&str> = urls.iter().map(String::as_str).collect();
    expected.sort();
    assert_eq!(seen, expected);

    let first = rows.iter().find(|r| r.url.ends_with("/a")).unwrap();
    assert_eq!(first.tech_support, "技术支持：某某科技有限公司");
}
