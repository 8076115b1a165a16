//! Upstream egress honors the standard proxy variables. Kept in its own
//! binary so the process environment is not shared with other tests.

mod common;

use common::upstream;
use hou::Settings;
use reqwest::StatusCode;

#[tokio::test]
async fn upstream_requests_go_through_http_proxy() {
    let forward_proxy = upstream::start_echo().await;
    let proxy_url = format!("http://{forward_proxy}");
    for name in ["HTTP_PROXY", "http_proxy"] {
        std::env::set_var(name, &proxy_url);
    }
    for name in ["NO_PROXY", "no_proxy", "ALL_PROXY", "all_proxy"] {
        std::env::remove_var(name);
    }

    // the target does not resolve; only the forward proxy can answer
    let server = common::start(Settings {
        proxy: Some("backend.invalid".to_string()),
        ..Settings::default()
    });

    let response = common::client()
        .get(server.url("/x?y=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-seen-host"], "backend.invalid");
    assert_eq!(response.text().await.unwrap(), "GET /x?y=1 ");

    server.stop().await;
}
