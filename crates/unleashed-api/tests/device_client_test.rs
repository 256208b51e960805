#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceClient` using wiremock as a fake device.

use secrecy::SecretString;
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unleashed_api::{CookieSet, DeviceClient, Error, SessionRecord, StatQuery, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DeviceClient) {
    let server = MockServer::start().await;
    let target = server.address().to_string();
    let config = TransportConfig::default();
    let client = DeviceClient::new(&target, "http", &config, &config).unwrap();
    (server, client)
}

fn password() -> SecretString {
    SecretString::from("hunter2".to_string())
}

fn session() -> SessionRecord {
    let mut cookies = CookieSet::new();
    cookies.insert("-ejs-session-", "auth");
    SessionRecord::new(cookies, "tok".into())
}

async fn mount_login_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/admin/login.jsp"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "-ejs-session-=init; Path=/; HttpOnly")
                .append_header("set-cookie", "lang=en; Path=/")
                .set_body_string("<html>login</html>"),
        )
        .mount(server)
        .await;
}

// ── Login tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_merges_cookies_and_captures_token() {
    let (server, client) = setup().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/admin/login.jsp"))
        .and(header("cookie", "-ejs-session-=init; lang=en"))
        .and(body_string_contains("username=admin"))
        .and(body_string_contains("password=hunter2"))
        .and(body_string_contains("action=login.jsp"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/admin/dashboard.jsp")
                .append_header("set-cookie", "-ejs-session-=auth; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/_csrfTokenVar.jsp"))
        .and(header("cookie", "-ejs-session-=auth; lang=en"))
        .respond_with(ResponseTemplate::new(200).set_body_string("var csfrToken = 'tok-123';"))
        .expect(1)
        .mount(&server)
        .await;

    let session = client.login("admin", &password()).await.unwrap();

    assert_eq!(session.csrf_token, "tok-123");
    assert_eq!(session.cookies.get("-ejs-session-"), Some("auth"));
    assert_eq!(session.cookies.get("lang"), Some("en"));
}

#[tokio::test]
async fn test_login_follows_token_redirect() {
    let (server, client) = setup().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/admin/login.jsp"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/admin/dashboard.jsp"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/_csrfTokenVar.jsp"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/admin/token2.jsp"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/token2.jsp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("csrfToken = 'tok'"))
        .expect(1)
        .mount(&server)
        .await;

    let session = client.login("admin", &password()).await.unwrap();
    assert_eq!(session.csrf_token, "tok");
}

#[tokio::test]
async fn test_login_rejected_form() {
    let (server, client) = setup().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/admin/login.jsp"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = client.login("admin", &password()).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_without_token_fails() {
    let (server, client) = setup().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/admin/login.jsp"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/_csrfTokenVar.jsp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nothing here</html>"))
        .mount(&server)
        .await;

    let result = client.login("admin", &password()).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_unreachable_device() {
    let config = TransportConfig::default();
    // Port 9 (discard) on localhost is expected to refuse connections.
    let client = DeviceClient::new("127.0.0.1:9", "http", &config, &config).unwrap();
    let result = client.login("admin", &password()).await;
    assert!(
        matches!(result, Err(Error::Transport(_) | Error::Timeout { .. })),
        "expected transport error, got: {result:?}"
    );
}

// ── Fetch tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_sends_session_material() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/_cmdstat.jsp"))
        .and(header("cookie", "-ejs-session-=auth"))
        .and(header("x-csrf-token", "tok"))
        .and(header("content-type", "text/xml"))
        .and(body_string(StatQuery::ApStatus.body()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<ajax-response><response><ap mac="aa"/></response></ajax-response>"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body = client.fetch(&session(), StatQuery::ApStatus).await.unwrap();
    assert!(body.contains(r#"mac="aa""#));
}

#[tokio::test]
async fn test_fetch_login_page_means_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/_cmdstat.jsp"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><script>location='/admin/login.jsp'</script></html>"#),
        )
        .mount(&server)
        .await;

    let result = client.fetch(&session(), StatQuery::Inventory).await;
    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );
}

#[tokio::test]
async fn test_fetch_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/_cmdstat.jsp"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.fetch(&session(), StatQuery::Clients).await;
    assert!(
        matches!(result, Err(Error::Http { status: 500, .. })),
        "expected HTTP 500 error, got: {result:?}"
    );
}
