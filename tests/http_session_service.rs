//! `HttpSessionService` against a minimal HTTP/1.1 server on localhost.

use auth_gate::{Auth, AuthConfig, Body, Error, HttpSessionService};
use http::header::{COOKIE, SET_COOKIE};
use http::{Request, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Serves one canned response and hands back the raw request head.
async fn serve_once(
    status: &'static str,
    extra_headers: &'static str,
    body: &'static str,
) -> (Url, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\n{}\
             content-type: application/json\r\n\
             set-cookie: authjs.session-token=rotated; Path=/; HttpOnly\r\n\
             set-cookie: authjs.callback-url=%2F; Path=/\r\n\
             content-length: {}\r\n\
             connection: close\r\n\r\n{}",
            status,
            extra_headers,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8(head).unwrap()
    });

    (Url::parse(&format!("http://{}", addr)).unwrap(), server)
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(COOKIE, "authjs.session-token=abc")
        .header("authorization", "Bearer leak")
        .body(Body::new())
        .unwrap()
}

#[tokio::test]
async fn session_is_fetched_over_http() {
    let (origin, server) = serve_once("200 OK", "", r#"{"user":{"id":"u1"}}"#).await;
    let auth = Auth::new(
        AuthConfig::new().with_url(origin),
        HttpSessionService::build().unwrap(),
    );

    let response = auth.middleware(get("/dashboard")).await.unwrap();
    let head = server.await.unwrap().to_ascii_lowercase();

    assert!(head.starts_with("get /api/auth/session http/1.1\r\n"));
    assert!(head.contains("cookie: authjs.session-token=abc\r\n"));
    assert!(!head.contains("authorization"));

    assert_eq!(response.status(), StatusCode::OK);
    let cookies: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(
        cookies,
        vec![
            "authjs.session-token=rotated; Path=/; HttpOnly",
            "authjs.callback-url=%2F; Path=/",
        ]
    );
}

#[tokio::test]
async fn error_status_fails_the_request() {
    let (origin, server) = serve_once("503 Service Unavailable", "", "{}").await;
    let auth = Auth::new(
        AuthConfig::new().with_url(origin),
        HttpSessionService::build().unwrap(),
    );

    let err = auth.middleware(get("/dashboard")).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(
        err,
        Error::SessionStatus { status } if status == StatusCode::SERVICE_UNAVAILABLE
    ));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    drop(listener);

    let auth = Auth::new(
        AuthConfig::new().with_url(origin),
        HttpSessionService::build().unwrap(),
    );
    let err = auth.session(&http::HeaderMap::new()).await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn redirects_from_the_service_are_not_followed() {
    let (origin, server) = serve_once(
        "302 Found",
        "location: http://127.0.0.1:1/elsewhere\r\n",
        "",
    )
    .await;
    let auth = Auth::new(
        AuthConfig::new().with_url(origin),
        HttpSessionService::build().unwrap(),
    );

    let err = auth.middleware(get("/dashboard")).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(
        err,
        Error::SessionStatus { status } if status == StatusCode::FOUND
    ));
}
