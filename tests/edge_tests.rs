//! Integration tests exercising both listeners over real sockets.
//!
//! Each test builds its own `EdgeServer` bound to 127.0.0.1:0, so tests run
//! in parallel without port conflicts or cross-test interference.

use std::net::SocketAddr;

use acmegate::{EdgeServer, ServerError};
use reqwest::header::{CONTENT_TYPE, HOST, LOCATION};
use reqwest::redirect::Policy;
use reqwest::StatusCode;

const CHALLENGE_PREFIX: &str = "/.well-known/acme-challenge";

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

/// Starts a server with both listener addresses on ephemeral loopback ports
/// and returns it together with the bound plaintext address.
async fn started_server() -> (EdgeServer, SocketAddr) {
    let server = EdgeServer::new(loopback(), loopback());
    let addr = server.start().await.expect("plaintext listener should bind");
    (server, addr)
}

/// Client that reports redirects instead of following them.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// Self-signed wildcard certificate pair as PEM bytes.
fn test_cert_pair() -> (Vec<u8>, Vec<u8>) {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    (
        cert.pem().into_bytes(),
        key_pair.serialize_pem().into_bytes(),
    )
}

#[tokio::test]
async fn registered_token_is_answered_verbatim() {
    let (server, addr) = started_server().await;
    server.register_token("abc", "xyz123").await;

    let response = client()
        .get(format!("http://{addr}{CHALLENGE_PREFIX}/abc"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(response.text().await.unwrap(), "xyz123");

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_token_is_a_404_with_empty_body() {
    let (server, addr) = started_server().await;
    server.register_token("abc", "xyz123").await;

    let response = client()
        .get(format!("http://{addr}{CHALLENGE_PREFIX}/def"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "");

    server.shutdown().await;
}

#[tokio::test]
async fn clear_tokens_is_idempotent() {
    let (server, addr) = started_server().await;
    let client = client();
    let url = format!("http://{addr}{CHALLENGE_PREFIX}/abc");

    server.register_token("abc", "xyz123").await;
    server.clear_tokens().await;
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.clear_tokens().await;
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A fresh registration after repeated clears behaves as a new insert
    server.register_token("abc", "fresh").await;
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "fresh");

    server.shutdown().await;
}

#[tokio::test]
async fn concurrent_registrations_stay_separate() {
    let (server, addr) = started_server().await;

    let registrations: Vec<_> = (0..16)
        .map(|i| {
            let store = server_token_writer(&server, i);
            tokio::spawn(store)
        })
        .collect();
    for registration in registrations {
        registration.await.unwrap();
    }

    let client = client();
    let lookups: Vec<_> = (0..16)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                let response = client
                    .get(format!("http://{addr}{CHALLENGE_PREFIX}/token-{i}"))
                    .send()
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                assert_eq!(response.text().await.unwrap(), format!("response-{i}"));
            })
        })
        .collect();
    for lookup in lookups {
        lookup.await.unwrap();
    }

    server.shutdown().await;
}

fn server_token_writer(
    server: &EdgeServer,
    i: usize,
) -> impl std::future::Future<Output = ()> + 'static {
    let store = server.challenge_store();
    async move {
        store
            .put(format!("token-{i}"), format!("response-{i}"))
            .await;
    }
}

#[tokio::test]
async fn other_paths_redirect_with_host_and_query_preserved() {
    let (server, addr) = started_server().await;

    let response = client()
        .get(format!("http://{addr}/some/page?x=1"))
        .header(HOST, "example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[LOCATION],
        "https://example.com/some/page?x=1"
    );

    server.shutdown().await;
}

#[tokio::test]
async fn redirect_reflects_host_header_verbatim_including_port() {
    let (server, addr) = started_server().await;

    // reqwest sends Host: 127.0.0.1:<port> by default
    let response = client()
        .get(format!("http://{addr}/landing"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], format!("https://{addr}/landing"));

    server.shutdown().await;
}

#[tokio::test]
async fn post_requests_redirect_even_on_the_challenge_path() {
    let (server, addr) = started_server().await;
    server.register_token("abc", "xyz123").await;

    let response = client()
        .post(format!("http://{addr}{CHALLENGE_PREFIX}/abc"))
        .header(HOST, "example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[LOCATION],
        format!("https://example.com{CHALLENGE_PREFIX}/abc")
    );

    server.shutdown().await;
}

#[tokio::test]
async fn invalid_certificate_fails_without_binding() {
    // Reserve a concrete port so the failed start can be probed afterwards
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let https_addr = probe.local_addr().unwrap();
    drop(probe);

    let server = EdgeServer::new(loopback(), https_addr);
    server.start().await.expect("plaintext listener should bind");

    let err = server
        .start_encrypted(b"not a certificate", b"not a key")
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::TlsConfig(_)));

    // Nothing is listening on the encrypted port after the failed start
    assert!(std::net::TcpStream::connect(https_addr).is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn encrypted_listener_serves_the_same_routing_table() {
    let (cert_pem, key_pem) = test_cert_pair();

    let server = EdgeServer::new(loopback(), loopback());
    server.start().await.expect("plaintext listener should bind");
    let https_addr = server
        .start_encrypted(&cert_pem, &key_pem)
        .await
        .expect("encrypted listener should start");

    server.register_token("abc", "xyz123").await;

    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();

    let response = client
        .get(format!(
            "https://localhost:{}{CHALLENGE_PREFIX}/abc",
            https_addr.port()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "xyz123");

    // Catch-all is wired identically on the encrypted listener
    let response = client
        .get(format!("https://localhost:{}/page", https_addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    server.shutdown().await;
}

#[tokio::test]
async fn plaintext_listener_survives_failed_encrypted_start() {
    let (server, addr) = started_server().await;
    server.register_token("abc", "xyz123").await;

    server
        .start_encrypted(b"garbage", b"garbage")
        .await
        .unwrap_err();

    let response = client()
        .get(format!("http://{addr}{CHALLENGE_PREFIX}/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.shutdown().await;
}
