//! Integration tests for downloads against a WireMock server.

use classclap_network::{HttpStatus, NetworkClient, NetworkError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> NetworkClient {
    NetworkClient::with_defaults().expect("failed to build client")
}

#[tokio::test(flavor = "multi_thread")]
async fn download_resolves_with_the_full_body() {
    let server = MockServer::start().await;
    let payload = vec![0xABu8; 4096];
    Mock::given(method("GET"))
        .and(path("/archive.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/archive.bin", server.uri());
    let fractions = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&fractions);
    let bytes = client()
        .get(&url)
        .download(move |fraction| {
            recorded.lock().unwrap().push(fraction);
        })
        .await
        .unwrap();

    assert_eq!(&bytes[..], &payload[..]);

    // Whatever the chunking, every fraction is in range and the sequence is
    // non-decreasing.
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        let seen = fractions.lock().unwrap().clone();
        if seen.last() == Some(&1.0) {
            assert!(seen.windows(2).all(|w| w[0] <= w[1]));
            assert!(seen.iter().all(|f| (0.0..=1.0).contains(f)));
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "progress never reached 1.0: {seen:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn download_of_missing_file_is_a_server_side_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archive.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/archive.bin", server.uri());
    let error = client().get(&url).download(|_| {}).await.unwrap_err();
    assert!(matches!(
        error,
        NetworkError::DownloadServerSide {
            status: HttpStatus::NotFound
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn download_with_delivers_completion_through_the_callback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let client = client();
    let url = format!("{}/notes.txt", server.uri());
    let (tx, rx) = tokio::sync::oneshot::channel();
    let handle = client.get(&url).download_with(
        |_| {},
        move |result| {
            let _ = tx.send(result);
        },
    );
    assert!(handle.is_some());

    let result = rx.await.unwrap();
    assert_eq!(&result.unwrap()[..], b"hello");
    assert_eq!(client.downloads().active_transfers(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn download_with_reports_a_bad_url_through_the_callback() {
    let client = client();
    let (tx, rx) = tokio::sync::oneshot::channel();
    let handle = client.get("::broken::").download_with(
        |_| {},
        move |result| {
            let _ = tx.send(result);
        },
    );
    assert!(handle.is_none());

    let result = rx.await.unwrap();
    assert!(matches!(result, Err(NetworkError::BadUrl { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_download_never_completes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 1 << 20])
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let client = client();
    let url = format!("{}/slow.bin", server.uri());
    let completed = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&completed);
    let handle = client
        .get(&url)
        .download_with(|_| {}, move |_| {
            *flag.lock().unwrap() = true;
        })
        .unwrap();
    handle.cancel();

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!*completed.lock().unwrap());
    assert_eq!(client.downloads().active_transfers(), 0);
}
