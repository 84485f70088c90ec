//! Delivery semantics against a real loopback HTTP endpoint.
//!
//! A minimal TCP server stands in for a subscriber so the tests observe
//! exactly how many HTTP calls the dispatcher makes and what they carry.

use inkpress_core::entities::webhook_subscription::WebhookSubscription;
use inkpress_core::processors::{deliver_with_retry, test_delivery, DeliveryOutcome, DispatcherConfig};
use inkpress_sdk::signature::{verify_body, SIGNATURE_HEADER};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

/// One captured request: (signature header value, body).
type CapturedRequest = (Option<String>, String);

/// Spawn a scripted HTTP endpoint answering `responses` in order (repeating
/// the last one if more requests arrive). Returns its address, a request
/// counter, and the captured requests.
async fn spawn_endpoint(
    responses: Vec<u16>,
) -> (SocketAddr, Arc<AtomicUsize>, Arc<Mutex<Vec<CapturedRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let captured = Arc::new(Mutex::new(Vec::new()));

    let counter_clone = Arc::clone(&counter);
    let captured_clone = Arc::clone(&captured);
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let n = counter_clone.fetch_add(1, Ordering::SeqCst);
            let status = *responses.get(n).or(responses.last()).unwrap_or(&200);

            let (signature, body) = read_request(&mut stream).await;
            captured_clone.lock().await.push((signature, body));

            let reason = if status < 300 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (addr, counter, captured)
}

/// Read one HTTP request off the stream; returns the signature header and body.
async fn read_request(stream: &mut tokio::net::TcpStream) -> (Option<String>, String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    let signature = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case(SIGNATURE_HEADER)
            .then(|| value.trim().to_string())
    });

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    (signature, String::from_utf8_lossy(&body).to_string())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn subscription(addr: SocketAddr, secret: &str) -> WebhookSubscription {
    let now = time::OffsetDateTime::now_utc();
    let now = time::PrimitiveDateTime::new(now.date(), now.time());
    WebhookSubscription {
        id: Uuid::new_v4(),
        name: "test endpoint".into(),
        target_url: format!("http://{addr}/hook"),
        events: vec!["*".into()],
        active: true,
        timeout_secs: 5,
        secret: secret.into(),
        created_at: now,
        updated_at: now,
    }
}

fn fast_config() -> DispatcherConfig {
    DispatcherConfig {
        max_attempts: 3,
        base_backoff: Duration::from_millis(10),
        workers: 2,
    }
}

fn no_shutdown() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    // Keep the sender alive for the duration of the test process.
    std::mem::forget(tx);
    rx
}

#[tokio::test]
async fn delivery_succeeding_on_third_attempt_is_delivered() {
    let (addr, counter, _) = spawn_endpoint(vec![500, 500, 200]).await;
    let client = reqwest::Client::new();
    let sub = subscription(addr, "secret");

    let outcome = deliver_with_retry(
        &client,
        &sub,
        "post.published",
        r#"{"event":"post.published","occurred_at":"2026-01-01T00:00:00Z","data":{}}"#,
        &fast_config(),
        no_shutdown(),
    )
    .await;

    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            status: 200,
            attempts: 3
        }
    );
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn delivery_failing_every_attempt_is_abandoned() {
    let (addr, counter, _) = spawn_endpoint(vec![503]).await;
    let client = reqwest::Client::new();
    let sub = subscription(addr, "secret");

    let outcome = deliver_with_retry(
        &client,
        &sub,
        "page.updated",
        "{}",
        &fast_config(),
        no_shutdown(),
    )
    .await;

    assert_eq!(outcome, DeliveryOutcome::Abandoned { attempts: 3 });
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn spurious_shutdown_notifications_do_not_skip_backoff() {
    let (addr, counter, _) = spawn_endpoint(vec![500, 200]).await;
    let client = reqwest::Client::new();
    let sub = subscription(addr, "secret");
    let config = DispatcherConfig {
        max_attempts: 3,
        base_backoff: Duration::from_millis(150),
        workers: 2,
    };

    let (tx, rx) = watch::channel(false);
    // Hammer the watch channel with non-shutdown notifications while the
    // delivery sits in its backoff.
    let noise = tokio::spawn(async move {
        for _ in 0..20 {
            if tx.send(false).is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx
    });

    let started = std::time::Instant::now();
    let outcome = deliver_with_retry(&client, &sub, "post.updated", "{}", &config, rx).await;
    let elapsed = started.elapsed();
    let _tx = noise.await.unwrap();

    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            status: 200,
            attempts: 2
        }
    );
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    // The retry waited out the full backoff despite the notifications.
    assert!(elapsed >= Duration::from_millis(150), "elapsed: {elapsed:?}");
}

#[tokio::test]
async fn dropped_shutdown_sender_abandons_scheduled_retries() {
    let (addr, counter, _) = spawn_endpoint(vec![500]).await;
    let client = reqwest::Client::new();
    let sub = subscription(addr, "secret");

    let (tx, rx) = watch::channel(false);
    drop(tx);

    let outcome = deliver_with_retry(&client, &sub, "page.updated", "{}", &fast_config(), rx).await;

    // The first attempt runs; the backoff is not entered with a dead channel.
    assert_eq!(outcome, DeliveryOutcome::Abandoned { attempts: 1 });
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delivered_body_carries_a_verifiable_signature() {
    let (addr, _, captured) = spawn_endpoint(vec![200]).await;
    let client = reqwest::Client::new();
    let sub = subscription(addr, "signing-secret");
    let body = r#"{"event":"media.created","occurred_at":"2026-01-01T00:00:00Z","data":{"id":9}}"#;

    let outcome =
        deliver_with_retry(&client, &sub, "media.created", body, &fast_config(), no_shutdown())
            .await;
    assert!(matches!(outcome, DeliveryOutcome::Delivered { .. }));

    let requests = captured.lock().await;
    let (signature, received_body) = &requests[0];
    assert_eq!(received_body, body);
    let signature = signature.as_ref().expect("signature header present");
    verify_body(signature, received_body, b"signing-secret").unwrap();
    assert!(verify_body(signature, received_body, b"wrong-secret").is_err());
}

#[tokio::test]
async fn test_delivery_makes_exactly_one_attempt() {
    let (addr, counter, _) = spawn_endpoint(vec![500]).await;
    let client = reqwest::Client::new();
    let sub = subscription(addr, "secret");

    let response = test_delivery(&client, &sub).await;

    assert!(!response.delivered);
    assert_eq!(response.status, Some(500));
    assert!(response.error.is_none());
    // No retry: the endpoint saw exactly one HTTP call.
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delivery_returns_transport_errors_verbatim() {
    // Bind then drop to get an address with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = reqwest::Client::new();
    let sub = subscription(addr, "secret");

    let response = test_delivery(&client, &sub).await;

    assert!(!response.delivered);
    assert_eq!(response.status, None);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_delivery_reports_success_status() {
    let (addr, counter, captured) = spawn_endpoint(vec![204]).await;
    let client = reqwest::Client::new();
    let sub = subscription(addr, "secret");

    let response = test_delivery(&client, &sub).await;

    assert!(response.delivered);
    assert_eq!(response.status, Some(204));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let requests = captured.lock().await;
    let (_, body) = &requests[0];
    let envelope: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(envelope["event"], "webhook.test");
    assert_eq!(envelope["data"]["subscription_id"], sub.id.to_string());
}
