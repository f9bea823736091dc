//! End-to-end transport behavior against a mock streaming backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tether_client::{AppLifecycle, AppState, NetworkMonitor, NetworkStatus, TetherClient};
use tether_config::StreamConfig;
use tether_stream::{
    ConnectionState, ExitStatus, StreamEndpoint, StreamTransport, TransportError, TransportEvent,
    TransportEvents,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> StreamConfig {
    StreamConfig {
        backoff_floor_ms: 10,
        backoff_ceiling_ms: 1_000,
        max_retries: 3,
        attempt_timeout_ms: 500,
        flush_interval_ms: 50,
        raw_fallback_max_len: 32,
    }
}

fn client_for(server: &MockServer) -> TetherClient {
    TetherClient::builder().base_url(server.uri()).build().unwrap()
}

fn sse(lines: &[&str]) -> ResponseTemplate {
    let mut body = String::new();
    for line in lines {
        body.push_str("data: ");
        body.push_str(line);
        body.push('\n');
    }
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn next(events: &mut TransportEvents) -> TransportEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended")
}

fn transport(client: TetherClient, config: StreamConfig) -> StreamTransport {
    StreamTransport::new(client, config, NetworkMonitor::new(), AppLifecycle::new())
}

#[tokio::test]
async fn test_terminal_output_is_coalesced_and_exit_is_last() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pty/pty_1/stream"))
        .respond_with(sse(&[
            r#"{"type":"connected"}"#,
            r#"{"type":"data","data":"abc"}"#,
            r#"{"type":"data","data":"def"}"#,
            r#"{"type":"exit","exitCode":0}"#,
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (handle, mut events) = transport(client.clone(), fast_config())
        .open(StreamEndpoint::terminal(&client, "pty_1").unwrap());

    assert_eq!(next(&mut events).await, TransportEvent::Connected);
    assert_eq!(next(&mut events).await, TransportEvent::Output("abcdef".to_string()));
    assert_eq!(
        next(&mut events).await,
        TransportEvent::Exit(ExitStatus {
            code: 0,
            signal: None
        })
    );
    assert_eq!(events.recv().await, None);
    assert_eq!(handle.state(), ConnectionState::Terminated);
}

#[tokio::test]
async fn test_short_malformed_line_forwarded_as_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pty/pty_1/stream"))
        .respond_with(sse(&[
            "plain text",
            "this line is much too long to be forwarded as raw output",
            r#"{"type":"exit","exitCode":1,"signal":9}"#,
        ]))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (_handle, mut events) = transport(client.clone(), fast_config())
        .open(StreamEndpoint::terminal(&client, "pty_1").unwrap());

    assert_eq!(next(&mut events).await, TransportEvent::Connected);
    assert_eq!(next(&mut events).await, TransportEvent::Output("plain text".to_string()));
    assert_eq!(
        next(&mut events).await,
        TransportEvent::Exit(ExitStatus {
            code: 1,
            signal: Some(9)
        })
    );
}

#[tokio::test]
async fn test_repeated_failures_back_off_then_give_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pty/pty_1/stream"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (handle, mut events) = transport(client.clone(), fast_config())
        .open(StreamEndpoint::terminal(&client, "pty_1").unwrap());

    assert_eq!(
        next(&mut events).await,
        TransportEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(10)
        }
    );
    assert_eq!(
        next(&mut events).await,
        TransportEvent::Reconnecting {
            attempt: 2,
            delay: Duration::from_millis(20)
        }
    );
    match next(&mut events).await {
        TransportEvent::Error(TransportError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert_eq!(*last, TransportError::Status(500));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(handle.state(), ConnectionState::Terminated);

    // No further attempts without an explicit retry
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.close();
}

#[tokio::test]
async fn test_attempt_without_headers_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/event"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = StreamConfig {
        max_retries: 1,
        attempt_timeout_ms: 50,
        ..fast_config()
    };
    let client = client_for(&server);
    let (handle, mut events) =
        transport(client.clone(), config).open(StreamEndpoint::session_events(&client, None).unwrap());

    match next(&mut events).await {
        TransportEvent::Error(TransportError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 1);
            assert_eq!(*last, TransportError::Timeout(Duration::from_millis(50)));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    handle.close();
}

#[tokio::test]
async fn test_retry_after_exhaustion_starts_over() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pty/pty_1/stream"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = StreamConfig {
        max_retries: 1,
        ..fast_config()
    };
    let client = client_for(&server);
    let (handle, mut events) =
        transport(client.clone(), config).open(StreamEndpoint::terminal(&client, "pty_1").unwrap());

    assert!(matches!(
        next(&mut events).await,
        TransportEvent::Error(TransportError::Exhausted { attempts: 1, .. })
    ));

    handle.retry();
    assert!(matches!(
        next(&mut events).await,
        TransportEvent::Error(TransportError::Exhausted { attempts: 1, .. })
    ));
    handle.close();
}

#[tokio::test]
async fn test_events_for_other_sessions_are_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/event"))
        .respond_with(sse(&[
            r#"{"type":"message.updated","properties":{"sessionID":"ses_2"}}"#,
            r#"{"type":"message.updated","properties":{"sessionID":"ses_1","messageID":"msg_1"}}"#,
        ]))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (handle, mut events) = transport(client.clone(), fast_config())
        .open(StreamEndpoint::session_events(&client, Some("ses_1")).unwrap());

    assert_eq!(next(&mut events).await, TransportEvent::Connected);
    match next(&mut events).await {
        TransportEvent::Event(event) => {
            assert_eq!(event.properties.session_id.as_deref(), Some("ses_1"));
            assert_eq!(event.properties.message_id.as_deref(), Some("msg_1"));
        }
        other => panic!("expected event, got {:?}", other),
    }

    // The body ends without an exit message, so the transport reconnects
    assert!(matches!(
        next(&mut events).await,
        TransportEvent::Reconnecting { attempt: 1, .. }
    ));
    handle.close();
}

#[tokio::test]
async fn test_close_stops_delivery_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pty/pty_1/stream"))
        .respond_with(sse(&[
            r#"{"type":"data","data":"queued"}"#,
            r#"{"type":"exit","exitCode":0}"#,
        ]))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (handle, mut events) = transport(client.clone(), fast_config())
        .open(StreamEndpoint::terminal(&client, "pty_1").unwrap());

    assert_eq!(next(&mut events).await, TransportEvent::Connected);
    handle.close();

    assert_eq!(events.recv().await, None);
    assert!(handle.is_closed());
    assert_eq!(handle.state(), ConnectionState::Terminated);
}

#[tokio::test]
async fn test_background_defers_connection_until_foreground() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pty/pty_1/stream"))
        .respond_with(sse(&[r#"{"type":"exit","exitCode":0}"#]))
        .mount(&server)
        .await;

    let lifecycle = AppLifecycle::new();
    lifecycle.set_state(AppState::Background);
    let client = client_for(&server);
    let transport = StreamTransport::new(
        client.clone(),
        fast_config(),
        NetworkMonitor::new(),
        lifecycle.clone(),
    );
    let (handle, mut events) = transport.open(StreamEndpoint::terminal(&client, "pty_1").unwrap());

    let idle = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
    assert!(idle.is_err(), "no events while backgrounded");
    assert_eq!(handle.state(), ConnectionState::Idle);
    assert!(server.received_requests().await.unwrap().is_empty());

    lifecycle.set_state(AppState::Foreground);
    assert_eq!(next(&mut events).await, TransportEvent::Connected);
    assert!(matches!(next(&mut events).await, TransportEvent::Exit(_)));
}

#[tokio::test]
async fn test_offline_defers_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/event"))
        .respond_with(sse(&[]))
        .mount(&server)
        .await;

    let network = NetworkMonitor::with_status(NetworkStatus::Offline);
    let client = client_for(&server);
    let transport = StreamTransport::new(
        client.clone(),
        fast_config(),
        network.clone(),
        AppLifecycle::new(),
    );
    let (handle, mut events) = transport.open(StreamEndpoint::session_events(&client, None).unwrap());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(server.received_requests().await.unwrap().is_empty());

    network.set_status(NetworkStatus::Online);
    assert_eq!(next(&mut events).await, TransportEvent::Connected);
    handle.close();
}

/// HTTP server whose stream responses stay open until the client hangs up
/// or `failing` is set. While `failing` is set every request gets a 500.
struct HeldStreamServer {
    url: String,
    requests: Arc<AtomicUsize>,
    failing: watch::Sender<bool>,
}

impl HeldStreamServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(AtomicUsize::new(0));
        let (failing, failing_rx) = watch::channel(false);

        let counter = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_held(socket, counter.clone(), failing_rx.clone()));
            }
        });

        Self {
            url,
            requests,
            failing,
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

async fn serve_held(
    mut socket: TcpStream,
    requests: Arc<AtomicUsize>,
    mut failing: watch::Receiver<bool>,
) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    requests.fetch_add(1, Ordering::SeqCst);

    if *failing.borrow_and_update() {
        let _ = socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await;
        return;
    }

    let line = "data: {\"type\":\"connected\"}\n";
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
        line.len(),
        line
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    // Hold the body open until the client drops it or failure is requested.
    tokio::select! {
        _ = socket.read(&mut buf) => {}
        _ = failing.changed() => {}
    }
}

#[tokio::test]
async fn test_background_while_connected_suspends_without_spending_retries() {
    let server = HeldStreamServer::start().await;
    let client = TetherClient::builder().base_url(server.url.clone()).build().unwrap();
    let lifecycle = AppLifecycle::new();
    let transport = StreamTransport::new(
        client.clone(),
        fast_config(),
        NetworkMonitor::new(),
        lifecycle.clone(),
    );
    let (handle, mut events) = transport.open(StreamEndpoint::terminal(&client, "pty_1").unwrap());

    assert_eq!(next(&mut events).await, TransportEvent::Connected);
    assert_eq!(handle.state(), ConnectionState::Connected);

    lifecycle.set_state(AppState::Background);
    let mut state = handle.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Idle),
    )
    .await
    .expect("timed out waiting for idle")
    .unwrap();

    let quiet = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
    assert!(quiet.is_err(), "no reconnect reported while backgrounded");
    assert_eq!(handle.state(), ConnectionState::Idle);
    assert_eq!(server.requests(), 1);

    lifecycle.set_state(AppState::Foreground);
    assert_eq!(next(&mut events).await, TransportEvent::Connected);
    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(server.requests(), 2);

    // Drop the live connection and refuse every reconnect: the full retry
    // budget and the backoff floor are still available.
    server.failing.send(true).unwrap();
    assert_eq!(
        next(&mut events).await,
        TransportEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(10)
        }
    );
    assert_eq!(
        next(&mut events).await,
        TransportEvent::Reconnecting {
            attempt: 2,
            delay: Duration::from_millis(20)
        }
    );
    match next(&mut events).await {
        TransportEvent::Error(TransportError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert_eq!(*last, TransportError::Status(500));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(server.requests(), 4);
    assert_eq!(handle.state(), ConnectionState::Terminated);
    handle.close();
}
