//! Tests for the socket listener.

use std::io::{BufRead, BufReader};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use filterd_config::SocketEndpoint;
use filterd_protocol::{Response, read_line};
use rstest::{fixture, rstest};

use super::listener::SocketListener;
use super::{CannedMonitorHandler, ConnectionHandler, ListenerError};

#[derive(Clone)]
struct CountingFixture {
    count: Arc<AtomicUsize>,
    handler: Arc<CannedMonitorHandler>,
}

#[fixture]
fn counting_fixture() -> CountingFixture {
    let (count, handler) = CannedMonitorHandler::new(&["test_1", "test_2"]);
    CountingFixture { count, handler }
}

#[fixture]
fn tcp_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 0)
}

fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[rstest]
fn tcp_listener_accepts_connections(
    tcp_endpoint: SocketEndpoint,
    counting_fixture: CountingFixture,
) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener
        .local_addr()
        .expect("listener should report local address");
    let CountingFixture { count, handler } = counting_fixture;
    let handler: Arc<dyn ConnectionHandler> = handler;
    let handle = listener.start(handler).expect("start listener");

    TcpStream::connect(addr).expect("connect first client");
    TcpStream::connect(addr).expect("connect second client");

    assert!(wait_for_count(&count, 2), "expected two connections");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn accepted_connection_reaches_its_handler(
    tcp_endpoint: SocketEndpoint,
    counting_fixture: CountingFixture,
) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address");
    let handle = listener
        .start(counting_fixture.handler)
        .expect("start listener");

    let stream = TcpStream::connect(addr).expect("connect client");
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout");
    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line).expect("read reply");
    let reply: Response = read_line(&line).expect("decode reply");

    assert_eq!(reply, Response::monitor(vec!["test_1".into(), "test_2".into()]));
    handle.shutdown();
    handle.join().expect("join listener");
}

#[cfg(unix)]
#[fixture]
fn unix_tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[cfg(unix)]
#[rstest]
fn unix_listener_replaces_stale_socket(
    unix_tempdir: tempfile::TempDir,
    counting_fixture: CountingFixture,
) {
    let path = unix_tempdir.path().join("filterd.sock");
    {
        let _stale = std::os::unix::net::UnixListener::bind(&path).expect("bind stale listener");
    }
    assert!(path.exists(), "stale socket should remain");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let listener = SocketListener::bind(&endpoint).expect("bind new listener");
    let CountingFixture { count, handler } = counting_fixture;
    let handle = listener.start(handler).expect("start listener");

    std::os::unix::net::UnixStream::connect(&path).expect("connect unix client");
    assert!(wait_for_count(&count, 1), "expected one connection");

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(!path.exists(), "listener should remove its socket on shutdown");
}

#[cfg(unix)]
#[rstest]
fn unix_listener_rejects_live_socket(unix_tempdir: tempfile::TempDir) {
    let path = unix_tempdir.path().join("filterd.sock");
    let _existing = std::os::unix::net::UnixListener::bind(&path).expect("bind existing listener");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixInUse { .. }));
}

#[cfg(unix)]
#[rstest]
fn unix_listener_refuses_regular_file(unix_tempdir: tempfile::TempDir) {
    let path = unix_tempdir.path().join("filterd.sock");
    std::fs::write(&path, b"not a socket").expect("write file");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
}
