use super::*;

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use filterd_config::{Config, SocketEndpoint};
use rstest::rstest;

/// Accepts one connection, records the request line and answers with a
/// canned response line.
struct FakeDaemon {
    port: u16,
    request: Arc<Mutex<Option<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeDaemon {
    fn spawn(response: &str) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake daemon")?;
        listener
            .set_nonblocking(true)
            .context("fake daemon nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let request = Arc::new(Mutex::new(None));
        let recorded = Arc::clone(&request);
        let response = response.to_owned();
        let handle = thread::spawn(move || serve(&listener, &response, &recorded));
        Ok(Self {
            port,
            request,
            handle: Some(handle),
        })
    }

    fn take_request(&mut self) -> Result<Option<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake daemon thread panicked"))??;
        }
        let request = self
            .request
            .lock()
            .map_err(|error| anyhow!("lock request: {error}"))?
            .take();
        Ok(request)
    }
}

fn serve(listener: &TcpListener, response: &str, recorded: &Mutex<Option<String>>) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut stream = loop {
        match listener.accept() {
            Ok((stream, _)) => break stream,
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Ok(());
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(error) => return Err(error).context("accept connection"),
        }
    };
    stream.set_nonblocking(false).context("blocking stream")?;
    let mut line = String::new();
    BufReader::new(stream.try_clone().context("clone stream")?)
        .read_line(&mut line)
        .context("read request")?;
    *recorded
        .lock()
        .map_err(|error| anyhow!("lock request: {error}"))? = Some(line.trim_end().to_owned());
    stream
        .write_all(format!("{response}\n").as_bytes())
        .context("write response")
}

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

struct Outcome {
    exit: ExitCode,
    stdout: String,
    stderr: String,
    request: Option<String>,
}

fn run_against(response: &str, args: &[&str]) -> Outcome {
    let mut daemon = FakeDaemon::spawn(response).expect("spawn fake daemon");
    let loader = StaticConfigLoader {
        config: Config {
            management_socket: SocketEndpoint::tcp("127.0.0.1", daemon.port),
            ..Config::default()
        },
    };
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv = std::iter::once("filterctl")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit = run_with_loader(argv, &mut stdout, &mut stderr, &loader);
    Outcome {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
        request: daemon.take_request().expect("fake daemon result"),
    }
}

#[rstest]
#[case::monitor(&["monitor"], r#"{"type":"monitor"}"#)]
#[case::absent(&["update"], r#"{"type":"update"}"#)]
#[case::empty(&["update", "--empty"], r#"{"type":"update","filters":[]}"#)]
#[case::names(
    &["update", "test_1", "test_2"],
    r#"{"type":"update","filters":[{"name":"test_1"},{"name":"test_2"}]}"#
)]
fn sends_one_request_line(#[case] args: &[&str], #[case] expected: &str) {
    let outcome = run_against(r#"{"status":"OK"}"#, args);
    assert_eq!(outcome.request.as_deref(), Some(expected));
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
}

#[test]
fn prints_response_line_verbatim() {
    let response = r#"{"status":"OK","filters":["test_1"]}"#;
    let outcome = run_against(response, &["monitor"]);
    assert_eq!(outcome.stdout, format!("{response}\n"));
}

#[test]
fn ko_response_exits_with_failure() {
    let response = r#"{"status":"KO","error":{"kind":"BUSY","detail":"update already in progress"}}"#;
    let outcome = run_against(response, &["update", "--empty"]);
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stdout.contains("BUSY"));
}

#[rstest]
#[case::listed(
    r#"{"filters":[{"name":"test_1","filter":"ftest","config":"/tmp/test_1.conf"}]}"#,
    r#"{"type":"update","filters":[{"name":"test_1","filter":"ftest","config":"/tmp/test_1.conf"}]}"#
)]
#[case::empty_list(r#"{"filters":[]}"#, r#"{"type":"update","filters":[]}"#)]
#[case::missing_key("{}", r#"{"type":"update"}"#)]
fn reads_proposals_from_file(#[case] document: &str, #[case] expected: &str) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("bindings.json");
    fs::write(&path, document).expect("write bindings");
    let path = path.to_str().expect("utf8 path");

    let outcome = run_against(r#"{"status":"OK"}"#, &["update", "--from", path]);

    assert_eq!(outcome.request.as_deref(), Some(expected));
}

#[test]
fn file_without_filters_key_builds_absent_candidate() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("bindings.json"))
        .expect("utf8 path");
    fs::write(&path, "{}").expect("write bindings");

    let request = build_request(CliCommand::Update {
        empty: false,
        from: Some(path),
        names: Vec::new(),
    })
    .expect("build request");

    assert_eq!(request, Request::update(CandidateSet::Absent));
}

#[test]
fn unreadable_proposal_file_is_reported_before_connecting() {
    let outcome = run_against(
        r#"{"status":"OK"}"#,
        &["update", "--from", "/nonexistent/bindings.json"],
    );
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("failed to read bindings file"));
    assert!(outcome.request.is_none());
}

#[test]
fn empty_conflicts_with_names() {
    let outcome = run_against(r#"{"status":"OK"}"#, &["update", "--empty", "test_1"]);
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.request.is_none());
}
