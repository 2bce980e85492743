//! Transport tests against an in-process HTTP stub.
//!
//! The stub is a plain `TcpListener` serving one canned response per
//! connection; `Connection: close` keeps reqwest from reusing sockets
//! so every request is observable.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use tzcache_core::{TzErrorCode, TzId};
use tzcache_transport::{TransportConfig, TzClient, TzFetch};

struct StubServer {
    addr: SocketAddr,
    handle: thread::JoinHandle<Vec<String>>,
}

impl StubServer {
    /// Binds a listener and serves the scripted responses in order,
    /// one connection each. Returns the recorded request heads on
    /// `finish`.
    fn start(script: impl FnOnce(SocketAddr) -> Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");
        let responses = script(addr);

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    break;
                };
                let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
                let head = read_head(&mut stream);
                if head.is_empty() {
                    // Drain connection from finish(); not a request.
                    continue;
                }
                requests.push(head);
                let _ = stream.write_all(response.as_bytes());
            }
            requests
        });

        Self { addr, handle }
    }

    fn server_url(&self) -> String {
        format!("http://{}/tz", self.addr)
    }

    fn config(&self) -> TransportConfig {
        TransportConfig::new(self.server_url()).with_timeout(Duration::from_secs(5))
    }

    /// Unblocks any leftover accept and returns the recorded requests.
    fn finish(self) -> Vec<String> {
        while !self.handle.is_finished() {
            let _ = TcpStream::connect(self.addr);
            thread::sleep(Duration::from_millis(5));
        }
        self.handle.join().expect("stub thread")
    }
}

fn read_head(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

fn redirect_to(location: &str) -> String {
    response("302 Found", &[("Location", location)], "")
}

fn capabilities_ok() -> String {
    response(
        "200 OK",
        &[("Content-Type", "application/json")],
        r#"{"version": 1, "actions": [{"name": "get"}]}"#,
    )
}

const VTIMEZONE_BODY: &str = "BEGIN:VCALENDAR\r\n\
     VERSION:2.0\r\n\
     BEGIN:VTIMEZONE\r\n\
     TZID:America/New_York\r\n\
     BEGIN:STANDARD\r\n\
     DTSTART:20071104T020000\r\n\
     RRULE:FREQ=YEARLY;BYMONTH=11;BYDAY=1SU\r\n\
     TZOFFSETFROM:-0400\r\n\
     TZOFFSETTO:-0500\r\n\
     END:STANDARD\r\n\
     END:VTIMEZONE\r\n\
     END:VCALENDAR\r\n";

#[test]
fn discovery_follows_redirects_and_strips_query() {
    let stub = StubServer::start(|addr| {
        vec![
            redirect_to(&format!("http://{addr}/hop?junk=1")),
            redirect_to(&format!("http://{addr}/final?junk=2")),
            capabilities_ok(),
        ]
    });

    let client = TzClient::discover(stub.config()).expect("discovery");
    assert!(client.base_url().as_str().ends_with("/final"));
    assert_eq!(client.base_url().query(), None);
    assert_eq!(client.capabilities().and_then(|c| c.version), Some(1));

    let requests = stub.finish();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].starts_with("GET /tz?action=capabilities"));
    assert!(requests[1].starts_with("GET /hop?action=capabilities"));
    assert!(requests[2].starts_with("GET /final?action=capabilities"));
}

#[test]
fn discovery_fails_deterministically_on_the_eleventh_redirect() {
    let stub = StubServer::start(|addr| vec![redirect_to(&format!("http://{addr}/loop")); 11]);

    let err = TzClient::discover(stub.config()).unwrap_err();
    assert_eq!(err.code(), TzErrorCode::DiscoveryFailed);

    // Initial request plus ten followed redirects.
    let requests = stub.finish();
    assert_eq!(requests.len(), 11);
}

#[test]
fn discovery_is_fatal_on_non_redirect_failure() {
    let stub = StubServer::start(|_| vec![response("500 Internal Server Error", &[], "boom")]);

    let err = TzClient::discover(stub.config()).unwrap_err();
    assert_eq!(err.code(), TzErrorCode::DiscoveryFailed);
    assert_eq!(stub.finish().len(), 1);
}

#[test]
fn unparsable_capabilities_are_not_fatal() {
    let stub = StubServer::start(|_| vec![response("200 OK", &[], "surprise! not json")]);

    let client = TzClient::discover(stub.config()).expect("discovery");
    assert!(client.capabilities().is_none());
    stub.finish();
}

#[test]
fn conditional_fetch_round_trip() {
    let stub = StubServer::start(|_| {
        vec![
            capabilities_ok(),
            response("200 OK", &[("ETag", "\"etag-1\"")], VTIMEZONE_BODY),
            response("204 No Content", &[], ""),
        ]
    });

    let client = TzClient::discover(stub.config()).expect("discovery");
    let tzid = TzId::new("America/New_York");

    match client.get_timezone(&tzid, None).expect("fetch") {
        TzFetch::Found { etag, vtimezone } => {
            assert_eq!(etag.as_deref(), Some("\"etag-1\""));
            assert!(vtimezone.contains("BEGIN:VTIMEZONE"));
        }
        other => panic!("expected Found, got {other:?}"),
    }

    let unchanged = client.get_timezone(&tzid, Some("\"etag-1\"")).expect("fetch");
    assert_eq!(unchanged, TzFetch::NotModified);

    let requests = stub.finish();
    assert_eq!(requests.len(), 3);
    assert!(requests[1].contains("tzid=America%2FNew_York"));
    assert!(!requests[1].to_ascii_lowercase().contains("if-none-match"));
    assert!(
        requests[2]
            .to_ascii_lowercase()
            .contains("if-none-match: \"etag-1\"")
    );
}

#[test]
fn missing_timezone_is_typed_not_an_error() {
    let stub = StubServer::start(|_| {
        vec![
            capabilities_ok(),
            response("404 Not Found", &[], "no such timezone"),
        ]
    });

    let client = TzClient::discover(stub.config()).expect("discovery");
    let fetch = client.get_timezone(&TzId::new("Mars/Olympus"), None).expect("fetch");
    assert_eq!(fetch, TzFetch::Missing);
    stub.finish();
}

#[test]
fn server_error_is_not_degraded_to_missing() {
    let stub = StubServer::start(|_| {
        vec![
            capabilities_ok(),
            response("503 Service Unavailable", &[], ""),
        ]
    });

    let client = TzClient::discover(stub.config()).expect("discovery");
    let err = client.get_timezone(&TzId::new("America/New_York"), None).unwrap_err();
    assert_eq!(err.code(), TzErrorCode::NetworkError);
    stub.finish();
}

#[test]
fn list_and_aliases_actions() {
    let stub = StubServer::start(|_| {
        vec![
            capabilities_ok(),
            response(
                "200 OK",
                &[("Content-Type", "application/json")],
                r#"{"timezones": [{"tzid": "America/New_York"}, {"tzid": "Europe/Paris"}]}"#,
            ),
            response(
                "200 OK",
                &[],
                "# aliases\nUS/Eastern=America/New_York\n",
            ),
        ]
    });

    let client = TzClient::discover(stub.config()).expect("discovery");

    let list = client.get_list(None).expect("list");
    assert_eq!(list.timezones.len(), 2);
    assert_eq!(list.timezones[1].tzid, "Europe/Paris");

    let aliases = client.get_aliases().expect("aliases");
    assert_eq!(aliases.canonical("US/Eastern"), Some("America/New_York"));

    let requests = stub.finish();
    assert!(requests[1].starts_with("GET /tz?action=list"));
    assert!(requests[2].starts_with("GET /tz?aliases"));
}
