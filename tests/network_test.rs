//! Reachability probe and HTTP download against a local server.

use httpmock::prelude::*;
use reconkit::environment::NetworkProbe;
use reconkit::host::fetch_http;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn http_target_makes_host_reachable() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body("ok");
    });

    let probe = NetworkProbe::new(vec![], vec![server.url("/")], Duration::from_secs(5));

    assert!(probe.is_reachable());
    mock.assert();
}

#[test]
fn server_error_is_unreachable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(503);
    });

    let probe = NetworkProbe::new(vec![], vec![server.url("/health")], Duration::from_secs(5));

    assert!(!probe.is_reachable());
}

#[test]
fn tcp_target_answers() {
    let server = MockServer::start();
    let probe = NetworkProbe::new(vec![server.address().to_string()], vec![], Duration::from_secs(5));

    assert!(probe.tcp_reachable());
}

#[test]
fn fetch_writes_body_to_file() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/get-pip.py");
        then.status(200).body("print('bootstrap')\n");
    });
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("get-pip.py");

    fetch_http(&server.url("/get-pip.py"), &dest, Duration::from_secs(5)).unwrap();

    assert_eq!(fs::read_to_string(&dest).unwrap(), "print('bootstrap')\n");
}

#[test]
fn fetch_rejects_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404);
    });
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("missing");

    let err = fetch_http(&server.url("/missing"), &dest, Duration::from_secs(5)).unwrap_err();

    assert!(err.to_string().contains("404"));
    assert!(!dest.exists());
}
