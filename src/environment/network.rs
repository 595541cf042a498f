//! Network reachability probe.
//!
//! Tries raw TCP connects to well-known resolvers first and falls back to
//! HTTPS requests, so a host that blocks one but not the other still counts
//! as online.

use reqwest::blocking::Client;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Default TCP targets (public DNS resolvers, HTTPS port).
pub const DEFAULT_TCP_TARGETS: &[&str] = &["8.8.8.8:443", "1.1.1.1:443"];

/// Default HTTP targets.
pub const DEFAULT_HTTP_TARGETS: &[&str] = &["https://github.com"];

/// Checks whether the host can reach the internet.
#[derive(Debug, Clone)]
pub struct NetworkProbe {
    tcp_targets: Vec<String>,
    http_targets: Vec<String>,
    timeout: Duration,
}

impl Default for NetworkProbe {
    fn default() -> Self {
        Self::new(
            DEFAULT_TCP_TARGETS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_HTTP_TARGETS.iter().map(|s| s.to_string()).collect(),
            Duration::from_secs(5),
        )
    }
}

impl NetworkProbe {
    pub fn new(tcp_targets: Vec<String>, http_targets: Vec<String>, timeout: Duration) -> Self {
        Self {
            tcp_targets,
            http_targets,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True when any TCP or HTTP target answers.
    pub fn is_reachable(&self) -> bool {
        self.tcp_reachable() || self.http_reachable()
    }

    /// True when a TCP connection to any target succeeds within the timeout.
    pub fn tcp_reachable(&self) -> bool {
        self.tcp_targets.iter().any(|target| {
            let reachable = resolve(target)
                .into_iter()
                .any(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok());
            debug!(target = %target, reachable, "tcp probe");
            reachable
        })
    }

    /// True when any HTTP target returns a non-error status.
    pub fn http_reachable(&self) -> bool {
        let client = match Client::builder()
            .user_agent(concat!("reconkit/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                debug!(error = %e, "could not build HTTP client");
                return false;
            }
        };

        self.http_targets.iter().any(|url| {
            let reachable = match client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    status.is_success() || status.is_redirection()
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "http probe failed");
                    false
                }
            };
            debug!(url = %url, reachable, "http probe");
            reachable
        })
    }
}

fn resolve(target: &str) -> Vec<SocketAddr> {
    target
        .to_socket_addrs()
        .map(|addrs| addrs.collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn default_probe_targets_public_resolvers() {
        let probe = NetworkProbe::default();
        assert_eq!(probe.timeout(), Duration::from_secs(5));
        assert!(probe.tcp_targets.iter().any(|t| t.starts_with("1.1.1.1")));
    }

    #[test]
    fn tcp_probe_succeeds_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let probe = NetworkProbe::new(vec![addr], vec![], Duration::from_secs(1));
        assert!(probe.tcp_reachable());
        assert!(probe.is_reachable());
    }

    #[test]
    fn unresolvable_target_is_unreachable() {
        let probe = NetworkProbe::new(
            vec!["not a host".to_string()],
            vec![],
            Duration::from_millis(200),
        );
        assert!(!probe.tcp_reachable());
        assert!(!probe.http_reachable());
    }
}
