//! Network probes: outbound reachability and the loopback control plane

use serde::{Deserialize, Serialize};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;
use tracing::debug;

use super::{Attempt, Probe, names};
use crate::config::{HarnessConfig, MAX_RESPONSE_LIMIT};

/// Leading characters of `bytes` as text, decoded lossily. The result is
/// always a prefix of the decoded response and never longer than it.
pub fn response_preview(bytes: &[u8], max_chars: usize) -> String {
    String::from_utf8_lossy(bytes).chars().take(max_chars).collect()
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Connects to a public address that a locked-down sandbox must not reach
#[derive(Debug, Clone)]
pub struct OutboundProbe {
    target: SocketAddr,
    timeout: Duration,
}

impl OutboundProbe {
    pub fn new(target: SocketAddr, timeout: Duration) -> Self {
        Self { target, timeout }
    }
}

impl Probe for OutboundProbe {
    fn name(&self) -> &str {
        names::OUTBOUND_NETWORK
    }

    fn description(&self) -> &str {
        "Open a TCP connection to an external host"
    }

    fn attempt(&self) -> Attempt {
        match TcpStream::connect_timeout(&self.target, self.timeout) {
            Ok(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
                Attempt::succeeded(format!("connected to {}", self.target))
            }
            Err(e) if is_timeout(&e) => Attempt::denied(format!(
                "connection to {} timed out after {:?}",
                self.target, self.timeout
            )),
            // Every other failure still means no connection was made
            Err(e) => Attempt::denied(format!("connection to {} failed: {}", self.target, e)),
        }
    }
}

/// The single request line sent to the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    pub code: String,
    pub profile: String,
}

impl ControlRequest {
    /// JSON object terminated by a newline
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Sends one request to the loopback control-plane service and reads one
/// response. The service is expected to be reachable from inside the sandbox.
#[derive(Debug, Clone)]
pub struct ControlPlaneProbe {
    addr: SocketAddr,
    timeout: Duration,
    request: ControlRequest,
    response_limit: usize,
    preview_chars: usize,
}

impl ControlPlaneProbe {
    pub fn new(addr: SocketAddr, timeout: Duration, request: ControlRequest) -> Self {
        Self {
            addr,
            timeout,
            request,
            response_limit: MAX_RESPONSE_LIMIT,
            preview_chars: 200,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            addr: config.control_addr(),
            timeout: config.control_timeout(),
            request: ControlRequest {
                code: config.request_code.clone(),
                profile: config.request_profile.clone(),
            },
            response_limit: config.response_limit.min(MAX_RESPONSE_LIMIT),
            preview_chars: config.preview_chars,
        }
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    fn exchange(&self) -> io::Result<Vec<u8>> {
        let mut stream = TcpStream::connect_timeout(&self.addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        stream.write_all(&self.request.to_line()?)?;

        let mut buf = vec![0u8; self.response_limit];
        let n = stream.read(&mut buf)?;
        buf.truncate(n);
        debug!("control plane at {} answered with {} bytes", self.addr, n);
        Ok(buf)
    }
}

impl Probe for ControlPlaneProbe {
    fn name(&self) -> &str {
        names::CONTROL_PLANE
    }

    fn description(&self) -> &str {
        "Reach the loopback control-plane service"
    }

    fn attempt(&self) -> Attempt {
        match self.exchange() {
            Ok(response) => Attempt::succeeded(format!(
                "reachable at {}; response: {}",
                self.addr,
                response_preview(&response, self.preview_chars)
            )),
            Err(e) if is_timeout(&e) => {
                Attempt::denied(format!("connection to {} timed out", self.addr))
            }
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => Attempt::denied(format!(
                "connection to {} refused (is the control plane running?)",
                self.addr
            )),
            Err(e) => Attempt::inconclusive(format!("control plane at {}: {}", self.addr, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::AttemptKind;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    fn request() -> ControlRequest {
        ControlRequest {
            code: "print('Hello from sandbox!')".to_string(),
            profile: "python_sandbox".to_string(),
        }
    }

    /// Accepts one connection, reads the request line and answers with `reply`.
    /// Returns the address and a handle yielding the received line.
    fn serve_once(reply: &'static [u8]) -> (SocketAddr, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            reader.get_mut().write_all(reply).unwrap();
            line
        });
        (addr, handle)
    }

    fn closed_port() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(response_preview(b"hello world", 5), "hello");
        assert_eq!(response_preview("héllo".as_bytes(), 2), "hé");
        assert_eq!(response_preview(b"", 200), "");
    }

    #[test]
    fn test_preview_is_prefix_never_longer() {
        let samples: [&[u8]; 4] = [b"", b"ok", b"{\"status\":\"queued\"}", &[b'x'; 500]];
        for bytes in samples {
            let full = String::from_utf8_lossy(bytes).to_string();
            let preview = response_preview(bytes, 200);
            assert!(full.starts_with(&preview));
            assert!(preview.chars().count() <= 200);
            assert!(preview.len() <= full.len());
        }
    }

    #[test]
    fn test_request_line_format() {
        let line = request().to_line().unwrap();
        assert_eq!(line.last(), Some(&b'\n'));
        let value: serde_json::Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(value["code"], "print('Hello from sandbox!')");
        assert_eq!(value["profile"], "python_sandbox");
    }

    #[test]
    fn test_control_plane_reachable() {
        let (addr, server) = serve_once(b"{\"status\":\"ok\"}");
        let probe = ControlPlaneProbe::new(addr, Duration::from_secs(5), request());

        let attempt = probe.attempt();
        assert_eq!(attempt.kind, AttemptKind::Succeeded);
        assert!(attempt.detail.ends_with("response: {\"status\":\"ok\"}"));

        let received = server.join().unwrap();
        let parsed: ControlRequest = serde_json::from_str(received.trim_end()).unwrap();
        assert_eq!(parsed, request());
        assert!(received.ends_with('\n'));
    }

    #[test]
    fn test_control_plane_empty_response_still_reachable() {
        let (addr, server) = serve_once(b"");
        let probe = ControlPlaneProbe::new(addr, Duration::from_secs(5), request());

        let attempt = probe.attempt();
        server.join().unwrap();
        assert_eq!(attempt.kind, AttemptKind::Succeeded);
        assert!(attempt.detail.ends_with("response: "));
    }

    #[test]
    fn test_control_plane_preview_truncated() {
        let (addr, server) = serve_once(&[b'a'; 1000]);
        let probe =
            ControlPlaneProbe::new(addr, Duration::from_secs(5), request()).with_preview_chars(10);

        let attempt = probe.attempt();
        server.join().unwrap();
        assert!(attempt.detail.ends_with("response: aaaaaaaaaa"));
    }

    #[test]
    fn test_control_plane_refused_is_denied() {
        let probe = ControlPlaneProbe::new(closed_port(), Duration::from_secs(5), request());
        let attempt = probe.attempt();
        assert_eq!(attempt.kind, AttemptKind::Denied);
        assert!(attempt.detail.contains("refused"));
    }

    #[test]
    fn test_control_plane_silent_service_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let probe = ControlPlaneProbe::new(addr, Duration::from_millis(200), request());

        // The backlog completes the handshake; nobody ever answers
        let attempt = probe.attempt();
        assert_eq!(attempt.kind, AttemptKind::Denied);
        assert!(attempt.detail.contains("timed out"));
        drop(listener);
    }

    #[cfg(unix)]
    #[test]
    fn test_control_plane_reset_is_inconclusive() {
        use nix::sys::socket::{setsockopt, sockopt};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            // Linger 0 makes close send RST instead of FIN
            let linger = nix::libc::linger {
                l_onoff: 1,
                l_linger: 0,
            };
            setsockopt(&stream, sockopt::Linger, &linger).unwrap();
            drop(stream);
        });

        let control = ControlPlaneProbe::new(addr, Duration::from_secs(5), request());
        let attempt = control.attempt();
        server.join().unwrap();
        assert_eq!(attempt.kind, AttemptKind::Inconclusive);
        assert!(attempt.detail.starts_with(&format!("control plane at {}", addr)));
    }

    #[test]
    fn test_timeout_kinds() {
        assert!(is_timeout(&io::Error::from(ErrorKind::TimedOut)));
        assert!(is_timeout(&io::Error::from(ErrorKind::WouldBlock)));
        assert!(!is_timeout(&io::Error::from(ErrorKind::ConnectionRefused)));
        assert!(!is_timeout(&io::Error::from(ErrorKind::ConnectionReset)));
    }

    #[test]
    fn test_outbound_unroutable_is_denied() {
        // TEST-NET-1 is never routed; depending on the host this either
        // times out or fails fast with an unreachable error
        let target: SocketAddr = "192.0.2.1:53".parse().unwrap();
        let outbound = OutboundProbe::new(target, Duration::from_millis(200));
        let attempt = outbound.attempt();
        assert_eq!(attempt.kind, AttemptKind::Denied);
        assert!(
            attempt.detail.contains("timed out after 200ms") || attempt.detail.contains("failed"),
            "{}",
            attempt.detail
        );
    }

    #[test]
    fn test_outbound_refused_is_denied() {
        let probe = OutboundProbe::new(closed_port(), Duration::from_secs(2));
        let attempt = probe.attempt();
        assert_eq!(attempt.kind, AttemptKind::Denied);
        assert!(attempt.detail.contains("failed"));
    }

    #[test]
    fn test_outbound_connected_is_success() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let probe = OutboundProbe::new(listener.local_addr().unwrap(), Duration::from_secs(2));
        assert_eq!(probe.attempt().kind, AttemptKind::Succeeded);
    }

    #[test]
    fn test_from_config_uses_loopback_port() {
        let config = HarnessConfig {
            control_port: 7001,
            ..HarnessConfig::default()
        };
        let probe = ControlPlaneProbe::from_config(&config);
        assert_eq!(probe.addr.to_string(), "127.0.0.1:7001");
        assert_eq!(probe.timeout, Duration::from_secs(5));
        assert_eq!(probe.response_limit, 65536);
    }

    #[test]
    fn test_from_config_clamps_response_limit() {
        let config = HarnessConfig {
            response_limit: 1 << 46,
            ..HarnessConfig::default()
        };
        let control = ControlPlaneProbe::from_config(&config);
        assert_eq!(control.response_limit, MAX_RESPONSE_LIMIT);
    }
}
