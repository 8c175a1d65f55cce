//! Test utilities for socks5-wire
//!
//! Raw frame builders used across integration tests, written independently
//! of the encoders so that decoders are checked against hand-built bytes.

#![allow(dead_code)]

use socks5_wire::consts::*;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::{duplex, DuplexStream};

/// Create a pair of connected duplex streams for testing
pub fn create_mock_stream_pair() -> (DuplexStream, DuplexStream) {
    duplex(128 * 1024)
}

/// Install a tracing subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Formatted log output collected by [`capture_logs`]
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture every event on the current thread until the guard is dropped
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

/// Raw SOCKS5 frames
pub mod socks5_frames {
    use super::*;

    /// Method negotiation offering `methods`
    pub fn methods(methods: &[u8]) -> Vec<u8> {
        let mut frame = vec![SOCKS5_VERSION, methods.len() as u8];
        frame.extend_from_slice(methods);
        frame
    }

    /// Username/password request
    pub fn credential(username: &str, password: &str) -> Vec<u8> {
        let mut frame = vec![SOCKS5_AUTH_VERSION, username.len() as u8];
        frame.extend_from_slice(username.as_bytes());
        frame.push(password.len() as u8);
        frame.extend_from_slice(password.as_bytes());
        frame
    }

    /// IPv4 address body
    pub fn addr_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut addr = vec![SOCKS5_ADDR_TYPE_IPV4];
        addr.extend_from_slice(&ip);
        addr.extend_from_slice(&port.to_be_bytes());
        addr
    }

    /// Domain address body
    pub fn addr_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut addr = vec![SOCKS5_ADDR_TYPE_DOMAIN, domain.len() as u8];
        addr.extend_from_slice(domain.as_bytes());
        addr.extend_from_slice(&port.to_be_bytes());
        addr
    }

    /// Request or reply frame
    pub fn command(code: u8, addr: &[u8]) -> Vec<u8> {
        let mut frame = vec![SOCKS5_VERSION, code, SOCKS5_RESERVED];
        frame.extend_from_slice(addr);
        frame
    }

    /// Length-prefixed UDP datagram
    pub fn udp(fragment: u8, addr: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut frame = (payload.len() as u16).to_be_bytes().to_vec();
        frame.push(fragment);
        frame.extend_from_slice(addr);
        frame.extend_from_slice(payload);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_mock_stream_pair() {
        let (mut a, mut b) = create_mock_stream_pair();

        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        a.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        b.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_command_frame_layout() {
        let frame = socks5_frames::command(1, &socks5_frames::addr_ipv4([127, 0, 0, 1], 80));
        assert_eq!(frame, vec![5, 1, 0, 1, 127, 0, 0, 1, 0, 80]);
    }
}
