//! Error types for the SOCKS5 codec
//!
//! Every decode and encode operation returns [`Socks5Error`] on failure.
//! Failures of the underlying stream are carried unchanged in
//! [`Socks5Error::Io`].

use std::io;
use thiserror::Error;

/// Result alias used by all codec operations
pub type Result<T> = std::result::Result<T, Socks5Error>;

/// SOCKS5 codec errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// A fixed version byte did not match the protocol constant
    #[error("Bad version: expected {expected}, got {actual}")]
    BadVersion {
        /// Version required by the message
        expected: u8,
        /// Version found on the wire
        actual: u8,
    },

    /// Structurally malformed input, or a value that cannot be encoded
    #[error("Bad format: {0}")]
    BadFormat(String),

    /// Address type byte outside {1, 3, 4}
    #[error("Bad address type: {0}")]
    BadAddrType(u8),

    /// Caller-supplied encode target is too small
    #[error("Short buffer: need {needed} bytes, have {available}")]
    ShortBuffer {
        /// Bytes required by the encoding
        needed: usize,
        /// Bytes available in the target
        available: usize,
    },

    /// Zero authentication methods offered
    #[error("Bad method: no authentication methods offered")]
    BadMethod,

    /// Credential rejection; raised by callers, never by the codec
    #[error("Authentication failed")]
    AuthFailure,

    /// Request carried a command byte outside {1, 2, 3}
    ///
    /// The whole request frame has been consumed when this is returned,
    /// so the caller may still answer with a "command not supported" reply.
    #[error("Command not supported: {0}")]
    UnsupportedCommand(u8),

    /// IO error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Socks5Error {
    pub(crate) fn bad_format(msg: impl Into<String>) -> Self {
        Socks5Error::BadFormat(msg.into())
    }

    /// Whether the error came from the stream rather than from the bytes on it
    pub fn is_io(&self) -> bool {
        matches!(self, Socks5Error::Io(_))
    }
}

impl From<Socks5Error> for io::Error {
    fn from(err: Socks5Error) -> Self {
        match err {
            Socks5Error::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
