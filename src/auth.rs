//! Username/password sub-negotiation (RFC 1929)
//!
//! Client sends:
//! ```text
//! +----+------+----------+------+----------+
//! |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
//! +----+------+----------+------+----------+
//! | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
//! +----+------+----------+------+----------+
//! ```
//!
//! Server responds:
//! ```text
//! +----+--------+
//! |VER | STATUS |
//! +----+--------+
//! | 1  |   1    |
//! +----+--------+
//! ```
//!
//! Whether the credentials are acceptable is decided by the caller.

use crate::consts::*;
use crate::error::{Result, Socks5Error};
use crate::frame::{read_prefix, read_remainder};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Username/password request
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassCredential {
    /// Sub-negotiation version, 1 on the wire
    pub version: u8,
    /// Username, at most 255 bytes
    pub username: String,
    /// Password, at most 255 bytes
    pub password: String,
}

impl UserPassCredential {
    /// Create a version 1 credential
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        UserPassCredential {
            version: SOCKS5_AUTH_VERSION,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Number of bytes the encoded request occupies
    pub fn encoded_len(&self) -> usize {
        3 + self.username.len() + self.password.len()
    }

    /// Encode the request into a new buffer
    ///
    /// Usernames or passwords longer than 255 bytes are rejected rather
    /// than truncated.
    pub fn to_bytes(&self) -> Result<Bytes> {
        check_len("username", &self.username)?;
        check_len("password", &self.password)?;

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.version);
        buf.put_u8(self.username.len() as u8);
        buf.put_slice(self.username.as_bytes());
        buf.put_u8(self.password.len() as u8);
        buf.put_slice(self.password.as_bytes());
        Ok(buf.freeze())
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for UserPassCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPassCredential")
            .field("version", &self.version)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

fn check_len(field: &str, value: &str) -> Result<()> {
    if value.len() > MAX_CREDENTIAL_LEN {
        return Err(Socks5Error::bad_format(format!(
            "{} is {} bytes, limit is {}",
            field,
            value.len(),
            MAX_CREDENTIAL_LEN
        )));
    }
    Ok(())
}

fn utf8_field(field: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Socks5Error::bad_format(format!("invalid UTF-8 in {}", field)))
}

/// Username/password response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserPassStatus {
    /// Sub-negotiation version, 1 on the wire
    pub version: u8,
    /// 0 for success, anything else for failure
    pub status: u8,
}

impl UserPassStatus {
    /// Create a status response
    pub fn new(version: u8, status: u8) -> Self {
        UserPassStatus { version, status }
    }

    /// Version 1 success response
    pub fn success() -> Self {
        UserPassStatus::new(SOCKS5_AUTH_VERSION, SOCKS5_AUTH_STATUS_SUCCESS)
    }

    /// Version 1 failure response
    pub fn failure() -> Self {
        UserPassStatus::new(SOCKS5_AUTH_VERSION, SOCKS5_AUTH_STATUS_FAILURE)
    }

    /// Whether the server accepted the credentials
    pub fn is_success(&self) -> bool {
        self.status == SOCKS5_AUTH_STATUS_SUCCESS
    }
}

/// Read a username/password request
pub async fn decode_credential<R>(stream: &mut R) -> Result<UserPassCredential>
where
    R: AsyncRead + Unpin,
{
    // VER ULEN
    let mut buf = read_prefix(stream, 2).await?;

    let version = buf[0];
    if version != SOCKS5_AUTH_VERSION {
        debug!("Rejecting credential with version {}", version);
        return Err(Socks5Error::BadVersion {
            expected: SOCKS5_AUTH_VERSION,
            actual: version,
        });
    }

    // UNAME PLEN
    let ulen = buf[1] as usize;
    read_remainder(stream, &mut buf, 3 + ulen).await?;

    // PASSWD
    let plen = buf[2 + ulen] as usize;
    read_remainder(stream, &mut buf, 3 + ulen + plen).await?;

    let username = utf8_field("username", &buf[2..2 + ulen])?;
    let password = utf8_field("password", &buf[3 + ulen..])?;

    trace!("Decoded credential for user {:?}", username);
    Ok(UserPassCredential {
        version,
        username,
        password,
    })
}

/// Write a username/password request in a single write
pub async fn encode_credential<W>(credential: &UserPassCredential, stream: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = credential.to_bytes()?;
    trace!("Sending credentials for user {}", credential.username);
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

/// Read a username/password response
pub async fn decode_status<R>(stream: &mut R) -> Result<UserPassStatus>
where
    R: AsyncRead + Unpin,
{
    let buf = read_prefix(stream, 2).await?;

    if buf[0] != SOCKS5_AUTH_VERSION {
        debug!("Rejecting auth status with version {}", buf[0]);
        return Err(Socks5Error::BadVersion {
            expected: SOCKS5_AUTH_VERSION,
            actual: buf[0],
        });
    }

    trace!("Decoded auth status {}", buf[1]);
    Ok(UserPassStatus::new(buf[0], buf[1]))
}

/// Write a username/password response
pub async fn encode_status<W>(status: &UserPassStatus, stream: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    trace!("Sending auth status {}", status.status);
    stream.write_all(&[status.version, status.status]).await?;
    stream.flush().await?;
    Ok(())
}
