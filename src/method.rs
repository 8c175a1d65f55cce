//! Method negotiation
//!
//! The client offers its authentication methods:
//!
//! ```text
//! +----+----------+----------+
//! |VER | NMETHODS | METHODS  |
//! +----+----------+----------+
//! | 1  |    1     | 1 to 255 |
//! +----+----------+----------+
//! ```
//!
//! and the server answers with the one it selected:
//!
//! ```text
//! +----+--------+
//! |VER | METHOD |
//! +----+--------+
//! | 1  |   1    |
//! +----+--------+
//! ```

use crate::consts::*;
use crate::error::{Result, Socks5Error};
use crate::frame::{read_prefix, read_remainder};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Authentication method identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// GSSAPI
    GssApi,
    /// Username/password (RFC 1929)
    Password,
    /// No acceptable methods
    NotAcceptable,
    /// IANA assigned or private method
    Other(u8),
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::GssApi => SOCKS5_AUTH_METHOD_GSSAPI,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
            AuthMethod::NotAcceptable => SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE,
            AuthMethod::Other(byte) => byte,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => AuthMethod::None,
            SOCKS5_AUTH_METHOD_GSSAPI => AuthMethod::GssApi,
            SOCKS5_AUTH_METHOD_PASSWORD => AuthMethod::Password,
            SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE => AuthMethod::NotAcceptable,
            other => AuthMethod::Other(other),
        }
    }
}

impl From<u8> for AuthMethod {
    fn from(byte: u8) -> Self {
        AuthMethod::from_byte(byte)
    }
}

impl From<AuthMethod> for u8 {
    fn from(method: AuthMethod) -> Self {
        method.to_byte()
    }
}

/// Ordered list of methods offered by a client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodSet {
    methods: Vec<u8>,
}

impl MethodSet {
    /// Create a method set from raw method bytes
    pub fn new(methods: impl Into<Vec<u8>>) -> Self {
        MethodSet {
            methods: methods.into(),
        }
    }

    /// Method bytes in the order they were offered
    pub fn as_slice(&self) -> &[u8] {
        &self.methods
    }

    /// Iterate over the offered methods
    pub fn iter(&self) -> impl Iterator<Item = AuthMethod> + '_ {
        self.methods.iter().map(|&b| AuthMethod::from_byte(b))
    }

    /// Whether `method` was offered
    pub fn contains(&self, method: AuthMethod) -> bool {
        self.methods.contains(&method.to_byte())
    }

    /// Number of offered methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no method was offered
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl FromIterator<AuthMethod> for MethodSet {
    fn from_iter<I: IntoIterator<Item = AuthMethod>>(iter: I) -> Self {
        MethodSet::new(iter.into_iter().map(u8::from).collect::<Vec<_>>())
    }
}

/// Read the client's method negotiation message
pub async fn decode_methods<R>(stream: &mut R) -> Result<MethodSet>
where
    R: AsyncRead + Unpin,
{
    let mut buf = read_prefix(stream, 2).await?;

    let version = buf[0];
    let count = buf[1] as usize;

    if version != SOCKS5_VERSION {
        debug!("Rejecting method negotiation with version {}", version);
        return Err(Socks5Error::BadVersion {
            expected: SOCKS5_VERSION,
            actual: version,
        });
    }

    if count == 0 {
        debug!("Rejecting method negotiation without methods");
        return Err(Socks5Error::BadMethod);
    }

    read_remainder(stream, &mut buf, 2 + count).await?;
    let methods = MethodSet::new(&buf[2..]);

    trace!("Decoded {} offered methods: {:?}", count, methods.as_slice());
    Ok(methods)
}

/// Write the client's method negotiation message
pub async fn encode_methods<W>(methods: &MethodSet, stream: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if methods.is_empty() {
        return Err(Socks5Error::BadMethod);
    }
    if methods.len() > u8::MAX as usize {
        return Err(Socks5Error::bad_format(format!(
            "{} methods offered, limit is 255",
            methods.len()
        )));
    }

    let mut message = Vec::with_capacity(2 + methods.len());
    message.push(SOCKS5_VERSION);
    message.push(methods.len() as u8);
    message.extend_from_slice(methods.as_slice());

    trace!("Offering {} methods: {:?}", methods.len(), methods.as_slice());
    stream.write_all(&message).await?;
    stream.flush().await?;
    Ok(())
}

/// Read the server's method selection
pub async fn decode_method<R>(stream: &mut R) -> Result<AuthMethod>
where
    R: AsyncRead + Unpin,
{
    let buf = read_prefix(stream, 2).await?;

    if buf[0] != SOCKS5_VERSION {
        debug!("Rejecting method selection with version {}", buf[0]);
        return Err(Socks5Error::BadVersion {
            expected: SOCKS5_VERSION,
            actual: buf[0],
        });
    }

    let method = AuthMethod::from_byte(buf[1]);
    trace!("Server selected method {:?}", method);
    Ok(method)
}

/// Write the server's method selection
pub async fn encode_method<W>(method: AuthMethod, stream: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    trace!("Selecting method {:?}", method);
    stream.write_all(&[SOCKS5_VERSION, method.to_byte()]).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_auth_method_from_byte() {
        assert_eq!(AuthMethod::from_byte(0), AuthMethod::None);
        assert_eq!(AuthMethod::from_byte(1), AuthMethod::GssApi);
        assert_eq!(AuthMethod::from_byte(2), AuthMethod::Password);
        assert_eq!(AuthMethod::from_byte(0xFF), AuthMethod::NotAcceptable);
        assert_eq!(AuthMethod::from_byte(0x80), AuthMethod::Other(0x80));
    }

    #[test]
    fn test_auth_method_to_byte() {
        assert_eq!(AuthMethod::None.to_byte(), 0);
        assert_eq!(AuthMethod::Password.to_byte(), 2);
        assert_eq!(AuthMethod::NotAcceptable.to_byte(), 0xFF);
        assert_eq!(u8::from(AuthMethod::Other(0x03)), 0x03);
    }

    #[tokio::test]
    async fn test_decode_methods() {
        let mut cursor = Cursor::new(vec![5, 2, 0, 2]);

        let methods = decode_methods(&mut cursor).await.unwrap();
        assert_eq!(methods.as_slice(), &[0, 2]);
        assert!(methods.contains(AuthMethod::None));
        assert!(methods.contains(AuthMethod::Password));
        assert!(!methods.contains(AuthMethod::GssApi));
    }

    #[tokio::test]
    async fn test_decode_methods_zero_count() {
        let mut cursor = Cursor::new(vec![5, 0]);

        let err = decode_methods(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Socks5Error::BadMethod));
    }

    #[tokio::test]
    async fn test_decode_methods_bad_version() {
        let mut cursor = Cursor::new(vec![4, 1, 0]);

        let err = decode_methods(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            Socks5Error::BadVersion {
                expected: 5,
                actual: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_decode_methods_truncated() {
        let mut cursor = Cursor::new(vec![5, 3, 0]);

        let err = decode_methods(&mut cursor).await.unwrap_err();
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_decode_methods_split_reads() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[5, 3])
            .read(&[0, 1, 2])
            .build();

        let methods = decode_methods(&mut stream).await.unwrap();
        let offered: Vec<AuthMethod> = methods.iter().collect();
        assert_eq!(
            offered,
            vec![AuthMethod::None, AuthMethod::GssApi, AuthMethod::Password]
        );
    }

    #[tokio::test]
    async fn test_decode_methods_leaves_next_message() {
        let mut cursor = Cursor::new(vec![5, 1, 0, 0xAB]);

        decode_methods(&mut cursor).await.unwrap();
        assert_eq!(cursor.position(), 3);
    }

    #[tokio::test]
    async fn test_encode_method() {
        let mut stream = tokio_test::io::Builder::new().write(&[5, 2]).build();

        encode_method(AuthMethod::Password, &mut stream).await.unwrap();
    }

    #[tokio::test]
    async fn test_encode_methods() {
        let mut buffer = Vec::new();
        let methods: MethodSet = [AuthMethod::None, AuthMethod::Password]
            .into_iter()
            .collect();

        encode_methods(&methods, &mut buffer).await.unwrap();
        assert_eq!(buffer, vec![5, 2, 0, 2]);
    }

    #[tokio::test]
    async fn test_encode_methods_empty() {
        let mut buffer = Vec::new();

        let err = encode_methods(&MethodSet::default(), &mut buffer)
            .await
            .unwrap_err();
        assert!(matches!(err, Socks5Error::BadMethod));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_decode_method() {
        let mut cursor = Cursor::new(vec![5, 0xFF]);
        assert_eq!(
            decode_method(&mut cursor).await.unwrap(),
            AuthMethod::NotAcceptable
        );

        let mut cursor = Cursor::new(vec![1, 0]);
        assert!(matches!(
            decode_method(&mut cursor).await,
            Err(Socks5Error::BadVersion { .. })
        ));
    }

    #[tokio::test]
    async fn test_methods_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let offered = MethodSet::new(vec![SOCKS5_AUTH_METHOD_NONE]);

        encode_methods(&offered, &mut client).await.unwrap();
        let received = decode_methods(&mut server).await.unwrap();
        assert_eq!(received, offered);

        encode_method(AuthMethod::None, &mut server).await.unwrap();
        assert_eq!(decode_method(&mut client).await.unwrap(), AuthMethod::None);
    }
}
