//! Connection request and reply
//!
//! Both messages share one layout:
//!
//! ```text
//! +----+---------+-------+------+----------+----------+
//! |VER | CMD/REP |  RSV  | ATYP |   ADDR   |   PORT   |
//! +----+---------+-------+------+----------+----------+
//! | 1  |    1    | X'00' |  1   | Variable |    2     |
//! +----+---------+-------+------+----------+----------+
//! ```

use crate::address::Address;
use crate::consts::*;
use crate::error::{Result, Socks5Error};
use crate::frame::{read_prefix, read_remainder};
use bytes::{BufMut, Bytes, BytesMut};
use std::{fmt, io};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for an incoming connection
    Bind,
    /// UDP ASSOCIATE - establish UDP relay
    UdpAssociate,
}

impl Command {
    /// Parse a command byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(Command::Connect),
            SOCKS5_CMD_TCP_BIND => Some(Command::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(Command::UdpAssociate),
            _ => None,
        }
    }

    /// Convert to the command byte
    pub fn to_byte(self) -> u8 {
        match self {
            Command::Connect => SOCKS5_CMD_TCP_CONNECT,
            Command::Bind => SOCKS5_CMD_TCP_BIND,
            Command::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Connect => write!(f, "CONNECT"),
            Command::Bind => write!(f, "BIND"),
            Command::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<ReplyCode> for u8 {
    fn from(code: ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for ReplyCode {
    type Error = Socks5Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            SOCKS5_REPLY_SUCCEEDED => Ok(ReplyCode::Succeeded),
            SOCKS5_REPLY_GENERAL_FAILURE => Ok(ReplyCode::GeneralFailure),
            SOCKS5_REPLY_CONNECTION_NOT_ALLOWED => Ok(ReplyCode::ConnectionNotAllowed),
            SOCKS5_REPLY_NETWORK_UNREACHABLE => Ok(ReplyCode::NetworkUnreachable),
            SOCKS5_REPLY_HOST_UNREACHABLE => Ok(ReplyCode::HostUnreachable),
            SOCKS5_REPLY_CONNECTION_REFUSED => Ok(ReplyCode::ConnectionRefused),
            SOCKS5_REPLY_TTL_EXPIRED => Ok(ReplyCode::TtlExpired),
            SOCKS5_REPLY_COMMAND_NOT_SUPPORTED => Ok(ReplyCode::CommandNotSupported),
            SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED => Ok(ReplyCode::AddressTypeNotSupported),
            other => Err(Socks5Error::bad_format(format!("unknown reply code {}", other))),
        }
    }
}

impl From<&io::Error> for ReplyCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ReplyCode::ConnectionRefused,
            io::ErrorKind::TimedOut => ReplyCode::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => ReplyCode::HostUnreachable,
            io::ErrorKind::PermissionDenied => ReplyCode::ConnectionNotAllowed,
            _ => ReplyCode::GeneralFailure,
        }
    }
}

/// Client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Requested command
    pub command: Command,
    /// Destination address
    pub address: Address,
}

impl Request {
    /// Create a request
    pub fn new(command: Command, address: Address) -> Self {
        Request { command, address }
    }

    /// Create a request carrying the `0.0.0.0:0` placeholder address
    pub fn unaddressed(command: Command) -> Self {
        Request::new(command, Address::unspecified())
    }

    /// Encode the request into a new buffer
    pub fn to_bytes(&self) -> Result<Bytes> {
        encode_frame(self.command.to_byte(), &self.address)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            SOCKS5_VERSION,
            self.command.to_byte(),
            SOCKS5_RESERVED,
            self.address.addr_type(),
            self.address
        )
    }
}

/// Server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply status
    pub code: ReplyCode,
    /// Bound address
    pub address: Address,
}

impl Reply {
    /// Create a reply
    pub fn new(code: ReplyCode, address: Address) -> Self {
        Reply { code, address }
    }

    /// Create a reply carrying the `0.0.0.0:0` placeholder address
    ///
    /// Peers accept this as the bound address of a CONNECT reply and of
    /// failure replies.
    pub fn unbound(code: ReplyCode) -> Self {
        Reply::new(code, Address::unspecified())
    }

    /// Encode the reply into a new buffer
    pub fn to_bytes(&self) -> Result<Bytes> {
        encode_frame(self.code.into(), &self.address)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            SOCKS5_VERSION,
            u8::from(self.code),
            SOCKS5_RESERVED,
            self.address.addr_type(),
            self.address
        )
    }
}

fn encode_frame(code: u8, address: &Address) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(3 + address.encoded_len());
    buf.put_u8(SOCKS5_VERSION);
    buf.put_u8(code);
    buf.put_u8(SOCKS5_RESERVED);
    address.write_to_buf(&mut buf)?;
    Ok(buf.freeze())
}

/// Read a complete `VER CODE RSV ADDR` frame
async fn decode_frame<R>(stream: &mut R) -> Result<(u8, Address)>
where
    R: AsyncRead + Unpin,
{
    // VER CODE RSV ATYP and the first address byte
    let mut buf = read_prefix(stream, ADDR_FRAME_PREFIX_LEN).await?;

    if buf[0] != SOCKS5_VERSION {
        debug!("Rejecting frame with version {}", buf[0]);
        return Err(Socks5Error::BadVersion {
            expected: SOCKS5_VERSION,
            actual: buf[0],
        });
    }

    let total = 3 + Address::frame_len(buf[3], buf[4])?;
    read_remainder(stream, &mut buf, total).await?;

    let address = Address::decode(&buf[3..])?;
    Ok((buf[1], address))
}

/// Read a client request
///
/// An unknown command byte is reported as
/// [`Socks5Error::UnsupportedCommand`] after the whole frame is consumed.
pub async fn decode_request<R>(stream: &mut R) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let (cmd, address) = decode_frame(stream).await?;
    let command = Command::from_byte(cmd).ok_or_else(|| {
        debug!("Unknown command {} for {}", cmd, address);
        Socks5Error::UnsupportedCommand(cmd)
    })?;

    trace!("Decoded SOCKS5 request: {} to {}", command, address);
    Ok(Request { command, address })
}

/// Write a client request
pub async fn encode_request<W>(request: &Request, stream: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = request.to_bytes()?;
    trace!("Encoded SOCKS5 request: {} to {}", request.command, request.address);
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

/// Read a server reply
pub async fn decode_reply<R>(stream: &mut R) -> Result<Reply>
where
    R: AsyncRead + Unpin,
{
    let (rep, address) = decode_frame(stream).await?;
    let code = ReplyCode::try_from(rep).map_err(|e| {
        debug!("Unknown reply code {} for {}", rep, address);
        e
    })?;

    trace!("Decoded SOCKS5 reply: {:?} bound to {}", code, address);
    Ok(Reply { code, address })
}

/// Write a server reply
pub async fn encode_reply<W>(reply: &Reply, stream: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = reply.to_bytes()?;
    trace!("Encoded SOCKS5 reply: {:?} bound to {}", reply.code, reply.address);
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}
