//! SOCKS5 address representation
//!
//! The address is shared by requests, replies and UDP headers.
//!
//! ```text
//! +------+----------+----------+
//! | ATYP |   ADDR   |   PORT   |
//! +------+----------+----------+
//! |  1   | Variable |    2     |
//! +------+----------+----------+
//! ```
//!
//! `ADDR` is 4 bytes for IPv4, 16 bytes for IPv6, or a one byte length
//! followed by the name for a domain.

use crate::consts::*;
use crate::error::{Result, Socks5Error};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tracing::debug;

/// Address type carried in the `ATYP` byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrKind {
    /// IPv4 literal
    Ipv4,
    /// Domain name
    Domain,
    /// IPv6 literal
    Ipv6,
}

impl AddrKind {
    /// Parse an address type byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_ADDR_TYPE_IPV4 => Some(AddrKind::Ipv4),
            SOCKS5_ADDR_TYPE_DOMAIN => Some(AddrKind::Domain),
            SOCKS5_ADDR_TYPE_IPV6 => Some(AddrKind::Ipv6),
            _ => None,
        }
    }

    /// Convert to the address type byte
    pub fn to_byte(self) -> u8 {
        match self {
            AddrKind::Ipv4 => SOCKS5_ADDR_TYPE_IPV4,
            AddrKind::Domain => SOCKS5_ADDR_TYPE_DOMAIN,
            AddrKind::Ipv6 => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

fn canonical_host(kind: AddrKind, host: String) -> String {
    let parsed = match kind {
        AddrKind::Ipv4 => host.parse::<Ipv4Addr>().map(|ip| ip.to_string()),
        AddrKind::Ipv6 => host.parse::<Ipv6Addr>().map(|ip| ip.to_string()),
        AddrKind::Domain => return host,
    };
    parsed.unwrap_or(host)
}

/// Endpoint carried by requests, replies and UDP headers
///
/// `host` is a dotted-quad or hex-colon literal for the IP kinds, or a
/// name of at most 255 bytes for [`AddrKind::Domain`]. IP literals that
/// parse are stored in canonical form; anything else is kept as given and
/// rejected when the address is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    kind: AddrKind,
    host: String,
    port: u16,
}

impl Address {
    /// Create an address from its parts
    pub fn new(kind: AddrKind, host: impl Into<String>, port: u16) -> Self {
        Address {
            kind,
            host: canonical_host(kind, host.into()),
            port,
        }
    }

    /// Create an IPv4 address
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        Address {
            kind: AddrKind::Ipv4,
            host: ip.to_string(),
            port,
        }
    }

    /// Create an IPv6 address
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        Address {
            kind: AddrKind::Ipv6,
            host: ip.to_string(),
            port,
        }
    }

    /// Create a domain name address
    pub fn domain(name: impl Into<String>, port: u16) -> Self {
        Address::new(AddrKind::Domain, name, port)
    }

    /// The IPv4 `0.0.0.0:0` placeholder
    ///
    /// Messages built without an explicit address carry this one, which
    /// encodes as `01 00 00 00 00 00 00`.
    pub fn unspecified() -> Self {
        Address::ipv4(Ipv4Addr::UNSPECIFIED, 0)
    }

    /// Address type
    pub fn kind(&self) -> AddrKind {
        self.kind
    }

    /// Host literal or domain name
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port number
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address type byte for the wire
    pub fn addr_type(&self) -> u8 {
        self.kind.to_byte()
    }

    /// Socket address for the IP kinds, `None` for domains or bad literals
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        let ip = match self.kind {
            AddrKind::Ipv4 => IpAddr::V4(self.host.parse().ok()?),
            AddrKind::Ipv6 => IpAddr::V6(self.host.parse().ok()?),
            AddrKind::Domain => return None,
        };
        Some(SocketAddr::new(ip, self.port))
    }

    /// Encoded length for an address starting with `atyp`
    ///
    /// `next` is the byte following the type byte; it is only used for
    /// domains, where it holds the name length.
    pub fn frame_len(atyp: u8, next: u8) -> Result<usize> {
        match AddrKind::from_byte(atyp) {
            Some(AddrKind::Ipv4) => Ok(1 + 4 + 2),
            Some(AddrKind::Ipv6) => Ok(1 + 16 + 2),
            Some(AddrKind::Domain) => Ok(1 + 1 + next as usize + 2),
            None => {
                debug!("Rejecting address type {}", atyp);
                Err(Socks5Error::BadAddrType(atyp))
            }
        }
    }

    /// Number of bytes [`Address::encode`] produces
    pub fn encoded_len(&self) -> usize {
        match self.kind {
            AddrKind::Ipv4 => 1 + 4 + 2,
            AddrKind::Ipv6 => 1 + 16 + 2,
            AddrKind::Domain => 1 + 1 + self.host.len() + 2,
        }
    }

    /// Decode an address from the start of `buf`
    ///
    /// Bytes past the encoded address are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let atyp = *buf
            .first()
            .ok_or_else(|| Socks5Error::bad_format("empty address"))?;
        let len = Address::frame_len(atyp, buf.get(1).copied().unwrap_or(0))?;
        if buf.len() < len {
            debug!("Rejecting truncated address: {} of {} bytes", buf.len(), len);
            return Err(Socks5Error::bad_format(format!(
                "address needs {} bytes, got {}",
                len,
                buf.len()
            )));
        }

        let port = u16::from_be_bytes([buf[len - 2], buf[len - 1]]);
        let addr = match atyp {
            SOCKS5_ADDR_TYPE_IPV4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&buf[1..5]);
                Address::ipv4(Ipv4Addr::from(octets), port)
            }
            SOCKS5_ADDR_TYPE_IPV6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&buf[1..17]);
                Address::ipv6(Ipv6Addr::from(octets), port)
            }
            _ => {
                let name = std::str::from_utf8(&buf[2..len - 2])
                    .map_err(|_| Socks5Error::bad_format("invalid UTF-8 in domain name"))?;
                Address::domain(name, port)
            }
        };

        Ok(addr)
    }

    /// Encode the address into a new buffer
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.write_to_buf(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Encode the address into a caller-supplied slice
    ///
    /// Returns the number of bytes written.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        let needed = self.encoded_len();
        if buf.len() < needed {
            return Err(Socks5Error::ShortBuffer {
                needed,
                available: buf.len(),
            });
        }

        let mut dst = &mut buf[..needed];
        self.write_to_buf(&mut dst)?;
        Ok(needed)
    }

    /// Append the encoded address to `buf`
    ///
    /// Nothing is written when the address cannot be encoded.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        match self.kind {
            AddrKind::Ipv4 => {
                let ip: Ipv4Addr = self.host.parse().map_err(|_| {
                    Socks5Error::bad_format(format!("invalid IPv4 literal: {:?}", self.host))
                })?;
                buf.put_u8(SOCKS5_ADDR_TYPE_IPV4);
                buf.put_slice(&ip.octets());
            }
            AddrKind::Ipv6 => {
                let ip: Ipv6Addr = self.host.parse().map_err(|_| {
                    Socks5Error::bad_format(format!("invalid IPv6 literal: {:?}", self.host))
                })?;
                buf.put_u8(SOCKS5_ADDR_TYPE_IPV6);
                buf.put_slice(&ip.octets());
            }
            AddrKind::Domain => {
                if self.host.len() > MAX_DOMAIN_LEN {
                    return Err(Socks5Error::bad_format(format!(
                        "domain name is {} bytes, limit is {}",
                        self.host.len(),
                        MAX_DOMAIN_LEN
                    )));
                }
                buf.put_u8(SOCKS5_ADDR_TYPE_DOMAIN);
                buf.put_u8(self.host.len() as u8);
                buf.put_slice(self.host.as_bytes());
            }
        }
        buf.put_u16(self.port);
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AddrKind::Ipv6 => write!(f, "[{}]:{}", self.host, self.port),
            _ => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Address::ipv4(*v4.ip(), v4.port()),
            SocketAddr::V6(v6) => Address::ipv6(*v6.ip(), v6.port()),
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::unspecified()
    }
}
