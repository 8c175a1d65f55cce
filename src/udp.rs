//! UDP relay datagrams
//!
//! ```text
//! +----+------+------+----------+----------+----------+
//! |RSV | FRAG | ATYP | DST.ADDR | DST.PORT |   DATA   |
//! +----+------+------+----------+----------+----------+
//! | 2  |  1   |  1   | Variable |    2     | Variable |
//! +----+------+------+----------+----------+----------+
//! ```
//!
//! RFC 1928 defines `RSV` as reserved. When datagrams are carried inside a
//! byte stream there is no packet boundary, so the stream codec reads
//! `RSV` as the payload length instead ([`UdpFraming::LengthPrefixed`]).
//! Peers using this codec depend on that convention; it rejects literal
//! RFC 1928 datagrams whose reserved field holds anything but the payload
//! length. [`UdpCodec`] makes the choice explicit for whole packets.

use crate::address::Address;
use crate::config::CodecConfig;
use crate::consts::*;
use crate::error::{Result, Socks5Error};
use crate::frame::{read_prefix, read_remainder};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// How the `RSV` field of a UDP datagram is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UdpFraming {
    /// `RSV` holds the payload length
    #[default]
    LengthPrefixed,
    /// `RSV` is ignored and the payload runs to the end of the packet
    Datagram,
}

/// UDP datagram header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpHeader {
    /// Reserved field; the payload length under length-prefixed framing
    pub reserved: u16,
    /// Fragment number (0 for standalone packets)
    pub fragment: u8,
    /// Destination or source address
    pub address: Address,
}

impl UdpHeader {
    /// Create a header
    pub fn new(reserved: u16, fragment: u8, address: Address) -> Self {
        UdpHeader {
            reserved,
            fragment,
            address,
        }
    }

    /// Number of bytes the encoded header occupies
    pub fn encoded_len(&self) -> usize {
        3 + self.address.encoded_len()
    }

    /// Check if this is a fragmented packet
    pub fn is_fragmented(&self) -> bool {
        self.fragment != 0
    }

    fn write_to_buf<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        // Encode the address first so nothing is written on failure.
        let address = self.address.encode()?;
        buf.put_u16(self.reserved);
        buf.put_u8(self.fragment);
        buf.put_slice(&address);
        Ok(())
    }
}

impl fmt::Display for UdpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.reserved,
            self.fragment,
            self.address.addr_type(),
            self.address
        )
    }
}

/// Header plus payload of one relayed UDP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpDatagram {
    /// Datagram header
    pub header: UdpHeader,
    /// Packet data
    pub payload: Bytes,
}

impl UdpDatagram {
    /// Create a datagram from a header and payload as given
    pub fn new(header: UdpHeader, payload: impl Into<Bytes>) -> Self {
        UdpDatagram {
            header,
            payload: payload.into(),
        }
    }

    /// Create a datagram whose reserved field carries the payload length
    pub fn framed(fragment: u8, address: Address, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let reserved = payload_len(&payload)?;
        Ok(UdpDatagram::new(
            UdpHeader::new(reserved, fragment, address),
            payload,
        ))
    }

    /// Encode header and payload into a new buffer
    ///
    /// The reserved field is written as stored.
    pub fn to_bytes(&self) -> Result<Bytes> {
        payload_len(&self.payload)?;

        let mut buf = BytesMut::with_capacity(self.header.encoded_len() + self.payload.len());
        self.header.write_to_buf(&mut buf)?;
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }
}

fn payload_len(payload: &[u8]) -> Result<u16> {
    u16::try_from(payload.len()).map_err(|_| {
        Socks5Error::bad_format(format!(
            "payload is {} bytes, limit is {}",
            payload.len(),
            MAX_UDP_PAYLOAD_LEN
        ))
    })
}

/// Header length for a datagram starting with `buf`
///
/// `buf` must hold at least [`ADDR_FRAME_PREFIX_LEN`] bytes.
fn header_len(buf: &[u8]) -> Result<usize> {
    Ok(3 + Address::frame_len(buf[3], buf[4])?)
}

/// Read one length-prefixed datagram from a stream
///
/// Reads exactly the header plus `reserved` payload bytes.
pub async fn decode_datagram<R>(stream: &mut R) -> Result<UdpDatagram>
where
    R: AsyncRead + Unpin,
{
    // RSV FRAG ATYP and the first address byte
    let mut buf = read_prefix(stream, ADDR_FRAME_PREFIX_LEN).await?;

    let hlen = header_len(&buf)?;
    let reserved = u16::from_be_bytes([buf[0], buf[1]]);
    read_remainder(stream, &mut buf, hlen + reserved as usize).await?;

    let address = Address::decode(&buf[3..hlen])?;
    let header = UdpHeader::new(reserved, buf[2], address);
    let payload = buf.split_off(hlen).freeze();

    trace!("Decoded UDP datagram [{}] with {} payload bytes", header, payload.len());
    Ok(UdpDatagram { header, payload })
}

/// Write one datagram to a stream
///
/// The header is written as stored; peers reading with
/// [`decode_datagram`] expect `reserved` to equal the payload length,
/// which [`UdpDatagram::framed`] guarantees.
pub async fn encode_datagram<W>(datagram: &UdpDatagram, stream: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if datagram.header.reserved as usize != datagram.payload.len() {
        debug!(
            "Writing UDP datagram with reserved {} and {} payload bytes",
            datagram.header.reserved,
            datagram.payload.len()
        );
    }

    let bytes = datagram.to_bytes()?;
    trace!(
        "Encoded UDP datagram [{}] with {} payload bytes",
        datagram.header,
        datagram.payload.len()
    );
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

/// Packet codec with an explicit reserved-field interpretation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UdpCodec {
    framing: UdpFraming,
}

impl UdpCodec {
    /// Create a codec using `framing`
    pub fn new(framing: UdpFraming) -> Self {
        UdpCodec { framing }
    }

    /// Create a codec from configuration
    pub fn from_config(config: &CodecConfig) -> Self {
        UdpCodec::new(config.udp_framing)
    }

    /// Framing in use
    pub fn framing(&self) -> UdpFraming {
        self.framing
    }

    /// Decode one whole packet
    ///
    /// Under length-prefixed framing the packet must hold exactly
    /// `reserved` payload bytes.
    pub fn decode_packet(&self, packet: &[u8]) -> Result<UdpDatagram> {
        if packet.len() < ADDR_FRAME_PREFIX_LEN {
            return Err(Socks5Error::bad_format(format!(
                "UDP packet too short: {} bytes",
                packet.len()
            )));
        }

        let hlen = header_len(packet)?;
        let address = Address::decode(&packet[3..])?;
        let reserved = u16::from_be_bytes([packet[0], packet[1]]);
        let payload = &packet[hlen..];

        if self.framing == UdpFraming::LengthPrefixed && payload.len() != reserved as usize {
            debug!(
                "UDP packet length mismatch: reserved {} but {} payload bytes",
                reserved,
                payload.len()
            );
            return Err(Socks5Error::bad_format(format!(
                "reserved field {} does not match payload length {}",
                reserved,
                payload.len()
            )));
        }

        Ok(UdpDatagram::new(
            UdpHeader::new(reserved, packet[2], address),
            Bytes::copy_from_slice(payload),
        ))
    }

    /// Encode one whole packet
    ///
    /// Under length-prefixed framing a reserved field that does not match
    /// the payload length is rejected.
    pub fn encode_packet(&self, datagram: &UdpDatagram) -> Result<Bytes> {
        if self.framing == UdpFraming::LengthPrefixed
            && datagram.header.reserved as usize != datagram.payload.len()
        {
            return Err(Socks5Error::bad_format(format!(
                "reserved field {} does not match payload length {}",
                datagram.header.reserved,
                datagram.payload.len()
            )));
        }
        datagram.to_bytes()
    }
}
