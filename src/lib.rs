//! # socks5-wire - SOCKS5 wire codec
//!
//! Converts between SOCKS5 (RFC 1928) and username/password (RFC 1929)
//! messages and their exact wire layouts. Sockets, connection state,
//! authentication policy and data relaying belong to the caller; this crate
//! only shapes bytes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socks5_wire::{decode_methods, decode_request, encode_method, encode_reply};
//! use socks5_wire::{AuthMethod, Reply, ReplyCode};
//!
//! async fn handshake(stream: &mut tokio::net::TcpStream) -> socks5_wire::Result<()> {
//!     let methods = decode_methods(stream).await?;
//!     if !methods.contains(AuthMethod::None) {
//!         return encode_method(AuthMethod::NotAcceptable, stream).await;
//!     }
//!     encode_method(AuthMethod::None, stream).await?;
//!
//!     let request = decode_request(stream).await?;
//!     tracing::info!("{} to {}", request.command, request.address);
//!     encode_reply(&Reply::unbound(ReplyCode::Succeeded), stream).await
//! }
//! ```
//!
//! ## Framing
//!
//! Decoders read a fixed prefix, compute the frame length from it, then
//! read exactly the remainder. They never consume bytes belonging to the
//! next message, so one stream can carry a whole handshake.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod address;
pub mod auth;
pub mod command;
pub mod config;
pub mod consts;
pub mod error;
mod frame;
pub mod method;
pub mod udp;

// Re-export commonly used items
pub use address::{AddrKind, Address};
pub use auth::{
    decode_credential, decode_status, encode_credential, encode_status, UserPassCredential,
    UserPassStatus,
};
pub use command::{
    decode_reply, decode_request, encode_reply, encode_request, Command, Reply, ReplyCode,
    Request,
};
pub use config::{load_config, parse_config, CodecConfig};
pub use error::{Result, Socks5Error};
pub use method::{
    decode_method, decode_methods, encode_method, encode_methods, AuthMethod, MethodSet,
};
pub use udp::{decode_datagram, encode_datagram, UdpCodec, UdpDatagram, UdpFraming, UdpHeader};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the library
pub const NAME: &str = env!("CARGO_PKG_NAME");
