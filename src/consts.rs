//! SOCKS5 protocol constants
//!
//! Defines all constants used in the SOCKS5 wire formats.

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

/// Username/password sub-negotiation version
pub const SOCKS5_AUTH_VERSION: u8 = 0x01;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// GSSAPI authentication
pub const SOCKS5_AUTH_METHOD_GSSAPI: u8 = 0x01;
/// Username/password authentication
pub const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

// Username/password status
/// Credentials accepted
pub const SOCKS5_AUTH_STATUS_SUCCESS: u8 = 0x00;
/// Credentials rejected (any nonzero value is a failure)
pub const SOCKS5_AUTH_STATUS_FAILURE: u8 = 0x01;

// Commands
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command
pub const SOCKS5_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// Reply codes
/// Succeeded
pub const SOCKS5_REPLY_SUCCEEDED: u8 = 0x00;
/// General SOCKS server failure
pub const SOCKS5_REPLY_GENERAL_FAILURE: u8 = 0x01;
/// Connection not allowed by ruleset
pub const SOCKS5_REPLY_CONNECTION_NOT_ALLOWED: u8 = 0x02;
/// Network unreachable
pub const SOCKS5_REPLY_NETWORK_UNREACHABLE: u8 = 0x03;
/// Host unreachable
pub const SOCKS5_REPLY_HOST_UNREACHABLE: u8 = 0x04;
/// Connection refused
pub const SOCKS5_REPLY_CONNECTION_REFUSED: u8 = 0x05;
/// TTL expired
pub const SOCKS5_REPLY_TTL_EXPIRED: u8 = 0x06;
/// Command not supported
pub const SOCKS5_REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;
/// Address type not supported
pub const SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;

// Reserved byte
/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

// Frame sizes
/// Maximum domain name length
pub const MAX_DOMAIN_LEN: usize = 255;
/// Maximum username or password length
pub const MAX_CREDENTIAL_LEN: usize = 255;
/// Maximum payload of a length-prefixed UDP datagram
pub const MAX_UDP_PAYLOAD_LEN: usize = u16::MAX as usize;
/// Bytes read before the length of a request, reply or UDP header is known
///
/// Four fixed bytes plus the first address byte, which for a domain
/// address is the name length.
pub const ADDR_FRAME_PREFIX_LEN: usize = 5;
