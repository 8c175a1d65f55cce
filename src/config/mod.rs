//! Configuration module for the codec
//!
//! The only tunable is how UDP datagram reserved fields are read; see
//! [`UdpFraming`].

use crate::udp::UdpFraming;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Codec configuration
///
/// ```toml
/// udp_framing = "datagram"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Reserved-field interpretation for UDP packets
    pub udp_framing: UdpFraming,
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CodecConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<CodecConfig> {
    toml::from_str(content).with_context(|| "Failed to parse configuration")
}
