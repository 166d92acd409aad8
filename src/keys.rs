//! The scalar keys of the bifrost config and how user input maps onto them.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::yaml::Scalar;

const MAX_ADDRESS_LEN: usize = 253;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ListenIp,
    SrcIp,
    DstIp,
    Address,
    Protocol,
    Port,
}

impl ConfigKey {
    /// Prompt order used by interactive configuration.
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::ListenIp,
        ConfigKey::SrcIp,
        ConfigKey::DstIp,
        ConfigKey::Address,
        ConfigKey::Protocol,
        ConfigKey::Port,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::ListenIp => "listen_ip",
            ConfigKey::SrcIp => "src_ip",
            ConfigKey::DstIp => "dst_ip",
            ConfigKey::Address => "address",
            ConfigKey::Protocol => "protocol",
            ConfigKey::Port => "port",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ConfigKey::ListenIp => "IP to listen on (e.g., 0.0.0.0)",
            ConfigKey::SrcIp => "Source IP",
            ConfigKey::DstIp => "Destination IP",
            ConfigKey::Address => "Remote address (hostname or IP)",
            ConfigKey::Protocol => "Protocol (tcp, udp or IP protocol number)",
            ConfigKey::Port => "Port (1-65535)",
        }
    }

    /// Validates raw input and returns the scalar to store.
    pub fn parse_value(self, input: &str) -> Result<Scalar> {
        let key = self.as_str();
        let input = input.trim();
        let invalid = |reason: &str| Error::InvalidValue {
            key,
            reason: reason.to_string(),
        };

        match self {
            ConfigKey::ListenIp | ConfigKey::SrcIp | ConfigKey::DstIp => input
                .parse::<IpAddr>()
                .map(|ip| Scalar::Quoted(ip.to_string()))
                .map_err(|_| invalid(&format!("'{}' is not an IP address", input))),
            ConfigKey::Address => {
                if input.is_empty() {
                    Err(invalid("must not be empty"))
                } else if input.chars().any(char::is_whitespace) {
                    Err(invalid("must not contain whitespace"))
                } else if input.len() > MAX_ADDRESS_LEN {
                    Err(invalid("too long"))
                } else {
                    Ok(Scalar::Quoted(input.to_string()))
                }
            }
            ConfigKey::Protocol => {
                let lower = input.to_ascii_lowercase();
                if lower == "tcp" || lower == "udp" {
                    return Ok(Scalar::Quoted(lower));
                }
                match input.parse::<u8>() {
                    Ok(n) => Ok(Scalar::Bare(n.to_string())),
                    Err(_) => Err(invalid("expected tcp, udp or a number 0-255")),
                }
            }
            ConfigKey::Port => match input.parse::<u16>() {
                Ok(p) if p > 0 => Ok(Scalar::Bare(p.to_string())),
                _ => Err(invalid("expected a number 1-65535")),
            },
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownKey(s.to_string()))
    }
}
