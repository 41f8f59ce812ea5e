use anyhow::{anyhow, Result};
use deku::prelude::*;
use serde_derive::Deserialize;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ETHERTYPE_IPV4: u16 = 0x0800;

#[derive(DekuRead, DekuWrite, Eq, PartialEq, Hash, Clone, Copy, Deserialize)]
#[serde(try_from = "String")]
pub struct Mac(pub [u8; 6]);

impl fmt::Debug for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", m[0], m[1], m[2], m[3], m[4], m[5])
    }
}

impl fmt::Display for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` or `aabbccddeeff`.
impl FromStr for Mac {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        let bytes = hex::decode(&digits).map_err(|e| anyhow!("invalid mac address {:?}: {}", s, e))?;
        if bytes.len() != 6 {
            return Err(anyhow!("invalid mac address {:?}: expected 6 bytes, got {}", s, bytes.len()));
        }
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&bytes);
        Ok(Mac(mac))
    }
}

impl TryFrom<String> for Mac {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// The link-layer header spliced in front of every translated frame.
#[derive(Debug, PartialEq, Clone, DekuRead, DekuWrite, Deserialize)]
#[serde(default)]
pub struct EthernetHeader {
    pub destination: Mac,
    pub source: Mac,
    #[deku(endian = "big")]
    pub ethertype: u16,
}

impl Default for EthernetHeader {
    fn default() -> Self {
        EthernetHeader {
            destination: Mac([0x03, 0x7c, 0xec, 0x88, 0x0f, 0x02]),
            source: Mac([0x02, 0x9a, 0x54, 0x0b, 0xb6, 0x42]),
            ethertype: ETHERTYPE_IPV4,
        }
    }
}

impl EthernetHeader {
    pub fn encode(&self) -> Result<[u8; ETHERNET_HEADER_LEN]> {
        let bytes = self.to_bytes()?;
        if bytes.len() != ETHERNET_HEADER_LEN {
            return Err(anyhow!("ethernet header encoded to {} bytes", bytes.len()));
        }
        let mut out = [0u8; ETHERNET_HEADER_LEN];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}
