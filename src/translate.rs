//! Linux cooked capture (SLL / SLL2) to Ethernet header translation.
//!
//! The cooked header is stripped and replaced by a fixed Ethernet header.
//! Frames that can't be translated safely are forwarded untouched.

use crate::utils::ethernet::{EthernetHeader, ETHERNET_HEADER_LEN};
use anyhow::Result;
use std::borrow::Cow;

pub const SLL_HEADER_LEN: usize = 16;
pub const SLL2_HEADER_LEN: usize = 20;

/// Highest packet type defined for the v1 cooked header (outgoing).
const MAX_SLL_PACKET_TYPE: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookedVariant {
    V1,
    V2,
}

impl CookedVariant {
    /// Guesses the header variant from the leading 16-bit field.
    ///
    /// Only the numeric range is checked: the known v1 packet types are
    /// 0..=4, anything else is taken as the 20 byte v2 header. The extra
    /// fields of v2 are never read.
    pub fn from_packet_type(packet_type: u16) -> Self {
        if packet_type <= MAX_SLL_PACKET_TYPE {
            CookedVariant::V1
        } else {
            CookedVariant::V2
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            CookedVariant::V1 => SLL_HEADER_LEN,
            CookedVariant::V2 => SLL2_HEADER_LEN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Translator {
    ethernet: [u8; ETHERNET_HEADER_LEN],
}

impl Translator {
    pub fn new(header: &EthernetHeader) -> Result<Self> {
        Ok(Translator {
            ethernet: header.encode()?,
        })
    }

    pub fn ethernet_header(&self) -> &[u8; ETHERNET_HEADER_LEN] {
        &self.ethernet
    }

    /// Returns the cooked header variant to strip, or `None` when the frame
    /// has to pass through unchanged.
    pub fn detect(&self, frame: &[u8]) -> Option<CookedVariant> {
        if frame.len() < SLL_HEADER_LEN {
            return None;
        }
        let packet_type = u16::from_be_bytes([frame[0], frame[1]]);
        let variant = CookedVariant::from_packet_type(packet_type);
        if frame.len() < variant.header_len() + ETHERNET_HEADER_LEN {
            return None;
        }
        Some(variant)
    }

    pub fn translate<'a>(&self, frame: &'a [u8]) -> Cow<'a, [u8]> {
        self.translate_with_variant(frame).1
    }

    /// Like `translate`, also reporting which header was stripped.
    pub fn translate_with_variant<'a>(&self, frame: &'a [u8]) -> (Option<CookedVariant>, Cow<'a, [u8]>) {
        match self.detect(frame) {
            Some(variant) => {
                let payload = &frame[variant.header_len()..];
                let mut out = Vec::with_capacity(ETHERNET_HEADER_LEN + payload.len());
                out.extend_from_slice(&self.ethernet);
                out.extend_from_slice(payload);
                (Some(variant), Cow::Owned(out))
            }
            None => (None, Cow::Borrowed(frame)),
        }
    }
}
