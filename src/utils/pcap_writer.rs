use anyhow::{anyhow, Result};
use pcap_parser::*;
use std::io::Write;

pub const DEFAULT_SNAPLEN: u32 = 65535;

const MAGIC_MICROSECOND: u32 = 0xa1b2_c3d4;
const MAGIC_NANOSECOND: u32 = 0xa1b2_3c4d;

/// Global header settings of the output capture.
#[derive(Debug, Clone, Copy)]
pub struct OutputHeader {
    pub link_type: Linktype,
    pub snaplen: u32,
    /// keep nanosecond timestamps from the input
    pub nanosecond: bool,
}

impl Default for OutputHeader {
    fn default() -> Self {
        OutputHeader {
            link_type: Linktype::ETHERNET,
            snaplen: DEFAULT_SNAPLEN,
            nanosecond: false,
        }
    }
}

/// Appends records to a legacy pcap stream.
pub struct FrameSink<W: Write> {
    writer: W,
    frames: u64,
}

impl<W: Write> FrameSink<W> {
    /// Writes the global header right away.
    pub fn new(mut writer: W, output: OutputHeader) -> Result<Self> {
        let mut header = PcapHeader {
            magic_number: if output.nanosecond { MAGIC_NANOSECOND } else { MAGIC_MICROSECOND },
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: output.snaplen,
            network: output.link_type,
        };
        let bytes = header
            .to_vec()
            .map_err(|e| anyhow!("serialize pcap header: {:?}", e))?;
        writer.write_all(&bytes)?;
        log::debug!("{:?}", header);
        Ok(FrameSink { writer, frames: 0 })
    }

    pub fn append(&mut self, ts_sec: u32, ts_usec: u32, data: &[u8]) -> Result<()> {
        let len = data.len() as u32;
        let mut block = LegacyPcapBlock {
            data,
            ts_sec,
            ts_usec,
            caplen: len,
            origlen: len,
        };
        let bytes = block
            .to_vec()
            .map_err(|e| anyhow!("serialize pcap record: {:?}", e))?;
        self.writer.write_all(&bytes)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
