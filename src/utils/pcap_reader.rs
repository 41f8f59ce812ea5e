use anyhow::{anyhow, Result};
use pcap_parser::{traits::PcapReaderIterator, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError};
use std::io::Read;

/// Holds a full record at the default snaplen plus its record header.
const BUFFER_SIZE: usize = 2 * 65536;
const RECORD_HEADER_LEN: usize = 16;
/// Upper bound for the read buffer when the header declares no usable snaplen.
const MAX_SNAPLEN: usize = 16 * 1024 * 1024;

pub const LINKTYPE_LINUX_SLL: Linktype = Linktype(113);
pub const LINKTYPE_LINUX_SLL2: Linktype = Linktype(276);

const MAGIC_NANOSECOND: u32 = 0xa1b2_3c4d;
const MAGIC_NANOSECOND_SWAPPED: u32 = 0x4d3c_b2a1;

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub origlen: u32,
    pub data: Vec<u8>,
}

/// Reads the records of a legacy pcap stream one at a time.
pub struct FrameSource<R: Read> {
    capture: LegacyPcapReader<R>,
    link_type: Linktype,
    snaplen: u32,
    nanosecond: bool,
    capacity: usize,
    done: bool,
}

impl<R: Read> FrameSource<R> {
    /// Opens the stream and consumes the global header.
    pub fn new(reader: R) -> Result<Self> {
        let capture = LegacyPcapReader::new(BUFFER_SIZE, reader)
            .map_err(|e| anyhow!("not a pcap capture: {:?}", e))?;
        let mut source = FrameSource {
            capture,
            link_type: Linktype(0),
            snaplen: 0,
            nanosecond: false,
            capacity: BUFFER_SIZE,
            done: false,
        };
        source.read_header()?;
        log::info!("input link type {:?}, snaplen {}", source.link_type, source.snaplen);
        if source.link_type != LINKTYPE_LINUX_SLL && source.link_type != LINKTYPE_LINUX_SLL2 {
            log::warn!("input link type {:?} is not linux cooked capture", source.link_type);
        }
        Ok(source)
    }

    pub fn link_type(&self) -> Linktype {
        self.link_type
    }

    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    pub fn is_nanosecond(&self) -> bool {
        self.nanosecond
    }

    fn read_header(&mut self) -> Result<()> {
        loop {
            match self.capture.next() {
                Ok((offset, block)) => {
                    let header = match block {
                        PcapBlockOwned::LegacyHeader(hdr) => Some((
                            hdr.network,
                            hdr.snaplen,
                            hdr.magic_number == MAGIC_NANOSECOND
                                || hdr.magic_number == MAGIC_NANOSECOND_SWAPPED,
                        )),
                        _ => None,
                    };
                    self.capture.consume(offset);
                    return match header {
                        Some((link_type, snaplen, nanosecond)) => {
                            self.link_type = link_type;
                            self.snaplen = snaplen;
                            self.nanosecond = nanosecond;
                            Ok(())
                        }
                        None => Err(anyhow!("capture does not start with a pcap header")),
                    };
                }
                Err(PcapError::Incomplete) => self.fill()?,
                Err(PcapError::Eof) => {
                    return Err(anyhow!("capture is too short for a pcap header"));
                }
                Err(e) => return Err(anyhow!("read pcap header: {:?}", e)),
            }
        }
    }

    fn max_buffer_len(&self) -> usize {
        let snaplen = match self.snaplen as usize {
            0 => MAX_SNAPLEN,
            n => n.min(MAX_SNAPLEN),
        };
        (snaplen + RECORD_HEADER_LEN).max(BUFFER_SIZE)
    }

    /// Reads more input after `Incomplete`. Grows the buffer when it is
    /// full and still holds less than one record.
    fn fill(&mut self) -> Result<()> {
        if self.capture.reader_exhausted() {
            return Err(anyhow!("truncated pcap record at end of capture"));
        }
        if self.capture.data().len() >= self.capacity {
            let limit = self.max_buffer_len();
            let size = (self.capacity * 2).min(limit);
            if size <= self.capacity || !self.capture.grow(size) {
                return Err(anyhow!("pcap record larger than {} bytes", self.capacity));
            }
            log::debug!("read buffer grown to {} bytes", size);
            self.capacity = size;
        }
        self.capture
            .refill()
            .map_err(|e| anyhow!("read pcap record: {:?}", e))
    }
}

impl<R: Read> Iterator for FrameSource<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let ret = match self.capture.next() {
                Ok((offset, block)) => {
                    let ret = match block {
                        PcapBlockOwned::Legacy(packet) => Some(Frame {
                            ts_sec: packet.ts_sec,
                            ts_usec: packet.ts_usec,
                            origlen: packet.origlen,
                            data: packet.data.to_vec(),
                        }),
                        _ => None,
                    };
                    self.capture.consume(offset);
                    ret.map(Ok)
                }
                Err(PcapError::Eof) => {
                    if self.capture.reader_exhausted() {
                        self.done = true;
                        return None;
                    }
                    // the buffer can run dry before the reader does
                    self.capture
                        .refill()
                        .map_err(|e| anyhow!("read pcap record: {:?}", e))
                        .err()
                        .map(Err)
                }
                Err(PcapError::Incomplete) => {
                    if self.capture.reader_exhausted() && self.capture.data().is_empty() {
                        self.done = true;
                        return None;
                    }
                    self.fill().err().map(Err)
                }
                Err(e) => Some(Err(anyhow!("read pcap record: {:?}", e))),
            };
            if let Some(ret) = ret {
                if ret.is_err() {
                    self.done = true;
                }
                return Some(ret);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pcap_writer::{FrameSink, OutputHeader};
    use std::io;

    /// Hands out at most `chunk` bytes per read, like a pipe.
    struct ChunkedReader<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl<'a> Read for ChunkedReader<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn capture(snaplen: u32, records: &[Vec<u8>]) -> Vec<u8> {
        let header = OutputHeader {
            link_type: LINKTYPE_LINUX_SLL,
            snaplen,
            nanosecond: false,
        };
        let mut sink = FrameSink::new(Vec::new(), header).unwrap();
        for (i, data) in records.iter().enumerate() {
            sink.append(i as u32, 0, data).unwrap();
        }
        sink.finish().unwrap()
    }

    #[test]
    fn test_short_reads() {
        let records: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 9000]).collect();
        let input = capture(65535, &records);
        for &chunk in &[4096usize, 1000, 24] {
            let reader = ChunkedReader { data: &input, chunk };
            let frames = FrameSource::new(reader).unwrap().collect::<Result<Vec<_>>>().unwrap();
            assert_eq!(frames.len(), records.len(), "chunk {}", chunk);
            for (i, f) in frames.iter().enumerate() {
                assert_eq!(f.ts_sec, i as u32);
                assert_eq!(f.data, records[i]);
            }
        }
    }

    #[test]
    fn test_record_larger_than_buffer() {
        let records = vec![vec![0x11; 200_000], vec![0x22; 64], vec![0x33; 262_144]];
        let input = capture(262_144, &records);

        let frames = FrameSource::new(&input[..]).unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(frames.iter().map(|f| f.data.len()).collect::<Vec<_>>(), vec![200_000, 64, 262_144]);
        assert_eq!(frames[0].data, records[0]);
        assert_eq!(frames[2].data, records[2]);

        let reader = ChunkedReader { data: &input, chunk: 4096 };
        let frames = FrameSource::new(reader).unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].data, records[1]);
    }

    #[test]
    fn test_truncated_after_short_reads() {
        let mut input = capture(65535, &[vec![0x42; 9000]]);
        input.truncate(input.len() - 100);
        let reader = ChunkedReader { data: &input, chunk: 4096 };
        let mut source = FrameSource::new(reader).unwrap();
        assert!(source.next().unwrap().is_err());
        assert!(source.next().is_none());
    }
}
