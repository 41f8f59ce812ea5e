use crate::config::Config;
use crate::translate::{CookedVariant, Translator};
use crate::utils::pcap_reader::{Frame, FrameSource};
use crate::utils::pcap_writer::{FrameSink, OutputHeader};
use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Where a conversion failed. Attached to errors as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    OpenInput,
    CreateOutput,
    WriteHeader,
    ReadFrame,
    WriteFrame,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::OpenInput => "error opening pcap file",
            Stage::CreateOutput => "error creating output pcap file",
            Stage::WriteHeader => "error writing file header",
            Stage::ReadFrame => "error reading packet",
            Stage::WriteFrame => "error writing packet to output",
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub frames: u64,
    pub translated_v1: u64,
    pub translated_v2: u64,
    pub passed_through: u64,
}

impl Summary {
    fn record(&mut self, variant: Option<CookedVariant>) {
        self.frames += 1;
        match variant {
            Some(CookedVariant::V1) => self.translated_v1 += 1,
            Some(CookedVariant::V2) => self.translated_v2 += 1,
            None => self.passed_through += 1,
        }
    }
}

/// Translates every frame in order and appends it to `sink`.
///
/// Stops at the first read or write error. Records appended before the
/// error stay in the sink.
pub fn run<I, W>(frames: I, sink: &mut FrameSink<W>, translator: &Translator) -> Result<Summary>
where
    I: IntoIterator<Item = Result<Frame>>,
    W: Write,
{
    let mut summary = Summary::default();
    for frame in frames {
        let frame = frame.context(Stage::ReadFrame)?;
        let (variant, data) = translator.translate_with_variant(&frame.data);
        match variant {
            Some(v) => log::trace!("frame {}: stripped {:?} header", summary.frames, v),
            None => log::debug!("frame {}: passed through ({} bytes)", summary.frames, frame.data.len()),
        }
        sink.append(frame.ts_sec, frame.ts_usec, &data)
            .context(Stage::WriteFrame)?;
        summary.record(variant);
    }
    log::info!(
        "{} frames: {} sll, {} sll2, {} unchanged",
        summary.frames, summary.translated_v1, summary.translated_v2, summary.passed_through
    );
    Ok(summary)
}

/// Converts the capture at `input` into an Ethernet capture at `output`.
pub fn convert(input: &Path, output: &Path, config: &Config) -> Result<Summary> {
    let translator = Translator::new(&config.ethernet)?;

    let file = File::open(input)
        .with_context(|| format!("open {}", input.display()))
        .context(Stage::OpenInput)?;
    let source = FrameSource::new(BufReader::new(file)).context(Stage::OpenInput)?;

    let file = File::create(output)
        .with_context(|| format!("create {}", output.display()))
        .context(Stage::CreateOutput)?;
    let header = OutputHeader {
        snaplen: config.snaplen,
        nanosecond: source.is_nanosecond(),
        ..OutputHeader::default()
    };
    let mut sink = FrameSink::new(BufWriter::new(file), header).context(Stage::WriteHeader)?;

    let summary = run(source, &mut sink, &translator)?;
    sink.finish().context(Stage::WriteFrame)?;
    Ok(summary)
}
