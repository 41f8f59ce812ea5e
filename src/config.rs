use crate::utils::ethernet::EthernetHeader;
use crate::utils::pcap_writer::DEFAULT_SNAPLEN;
use anyhow::{Context, Result};
use serde_derive::Deserialize;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(about = "Convert a linux cooked capture (SLL/SLL2) pcap to an Ethernet pcap")]
pub struct Opt {
    /// Config file
    #[structopt(short, long, parse(from_os_str))]
    pub config: Option<PathBuf>,
    /// Input file
    #[structopt(parse(from_os_str))]
    pub input: PathBuf,
    /// Output file
    #[structopt(parse(from_os_str))]
    pub output: PathBuf,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// snaplen declared in the output header
    pub snaplen: u32,
    /// header put in front of every translated frame
    pub ethernet: EthernetHeader,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            snaplen: DEFAULT_SNAPLEN,
            ethernet: EthernetHeader::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = toml::from_slice(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }
}
