use anyhow::Result;
use env_logger::Env;
use sll2eth::config::{Config, Opt};
use structopt::StructOpt;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("sll2eth=info")).init();
    let opt = Opt::from_args();

    let config = match &opt.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let summary = sll2eth::convert(&opt.input, &opt.output, &config)?;
    println!(
        "PCAP processing complete. {} packets saved to {}.",
        summary.frames,
        opt.output.display()
    );
    Ok(())
}
