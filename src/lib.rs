pub use anyhow::Result;
pub use pipeline::{convert, run, Stage, Summary};
pub use translate::{CookedVariant, Translator};

pub mod config;
pub mod pipeline;
pub mod translate;
pub mod utils;
