use std::{io, path::PathBuf};

use clap::Args as ClapArgs;
use xdom_converters_core::{Converter, EventsConverter, Options};

use super::Reading;
use crate::error::Report;

/// Print the event stream of a document, one event per line
#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Input file
    pub file: PathBuf,

    #[command(flatten)]
    pub reading: Reading,
}

pub fn run(args: &Args) -> miette::Result<()> {
    let xdom = args.reading.document_file(&args.file, false)?;
    let converter = EventsConverter::new(Options::default());
    converter
        .write_to(&xdom, io::stdout().lock())
        .map_err(|error| Report::new(format!("printing {}", args.file.display()), &error).into())
}
