use std::{
    io::{self, Write},
    path::PathBuf,
    time::Instant,
};

use clap::Args as ClapArgs;
use rayon::prelude::*;
use xdom_converters_core::{Backend, Converter, EventsConverter, Options, PrettyDuration};
use xdom_parser::Xdom;

use super::Reading;
use crate::error::Report;

/// Convert wiki documents, printing the results in input order
#[derive(ClapArgs, Debug)]
pub struct Args {
    /// List of files to convert
    #[arg(conflicts_with = "stdin")]
    pub files: Vec<PathBuf>,

    /// Input from stdin
    #[arg(long, conflicts_with = "files")]
    pub stdin: bool,

    /// Output format: xwiki/2.0 or event/1.0
    #[arg(long, value_parser = clap::value_parser!(Backend), default_value = "xwiki")]
    pub backend: Backend,

    /// Print what executed macros produced instead of their calls
    #[arg(long)]
    pub expand: bool,

    /// Show timing information
    #[arg(long)]
    pub timings: bool,

    #[command(flatten)]
    pub reading: Reading,
}

pub fn run(args: &Args) -> miette::Result<()> {
    let options = Options::builder()
        .expand_macros(args.expand)
        .timings(args.timings)
        .build();

    match args.backend {
        Backend::XWiki => run_converter(&xdom_converters_xwiki::Processor::new(options), args),
        Backend::Events => run_converter(&EventsConverter::new(options), args),
    }
}

#[tracing::instrument(skip_all, fields(backend = %converter.backend()))]
fn run_converter<C>(converter: &C, args: &Args) -> miette::Result<()>
where
    C: Converter + Sync,
    C::Error: 'static,
{
    if args.stdin {
        let xdom = args.reading.document_stdin(args.timings)?;
        let output = render(converter, &xdom, "standard input")?;
        return write_output(&output);
    }
    if args.files.is_empty() {
        return Err(miette::miette!(
            "You must pass at least one file, or --stdin, to convert"
        ));
    }

    // Each file is read, transformed and rendered on its own; only printing
    // waits for the input order.
    let results: Vec<(PathBuf, Result<String, Report>)> = args
        .files
        .par_iter()
        .map(|file| {
            let result = args
                .reading
                .document_file(file, args.timings)
                .and_then(|xdom| render(converter, &xdom, &file.display().to_string()));
            (file.clone(), result)
        })
        .collect();

    let mut failed = 0;
    for (file, result) in results {
        match result {
            Ok(output) => write_output(&output)?,
            Err(report) => {
                failed += 1;
                eprintln!("\n{failed}. File: {}", file.display());
                eprintln!("{:?}", miette::Report::new(report));
            }
        }
    }
    if failed > 0 {
        return Err(miette::miette!("Failed to process {failed} file(s)"));
    }
    Ok(())
}

fn render<C>(converter: &C, xdom: &Xdom, name: &str) -> Result<String, Report>
where
    C: Converter,
    C::Error: 'static,
{
    let started = Instant::now();
    let output = converter
        .convert_to_string(xdom)
        .map_err(|error| Report::new(format!("converting {name}"), &error))?;
    if converter.options().timings() {
        eprintln!("  Converted {name} in {}", started.elapsed().pretty_print());
    }
    Ok(output)
}

fn write_output(output: &str) -> miette::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")
        .and_then(|()| stdout.flush())
        .map_err(|error| Report::new("writing output", &error).into())
}
