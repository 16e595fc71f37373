use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use clap::Args as ClapArgs;
use xdom_converters_core::PrettyDuration;
use xdom_parser::{
    AllowAll, DocumentReference, ExecutionContext, GUEST_USER, IncludeContext, MacroRegistry,
    MacroTransformation, Syntax, Xdom,
};

use crate::{
    error::Report,
    loader::{FilesystemLoader, syntax_of},
};

pub mod convert;
pub mod events;
pub mod inspect;

/// How documents are read and which macros run on them
#[derive(ClapArgs, Debug, Clone)]
pub struct Reading {
    /// Directory holding the wiki: `Space.Page` is `<root>/Space/Page.xwiki`
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Syntax of the input; guessed from the file extension when omitted
    #[arg(long, value_parser = clap::value_parser!(Syntax))]
    pub syntax: Option<Syntax>,

    /// Leave macro calls unexecuted
    #[arg(long)]
    pub no_macros: bool,

    /// User the include macro checks view rights for
    #[arg(long, default_value = GUEST_USER)]
    pub user: String,

    /// Include context used when a call does not set one (current or new)
    #[arg(long, value_parser = clap::value_parser!(IncludeContext), default_value = "current")]
    pub context: IncludeContext,

    /// Deepest chain of nested includes
    #[arg(long, default_value_t = 32)]
    pub max_include_depth: usize,
}

impl Reading {
    fn loader(&self) -> FilesystemLoader {
        FilesystemLoader::new(&self.root)
    }

    fn parser_options(&self, source: DocumentReference, syntax: Syntax) -> xdom_parser::Options {
        xdom_parser::Options::builder()
            .with_syntax(syntax)
            .with_source(source)
            .with_default_include_context(self.context)
            .with_max_include_depth(self.max_include_depth)
            .with_user(self.user.clone())
            .build()
    }

    /// Parse `input` as the document stored at `path` (or a stdin page) and
    /// run its macros.
    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn document(&self, path: Option<&Path>, input: &str, timings: bool) -> Result<Xdom, Report> {
        let loader = self.loader();
        let (source, guessed) = path.map_or_else(
            || (DocumentReference::new("xwiki", "Main", "Stdin"), Syntax::XWiki),
            |path| (loader.reference_for(path), syntax_of(path)),
        );
        let options = self.parser_options(source.clone(), self.syntax.unwrap_or(guessed));

        let started = Instant::now();
        let mut xdom =
            xdom_parser::parse(input, &options).map_err(|error| Report::new(&source, &error))?;
        if timings {
            eprintln!("  Parsed {source} in {}", started.elapsed().pretty_print());
        }
        if self.no_macros {
            return Ok(xdom);
        }

        let started = Instant::now();
        let registry = MacroRegistry::standard(Arc::new(loader), Arc::new(AllowAll));
        let failures = MacroTransformation::new(registry, options)
            .transform(&mut xdom, &mut ExecutionContext::new(self.user.clone()))
            .map_err(|error| Report::new(&source, &error))?;
        if timings {
            eprintln!("  Ran macros of {source} in {}", started.elapsed().pretty_print());
        }
        if !failures.is_empty() {
            tracing::info!(%source, failures = failures.len(), "some macros failed");
        }
        Ok(xdom)
    }

    /// Read and prepare the document in `path`.
    pub fn document_file(&self, path: &Path, timings: bool) -> Result<Xdom, Report> {
        let input = std::fs::read_to_string(path)
            .map_err(|error| Report::new(format!("reading {}", path.display()), &error))?;
        self.document(Some(path), &input, timings)
    }

    /// Read and prepare the document given on standard input.
    pub fn document_stdin(&self, timings: bool) -> Result<Xdom, Report> {
        let mut input = String::new();
        io::stdin()
            .lock()
            .read_to_string(&mut input)
            .map_err(|error| Report::new("reading standard input", &error))?;
        self.document(None, &input, timings)
    }
}
