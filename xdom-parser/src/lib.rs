//! Wiki documents as events and trees.
//!
//! Text is read by a [`Syntax`] into a stream of [`Event`]s, assembled by an
//! [`XdomBuilder`] into an [`Xdom`], then walked back into events by
//! [`Xdom::traverse`]. [`MacroTransformation`] executes the macro calls of a
//! built tree, including other documents along the way.
use std::path::Path;

use tracing::instrument;

mod builder;
mod chain;
mod error;
mod listener;
mod model;
mod options;
mod syntax;
mod transformation;

pub use builder::{XdomBuilder, build};
pub use chain::{
    BlockState, ChainState, ChainingListener, LOOKAHEAD_DEPTH, LineState, ListenerChain,
    NewLineState,
};
pub use error::Error;
pub use listener::{Boundary, ContainerKind, Event, Listener};
pub use model::{
    AttachmentReference, Block, BlockTree, DocumentReference, FormatKind, HeaderLevel, ListKind,
    MacroCall, Node, NodeId, Parameters, ResourceKind, ResourceReference, Xdom,
};
pub use options::{GUEST_USER, Options, OptionsBuilder};
pub use syntax::{Syntax, parse_parameters, unescape};
pub use transformation::{
    AccessChecker, AllowAll, DEFAULT_PRIORITY, DocumentLoader, ERROR_CLASS, ExecutionContext,
    GetMacro, INCLUDE_MACRO, IncludeContext, IncludeMacro, LoadError, LoadedDocument, Macro,
    MacroExecutionError, MacroFailure, MacroInvocation, MacroOutput, MacroRegistry,
    MacroTransformation, MemoryLoader, SetMacro, absolutize_references,
};

/// Read `input` in the configured syntax and build its tree.
///
/// # Example
///
/// ```
/// use xdom_parser::{Block, Options, parse};
///
/// let xdom = parse("= Title =\n\nSome **bold** text.", &Options::default()).unwrap();
/// let first = xdom.children(xdom.root())[0];
/// assert!(matches!(xdom.block(first), Some(Block::Section { .. })));
/// ```
///
/// # Errors
///
/// When the reader produces an inconsistent event stream.
#[instrument(level = "debug", skip(input), fields(syntax = %options.syntax))]
pub fn parse(input: &str, options: &Options) -> Result<Xdom, Error> {
    let mut builder = XdomBuilder::new();
    options.syntax.read(input, &mut builder)?;
    let mut xdom = builder.into_xdom()?;
    xdom.set_source(options.source.clone());
    tracing::trace!(blocks = xdom.len(), "built document");
    Ok(xdom)
}

/// [`parse`] the contents of `file_path`.
///
/// # Errors
///
/// When the file cannot be read, or as [`parse`].
#[instrument(skip(file_path, options))]
pub fn parse_file<P: AsRef<Path>>(file_path: P, options: &Options) -> Result<Xdom, Error> {
    let input = std::fs::read_to_string(file_path)?;
    parse(&input, options)
}
