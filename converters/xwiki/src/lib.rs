//! `xwiki/2.0` renderer for xdom trees.
//!
//! The renderer is a [`ListenerChain`] stage: the chain replays the tree as
//! events, keeps track of the open constructs and looks one event ahead, and
//! the [`SyntaxRenderer`] prints markup from that.
//!
//! Reading the printed markup back gives the same tree for everything the
//! `xwiki/2.0` reader produces. Text is escaped with `~` wherever it would
//! otherwise read as markup.
//!
//! # Example
//!
//! ```
//! use xdom_converters_core::{Converter, Options};
//! use xdom_converters_xwiki::Processor;
//!
//! let xdom = xdom_parser::parse("**bold** text", &xdom_parser::Options::default()).unwrap();
//! let processor = Processor::new(Options::default());
//! assert_eq!(processor.convert_to_string(&xdom).unwrap(), "**bold** text");
//! ```
//!
//! # Limitations
//!
//! Trees built by hand can hold shapes the syntax has no spelling for. They
//! are printed as closely as the syntax allows:
//! - Blocks nested in list items, cells or quotation lines continue the line
//!   of their container, and their parameters are dropped.
//! - Links nested in a link label print their label (or reference) only.
//! - New lines inside cells, headers and quotation lines, and new lines that
//!   would leave a blank line, print as line breaks.
//! - Verbatim content holding `}}}` cannot be delimited.
use std::io::Write;

use xdom_converters_core::{Backend, Converter, Options};
use xdom_parser::{ListenerChain, Xdom};

mod error;
pub mod escape;
mod macro_printer;
mod renderer;

pub use error::Error;
pub use macro_printer::MacroPrinter;
pub use renderer::SyntaxRenderer;

/// `xwiki/2.0` converter processor.
#[derive(Clone, Debug)]
pub struct Processor {
    options: Options,
}

impl Processor {
    /// Render `xdom` to a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parser`] when the tree replays as a badly nested
    /// event stream.
    #[tracing::instrument(skip_all)]
    pub fn render(&self, xdom: &Xdom) -> Result<String, Error> {
        let mut renderer = SyntaxRenderer::new(self.options.expand_macros());
        let mut chain = ListenerChain::new();
        chain.add_listener(&mut renderer);
        xdom.traverse(&mut chain)?;
        chain.finish()?;
        drop(chain);
        Ok(renderer.into_output())
    }
}

impl Converter for Processor {
    type Error = Error;

    fn new(options: Options) -> Self {
        Self { options }
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn backend(&self) -> Backend {
        Backend::XWiki
    }

    fn write_to<W: Write>(&self, xdom: &Xdom, mut writer: W) -> Result<(), Self::Error> {
        let output = self.render(xdom)?;
        writer.write_all(output.as_bytes())?;
        Ok(())
    }
}
