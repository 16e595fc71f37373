//! The `event/1.0` backend: a tree replayed as one event per line.
use std::io::Write;

use xdom_parser::Xdom;

use crate::{Backend, Converter, Error, Options};

#[derive(Clone, Debug)]
pub struct EventsConverter {
    options: Options,
}

impl Converter for EventsConverter {
    type Error = Error;

    fn new(options: Options) -> Self {
        Self { options }
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn backend(&self) -> Backend {
        Backend::Events
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn write_to<W: Write>(&self, xdom: &Xdom, mut writer: W) -> Result<(), Self::Error> {
        for event in xdom.events() {
            writeln!(writer, "{event}")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use pretty_assertions::assert_eq;
    use xdom_parser::parse;

    use super::*;

    #[test]
    fn one_line_per_event() {
        let xdom = parse("**a**", &xdom_parser::Options::default()).unwrap();
        let output = EventsConverter::new(Options::default())
            .convert_to_string(&xdom)
            .unwrap();
        assert_eq!(
            output,
            "beginDocument\nbeginParagraph\nbeginFormat [BOLD]\nonWord [a]\nendFormat [BOLD]\nendParagraph\nendDocument\n"
        );
    }
}
