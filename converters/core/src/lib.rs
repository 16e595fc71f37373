//! What every xdom output backend shares.
//!
//! A converter takes a finished [`Xdom`] (parsed, macros already run) and
//! writes it out in one [`Backend`] format. [`Options`] carry the few knobs
//! that are not specific to a format.
//!
//! ```
//! use xdom_converters_core::{Converter, EventsConverter, Options};
//!
//! let converter = EventsConverter::new(Options::builder().expand_macros(true).build());
//! assert!(converter.options().expand_macros());
//! ```
use std::{io::Write, time::Duration};

use xdom_parser::Xdom;

mod backend;
mod error;
mod events;

pub use backend::Backend;
pub use error::Error;
pub use events::EventsConverter;

/// Settings shared by all converters; see [`Options::builder`].
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct Options {
    expand_macros: bool,
    timings: bool,
}

impl Options {
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Whether executed macros are written as what they produced rather
    /// than as the call that produced it.
    #[must_use]
    pub fn expand_macros(&self) -> bool {
        self.expand_macros
    }

    /// Whether the caller wants conversion times reported.
    #[must_use]
    pub fn timings(&self) -> bool {
        self.timings
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    #[must_use]
    pub fn expand_macros(mut self, expand: bool) -> Self {
        self.options.expand_macros = expand;
        self
    }

    #[must_use]
    pub fn timings(mut self, timings: bool) -> Self {
        self.options.timings = timings;
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        self.options
    }
}

/// Short human form of a [`Duration`]: `850ns`, `1.5µs`, `12ms`, `2.25s`.
pub trait PrettyDuration {
    fn pretty_print(&self) -> String;
}

impl PrettyDuration for Duration {
    fn pretty_print(&self) -> String {
        const UNITS: [(u128, &str); 3] = [
            (1_000_000_000, "s"),
            (1_000_000, "ms"),
            (1_000, "µs"),
        ];
        let nanos = self.as_nanos();
        let Some((scale, unit)) = UNITS.into_iter().find(|(scale, _)| nanos >= *scale) else {
            return format!("{nanos}ns");
        };
        // Hundredths of the unit, rounded half up.
        let hundredths = (nanos * 100 + scale / 2) / scale;
        let whole = hundredths / 100;
        match hundredths % 100 {
            0 => format!("{whole}{unit}"),
            fraction if fraction % 10 == 0 => format!("{whole}.{}{unit}", fraction / 10),
            fraction => format!("{whole}.{fraction:02}{unit}"),
        }
    }
}

/// A document output format.
///
/// Converters receive trees whose macros have already run; they decide
/// only how the tree is spelled.
pub trait Converter: Sized {
    type Error: std::error::Error + From<std::io::Error> + From<std::string::FromUtf8Error>;

    fn new(options: Options) -> Self;

    fn options(&self) -> &Options;

    fn backend(&self) -> Backend;

    /// Write `xdom` to `writer` in this converter's format.
    ///
    /// # Errors
    ///
    /// When the tree cannot be replayed or `writer` fails.
    fn write_to<W: Write>(&self, xdom: &Xdom, writer: W) -> Result<(), Self::Error>;

    /// [`Converter::write_to`] into a `String`.
    ///
    /// # Errors
    ///
    /// As [`Converter::write_to`], or when the output is not UTF-8.
    fn convert_to_string(&self, xdom: &Xdom) -> Result<String, Self::Error> {
        let mut output = Vec::new();
        self.write_to(xdom, &mut output)?;
        String::from_utf8(output).map_err(Self::Error::from)
    }
}

/// The first [`xdom_parser::Error`] in `error` or its chain of sources, so
/// callers can show its [`advice`](xdom_parser::Error::advice).
#[must_use]
pub fn find_parser_error<'e>(
    error: &'e (dyn std::error::Error + 'static),
) -> Option<&'e xdom_parser::Error> {
    std::iter::successors(Some(error), |current| current.source())
        .find_map(|current| current.downcast_ref::<xdom_parser::Error>())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Duration::from_nanos(999), "999ns")]
    #[case(Duration::from_micros(1), "1µs")]
    #[case(Duration::from_nanos(1_500), "1.5µs")]
    #[case(Duration::from_nanos(1_234_567), "1.23ms")]
    #[case(Duration::from_millis(12), "12ms")]
    #[case(Duration::from_millis(2_250), "2.25s")]
    fn pretty_durations(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(duration.pretty_print(), expected);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("include failed")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("parse failed")]
    struct Inner(#[source] xdom_parser::Error);

    #[test]
    fn finds_parser_error_down_the_chain() {
        let error = Outer(Inner(xdom_parser::Error::EmptyDocument));
        assert!(matches!(
            find_parser_error(&error),
            Some(xdom_parser::Error::EmptyDocument)
        ));
        assert!(find_parser_error(&std::io::Error::other("disk")).is_none());
    }

    #[test]
    fn defaults_keep_macro_calls() {
        let options = Options::default();
        assert!(!options.expand_macros());
        assert!(!options.timings());
    }
}
