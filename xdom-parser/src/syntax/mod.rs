//! Readers that turn markup text into events.
use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::{Error, Listener};

mod inline;
mod parameters;
mod plain;
mod scan;
mod xwiki;

pub use parameters::{parse_parameters, unescape};

/// Markup dialect identifier, written `name/version`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Syntax {
    #[default]
    #[serde(rename = "xwiki/2.0")]
    XWiki,
    #[serde(rename = "plain/1.0")]
    Plain,
}

impl Syntax {
    /// Emit the events of `input` into `listener`, from `beginDocument` to
    /// `endDocument`.
    ///
    /// # Errors
    ///
    /// Only errors raised by the listener; reading itself never fails.
    #[tracing::instrument(level = "trace", skip(input, listener))]
    pub fn read(self, input: &str, listener: &mut dyn Listener) -> Result<(), Error> {
        match self {
            Self::XWiki => xwiki::read(input, listener),
            Self::Plain => plain::read(input, listener),
        }
    }

    /// File extension used for documents in this syntax.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::XWiki => "xwiki",
            Self::Plain => "txt",
        }
    }
}

impl FromStr for Syntax {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xwiki/2.0" | "xwiki" => Ok(Self::XWiki),
            "plain/1.0" | "plain" => Ok(Self::Plain),
            _ => Err(Error::UnsupportedSyntax(s.to_string())),
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XWiki => write!(f, "xwiki/2.0"),
            Self::Plain => write!(f, "plain/1.0"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("xwiki/2.0", Syntax::XWiki)]
    #[case("XWiki", Syntax::XWiki)]
    #[case("plain/1.0", Syntax::Plain)]
    fn parses_identifiers(#[case] id: &str, #[case] expected: Syntax) {
        assert_eq!(id.parse::<Syntax>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_syntax() {
        assert!(matches!(
            "markdown/1.2".parse::<Syntax>(),
            Err(Error::UnsupportedSyntax(id)) if id == "markdown/1.2"
        ));
    }

    #[test]
    fn display_round_trips() {
        for syntax in [Syntax::XWiki, Syntax::Plain] {
            assert_eq!(syntax.to_string().parse::<Syntax>().unwrap(), syntax);
        }
    }
}
