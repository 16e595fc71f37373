use std::{error::Error, fmt::Display};

use miette::Diagnostic;
use xdom_converters_core::find_parser_error;

/// A failure shown to the user, with the parser's advice when it has some.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("{message}")]
#[diagnostic()]
pub(crate) struct Report {
    message: String,

    #[help]
    advice: Option<String>,
}

impl Report {
    /// `context` followed by `error` and its chain of causes.
    pub(crate) fn new(context: impl Display, error: &(dyn Error + 'static)) -> Self {
        let mut message = format!("{context}: {error}");
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        let advice = find_parser_error(error)
            .and_then(xdom_parser::Error::advice)
            .map(str::to_string);
        Self { message, advice }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parser_errors_carry_advice() {
        let error = xdom_parser::Error::InvalidHeaderLevel(9);
        let report = Report::new("reading a.xwiki", &error);
        assert_eq!(report.message, "reading a.xwiki: invalid header level: 9");
        assert_eq!(
            report.advice.as_deref(),
            Some("Header levels go from 1 (=) to 6 (======)")
        );
    }

    #[test]
    fn causes_are_chained() {
        let error = xdom_converters_xwiki::Error::Io(std::io::Error::other("disk full"));
        let report = Report::new("writing", &error);
        assert!(report.message.starts_with("writing: "));
        assert!(report.message.contains("disk full"));
        assert_eq!(report.advice, None);
    }
}
