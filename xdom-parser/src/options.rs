use crate::{DocumentReference, IncludeContext, Syntax};

/// Viewer reported by access checks when no user is configured.
pub const GUEST_USER: &str = "XWiki.XWikiGuest";

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Options {
    pub syntax: Syntax,
    /// Where the parsed text lives; relative references resolve against it.
    pub source: Option<DocumentReference>,
    /// Include mode used when a call does not set `context`.
    pub default_include_context: IncludeContext,
    /// Deepest chain of nested includes before giving up, cycles aside.
    pub max_include_depth: usize,
    pub user: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            syntax: Syntax::default(),
            source: None,
            default_include_context: IncludeContext::default(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            user: GUEST_USER.to_string(),
        }
    }
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use xdom_parser::{IncludeContext, Options, Syntax};
    ///
    /// let options = Options::builder()
    ///     .with_syntax(Syntax::Plain)
    ///     .with_default_include_context(IncludeContext::New)
    ///     .with_user("XWiki.Admin")
    ///     .build();
    /// assert_eq!(options.user, "XWiki.Admin");
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Equivalent to `Options::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builder for `Options`.
///
/// Create an `OptionsBuilder` using `Options::builder()`.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    #[must_use]
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.options.syntax = syntax;
        self
    }

    /// Set the reference of the document being parsed.
    ///
    /// # Example
    ///
    /// ```
    /// use xdom_parser::{DocumentReference, Options};
    ///
    /// let options = Options::builder()
    ///     .with_source(DocumentReference::new("xwiki", "Sandbox", "WebHome"))
    ///     .build();
    /// assert!(options.source.is_some());
    /// ```
    #[must_use]
    pub fn with_source(mut self, source: DocumentReference) -> Self {
        self.options.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_default_include_context(mut self, context: IncludeContext) -> Self {
        self.options.default_include_context = context;
        self
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.options.max_include_depth = depth;
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.options.user = user.into();
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::new();
        assert_eq!(options.syntax, Syntax::XWiki);
        assert_eq!(options.default_include_context, IncludeContext::Current);
        assert_eq!(options.max_include_depth, 32);
        assert_eq!(options.user, GUEST_USER);
        assert!(options.source.is_none());
    }

    #[test]
    fn builder_overrides() {
        let options = Options::builder()
            .with_max_include_depth(3)
            .with_syntax(Syntax::Plain)
            .build();
        assert_eq!(options.max_include_depth, 3);
        assert_eq!(options.syntax, Syntax::Plain);
    }
}
