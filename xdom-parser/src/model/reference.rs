use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::Error;

/// What a link or image points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Document,
    Attachment,
    Url,
    Mailto,
}

impl ResourceKind {
    /// Prefix used when the reference is written in its typed form (`doc:Page`).
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Document => "doc",
            Self::Attachment => "attach",
            Self::Url => "url",
            Self::Mailto => "mailto",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "doc" => Some(Self::Document),
            "attach" => Some(Self::Attachment),
            "url" => Some(Self::Url),
            "mailto" => Some(Self::Mailto),
            _ => None,
        }
    }
}

/// The target of a link or image as written in markup.
///
/// `typed` records whether the source spelled the kind out (`doc:Page`) so
/// the reference prints back the way it was read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceReference {
    pub kind: ResourceKind,
    pub reference: String,
    pub typed: bool,
}

impl ResourceReference {
    #[must_use]
    pub fn new(kind: ResourceKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
            typed: false,
        }
    }

    #[must_use]
    pub fn typed(kind: ResourceKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
            typed: true,
        }
    }

    /// Read a link reference: typed prefixes win, absolute URLs are URLs,
    /// everything else names a document.
    #[must_use]
    pub fn parse_link(text: &str) -> Self {
        let typed = text
            .split_once(':')
            .and_then(|(prefix, rest)| ResourceKind::from_prefix(prefix).map(|kind| (kind, rest)));
        if let Some((kind, rest)) = typed {
            return Self::typed(kind, rest);
        }
        if is_absolute_url(text) {
            return Self::new(ResourceKind::Url, text);
        }
        Self::new(ResourceKind::Document, text)
    }

    /// Read an image reference (the part after `image:`): an absolute URL or
    /// an attachment.
    #[must_use]
    pub fn parse_image(text: &str) -> Self {
        if is_absolute_url(text) {
            Self::new(ResourceKind::Url, text)
        } else {
            Self::new(ResourceKind::Attachment, text)
        }
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.typed {
            write!(f, "{}:{}", self.kind.prefix(), self.reference)
        } else {
            write!(f, "{}", self.reference)
        }
    }
}

fn is_absolute_url(text: &str) -> bool {
    text.contains("://") && url::Url::parse(text).is_ok()
}

const DEFAULT_WIKI: &str = "xwiki";
const DEFAULT_SPACE: &str = "Main";
const DEFAULT_PAGE: &str = "WebHome";

/// Absolute document location, written `wiki:Space.Page`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentReference {
    wiki: String,
    space: String,
    page: String,
}

impl Default for DocumentReference {
    fn default() -> Self {
        Self::new(DEFAULT_WIKI, DEFAULT_SPACE, DEFAULT_PAGE)
    }
}

impl DocumentReference {
    #[must_use]
    pub fn new(wiki: impl Into<String>, space: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            wiki: wiki.into(),
            space: space.into(),
            page: page.into(),
        }
    }

    #[must_use]
    pub fn wiki(&self) -> &str {
        &self.wiki
    }

    #[must_use]
    pub fn space(&self) -> &str {
        &self.space
    }

    #[must_use]
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Resolve a possibly partial reference (`Page`, `Space.Page`,
    /// `wiki:Space.Page`) by filling the missing parts from `base`.
    ///
    /// Nested spaces are kept together: in `A.B.Page` the space is `A.B`.
    #[must_use]
    pub fn resolve(text: &str, base: &DocumentReference) -> Self {
        let text = text.trim();
        let (wiki, rest) = match text.split_once(':') {
            Some((wiki, rest)) if !wiki.is_empty() => (Some(wiki), rest),
            Some(_) | None => (None, text),
        };
        let (space, page) = match rest.rsplit_once('.') {
            Some((space, page)) if !space.is_empty() => (Some(space), page),
            Some(_) | None => (None, rest),
        };
        Self {
            wiki: wiki.unwrap_or(&base.wiki).to_string(),
            space: space.unwrap_or(&base.space).to_string(),
            page: if page.is_empty() {
                base.page.clone()
            } else {
                page.to_string()
            },
        }
    }
}

impl FromStr for DocumentReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(Error::InvalidReference(s.to_string()));
        }
        Ok(Self::resolve(s, &Self::default()))
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.wiki, self.space, self.page)
    }
}

/// A file attached to a document, written `wiki:Space.Page@file`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AttachmentReference {
    document: DocumentReference,
    name: String,
}

impl AttachmentReference {
    #[must_use]
    pub fn document(&self) -> &DocumentReference {
        &self.document
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve `file`, `Page@file` or `wiki:Space.Page@file` against the
    /// document that holds the reference.
    #[must_use]
    pub fn resolve(text: &str, base: &DocumentReference) -> Self {
        match text.rsplit_once('@') {
            Some((document, name)) => Self {
                document: if document.trim().is_empty() {
                    base.clone()
                } else {
                    DocumentReference::resolve(document, base)
                },
                name: name.to_string(),
            },
            None => Self {
                document: base.clone(),
                name: text.to_string(),
            },
        }
    }
}

impl fmt::Display for AttachmentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.document, self.name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Page2", "xwiki:Other.Page2")]
    #[case("Space.Page", "xwiki:Space.Page")]
    #[case("dev:Space.Page", "dev:Space.Page")]
    #[case("A.B.Page", "xwiki:A.B.Page")]
    #[case("", "xwiki:Other.Inc")]
    fn resolves_against_base(#[case] text: &str, #[case] expected: &str) {
        let base = DocumentReference::new("xwiki", "Other", "Inc");
        assert_eq!(DocumentReference::resolve(text, &base).to_string(), expected);
    }

    #[rstest]
    #[case("pic.png", "xwiki:Other.Inc@pic.png")]
    #[case("Page@pic.png", "xwiki:Other.Page@pic.png")]
    #[case("wiki:S.P@a.txt", "wiki:S.P@a.txt")]
    fn resolves_attachments(#[case] text: &str, #[case] expected: &str) {
        let base = DocumentReference::new("xwiki", "Other", "Inc");
        assert_eq!(AttachmentReference::resolve(text, &base).to_string(), expected);
    }

    #[rstest]
    #[case("doc:Space.Page", ResourceKind::Document, "Space.Page", true)]
    #[case("attach:file.txt", ResourceKind::Attachment, "file.txt", true)]
    #[case("mailto:john@example.com", ResourceKind::Mailto, "john@example.com", true)]
    #[case("https://example.com/a", ResourceKind::Url, "https://example.com/a", false)]
    #[case("wiki:Space.Page", ResourceKind::Document, "wiki:Space.Page", false)]
    #[case("Page", ResourceKind::Document, "Page", false)]
    fn parses_link_references(
        #[case] text: &str,
        #[case] kind: ResourceKind,
        #[case] reference: &str,
        #[case] typed: bool,
    ) {
        let parsed = ResourceReference::parse_link(text);
        assert_eq!(parsed.kind, kind);
        assert_eq!(parsed.reference, reference);
        assert_eq!(parsed.typed, typed);
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn image_references_default_to_attachments() {
        assert_eq!(
            ResourceReference::parse_image("logo.png").kind,
            ResourceKind::Attachment
        );
        assert_eq!(
            ResourceReference::parse_image("http://example.com/logo.png").kind,
            ResourceKind::Url
        );
    }

    #[test]
    fn blank_document_reference_is_rejected() {
        assert!("  ".parse::<DocumentReference>().is_err());
    }
}
