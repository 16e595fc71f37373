use std::fmt;

use serde::Serialize;

use crate::{Error, Parameters, ResourceReference};

/// Section depth, `=` through `======`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub struct HeaderLevel(u8);

impl HeaderLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeaderLevel {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(Error::InvalidHeaderLevel(level))
        }
    }
}

impl From<HeaderLevel> for u8 {
    fn from(level: HeaderLevel) -> Self {
        level.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bulleted,
    Numbered,
}

impl ListKind {
    /// The character repeated per nesting level in an item marker.
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Bulleted => '*',
            Self::Numbered => '1',
        }
    }
}

/// Inline style spans, each written between a pair of two-character
/// delimiters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Superscript,
    Subscript,
    Monospace,
}

impl FormatKind {
    pub const ALL: [FormatKind; 7] = [
        Self::Bold,
        Self::Italic,
        Self::Underline,
        Self::Strikethrough,
        Self::Superscript,
        Self::Subscript,
        Self::Monospace,
    ];

    #[must_use]
    pub fn delimiter(self) -> &'static str {
        match self {
            Self::Bold => "**",
            Self::Italic => "//",
            Self::Underline => "__",
            Self::Strikethrough => "--",
            Self::Superscript => "^^",
            Self::Subscript => ",,",
            Self::Monospace => "##",
        }
    }

    /// The kind whose delimiter starts `text`, if any.
    #[must_use]
    pub fn from_prefix(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| text.starts_with(kind.delimiter()))
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bold => "BOLD",
            Self::Italic => "ITALIC",
            Self::Underline => "UNDERLINE",
            Self::Strikethrough => "STRIKEDOUT",
            Self::Superscript => "SUPERSCRIPT",
            Self::Subscript => "SUBSCRIPT",
            Self::Monospace => "MONOSPACE",
        };
        write!(f, "{name}")
    }
}

/// A macro call as written in markup: `{{name key="value"}}content{{/name}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MacroCall {
    pub name: String,
    pub parameters: Parameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl MacroCall {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// What a node in an [`Xdom`](crate::Xdom) is.
///
/// Children live in the arena, so every variant is the node's own payload
/// only. Containers are the variants that can own children; the rest are
/// leaves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
#[non_exhaustive]
pub enum Block {
    Document,
    /// A document embedded inside another one, `(((` ... `)))`.
    Group {
        parameters: Parameters,
    },
    Paragraph {
        parameters: Parameters,
    },
    Section {
        level: HeaderLevel,
        parameters: Parameters,
    },
    List {
        kind: ListKind,
        parameters: Parameters,
    },
    ListItem,
    Format {
        kind: FormatKind,
    },
    /// The label is the node's children; an empty label means the link
    /// prints its reference.
    Link {
        reference: ResourceReference,
        free_standing: bool,
        parameters: Parameters,
    },
    Image {
        reference: ResourceReference,
        free_standing: bool,
        parameters: Parameters,
    },
    /// A macro call. Once executed, the produced blocks are its children.
    Macro {
        call: MacroCall,
        inline: bool,
        executed: bool,
    },
    Table {
        parameters: Parameters,
    },
    TableRow {
        parameters: Parameters,
    },
    TableCell {
        header: bool,
        parameters: Parameters,
    },
    Quotation {
        parameters: Parameters,
    },
    QuotationLine,
    HorizontalLine {
        parameters: Parameters,
    },
    Verbatim {
        content: String,
        inline: bool,
        parameters: Parameters,
    },
    EmptyLines(usize),
    Word(String),
    Space,
    SpecialSymbol(char),
    Escape(String),
    NewLine,
    LineBreak,
}

impl Block {
    #[must_use]
    pub fn word(text: impl Into<String>) -> Self {
        Self::Word(text.into())
    }

    #[must_use]
    pub fn paragraph() -> Self {
        Self::Paragraph {
            parameters: Parameters::new(),
        }
    }

    #[must_use]
    pub fn group(parameters: Parameters) -> Self {
        Self::Group { parameters }
    }

    #[must_use]
    pub fn format(kind: FormatKind) -> Self {
        Self::Format { kind }
    }

    /// Whether the block sits inside a line of text rather than on its own.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        match self {
            Self::Format { .. }
            | Self::Link { .. }
            | Self::Image { .. }
            | Self::Word(_)
            | Self::Space
            | Self::SpecialSymbol(_)
            | Self::Escape(_)
            | Self::NewLine
            | Self::LineBreak => true,
            Self::Macro { inline, .. } | Self::Verbatim { inline, .. } => *inline,
            Self::Document
            | Self::Group { .. }
            | Self::Paragraph { .. }
            | Self::Section { .. }
            | Self::List { .. }
            | Self::ListItem
            | Self::Table { .. }
            | Self::TableRow { .. }
            | Self::TableCell { .. }
            | Self::Quotation { .. }
            | Self::QuotationLine
            | Self::HorizontalLine { .. }
            | Self::EmptyLines(_) => false,
        }
    }

    /// Parameters attached to the block, when the variant carries any.
    #[must_use]
    pub fn parameters(&self) -> Option<&Parameters> {
        match self {
            Self::Group { parameters }
            | Self::Paragraph { parameters }
            | Self::Section { parameters, .. }
            | Self::List { parameters, .. }
            | Self::Link { parameters, .. }
            | Self::Image { parameters, .. }
            | Self::Table { parameters }
            | Self::TableRow { parameters }
            | Self::TableCell { parameters, .. }
            | Self::Quotation { parameters }
            | Self::HorizontalLine { parameters }
            | Self::Verbatim { parameters, .. } => Some(parameters),
            Self::Macro { call, .. } => Some(&call.parameters),
            Self::Document
            | Self::ListItem
            | Self::Format { .. }
            | Self::QuotationLine
            | Self::EmptyLines(_)
            | Self::Word(_)
            | Self::Space
            | Self::SpecialSymbol(_)
            | Self::Escape(_)
            | Self::NewLine
            | Self::LineBreak => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(6, true)]
    #[case(7, false)]
    fn header_level_range(#[case] level: u8, #[case] valid: bool) {
        assert_eq!(HeaderLevel::try_from(level).is_ok(), valid);
    }

    #[test]
    fn format_prefix_lookup() {
        assert_eq!(FormatKind::from_prefix("**bold"), Some(FormatKind::Bold));
        assert_eq!(FormatKind::from_prefix("^^up"), Some(FormatKind::Superscript));
        assert_eq!(FormatKind::from_prefix("*x"), None);
    }

    #[test]
    fn header_level_serializes_as_number() {
        let level = HeaderLevel::try_from(3).unwrap();
        assert_eq!(serde_json::to_string(&level).unwrap(), "3");
    }
}
