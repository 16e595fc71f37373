use crate::{ContainerKind, NodeId};

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unexpected end of {found}: innermost open construct is {expected}")]
    UnexpectedEnd {
        expected: ContainerKind,
        found: ContainerKind,
    },

    #[error("end of {0} without a matching begin")]
    StackUnderflow(ContainerKind),

    #[error("event stream ended with {0} still open")]
    UnclosedConstruct(ContainerKind),

    #[error("event stream did not produce a document root")]
    EmptyDocument,

    #[error("invalid header level: {0}")]
    InvalidHeaderLevel(u8),

    #[error("unsupported syntax: {0}")]
    UnsupportedSyntax(String),

    #[error("invalid document reference: {0:?}")]
    InvalidReference(String),

    #[error("no node {0} in this document")]
    UnknownNode(NodeId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error comes from an unbalanced event stream.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedEnd { .. }
                | Self::StackUnderflow(_)
                | Self::UnclosedConstruct(_)
                | Self::EmptyDocument
        )
    }

    /// Get advice for this error if available.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::UnexpectedEnd { .. } | Self::StackUnderflow(_) | Self::UnclosedConstruct(_) => {
                Some(
                    "Every begin event must be closed by the matching end event before its enclosing construct is closed",
                )
            }
            Self::EmptyDocument => {
                Some("Event streams must start with beginDocument and finish with endDocument")
            }
            Self::InvalidHeaderLevel(_) => Some("Header levels go from 1 (=) to 6 (======)"),
            Self::UnsupportedSyntax(_) => Some("Supported syntaxes are: xwiki/2.0, plain/1.0"),
            Self::InvalidReference(_) => {
                Some("Document references are written wiki:Space.Page, Space.Page or Page")
            }
            Self::UnknownNode(_) | Self::Io(_) => None,
        }
    }
}
