use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
    Block, DocumentReference, MacroCall, NodeId, Syntax, Xdom, XdomBuilder,
    transformation::{Macro, MacroExecutionError, MacroInvocation, MacroOutput, rewrite},
};

pub const INCLUDE_MACRO: &str = "include";

/// Runs ahead of ordinary macros so included content takes part in the
/// rest of the pass.
const INCLUDE_PRIORITY: u32 = 10;

const DOCUMENT_PURPOSE: &str = "pointing to the entity to include";

pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Where the content of an included document is executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IncludeContext {
    /// Alongside the including document, sharing its variables.
    #[default]
    Current,
    /// In a context of its own, right away.
    New,
}

impl std::str::FromStr for IncludeContext {
    type Err = MacroExecutionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("current") {
            Ok(Self::Current)
        } else if value.eq_ignore_ascii_case("new") {
            Ok(Self::New)
        } else {
            Err(MacroExecutionError::InvalidParameter {
                parameter: "context",
                value: value.to_string(),
            })
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedDocument {
    pub content: String,
    pub syntax: Syntax,
}

impl LoadedDocument {
    #[must_use]
    pub fn new(content: impl Into<String>, syntax: Syntax) -> Self {
        Self {
            content: content.into(),
            syntax,
        }
    }
}

pub trait DocumentLoader: Send + Sync {
    /// Source of the document named by `reference`.
    ///
    /// # Errors
    ///
    /// When the document cannot be read, including when it does not exist.
    fn load(&self, reference: &DocumentReference) -> Result<LoadedDocument, LoadError>;
}

pub trait AccessChecker: Send + Sync {
    fn can_view(&self, user: &str, reference: &DocumentReference) -> bool;
}

/// Grants every user view rights on every document.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl AccessChecker for AllowAll {
    fn can_view(&self, _user: &str, _reference: &DocumentReference) -> bool {
        true
    }
}

#[derive(thiserror::Error, Debug)]
#[error("no such document")]
struct NotFound;

/// Documents held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    documents: FxHashMap<DocumentReference, LoadedDocument>,
}

impl MemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, reference: DocumentReference, document: LoadedDocument) -> Self {
        self.insert(reference, document);
        self
    }

    pub fn insert(&mut self, reference: DocumentReference, document: LoadedDocument) {
        self.documents.insert(reference, document);
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, reference: &DocumentReference) -> Result<LoadedDocument, LoadError> {
        self.documents
            .get(reference)
            .cloned()
            .ok_or_else(|| Box::new(NotFound) as LoadError)
    }
}

/// `{{include document="..." context="new|current"/}}`
pub struct IncludeMacro {
    loader: Arc<dyn DocumentLoader>,
    access: Arc<dyn AccessChecker>,
}

impl IncludeMacro {
    #[must_use]
    pub fn new(loader: Arc<dyn DocumentLoader>, access: Arc<dyn AccessChecker>) -> Self {
        Self { loader, access }
    }
}

fn document_parameter(call: &MacroCall) -> Option<&str> {
    call.parameters
        .get("document")
        .or_else(|| call.parameters.get("reference"))
}

/// Documents being included around `node`, outermost first, starting with
/// the document being transformed when it is known.
fn include_chain(xdom: &Xdom, node: NodeId) -> Vec<DocumentReference> {
    let mut chain: Vec<DocumentReference> = xdom.source().cloned().into_iter().collect();
    let enclosing: Vec<&MacroCall> = xdom
        .ancestors(node)
        .filter_map(|id| {
            if let Some(Block::Macro {
                call,
                executed: true,
                ..
            }) = xdom.block(id)
            {
                (call.name == INCLUDE_MACRO).then_some(call)
            } else {
                None
            }
        })
        .collect();
    for call in enclosing.iter().rev() {
        if let Some(document) = document_parameter(call) {
            let base = chain.last().cloned().unwrap_or_default();
            chain.push(DocumentReference::resolve(document, &base));
        }
    }
    chain
}

impl Macro for IncludeMacro {
    fn priority(&self) -> u32 {
        INCLUDE_PRIORITY
    }

    fn supports_inline(&self) -> bool {
        false
    }

    #[tracing::instrument(level = "debug", skip_all, fields(document))]
    fn execute(&self, invocation: &mut MacroInvocation<'_>) -> Result<MacroOutput, MacroExecutionError> {
        let document = document_parameter(invocation.call).ok_or(
            MacroExecutionError::MissingParameter {
                parameter: "document",
                purpose: DOCUMENT_PURPOSE,
            },
        )?;
        let context = match invocation.call.parameters.get("context") {
            Some(value) => value.parse()?,
            None => invocation.options.default_include_context,
        };

        let chain = include_chain(invocation.xdom, invocation.node);
        let base = chain.last().cloned().unwrap_or_default();
        let reference = DocumentReference::resolve(document, &base);
        tracing::Span::current().record("document", tracing::field::display(&reference));

        let user = invocation.context.user();
        if !self.access.can_view(user, &reference) {
            return Err(MacroExecutionError::AccessDenied {
                user: user.to_string(),
                reference,
            });
        }
        if chain.contains(&reference) {
            return Err(MacroExecutionError::RecursiveInclusion(reference));
        }
        let depth = chain.len().saturating_sub(usize::from(invocation.xdom.source().is_some()));
        if depth >= invocation.options.max_include_depth {
            return Err(MacroExecutionError::IncludeTooDeep { reference, depth });
        }

        let loaded = self
            .loader
            .load(&reference)
            .map_err(|source| MacroExecutionError::Load {
                reference: reference.clone(),
                source,
            })?;
        let mut builder = XdomBuilder::new();
        let mut content = loaded
            .syntax
            .read(&loaded.content, &mut builder)
            .and_then(|()| builder.into_xdom())
            .map_err(|source| MacroExecutionError::Parse {
                reference: reference.clone(),
                source,
            })?;
        rewrite::absolutize_references(&mut content, &reference);
        tracing::debug!(%reference, ?context, blocks = content.len(), "included document");

        Ok(match context {
            IncludeContext::Current => MacroOutput::new(content),
            IncludeContext::New => MacroOutput {
                content,
                transform_with: Some(invocation.context.isolated(&reference)),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("new", IncludeContext::New)]
    #[case("NEW", IncludeContext::New)]
    #[case("Current", IncludeContext::Current)]
    fn parses_context(#[case] value: &str, #[case] expected: IncludeContext) {
        assert_eq!(value.parse::<IncludeContext>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_context() {
        let error = "shared".parse::<IncludeContext>().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid value [shared] for parameter [context]"
        );
    }

    #[test]
    fn memory_loader_reports_missing_documents() {
        let reference = DocumentReference::new("xwiki", "Main", "Missing");
        let loader = MemoryLoader::new();
        assert_eq!(loader.load(&reference).unwrap_err().to_string(), "no such document");
    }
}
