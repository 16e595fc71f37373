//! Macro execution over a built [`Xdom`].
//!
//! Pending macro calls run one at a time, lowest priority first and in
//! document order among equals. Each call's output becomes the children of
//! its macro node, so macros produced by an earlier call (an include
//! bringing in content, for instance) join the same ordering.
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{Block, DocumentReference, Error, FormatKind, MacroCall, NodeId, Options, Parameters, Xdom};

mod include;
mod rewrite;
mod variables;

pub use include::{
    AccessChecker, AllowAll, DocumentLoader, INCLUDE_MACRO, IncludeContext, IncludeMacro, LoadError,
    LoadedDocument, MemoryLoader,
};
pub use rewrite::absolutize_references;
pub use variables::{GetMacro, SetMacro};

/// Priority of macros that do not ask for one.
pub const DEFAULT_PRIORITY: u32 = 1000;

/// Class of the group that replaces a failed standalone macro.
pub const ERROR_CLASS: &str = "xwikirenderingerror";

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum MacroExecutionError {
    #[error("You must specify a '{parameter}' parameter {purpose}.")]
    MissingParameter {
        parameter: &'static str,
        purpose: &'static str,
    },

    #[error("Invalid value [{value}] for parameter [{parameter}]")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
    },

    #[error("Current user [{user}] doesn't have view rights on document [{reference}]")]
    AccessDenied {
        user: String,
        reference: DocumentReference,
    },

    #[error("Found recursive inclusion of document [{0}]")]
    RecursiveInclusion(DocumentReference),

    #[error("Too many nested inclusions ({depth}) while including document [{reference}]")]
    IncludeTooDeep {
        reference: DocumentReference,
        depth: usize,
    },

    #[error("Failed to load document [{reference}]")]
    Load {
        reference: DocumentReference,
        #[source]
        source: LoadError,
    },

    #[error("Failed to parse document [{reference}]")]
    Parse {
        reference: DocumentReference,
        #[source]
        source: Error,
    },

    #[error(transparent)]
    Tree(#[from] Error),

    #[error("Unknown macro: {0}")]
    UnknownMacro(String),

    #[error("The [{0}] macro is a standalone macro and it cannot be used inline")]
    InlineNotSupported(String),
}

impl MacroExecutionError {
    /// The message followed by its chain of causes.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

/// State shared by the macros of one transformation pass.
///
/// Passed down explicitly; an include in the `new` context runs its content
/// against an [`ExecutionContext::isolated`] copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    id: String,
    user: String,
    variables: FxHashMap<String, String>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            id: "main".to_string(),
            user: user.into(),
            variables: FxHashMap::default(),
        }
    }

    /// Identity of the transformation this context belongs to.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// A copy for the content of `reference`, with its own identity. Changes
    /// to the copy never reach this context.
    #[must_use]
    pub fn isolated(&self, reference: &DocumentReference) -> Self {
        Self {
            id: format!("include:{reference}"),
            ..self.clone()
        }
    }
}

/// One macro call being executed.
pub struct MacroInvocation<'a> {
    pub call: &'a MacroCall,
    pub inline: bool,
    /// The call's node in `xdom`; its ancestors are the enclosing calls.
    pub node: NodeId,
    pub xdom: &'a Xdom,
    pub context: &'a mut ExecutionContext,
    pub options: &'a Options,
}

/// What a macro produced.
#[derive(Debug, Default)]
pub struct MacroOutput {
    /// Blocks to place under the macro node (the children of this root).
    pub content: Xdom,
    /// When set, the macros inside `content` are executed right away in
    /// this context instead of joining the surrounding pass.
    pub transform_with: Option<ExecutionContext>,
}

impl MacroOutput {
    #[must_use]
    pub fn new(content: Xdom) -> Self {
        Self {
            content,
            transform_with: None,
        }
    }
}

pub trait Macro: Send + Sync {
    /// Lower runs first.
    fn priority(&self) -> u32 {
        DEFAULT_PRIORITY
    }

    fn supports_inline(&self) -> bool {
        true
    }

    /// Run the call.
    ///
    /// # Errors
    ///
    /// Any failure is local to this call; the transformation replaces the
    /// call's output with an error message.
    fn execute(&self, invocation: &mut MacroInvocation<'_>) -> Result<MacroOutput, MacroExecutionError>;
}

/// Macros by name.
#[derive(Clone, Default)]
pub struct MacroRegistry {
    macros: FxHashMap<String, Arc<dyn Macro>>,
}

impl MacroRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `include`, `set` and `get`, with includes served by `loader` and
    /// checked by `access`.
    #[must_use]
    pub fn standard(loader: Arc<dyn DocumentLoader>, access: Arc<dyn AccessChecker>) -> Self {
        Self::new()
            .with(INCLUDE_MACRO, IncludeMacro::new(loader, access))
            .with(variables::SET_MACRO, SetMacro)
            .with(variables::GET_MACRO, GetMacro)
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, implementation: impl Macro + 'static) -> Self {
        self.register(name, Arc::new(implementation));
        self
    }

    pub fn register(&mut self, name: impl Into<String>, implementation: Arc<dyn Macro>) {
        self.macros.insert(name.into(), implementation);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Macro>> {
        self.macros.get(name)
    }

    /// Names of the registered macros, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.macros.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// A call that failed and was replaced by an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroFailure {
    pub node: NodeId,
    pub name: String,
    pub message: String,
}

pub struct MacroTransformation {
    registry: MacroRegistry,
    options: Options,
}

impl MacroTransformation {
    #[must_use]
    pub fn new(registry: MacroRegistry, options: Options) -> Self {
        Self { registry, options }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Execute every pending macro in `xdom`.
    ///
    /// Macro failures do not stop the pass; they are returned after being
    /// replaced in the tree by an error message.
    ///
    /// # Errors
    ///
    /// Only structural faults of the tree itself.
    #[tracing::instrument(level = "trace", skip_all, fields(context = context.id()))]
    pub fn transform(
        &self,
        xdom: &mut Xdom,
        context: &mut ExecutionContext,
    ) -> Result<Vec<MacroFailure>, Error> {
        let mut failures = Vec::new();
        self.transform_scope(xdom, xdom.root(), context, &mut failures)?;
        Ok(failures)
    }

    fn priority(&self, name: &str) -> u32 {
        self.registry
            .get(name)
            .map_or(DEFAULT_PRIORITY, |implementation| implementation.priority())
    }

    /// The pending call to run next below `scope`.
    fn next_pending(&self, xdom: &Xdom, scope: NodeId) -> Option<NodeId> {
        xdom.descendants(scope)
            .enumerate()
            .filter_map(|(order, id)| {
                if let Some(Block::Macro {
                    call,
                    executed: false,
                    ..
                }) = xdom.block(id)
                {
                    Some((self.priority(&call.name), order, id))
                } else {
                    None
                }
            })
            .min()
            .map(|(_, _, id)| id)
    }

    fn transform_scope(
        &self,
        xdom: &mut Xdom,
        scope: NodeId,
        context: &mut ExecutionContext,
        failures: &mut Vec<MacroFailure>,
    ) -> Result<(), Error> {
        while let Some(id) = self.next_pending(xdom, scope) {
            self.execute(xdom, id, context, failures)?;
        }
        Ok(())
    }

    fn execute(
        &self,
        xdom: &mut Xdom,
        id: NodeId,
        context: &mut ExecutionContext,
        failures: &mut Vec<MacroFailure>,
    ) -> Result<(), Error> {
        let Some(Block::Macro {
            call,
            inline,
            executed,
        }) = xdom.block_mut(id)
        else {
            return Err(Error::UnknownNode(id));
        };
        *executed = true;
        let call = call.clone();
        let inline = *inline;

        let result = match self.registry.get(&call.name) {
            None => Err(MacroExecutionError::UnknownMacro(call.name.clone())),
            Some(implementation) if inline && !implementation.supports_inline() => {
                Err(MacroExecutionError::InlineNotSupported(call.name.clone()))
            }
            Some(implementation) => {
                tracing::debug!(name = %call.name, node = %id, context = context.id(), "executing macro");
                implementation.execute(&mut MacroInvocation {
                    call: &call,
                    inline,
                    node: id,
                    xdom,
                    context,
                    options: &self.options,
                })
            }
        };

        match result {
            Ok(output) => {
                xdom.append_fragment(id, output.content)?;
                if let Some(mut isolated) = output.transform_with {
                    self.transform_scope(xdom, id, &mut isolated, failures)?;
                }
            }
            Err(error) => {
                let message = format!(
                    "Failed to execute the [{}] macro. Cause: [{}]",
                    call.name,
                    error.describe()
                );
                tracing::warn!(name = %call.name, node = %id, %message, "macro failed");
                xdom.append_fragment(id, error_placeholder(&message, inline)?)?;
                failures.push(MacroFailure {
                    node: id,
                    name: call.name,
                    message,
                });
            }
        }
        Ok(())
    }
}

/// Words and spaces of `text` appended under `parent`.
pub(crate) fn append_text(xdom: &mut Xdom, parent: NodeId, text: &str) -> Result<(), Error> {
    for (index, word) in text.split(' ').enumerate() {
        if index > 0 {
            xdom.append_child(parent, Block::Space)?;
        }
        if !word.is_empty() {
            xdom.append_child(parent, Block::word(word))?;
        }
    }
    Ok(())
}

fn error_placeholder(message: &str, inline: bool) -> Result<Xdom, Error> {
    let mut placeholder = Xdom::new();
    let root = placeholder.root();
    let container = if inline {
        placeholder.append_child(root, Block::format(FormatKind::Monospace))?
    } else {
        let group = placeholder.append_child(
            root,
            Block::group(Parameters::new().with("class", ERROR_CLASS)),
        )?;
        placeholder.append_child(group, Block::paragraph())?
    };
    append_text(&mut placeholder, container, message)?;
    Ok(placeholder)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::{BlockTree, parse};

    struct Echo {
        priority: u32,
    }

    impl Macro for Echo {
        fn priority(&self) -> u32 {
            self.priority
        }

        fn execute(
            &self,
            invocation: &mut MacroInvocation<'_>,
        ) -> Result<MacroOutput, MacroExecutionError> {
            let order = invocation.context.variable("order").unwrap_or_default().to_string();
            invocation
                .context
                .set_variable("order", format!("{order}{}", invocation.call.name));
            Ok(MacroOutput::default())
        }
    }

    fn run(source: &str, registry: MacroRegistry) -> (Xdom, Vec<MacroFailure>, ExecutionContext) {
        let options = Options::default();
        let mut xdom = parse(source, &options).unwrap();
        let mut context = ExecutionContext::new("tester");
        let failures = MacroTransformation::new(registry, options)
            .transform(&mut xdom, &mut context)
            .unwrap();
        (xdom, failures, context)
    }

    #[test]
    fn runs_by_priority_then_document_order() {
        let registry = MacroRegistry::new()
            .with("a", Echo { priority: 50 })
            .with("b", Echo { priority: 10 })
            .with("c", Echo { priority: 50 });
        let (_, failures, context) = run("{{c/}}\n\n{{a/}} {{b/}}", registry);
        assert!(failures.is_empty());
        assert_eq!(context.variable("order"), Some("bca"));
    }

    #[test]
    #[traced_test]
    fn unknown_macro_becomes_error_group() {
        let (xdom, failures, _) = run("{{missing/}}", MacroRegistry::new());
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].message,
            "Failed to execute the [missing] macro. Cause: [Unknown macro: missing]"
        );
        let call = xdom.children(xdom.root())[0];
        let tree = xdom.tree(call).unwrap();
        assert_eq!(
            tree.children[0].block,
            Block::group(Parameters::new().with("class", ERROR_CLASS))
        );
        assert!(logs_contain("macro failed"));
    }

    #[test]
    fn inline_failure_is_monospace() {
        let (xdom, _, _) = run("x {{missing/}}", MacroRegistry::new());
        let paragraph = xdom.children(xdom.root())[0];
        let call = xdom.children(paragraph)[2];
        let tree = xdom.tree(call).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].block, Block::format(FormatKind::Monospace));
        assert_eq!(
            tree.children[0].children[..3],
            [
                BlockTree::leaf(Block::word("Failed")),
                BlockTree::leaf(Block::Space),
                BlockTree::leaf(Block::word("to")),
            ]
        );
    }

    #[test]
    fn isolated_context_has_its_own_identity() {
        let mut context = ExecutionContext::new("u");
        context.set_variable("x", "1");
        let reference = DocumentReference::new("xwiki", "S", "P");
        let mut copy = context.isolated(&reference);
        copy.set_variable("x", "2");
        assert_eq!(copy.id(), "include:xwiki:S.P");
        assert_eq!(context.variable("x"), Some("1"));
    }
}
