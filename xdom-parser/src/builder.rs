//! Builds an [`Xdom`] from an event stream.
//!
//! Every begin event pushes a marker, every leaf pushes its block, and every
//! end event pops back to the most recent marker and wraps what it popped in
//! the new container.
use crate::{
    Block, ChainState, ChainingListener, ContainerKind, Error, Event, FormatKind, HeaderLevel,
    ListKind, Listener, MacroCall, NodeId, Parameters, ResourceReference, Xdom,
};

#[derive(Debug)]
enum StackItem {
    Marker(ContainerKind),
    Node(NodeId),
}

/// Stack-and-marker tree builder.
///
/// Blocks are created detached in a scratch arena as they complete;
/// closing a container hands its collected children to it.
#[derive(Debug)]
pub struct XdomBuilder {
    arena: Xdom,
    stack: Vec<StackItem>,
    // Open documents; nested ones build groups.
    documents: usize,
}

impl Default for XdomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl XdomBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Xdom::with_root(Block::Document),
            stack: Vec::new(),
            documents: 0,
        }
    }

    fn open(&mut self, kind: ContainerKind) {
        self.stack.push(StackItem::Marker(kind));
    }

    fn leaf(&mut self, block: Block) {
        let id = self.arena.push_detached(block);
        self.stack.push(StackItem::Node(id));
    }

    /// Pop back to the most recent marker, check it opened `kind`, and wrap
    /// the popped blocks in `make(children)`. `None` from `make` drops the
    /// construct and its children.
    fn close(
        &mut self,
        kind: ContainerKind,
        make: impl FnOnce(&[NodeId]) -> Option<Block>,
    ) -> Result<(), Error> {
        let mut children = Vec::new();
        loop {
            match self.stack.pop() {
                Some(StackItem::Node(id)) => children.push(id),
                Some(StackItem::Marker(open)) if open == kind => break,
                Some(StackItem::Marker(open)) => {
                    tracing::error!(expected = %open, found = %kind, "unbalanced end event");
                    return Err(Error::UnexpectedEnd {
                        expected: open,
                        found: kind,
                    });
                }
                None => {
                    tracing::error!(found = %kind, "end event without a begin");
                    return Err(Error::StackUnderflow(kind));
                }
            }
        }
        children.reverse();

        let Some(block) = make(&children) else {
            return Ok(());
        };
        let container = self.arena.push_detached(block);
        self.arena.adopt(container, &children)?;
        self.stack.push(StackItem::Node(container));
        Ok(())
    }

    /// The finished document.
    ///
    /// # Errors
    ///
    /// Fails when a construct is still open or no document was built.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn into_xdom(self) -> Result<Xdom, Error> {
        let root = match self.stack.as_slice() {
            [StackItem::Node(id)] => *id,
            [] => return Err(Error::EmptyDocument),
            [.., StackItem::Marker(kind)] => {
                tracing::error!(open = %kind, "event stream ended inside a construct");
                return Err(Error::UnclosedConstruct(*kind));
            }
            [.., StackItem::Node(_)] => {
                let open = self.stack.iter().rev().find_map(|item| match item {
                    StackItem::Marker(kind) => Some(*kind),
                    StackItem::Node(_) => None,
                });
                return Err(open.map_or(Error::EmptyDocument, Error::UnclosedConstruct));
            }
        };
        if !matches!(self.arena.block(root), Some(Block::Document)) {
            return Err(Error::EmptyDocument);
        }
        Ok(self.arena.extract(root))
    }
}

impl Xdom {
    /// Copy the subtree at `id` out as its own document.
    pub(crate) fn extract(&self, id: NodeId) -> Xdom {
        let mut out = Xdom::new();
        let mut pending: Vec<(NodeId, NodeId)> = self
            .children(id)
            .iter()
            .rev()
            .map(|child| (*child, out.root()))
            .collect();
        while let Some((old, parent)) = pending.pop() {
            let Some(block) = self.block(old) else {
                continue;
            };
            let Ok(new) = out.append_child(parent, block.clone()) else {
                continue;
            };
            pending.extend(self.children(old).iter().rev().map(|child| (*child, new)));
        }
        out
    }
}

impl Listener for XdomBuilder {
    fn begin_document(&mut self, _: &Parameters) -> Result<(), Error> {
        self.documents += 1;
        self.open(ContainerKind::Document);
        Ok(())
    }

    fn end_document(&mut self, parameters: &Parameters) -> Result<(), Error> {
        self.documents = self.documents.saturating_sub(1);
        let outermost = self.documents == 0;
        self.close(ContainerKind::Document, |_| {
            Some(if outermost {
                Block::Document
            } else {
                Block::group(parameters.clone())
            })
        })
    }

    fn begin_group(&mut self, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::Group);
        Ok(())
    }

    fn end_group(&mut self, parameters: &Parameters) -> Result<(), Error> {
        self.close(ContainerKind::Group, |_| Some(Block::group(parameters.clone())))
    }

    fn begin_paragraph(&mut self, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::Paragraph);
        Ok(())
    }

    fn end_paragraph(&mut self, parameters: &Parameters) -> Result<(), Error> {
        self.close(ContainerKind::Paragraph, |_| {
            Some(Block::Paragraph {
                parameters: parameters.clone(),
            })
        })
    }

    fn begin_section(&mut self, _: HeaderLevel, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::Section);
        Ok(())
    }

    fn end_section(&mut self, level: HeaderLevel, parameters: &Parameters) -> Result<(), Error> {
        self.close(ContainerKind::Section, |_| {
            Some(Block::Section {
                level,
                parameters: parameters.clone(),
            })
        })
    }

    fn begin_list(&mut self, _: ListKind, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::List);
        Ok(())
    }

    fn end_list(&mut self, kind: ListKind, parameters: &Parameters) -> Result<(), Error> {
        self.close(ContainerKind::List, |_| {
            Some(Block::List {
                kind,
                parameters: parameters.clone(),
            })
        })
    }

    fn begin_list_item(&mut self) -> Result<(), Error> {
        self.open(ContainerKind::ListItem);
        Ok(())
    }

    fn end_list_item(&mut self) -> Result<(), Error> {
        self.close(ContainerKind::ListItem, |_| Some(Block::ListItem))
    }

    fn begin_format(&mut self, _: FormatKind) -> Result<(), Error> {
        self.open(ContainerKind::Format);
        Ok(())
    }

    fn end_format(&mut self, kind: FormatKind) -> Result<(), Error> {
        // A style span with nothing in it is not worth a block.
        self.close(ContainerKind::Format, |children| {
            (!children.is_empty()).then_some(Block::Format { kind })
        })
    }

    fn begin_link(&mut self, _: &ResourceReference, _: bool, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::Link);
        Ok(())
    }

    fn end_link(
        &mut self,
        reference: &ResourceReference,
        free_standing: bool,
        parameters: &Parameters,
    ) -> Result<(), Error> {
        self.close(ContainerKind::Link, |_| {
            Some(Block::Link {
                reference: reference.clone(),
                free_standing,
                parameters: parameters.clone(),
            })
        })
    }

    fn begin_table(&mut self, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::Table);
        Ok(())
    }

    fn end_table(&mut self, parameters: &Parameters) -> Result<(), Error> {
        self.close(ContainerKind::Table, |_| {
            Some(Block::Table {
                parameters: parameters.clone(),
            })
        })
    }

    fn begin_table_row(&mut self, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::TableRow);
        Ok(())
    }

    fn end_table_row(&mut self, parameters: &Parameters) -> Result<(), Error> {
        self.close(ContainerKind::TableRow, |_| {
            Some(Block::TableRow {
                parameters: parameters.clone(),
            })
        })
    }

    fn begin_table_cell(&mut self, _: bool, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::TableCell);
        Ok(())
    }

    fn end_table_cell(&mut self, header: bool, parameters: &Parameters) -> Result<(), Error> {
        self.close(ContainerKind::TableCell, |_| {
            Some(Block::TableCell {
                header,
                parameters: parameters.clone(),
            })
        })
    }

    fn begin_quotation(&mut self, _: &Parameters) -> Result<(), Error> {
        self.open(ContainerKind::Quotation);
        Ok(())
    }

    fn end_quotation(&mut self, parameters: &Parameters) -> Result<(), Error> {
        self.close(ContainerKind::Quotation, |_| {
            Some(Block::Quotation {
                parameters: parameters.clone(),
            })
        })
    }

    fn begin_quotation_line(&mut self) -> Result<(), Error> {
        self.open(ContainerKind::QuotationLine);
        Ok(())
    }

    fn end_quotation_line(&mut self) -> Result<(), Error> {
        self.close(ContainerKind::QuotationLine, |_| Some(Block::QuotationLine))
    }

    fn begin_macro_marker(&mut self, _: &MacroCall, _: bool) -> Result<(), Error> {
        self.open(ContainerKind::MacroMarker);
        Ok(())
    }

    fn end_macro_marker(&mut self, call: &MacroCall, inline: bool) -> Result<(), Error> {
        self.close(ContainerKind::MacroMarker, |_| {
            Some(Block::Macro {
                call: call.clone(),
                inline,
                executed: true,
            })
        })
    }

    fn on_word(&mut self, text: &str) -> Result<(), Error> {
        self.leaf(Block::word(text));
        Ok(())
    }

    fn on_space(&mut self) -> Result<(), Error> {
        self.leaf(Block::Space);
        Ok(())
    }

    fn on_special_symbol(&mut self, symbol: char) -> Result<(), Error> {
        self.leaf(Block::SpecialSymbol(symbol));
        Ok(())
    }

    fn on_escape(&mut self, text: &str) -> Result<(), Error> {
        self.leaf(Block::Escape(text.to_string()));
        Ok(())
    }

    fn on_new_line(&mut self) -> Result<(), Error> {
        self.leaf(Block::NewLine);
        Ok(())
    }

    fn on_line_break(&mut self) -> Result<(), Error> {
        self.leaf(Block::LineBreak);
        Ok(())
    }

    fn on_image(
        &mut self,
        reference: &ResourceReference,
        free_standing: bool,
        parameters: &Parameters,
    ) -> Result<(), Error> {
        self.leaf(Block::Image {
            reference: reference.clone(),
            free_standing,
            parameters: parameters.clone(),
        });
        Ok(())
    }

    fn on_macro(&mut self, call: &MacroCall, inline: bool) -> Result<(), Error> {
        self.leaf(Block::Macro {
            call: call.clone(),
            inline,
            executed: false,
        });
        Ok(())
    }

    fn on_verbatim(&mut self, content: &str, inline: bool, parameters: &Parameters) -> Result<(), Error> {
        self.leaf(Block::Verbatim {
            content: content.to_string(),
            inline,
            parameters: parameters.clone(),
        });
        Ok(())
    }

    fn on_horizontal_line(&mut self, parameters: &Parameters) -> Result<(), Error> {
        self.leaf(Block::HorizontalLine {
            parameters: parameters.clone(),
        });
        Ok(())
    }

    fn on_empty_lines(&mut self, count: usize) -> Result<(), Error> {
        self.leaf(Block::EmptyLines(count));
        Ok(())
    }
}

impl ChainingListener for XdomBuilder {
    fn on_event(&mut self, event: &Event, _: &ChainState) -> Result<(), Error> {
        Listener::on_event(self, event)
    }
}

/// Build a document from a complete event stream.
///
/// # Errors
///
/// Returns a structural [`Error`] when the stream is unbalanced.
pub fn build<'a>(events: impl IntoIterator<Item = &'a Event>) -> Result<Xdom, Error> {
    let mut builder = XdomBuilder::new();
    for event in events {
        Listener::on_event(&mut builder, event)?;
    }
    builder.into_xdom()
}
