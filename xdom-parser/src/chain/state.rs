use crate::{Boundary, ContainerKind, Error, Event};

/// Which constructs are open, innermost last, plus per-container counters.
#[derive(Clone, Debug, Default)]
pub struct BlockState {
    open: Vec<ContainerKind>,
    link_depth: usize,
    // One counter per open list / table / row / quotation: how many children
    // of that kind have begun so far.
    items: Vec<usize>,
    rows: Vec<usize>,
    cells: Vec<usize>,
    lines: Vec<usize>,
}

impl BlockState {
    fn begin(&mut self, kind: ContainerKind) {
        match kind {
            ContainerKind::Link => self.link_depth += 1,
            ContainerKind::List => self.items.push(0),
            ContainerKind::ListItem => bump(&mut self.items),
            ContainerKind::Table => self.rows.push(0),
            ContainerKind::TableRow => {
                bump(&mut self.rows);
                self.cells.push(0);
            }
            ContainerKind::TableCell => bump(&mut self.cells),
            ContainerKind::Quotation => self.lines.push(0),
            ContainerKind::QuotationLine => bump(&mut self.lines),
            ContainerKind::Document
            | ContainerKind::Group
            | ContainerKind::Paragraph
            | ContainerKind::Section
            | ContainerKind::Format
            | ContainerKind::MacroMarker => {}
        }
        self.open.push(kind);
    }

    fn end(&mut self, kind: ContainerKind) -> Result<(), Error> {
        match self.open.pop() {
            Some(open) if open == kind => {}
            Some(open) => {
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
        match kind {
            ContainerKind::Link => self.link_depth = self.link_depth.saturating_sub(1),
            ContainerKind::List => {
                self.items.pop();
            }
            ContainerKind::Table => {
                self.rows.pop();
            }
            ContainerKind::TableRow => {
                self.cells.pop();
            }
            ContainerKind::Quotation => {
                self.lines.pop();
            }
            ContainerKind::Document
            | ContainerKind::Group
            | ContainerKind::Paragraph
            | ContainerKind::Section
            | ContainerKind::ListItem
            | ContainerKind::Format
            | ContainerKind::TableCell
            | ContainerKind::QuotationLine
            | ContainerKind::MacroMarker => {}
        }
        Ok(())
    }

    /// The innermost open construct.
    #[must_use]
    pub fn current(&self) -> Option<ContainerKind> {
        self.open.last().copied()
    }

    /// The construct enclosing the innermost one.
    #[must_use]
    pub fn parent(&self) -> Option<ContainerKind> {
        self.open.iter().rev().nth(1).copied()
    }

    /// The innermost open construct that is not an inline span or macro
    /// marker.
    #[must_use]
    pub fn current_block(&self) -> Option<ContainerKind> {
        self.open.iter().rev().copied().find(|kind| {
            !matches!(
                kind,
                ContainerKind::Format | ContainerKind::Link | ContainerKind::MacroMarker
            )
        })
    }

    /// Open constructs, innermost first.
    pub fn open(&self) -> impl Iterator<Item = ContainerKind> + '_ {
        self.open.iter().rev().copied()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    #[must_use]
    pub fn is_in(&self, kind: ContainerKind) -> bool {
        self.open.contains(&kind)
    }

    #[must_use]
    pub fn is_in_table_cell(&self) -> bool {
        self.current_block() == Some(ContainerKind::TableCell)
    }

    #[must_use]
    pub fn is_in_section(&self) -> bool {
        self.current_block() == Some(ContainerKind::Section)
    }

    /// Number of link labels currently open.
    #[must_use]
    pub fn link_depth(&self) -> usize {
        self.link_depth
    }

    #[must_use]
    pub fn list_depth(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn quotation_depth(&self) -> usize {
        self.lines.len()
    }

    /// Zero-based index of the innermost list item begun so far.
    #[must_use]
    pub fn list_item_index(&self) -> Option<usize> {
        index(&self.items)
    }

    #[must_use]
    pub fn row_index(&self) -> Option<usize> {
        index(&self.rows)
    }

    #[must_use]
    pub fn cell_index(&self) -> Option<usize> {
        index(&self.cells)
    }

    #[must_use]
    pub fn quotation_line_index(&self) -> Option<usize> {
        index(&self.lines)
    }
}

fn bump(counters: &mut [usize]) {
    if let Some(last) = counters.last_mut() {
        *last += 1;
    }
}

fn index(counters: &[usize]) -> Option<usize> {
    counters.last().and_then(|count| count.checked_sub(1))
}

/// Whether the current event is the first thing on a visual line.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineState {
    starts_line: bool,
    pending: bool,
}

impl LineState {
    fn update(&mut self, event: &Event) {
        self.starts_line = self.pending;
        if matches!(
            event,
            Event::BeginDocument { .. }
                | Event::BeginGroup { .. }
                | Event::BeginParagraph { .. }
                | Event::BeginQuotationLine
                | Event::NewLine
        ) {
            self.pending = true;
        } else if event.is_inline()
            // Style delimiters and indentation do not move the text off the
            // line start.
            && !matches!(
                event,
                Event::BeginFormat { .. } | Event::EndFormat { .. } | Event::Space
            )
        {
            self.pending = false;
        }
    }

    #[must_use]
    pub fn starts_line(&self) -> bool {
        self.starts_line
    }
}

/// Number of new line events in a row, including the current one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewLineState {
    count: usize,
}

impl NewLineState {
    fn update(&mut self, event: &Event) {
        if matches!(event, Event::NewLine) {
            self.count += 1;
        } else {
            self.count = 0;
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Everything the chain tracks, as seen by a stage handling the current
/// event. Updated before the event reaches the stages.
#[derive(Clone, Debug, Default)]
pub struct ChainState {
    blocks: BlockState,
    line: LineState,
    new_lines: NewLineState,
    next: Option<Event>,
}

impl ChainState {
    pub(crate) fn update(&mut self, event: &Event, next: Option<&Event>) -> Result<(), Error> {
        match event.boundary() {
            Some((Boundary::Begin, kind)) => self.blocks.begin(kind),
            Some((Boundary::End, kind)) => self.blocks.end(kind)?,
            None => {}
        }
        self.line.update(event);
        self.new_lines.update(event);
        self.next = next.cloned();
        Ok(())
    }

    #[must_use]
    pub fn blocks(&self) -> &BlockState {
        &self.blocks
    }

    #[must_use]
    pub fn starts_line(&self) -> bool {
        self.line.starts_line()
    }

    #[must_use]
    pub fn new_line_count(&self) -> usize {
        self.new_lines.count()
    }

    /// The event that will follow the current one, when already known.
    #[must_use]
    pub fn next_event(&self) -> Option<&Event> {
        self.next.as_ref()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use super::*;
    use crate::{FormatKind, Parameters};

    fn feed(state: &mut ChainState, events: &[Event]) {
        for event in events {
            state.update(event, None).unwrap();
        }
    }

    #[test]
    fn tracks_list_items_and_depth() {
        let mut state = ChainState::default();
        let list = Event::BeginList {
            kind: crate::ListKind::Bulleted,
            parameters: Parameters::new(),
        };
        feed(
            &mut state,
            &[
                Event::begin_document(),
                list.clone(),
                Event::BeginListItem,
                Event::EndListItem,
                Event::BeginListItem,
                list,
                Event::BeginListItem,
            ],
        );
        assert_eq!(state.blocks().list_depth(), 2);
        assert_eq!(state.blocks().list_item_index(), Some(0));
        assert_eq!(state.blocks().current(), Some(ContainerKind::ListItem));
        assert_eq!(state.blocks().parent(), Some(ContainerKind::List));
    }

    #[test]
    fn line_start_survives_format_delimiters() {
        let mut state = ChainState::default();
        feed(
            &mut state,
            &[
                Event::begin_document(),
                Event::begin_paragraph(),
                Event::BeginFormat {
                    kind: FormatKind::Bold,
                },
            ],
        );
        state.update(&Event::word("a"), None).unwrap();
        assert!(state.starts_line());
        state.update(&Event::Space, None).unwrap();
        assert!(!state.starts_line());
        state.update(&Event::NewLine, None).unwrap();
        state.update(&Event::Space, None).unwrap();
        state.update(&Event::word("b"), None).unwrap();
        assert!(state.starts_line());
    }

    #[test]
    fn counts_consecutive_new_lines() {
        let mut state = ChainState::default();
        feed(&mut state, &[Event::NewLine, Event::NewLine]);
        assert_eq!(state.new_line_count(), 2);
        feed(&mut state, &[Event::word("x")]);
        assert_eq!(state.new_line_count(), 0);
    }

    #[test]
    fn link_depth_follows_nesting() {
        let mut state = ChainState::default();
        let link = Event::BeginLink {
            reference: crate::ResourceReference::parse_link("A"),
            free_standing: false,
            parameters: Parameters::new(),
        };
        feed(&mut state, &[link.clone(), link]);
        assert_eq!(state.blocks().link_depth(), 2);
    }

    #[test]
    fn wrong_end_is_structural() {
        let mut state = ChainState::default();
        feed(&mut state, &[Event::begin_paragraph()]);
        let error = state.update(&Event::EndListItem, None).unwrap_err();
        assert!(error.is_structural());
    }
}
