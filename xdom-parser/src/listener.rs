//! The event vocabulary shared by readers, the tree builder and renderers.
use std::fmt;

use serde::Serialize;

use crate::{
    Block, Error, FormatKind, HeaderLevel, ListKind, MacroCall, NodeId, Parameters,
    ResourceReference, Xdom,
};

/// Constructs that come as a begin/end pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerKind {
    Document,
    Group,
    Paragraph,
    Section,
    List,
    ListItem,
    Format,
    Link,
    Table,
    TableRow,
    TableCell,
    Quotation,
    QuotationLine,
    MacroMarker,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Document => "document",
            Self::Group => "group",
            Self::Paragraph => "paragraph",
            Self::Section => "section",
            Self::List => "list",
            Self::ListItem => "list item",
            Self::Format => "format",
            Self::Link => "link",
            Self::Table => "table",
            Self::TableRow => "table row",
            Self::TableCell => "table cell",
            Self::Quotation => "quotation",
            Self::QuotationLine => "quotation line",
            Self::MacroMarker => "macro marker",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    Begin,
    End,
}

/// One call of the [`Listener`] interface, as a value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    BeginDocument { parameters: Parameters },
    EndDocument { parameters: Parameters },
    BeginGroup { parameters: Parameters },
    EndGroup { parameters: Parameters },
    BeginParagraph { parameters: Parameters },
    EndParagraph { parameters: Parameters },
    BeginSection { level: HeaderLevel, parameters: Parameters },
    EndSection { level: HeaderLevel, parameters: Parameters },
    BeginList { kind: ListKind, parameters: Parameters },
    EndList { kind: ListKind, parameters: Parameters },
    BeginListItem,
    EndListItem,
    BeginFormat { kind: FormatKind },
    EndFormat { kind: FormatKind },
    BeginLink {
        reference: ResourceReference,
        free_standing: bool,
        parameters: Parameters,
    },
    EndLink {
        reference: ResourceReference,
        free_standing: bool,
        parameters: Parameters,
    },
    BeginTable { parameters: Parameters },
    EndTable { parameters: Parameters },
    BeginTableRow { parameters: Parameters },
    EndTableRow { parameters: Parameters },
    BeginTableCell { header: bool, parameters: Parameters },
    EndTableCell { header: bool, parameters: Parameters },
    BeginQuotation { parameters: Parameters },
    EndQuotation { parameters: Parameters },
    BeginQuotationLine,
    EndQuotationLine,
    BeginMacroMarker { call: MacroCall, inline: bool },
    EndMacroMarker { call: MacroCall, inline: bool },
    Word { text: String },
    Space,
    SpecialSymbol { symbol: char },
    Escape { text: String },
    NewLine,
    LineBreak,
    Image {
        reference: ResourceReference,
        free_standing: bool,
        parameters: Parameters,
    },
    Macro { call: MacroCall, inline: bool },
    Verbatim {
        content: String,
        inline: bool,
        parameters: Parameters,
    },
    HorizontalLine { parameters: Parameters },
    EmptyLines { count: usize },
}

impl Event {
    #[must_use]
    pub fn word(text: impl Into<String>) -> Self {
        Self::Word { text: text.into() }
    }

    #[must_use]
    pub fn begin_paragraph() -> Self {
        Self::BeginParagraph {
            parameters: Parameters::new(),
        }
    }

    #[must_use]
    pub fn end_paragraph() -> Self {
        Self::EndParagraph {
            parameters: Parameters::new(),
        }
    }

    #[must_use]
    pub fn begin_document() -> Self {
        Self::BeginDocument {
            parameters: Parameters::new(),
        }
    }

    #[must_use]
    pub fn end_document() -> Self {
        Self::EndDocument {
            parameters: Parameters::new(),
        }
    }

    /// For container events, whether this opens or closes which construct.
    #[must_use]
    pub fn boundary(&self) -> Option<(Boundary, ContainerKind)> {
        let (boundary, kind) = match self {
            Self::BeginDocument { .. } => (Boundary::Begin, ContainerKind::Document),
            Self::EndDocument { .. } => (Boundary::End, ContainerKind::Document),
            Self::BeginGroup { .. } => (Boundary::Begin, ContainerKind::Group),
            Self::EndGroup { .. } => (Boundary::End, ContainerKind::Group),
            Self::BeginParagraph { .. } => (Boundary::Begin, ContainerKind::Paragraph),
            Self::EndParagraph { .. } => (Boundary::End, ContainerKind::Paragraph),
            Self::BeginSection { .. } => (Boundary::Begin, ContainerKind::Section),
            Self::EndSection { .. } => (Boundary::End, ContainerKind::Section),
            Self::BeginList { .. } => (Boundary::Begin, ContainerKind::List),
            Self::EndList { .. } => (Boundary::End, ContainerKind::List),
            Self::BeginListItem => (Boundary::Begin, ContainerKind::ListItem),
            Self::EndListItem => (Boundary::End, ContainerKind::ListItem),
            Self::BeginFormat { .. } => (Boundary::Begin, ContainerKind::Format),
            Self::EndFormat { .. } => (Boundary::End, ContainerKind::Format),
            Self::BeginLink { .. } => (Boundary::Begin, ContainerKind::Link),
            Self::EndLink { .. } => (Boundary::End, ContainerKind::Link),
            Self::BeginTable { .. } => (Boundary::Begin, ContainerKind::Table),
            Self::EndTable { .. } => (Boundary::End, ContainerKind::Table),
            Self::BeginTableRow { .. } => (Boundary::Begin, ContainerKind::TableRow),
            Self::EndTableRow { .. } => (Boundary::End, ContainerKind::TableRow),
            Self::BeginTableCell { .. } => (Boundary::Begin, ContainerKind::TableCell),
            Self::EndTableCell { .. } => (Boundary::End, ContainerKind::TableCell),
            Self::BeginQuotation { .. } => (Boundary::Begin, ContainerKind::Quotation),
            Self::EndQuotation { .. } => (Boundary::End, ContainerKind::Quotation),
            Self::BeginQuotationLine => (Boundary::Begin, ContainerKind::QuotationLine),
            Self::EndQuotationLine => (Boundary::End, ContainerKind::QuotationLine),
            Self::BeginMacroMarker { .. } => (Boundary::Begin, ContainerKind::MacroMarker),
            Self::EndMacroMarker { .. } => (Boundary::End, ContainerKind::MacroMarker),
            Self::Word { .. }
            | Self::Space
            | Self::SpecialSymbol { .. }
            | Self::Escape { .. }
            | Self::NewLine
            | Self::LineBreak
            | Self::Image { .. }
            | Self::Macro { .. }
            | Self::Verbatim { .. }
            | Self::HorizontalLine { .. }
            | Self::EmptyLines { .. } => return None,
        };
        Some((boundary, kind))
    }

    #[must_use]
    pub fn is_begin(&self) -> bool {
        matches!(self.boundary(), Some((Boundary::Begin, _)))
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self.boundary(), Some((Boundary::End, _)))
    }

    /// Whether the event belongs inside a line of text.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        match self {
            Self::BeginFormat { .. }
            | Self::EndFormat { .. }
            | Self::BeginLink { .. }
            | Self::EndLink { .. }
            | Self::Word { .. }
            | Self::Space
            | Self::SpecialSymbol { .. }
            | Self::Escape { .. }
            | Self::NewLine
            | Self::LineBreak
            | Self::Image { .. } => true,
            Self::Macro { inline, .. }
            | Self::BeginMacroMarker { inline, .. }
            | Self::EndMacroMarker { inline, .. }
            | Self::Verbatim { inline, .. } => *inline,
            Self::BeginDocument { .. }
            | Self::EndDocument { .. }
            | Self::BeginGroup { .. }
            | Self::EndGroup { .. }
            | Self::BeginParagraph { .. }
            | Self::EndParagraph { .. }
            | Self::BeginSection { .. }
            | Self::EndSection { .. }
            | Self::BeginList { .. }
            | Self::EndList { .. }
            | Self::BeginListItem
            | Self::EndListItem
            | Self::BeginTable { .. }
            | Self::EndTable { .. }
            | Self::BeginTableRow { .. }
            | Self::EndTableRow { .. }
            | Self::BeginTableCell { .. }
            | Self::EndTableCell { .. }
            | Self::BeginQuotation { .. }
            | Self::EndQuotation { .. }
            | Self::BeginQuotationLine
            | Self::EndQuotationLine
            | Self::HorizontalLine { .. }
            | Self::EmptyLines { .. } => false,
        }
    }
}

struct Params<'a>(&'a Parameters);

impl fmt::Display for Params<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, " [")?;
        for (index, (key, value)) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "[{key}]=[{value}]")?;
        }
        write!(f, "]")
    }
}

fn macro_call(f: &mut fmt::Formatter<'_>, name: &str, call: &MacroCall, inline: bool) -> fmt::Result {
    let name = if inline {
        format!("{name}Inline")
    } else {
        format!("{name}Standalone")
    };
    write!(f, "{name} [{}]{}", call.name, Params(&call.parameters))?;
    if let Some(content) = &call.content {
        write!(f, " [{content}]")?;
    }
    Ok(())
}

/// One line per event, in the `event/1.0` style: `beginFormat [BOLD]`,
/// `onWord [hello]`.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginDocument { parameters } => write!(f, "beginDocument{}", Params(parameters)),
            Self::EndDocument { parameters } => write!(f, "endDocument{}", Params(parameters)),
            Self::BeginGroup { parameters } => write!(f, "beginGroup{}", Params(parameters)),
            Self::EndGroup { parameters } => write!(f, "endGroup{}", Params(parameters)),
            Self::BeginParagraph { parameters } => {
                write!(f, "beginParagraph{}", Params(parameters))
            }
            Self::EndParagraph { parameters } => write!(f, "endParagraph{}", Params(parameters)),
            Self::BeginSection { level, parameters } => {
                write!(f, "beginSection [{}]{}", level.get(), Params(parameters))
            }
            Self::EndSection { level, parameters } => {
                write!(f, "endSection [{}]{}", level.get(), Params(parameters))
            }
            Self::BeginList { kind, parameters } => {
                write!(f, "beginList [{kind:?}]{}", Params(parameters))
            }
            Self::EndList { kind, parameters } => {
                write!(f, "endList [{kind:?}]{}", Params(parameters))
            }
            Self::BeginListItem => write!(f, "beginListItem"),
            Self::EndListItem => write!(f, "endListItem"),
            Self::BeginFormat { kind } => write!(f, "beginFormat [{kind}]"),
            Self::EndFormat { kind } => write!(f, "endFormat [{kind}]"),
            Self::BeginLink {
                reference,
                free_standing,
                parameters,
            } => write!(
                f,
                "beginLink [{:?} {reference}] [{free_standing}]{}",
                reference.kind,
                Params(parameters)
            ),
            Self::EndLink {
                reference,
                free_standing,
                parameters,
            } => write!(
                f,
                "endLink [{:?} {reference}] [{free_standing}]{}",
                reference.kind,
                Params(parameters)
            ),
            Self::BeginTable { parameters } => write!(f, "beginTable{}", Params(parameters)),
            Self::EndTable { parameters } => write!(f, "endTable{}", Params(parameters)),
            Self::BeginTableRow { parameters } => write!(f, "beginTableRow{}", Params(parameters)),
            Self::EndTableRow { parameters } => write!(f, "endTableRow{}", Params(parameters)),
            Self::BeginTableCell { header, parameters } => {
                let name = if *header { "TableHeadCell" } else { "TableCell" };
                write!(f, "begin{name}{}", Params(parameters))
            }
            Self::EndTableCell { header, parameters } => {
                let name = if *header { "TableHeadCell" } else { "TableCell" };
                write!(f, "end{name}{}", Params(parameters))
            }
            Self::BeginQuotation { parameters } => {
                write!(f, "beginQuotation{}", Params(parameters))
            }
            Self::EndQuotation { parameters } => write!(f, "endQuotation{}", Params(parameters)),
            Self::BeginQuotationLine => write!(f, "beginQuotationLine"),
            Self::EndQuotationLine => write!(f, "endQuotationLine"),
            Self::BeginMacroMarker { call, inline } => {
                macro_call(f, "beginMacroMarker", call, *inline)
            }
            Self::EndMacroMarker { call, inline } => macro_call(f, "endMacroMarker", call, *inline),
            Self::Word { text } => write!(f, "onWord [{text}]"),
            Self::Space => write!(f, "onSpace"),
            Self::SpecialSymbol { symbol } => write!(f, "onSpecialSymbol [{symbol}]"),
            Self::Escape { text } => write!(f, "onEscape [{text}]"),
            Self::NewLine => write!(f, "onNewLine"),
            Self::LineBreak => write!(f, "onLineBreak"),
            Self::Image {
                reference,
                free_standing,
                parameters,
            } => write!(
                f,
                "onImage [{:?} {reference}] [{free_standing}]{}",
                reference.kind,
                Params(parameters)
            ),
            Self::Macro { call, inline } => macro_call(f, "onMacro", call, *inline),
            Self::Verbatim {
                content,
                inline,
                parameters,
            } => {
                let name = if *inline { "Inline" } else { "Standalone" };
                write!(f, "onVerbatim{name} [{content}]{}", Params(parameters))
            }
            Self::HorizontalLine { parameters } => {
                write!(f, "onHorizontalLine{}", Params(parameters))
            }
            Self::EmptyLines { count } => write!(f, "onEmptyLines [{count}]"),
        }
    }
}

/// Receives document events, one method per event kind.
///
/// Every method defaults to doing nothing, so implementors only handle what
/// they care about. [`Listener::on_event`] routes an [`Event`] value to the
/// matching method.
#[allow(unused_variables)]
pub trait Listener {
    fn begin_document(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_document(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_group(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_group(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_paragraph(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_paragraph(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_section(&mut self, level: HeaderLevel, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_section(&mut self, level: HeaderLevel, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_list(&mut self, kind: ListKind, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_list(&mut self, kind: ListKind, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_list_item(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn end_list_item(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn begin_format(&mut self, kind: FormatKind) -> Result<(), Error> {
        Ok(())
    }
    fn end_format(&mut self, kind: FormatKind) -> Result<(), Error> {
        Ok(())
    }
    fn begin_link(
        &mut self,
        reference: &ResourceReference,
        free_standing: bool,
        parameters: &Parameters,
    ) -> Result<(), Error> {
        Ok(())
    }
    fn end_link(
        &mut self,
        reference: &ResourceReference,
        free_standing: bool,
        parameters: &Parameters,
    ) -> Result<(), Error> {
        Ok(())
    }
    fn begin_table(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_table(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_table_row(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_table_row(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_table_cell(&mut self, header: bool, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_table_cell(&mut self, header: bool, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_quotation(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn end_quotation(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn begin_quotation_line(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn end_quotation_line(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn begin_macro_marker(&mut self, call: &MacroCall, inline: bool) -> Result<(), Error> {
        Ok(())
    }
    fn end_macro_marker(&mut self, call: &MacroCall, inline: bool) -> Result<(), Error> {
        Ok(())
    }
    fn on_word(&mut self, text: &str) -> Result<(), Error> {
        Ok(())
    }
    fn on_space(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn on_special_symbol(&mut self, symbol: char) -> Result<(), Error> {
        Ok(())
    }
    fn on_escape(&mut self, text: &str) -> Result<(), Error> {
        Ok(())
    }
    fn on_new_line(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn on_line_break(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn on_image(
        &mut self,
        reference: &ResourceReference,
        free_standing: bool,
        parameters: &Parameters,
    ) -> Result<(), Error> {
        Ok(())
    }
    fn on_macro(&mut self, call: &MacroCall, inline: bool) -> Result<(), Error> {
        Ok(())
    }
    fn on_verbatim(&mut self, content: &str, inline: bool, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn on_horizontal_line(&mut self, parameters: &Parameters) -> Result<(), Error> {
        Ok(())
    }
    fn on_empty_lines(&mut self, count: usize) -> Result<(), Error> {
        Ok(())
    }

    /// Route `event` to the matching method.
    ///
    /// # Errors
    ///
    /// Whatever the called method returns.
    fn on_event(&mut self, event: &Event) -> Result<(), Error> {
        match event {
            Event::BeginDocument { parameters } => self.begin_document(parameters),
            Event::EndDocument { parameters } => self.end_document(parameters),
            Event::BeginGroup { parameters } => self.begin_group(parameters),
            Event::EndGroup { parameters } => self.end_group(parameters),
            Event::BeginParagraph { parameters } => self.begin_paragraph(parameters),
            Event::EndParagraph { parameters } => self.end_paragraph(parameters),
            Event::BeginSection { level, parameters } => self.begin_section(*level, parameters),
            Event::EndSection { level, parameters } => self.end_section(*level, parameters),
            Event::BeginList { kind, parameters } => self.begin_list(*kind, parameters),
            Event::EndList { kind, parameters } => self.end_list(*kind, parameters),
            Event::BeginListItem => self.begin_list_item(),
            Event::EndListItem => self.end_list_item(),
            Event::BeginFormat { kind } => self.begin_format(*kind),
            Event::EndFormat { kind } => self.end_format(*kind),
            Event::BeginLink {
                reference,
                free_standing,
                parameters,
            } => self.begin_link(reference, *free_standing, parameters),
            Event::EndLink {
                reference,
                free_standing,
                parameters,
            } => self.end_link(reference, *free_standing, parameters),
            Event::BeginTable { parameters } => self.begin_table(parameters),
            Event::EndTable { parameters } => self.end_table(parameters),
            Event::BeginTableRow { parameters } => self.begin_table_row(parameters),
            Event::EndTableRow { parameters } => self.end_table_row(parameters),
            Event::BeginTableCell { header, parameters } => {
                self.begin_table_cell(*header, parameters)
            }
            Event::EndTableCell { header, parameters } => self.end_table_cell(*header, parameters),
            Event::BeginQuotation { parameters } => self.begin_quotation(parameters),
            Event::EndQuotation { parameters } => self.end_quotation(parameters),
            Event::BeginQuotationLine => self.begin_quotation_line(),
            Event::EndQuotationLine => self.end_quotation_line(),
            Event::BeginMacroMarker { call, inline } => self.begin_macro_marker(call, *inline),
            Event::EndMacroMarker { call, inline } => self.end_macro_marker(call, *inline),
            Event::Word { text } => self.on_word(text),
            Event::Space => self.on_space(),
            Event::SpecialSymbol { symbol } => self.on_special_symbol(*symbol),
            Event::Escape { text } => self.on_escape(text),
            Event::NewLine => self.on_new_line(),
            Event::LineBreak => self.on_line_break(),
            Event::Image {
                reference,
                free_standing,
                parameters,
            } => self.on_image(reference, *free_standing, parameters),
            Event::Macro { call, inline } => self.on_macro(call, *inline),
            Event::Verbatim {
                content,
                inline,
                parameters,
            } => self.on_verbatim(content, *inline, parameters),
            Event::HorizontalLine { parameters } => self.on_horizontal_line(parameters),
            Event::EmptyLines { count } => self.on_empty_lines(*count),
        }
    }
}

/// Events bracketing a container block, or the single event of a leaf.
fn block_events(block: &Block) -> (Event, Option<Event>) {
    match block.clone() {
        Block::Document => (Event::begin_document(), Some(Event::end_document())),
        Block::Group { parameters } => (
            Event::BeginGroup {
                parameters: parameters.clone(),
            },
            Some(Event::EndGroup { parameters }),
        ),
        Block::Paragraph { parameters } => (
            Event::BeginParagraph {
                parameters: parameters.clone(),
            },
            Some(Event::EndParagraph { parameters }),
        ),
        Block::Section { level, parameters } => (
            Event::BeginSection {
                level,
                parameters: parameters.clone(),
            },
            Some(Event::EndSection { level, parameters }),
        ),
        Block::List { kind, parameters } => (
            Event::BeginList {
                kind,
                parameters: parameters.clone(),
            },
            Some(Event::EndList { kind, parameters }),
        ),
        Block::ListItem => (Event::BeginListItem, Some(Event::EndListItem)),
        Block::Format { kind } => (Event::BeginFormat { kind }, Some(Event::EndFormat { kind })),
        Block::Link {
            reference,
            free_standing,
            parameters,
        } => (
            Event::BeginLink {
                reference: reference.clone(),
                free_standing,
                parameters: parameters.clone(),
            },
            Some(Event::EndLink {
                reference,
                free_standing,
                parameters,
            }),
        ),
        Block::Table { parameters } => (
            Event::BeginTable {
                parameters: parameters.clone(),
            },
            Some(Event::EndTable { parameters }),
        ),
        Block::TableRow { parameters } => (
            Event::BeginTableRow {
                parameters: parameters.clone(),
            },
            Some(Event::EndTableRow { parameters }),
        ),
        Block::TableCell { header, parameters } => (
            Event::BeginTableCell {
                header,
                parameters: parameters.clone(),
            },
            Some(Event::EndTableCell { header, parameters }),
        ),
        Block::Quotation { parameters } => (
            Event::BeginQuotation {
                parameters: parameters.clone(),
            },
            Some(Event::EndQuotation { parameters }),
        ),
        Block::QuotationLine => (Event::BeginQuotationLine, Some(Event::EndQuotationLine)),
        Block::Macro {
            call,
            inline,
            executed: true,
        } => (
            Event::BeginMacroMarker {
                call: call.clone(),
                inline,
            },
            Some(Event::EndMacroMarker { call, inline }),
        ),
        Block::Macro {
            call,
            inline,
            executed: false,
        } => (Event::Macro { call, inline }, None),
        Block::Image {
            reference,
            free_standing,
            parameters,
        } => (
            Event::Image {
                reference,
                free_standing,
                parameters,
            },
            None,
        ),
        Block::HorizontalLine { parameters } => (Event::HorizontalLine { parameters }, None),
        Block::Verbatim {
            content,
            inline,
            parameters,
        } => (
            Event::Verbatim {
                content,
                inline,
                parameters,
            },
            None,
        ),
        Block::EmptyLines(count) => (Event::EmptyLines { count }, None),
        Block::Word(text) => (Event::Word { text }, None),
        Block::Space => (Event::Space, None),
        Block::SpecialSymbol(symbol) => (Event::SpecialSymbol { symbol }, None),
        Block::Escape(text) => (Event::Escape { text }, None),
        Block::NewLine => (Event::NewLine, None),
        Block::LineBreak => (Event::LineBreak, None),
    }
}

impl Xdom {
    /// Replay the tree in document order as events into `listener`.
    ///
    /// # Errors
    ///
    /// Stops at the first error returned by the listener.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn traverse<L: Listener + ?Sized>(&self, listener: &mut L) -> Result<(), Error> {
        self.walk(self.root(), &mut |event| listener.on_event(&event))
    }

    /// The events [`Xdom::traverse`] would send, collected.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        // Collecting never fails.
        let _ = self.walk(self.root(), &mut |event| {
            events.push(event);
            Ok(())
        });
        events
    }

    fn walk(
        &self,
        id: NodeId,
        emit: &mut dyn FnMut(Event) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let Some(block) = self.block(id) else {
            return Err(Error::UnknownNode(id));
        };
        let (begin, end) = block_events(block);
        emit(begin)?;
        if let Some(end) = end {
            for child in self.children(id) {
                self.walk(*child, emit)?;
            }
            emit(end)?;
        }
        Ok(())
    }
}
