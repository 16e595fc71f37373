//! The `xwiki/2.0` printer, written as a [`ChainingListener`] stage.
//!
//! Layout decisions come from the chain state: which constructs are open,
//! whether the text starts a line, and the event that follows. Free text is
//! handed to [`escape`](crate::escape::escape) with what the printer knows
//! about its position.
use std::sync::LazyLock;

use regex::Regex;
use xdom_parser::{
    Boundary, ChainState, ChainingListener, ContainerKind, Error, Event, ListKind, Parameters,
    ResourceReference,
};

use crate::{
    escape::{
        EscapeContext, EscapeRequest, escape, escape_block_parameter_value,
        escape_link_parameter_value, escape_reference,
    },
    macro_printer::{MacroPrinter, ParameterList},
};

/// A cell starting with `=` would read as a header cell.
#[allow(clippy::expect_used)]
static CELL_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=").expect("cell start pattern is valid"));

/// A `{` right before `{{` would open verbatim instead.
#[allow(clippy::expect_used)]
static BEFORE_CONSTRUCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{$").expect("construct pattern is valid"));

/// After bold openers at line start, text made of list marker characters
/// would complete a list item marker once the span closes.
#[allow(clippy::expect_used)]
static MARKER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[*1]+$").expect("marker run pattern is valid"));

/// Character pairs that mean something when text ends with the first one and
/// the following markup starts with the second.
const JOINING: [&str; 16] = [
    "**", "//", "__", "--", "^^", ",,", "##", "\\\\", "[[", "]]", "{{", "((", "))", ">>", "||",
    "(%",
];

#[derive(Clone, Copy, Debug)]
struct Label {
    /// Only outermost links are printed; nested ones keep their label text.
    printed: bool,
    start: usize,
}

/// Prints the events it receives as `xwiki/2.0` markup.
#[derive(Debug, Default)]
pub struct SyntaxRenderer {
    expand_macros: bool,
    out: String,
    /// Blocks printed so far in each open document or group.
    frames: Vec<usize>,
    /// Items printed so far in each open top-level list.
    list_items: Vec<usize>,
    list_kinds: Vec<ListKind>,
    /// Lines printed so far in each open top-level quotation.
    quotation_lines: Vec<usize>,
    labels: Vec<Label>,
    cell_start: bool,
    /// Depth of the macro marker whose produced content is left out.
    skipping: Option<usize>,
}

impl SyntaxRenderer {
    /// With `expand_macros`, executed macros print what they produced;
    /// otherwise they print their call.
    #[must_use]
    pub fn new(expand_macros: bool) -> Self {
        Self {
            expand_macros,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.out
    }

    fn start_block(&mut self, parameters: Option<&Parameters>) {
        if let Some(printed) = self.frames.last_mut() {
            if *printed > 0 {
                self.out.push_str("\n\n");
            }
            *printed += 1;
        }
        if let Some(parameters) = parameters.filter(|parameters| !parameters.is_empty()) {
            let list = ParameterList {
                parameters,
                escape_value: escape_block_parameter_value,
            };
            self.out.push_str(&format!("(% {list} %)\n"));
        }
    }

    /// Start a block when it sits directly in a document or group. Nested
    /// blocks continue the line of their container.
    fn start_block_if_standalone(
        &mut self,
        state: &ChainState,
        opened: bool,
        parameters: Option<&Parameters>,
    ) -> bool {
        if is_standalone(state, opened) {
            self.start_block(parameters);
            true
        } else {
            if parameters.is_some_and(|parameters| !parameters.is_empty()) {
                tracing::debug!(
                    container = ?state.blocks().current(),
                    "parameters of a nested block are not printed"
                );
            }
            false
        }
    }

    fn begin_group(&mut self, state: &ChainState, parameters: &Parameters) {
        self.start_block_if_standalone(state, true, Some(parameters));
        self.out.push_str("(((\n");
        self.frames.push(0);
    }

    fn end_group(&mut self) {
        self.out.push_str("\n)))");
        self.frames.pop();
    }

    fn text(&mut self, text: &str, state: &ChainState, cell_start: bool) {
        let mut patterns: Vec<&Regex> = Vec::new();
        if cell_start {
            patterns.push(&CELL_START);
        }
        if state.next_event().is_some_and(opens_construct) {
            patterns.push(&BEFORE_CONSTRUCT);
        }
        if state.starts_line() && self.line_holds_only_stars() {
            patterns.push(&MARKER_RUN);
        }
        let escape_last_char =
            if let (Some(last), Some(follower)) = (text.chars().next_back(), self.follower(state)) {
                follower
                    .chars()
                    .next()
                    .is_some_and(|first| JOINING.contains(&format!("{last}{first}").as_str()))
            } else {
                false
            };
        let request = EscapeRequest {
            context: EscapeContext::from_state(state),
            escape_first_matching: &patterns,
            escape_last_char,
        };
        self.out.push_str(&escape(text, &request));
    }

    fn line_holds_only_stars(&self) -> bool {
        let line = self.out.rsplit('\n').next().unwrap_or_default();
        !line.is_empty() && line.chars().all(|c| c == '*')
    }

    /// The markup printed right after the current event, when known.
    fn follower(&self, state: &ChainState) -> Option<String> {
        let next = state.next_event()?;
        let follower = match next {
            Event::BeginFormat { kind } | Event::EndFormat { kind } => kind.delimiter().to_string(),
            Event::BeginLink { .. } | Event::Image { .. } => "[[".to_string(),
            Event::LineBreak => "\\\\".to_string(),
            Event::Macro { .. } | Event::Verbatim { .. } | Event::BeginMacroMarker { .. } => {
                "{{".to_string()
            }
            Event::Word { text } => text.clone(),
            Event::SpecialSymbol { symbol } => symbol.to_string(),
            Event::EndLink { .. } => {
                if self.labels.last().is_some_and(|label| label.printed) {
                    ">>".to_string()
                } else {
                    return None;
                }
            }
            Event::BeginDocument { .. }
            | Event::EndDocument { .. }
            | Event::BeginGroup { .. }
            | Event::EndGroup { .. }
            | Event::BeginParagraph { .. }
            | Event::EndParagraph { .. }
            | Event::BeginSection { .. }
            | Event::EndSection { .. }
            | Event::BeginList { .. }
            | Event::EndList { .. }
            | Event::BeginListItem
            | Event::EndListItem
            | Event::BeginTable { .. }
            | Event::EndTable { .. }
            | Event::BeginTableRow { .. }
            | Event::EndTableRow { .. }
            | Event::BeginTableCell { .. }
            | Event::EndTableCell { .. }
            | Event::BeginQuotation { .. }
            | Event::EndQuotation { .. }
            | Event::BeginQuotationLine
            | Event::EndQuotationLine
            | Event::EndMacroMarker { .. }
            | Event::Space
            | Event::Escape { .. }
            | Event::NewLine
            | Event::HorizontalLine { .. }
            | Event::EmptyLines { .. } => return None,
        };
        Some(follower)
    }

    fn new_line(&mut self, state: &ChainState) {
        let in_single_line = matches!(
            state.blocks().current_block(),
            Some(ContainerKind::TableCell | ContainerKind::Section | ContainerKind::QuotationLine)
        );
        // A plain new line here would end the container or leave a blank
        // line behind.
        if in_single_line
            || state.starts_line()
            || state.new_line_count() > 1
            || state.next_event().is_none_or(ends_block)
        {
            self.out.push_str("\\\\");
        } else {
            self.out.push('\n');
        }
    }

    fn list_item(&mut self) {
        if let Some(printed) = self.list_items.last_mut() {
            if *printed > 0 {
                self.out.push('\n');
            }
            *printed += 1;
        }
        let mut marker: String = self.list_kinds.iter().map(|kind| kind.marker()).collect();
        if self.list_kinds.last() == Some(&ListKind::Numbered) {
            marker.push('.');
        }
        self.out.push_str(&marker);
        self.out.push(' ');
    }

    fn quotation_line(&mut self, state: &ChainState) {
        if let Some(printed) = self.quotation_lines.last_mut() {
            if *printed > 0 {
                self.out.push('\n');
            }
            *printed += 1;
        }
        self.out
            .push_str(&">".repeat(state.blocks().quotation_depth()));
    }

    fn begin_link(&mut self, state: &ChainState) {
        let printed = state.blocks().link_depth() == 1;
        if printed {
            self.out.push_str("[[");
        }
        self.labels.push(Label {
            printed,
            start: self.out.len(),
        });
    }

    fn end_link(
        &mut self,
        reference: &ResourceReference,
        parameters: &Parameters,
        state: &ChainState,
    ) {
        let Some(label) = self.labels.pop() else {
            return;
        };
        let has_label = self.out.len() > label.start;
        if !label.printed {
            if !has_label {
                self.text(&reference.to_string(), state, false);
            }
            return;
        }
        if has_label {
            self.out.push_str(">>");
        }
        self.out.push_str(&escape_reference(&reference.to_string()));
        self.link_parameters(parameters);
        self.out.push_str("]]");
    }

    fn image(&mut self, reference: &ResourceReference, parameters: &Parameters) {
        self.out.push_str("[[image:");
        self.out.push_str(&escape_reference(&reference.reference));
        self.link_parameters(parameters);
        self.out.push_str("]]");
    }

    fn link_parameters(&mut self, parameters: &Parameters) {
        if !parameters.is_empty() {
            let list = ParameterList {
                parameters,
                escape_value: escape_link_parameter_value,
            };
            self.out.push_str(&format!("||{list}"));
        }
    }

    fn verbatim(&mut self, content: &str, inline: bool) {
        if content.contains("}}}") {
            tracing::warn!(content, "verbatim content holding `}}}}}}` cannot be printed as is");
        }
        if !inline && content.contains('\n') {
            self.out.push_str(&format!("{{{{{{\n{content}\n}}}}}}"));
        } else {
            self.out.push_str(&format!("{{{{{{{content}}}}}}}"));
        }
    }
}

/// Whether the block that `state` describes sits directly in a document or
/// group. `opened` tells whether the event opened a construct of its own,
/// which is then the innermost one.
fn is_standalone(state: &ChainState, opened: bool) -> bool {
    let enclosing = state
        .blocks()
        .open()
        .skip(usize::from(opened))
        .find(|kind| *kind != ContainerKind::MacroMarker);
    matches!(
        enclosing,
        None | Some(ContainerKind::Document | ContainerKind::Group)
    )
}

fn opens_construct(event: &Event) -> bool {
    matches!(
        event,
        Event::Macro { inline: true, .. }
            | Event::Verbatim { inline: true, .. }
            | Event::BeginMacroMarker { inline: true, .. }
    )
}

fn ends_block(event: &Event) -> bool {
    matches!(
        event.boundary(),
        Some((
            Boundary::End,
            ContainerKind::Document
                | ContainerKind::Group
                | ContainerKind::Paragraph
                | ContainerKind::Section
                | ContainerKind::List
                | ContainerKind::ListItem
                | ContainerKind::Table
                | ContainerKind::TableRow
                | ContainerKind::TableCell
                | ContainerKind::Quotation
                | ContainerKind::QuotationLine
        ))
    )
}

impl ChainingListener for SyntaxRenderer {
    #[allow(clippy::too_many_lines)]
    fn on_event(&mut self, event: &Event, state: &ChainState) -> Result<(), Error> {
        if let Some(depth) = self.skipping {
            if matches!(event, Event::EndMacroMarker { .. }) && state.blocks().depth() < depth {
                self.skipping = None;
            }
            return Ok(());
        }
        let cell_start = std::mem::take(&mut self.cell_start);

        match event {
            Event::BeginDocument { parameters } => {
                if state.blocks().depth() == 1 {
                    self.frames.push(0);
                } else {
                    self.begin_group(state, parameters);
                }
            }
            Event::EndDocument { .. } => {
                if state.blocks().depth() == 0 {
                    self.frames.pop();
                } else {
                    self.end_group();
                }
            }
            Event::BeginGroup { parameters } => self.begin_group(state, parameters),
            Event::EndGroup { .. } => self.end_group(),
            Event::BeginParagraph { parameters } => {
                self.start_block_if_standalone(state, true, Some(parameters));
            }
            Event::BeginSection { level, parameters } => {
                self.start_block_if_standalone(state, true, Some(parameters));
                self.out.push_str(&"=".repeat(usize::from(level.get())));
                self.out.push(' ');
            }
            Event::EndSection { level, .. } => {
                self.out.push(' ');
                self.out.push_str(&"=".repeat(usize::from(level.get())));
            }
            Event::BeginList { kind, parameters } => {
                if self.start_block_if_standalone(state, true, Some(parameters)) {
                    self.list_items.push(0);
                }
                self.list_kinds.push(*kind);
            }
            Event::EndList { .. } => {
                self.list_kinds.pop();
                if is_standalone(state, false) {
                    self.list_items.pop();
                }
            }
            Event::BeginListItem => self.list_item(),
            Event::BeginTable { parameters } => {
                self.start_block_if_standalone(state, true, Some(parameters));
            }
            Event::BeginTableRow { .. } => {
                if state.blocks().row_index().is_some_and(|index| index > 0) {
                    self.out.push('\n');
                }
            }
            Event::BeginTableCell { header, .. } => {
                self.out.push_str(if *header { "|=" } else { "|" });
                self.cell_start = true;
            }
            Event::BeginQuotation { parameters } => {
                if self.start_block_if_standalone(state, true, Some(parameters)) {
                    self.quotation_lines.push(0);
                }
            }
            Event::EndQuotation { .. } => {
                if is_standalone(state, false) {
                    self.quotation_lines.pop();
                }
            }
            Event::BeginQuotationLine => self.quotation_line(state),
            Event::BeginFormat { kind } | Event::EndFormat { kind } => {
                self.out.push_str(kind.delimiter());
            }
            Event::BeginLink { .. } => self.begin_link(state),
            Event::EndLink {
                reference,
                parameters,
                ..
            } => self.end_link(reference, parameters, state),
            Event::Image {
                reference,
                parameters,
                ..
            } => self.image(reference, parameters),
            Event::Word { text } => self.text(text, state, cell_start),
            Event::SpecialSymbol { symbol } => self.text(&symbol.to_string(), state, cell_start),
            Event::Escape { text } => {
                for c in text.chars() {
                    self.out.push(crate::escape::ESCAPE);
                    self.out.push(c);
                }
            }
            Event::Space => self.out.push(' '),
            Event::NewLine => self.new_line(state),
            Event::LineBreak => self.out.push_str("\\\\"),
            Event::EmptyLines { count } => {
                if is_standalone(state, false) {
                    self.out.push_str(&"\n".repeat(*count));
                }
            }
            Event::HorizontalLine { parameters } => {
                self.start_block_if_standalone(state, false, Some(parameters));
                self.out.push_str("----");
            }
            Event::Verbatim {
                content,
                inline,
                parameters,
            } => {
                let standalone =
                    !inline && self.start_block_if_standalone(state, false, Some(parameters));
                self.verbatim(content, !standalone);
            }
            Event::Macro { call, inline } => {
                let standalone = !inline && self.start_block_if_standalone(state, false, None);
                self.out
                    .push_str(&MacroPrinter::new(call, !standalone).to_string());
            }
            Event::BeginMacroMarker { call, inline } => {
                if !self.expand_macros {
                    let standalone = !inline && self.start_block_if_standalone(state, true, None);
                    self.out
                        .push_str(&MacroPrinter::new(call, !standalone).to_string());
                    self.skipping = Some(state.blocks().depth());
                }
            }
            Event::EndParagraph { .. }
            | Event::EndListItem
            | Event::EndTable { .. }
            | Event::EndTableRow { .. }
            | Event::EndTableCell { .. }
            | Event::EndQuotationLine
            | Event::EndMacroMarker { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use xdom_parser::{
        Block, BlockTree, FormatKind, ListenerChain, MacroCall, Options, ResourceKind, Xdom, parse,
    };

    use super::*;

    fn render(xdom: &Xdom, expand_macros: bool) -> String {
        let mut renderer = SyntaxRenderer::new(expand_macros);
        let mut chain = ListenerChain::new();
        chain.add_listener(&mut renderer);
        xdom.traverse(&mut chain).unwrap();
        chain.finish().unwrap();
        renderer.into_output()
    }

    fn reprint(source: &str) -> String {
        render(&parse(source, &Options::default()).unwrap(), false)
    }

    fn document(children: Vec<BlockTree>) -> Xdom {
        BlockTree::new(Block::Document, children).into_xdom().unwrap()
    }

    fn paragraph(children: Vec<BlockTree>) -> BlockTree {
        BlockTree::new(Block::paragraph(), children)
    }

    fn word(text: &str) -> BlockTree {
        BlockTree::leaf(Block::word(text))
    }

    #[rstest]
    #[case::paragraphs("a b\n\nc")]
    #[case::section("== Title ==")]
    #[case::styles("**bold** //it// __u__ --s-- ^^sup^^ ,,sub,, ##mono##")]
    #[case::nested_lists("* a\n** b\n*1. c\n* d")]
    #[case::numbered("1. one\n1. two")]
    #[case::table("|=H|=I\n|a|**b**")]
    #[case::quotation(">one\n>>two\n>three")]
    #[case::horizontal_line("a\n\n----\n\nb")]
    #[case::verbatim("{{{raw **x**}}}")]
    #[case::multi_line_verbatim("{{{\nline one\nline two\n}}}")]
    #[case::inline_verbatim("see {{{**x**}}} here")]
    #[case::macro_call("{{code language=\"rust\"}}\nfn main() {}\n{{/code}}")]
    #[case::inline_macro("see {{get name=\"x\"/}} now")]
    #[case::group("(((\ninner\n\nmore\n)))")]
    #[case::parameters("(% class=\"note\" %)\nText")]
    #[case::link("[[label **x**>>Space.Page||target=\"_blank\"]]")]
    #[case::bare_link("[[Space.Page]]")]
    #[case::image("[[image:logo.png||width=\"20\"]]")]
    #[case::line_break("a\\\\b")]
    #[case::new_line("a\nb")]
    #[case::empty_lines("a\n\n\n\nb")]
    #[case::escaped("a~*~*b ~[~[x]] ~~")]
    #[case::escaped_label("[[~[~[x~]~]>>A]]")]
    fn reprints_canonical_markup(#[case] source: &str) {
        assert_eq!(reprint(source), source);
    }

    #[test]
    fn escapes_line_start_markers() {
        let xdom = document(vec![paragraph(vec![
            word("*"),
            BlockTree::leaf(Block::Space),
            word("x"),
            BlockTree::leaf(Block::NewLine),
            word("="),
            BlockTree::leaf(Block::Space),
            word("y"),
        ])]);
        assert_eq!(render(&xdom, false), "~* x\n~= y");
    }

    #[test]
    fn escapes_text_merging_with_markup() {
        let xdom = document(vec![paragraph(vec![
            word("a*"),
            BlockTree::new(Block::format(FormatKind::Bold), vec![word("b*")]),
            word("c["),
            BlockTree::leaf(Block::Image {
                reference: ResourceReference::new(ResourceKind::Attachment, "i.png"),
                free_standing: false,
                parameters: Parameters::new(),
            }),
        ])]);
        assert_eq!(render(&xdom, false), "a~***b~***c~[[[image:i.png]]");
    }

    #[test]
    fn table_cells_keep_their_kind() {
        let cell = |children| {
            BlockTree::new(
                Block::TableCell {
                    header: false,
                    parameters: Parameters::new(),
                },
                children,
            )
        };
        let row = BlockTree::new(
            Block::TableRow {
                parameters: Parameters::new(),
            },
            vec![
                cell(vec![word("=x")]),
                cell(vec![word("a|b"), BlockTree::leaf(Block::NewLine), word("c")]),
            ],
        );
        let xdom = document(vec![BlockTree::new(
            Block::Table {
                parameters: Parameters::new(),
            },
            vec![row],
        )]);
        assert_eq!(render(&xdom, false), "|~=x|a~|b\\\\c");
    }

    #[test]
    fn trailing_and_doubled_new_lines_become_breaks() {
        let xdom = document(vec![paragraph(vec![
            word("a"),
            BlockTree::leaf(Block::NewLine),
            BlockTree::leaf(Block::NewLine),
            word("b"),
            BlockTree::leaf(Block::NewLine),
        ])]);
        assert_eq!(render(&xdom, false), "a\n\\\\b\\\\");
    }

    #[test]
    fn nested_links_print_their_label_only() {
        let link = |reference: &str, children| {
            BlockTree::new(
                Block::Link {
                    reference: ResourceReference::parse_link(reference),
                    free_standing: false,
                    parameters: Parameters::new(),
                },
                children,
            )
        };
        let xdom = document(vec![paragraph(vec![link(
            "Outer",
            vec![word("see"), link("Inner", vec![]), link("X", vec![word("y>>")])],
        )])]);
        assert_eq!(render(&xdom, false), "[[seeInnery~>~>>>Outer]]");
    }

    fn executed_include() -> Xdom {
        let call = MacroCall::new("include").with_parameter("document", "B");
        document(vec![
            paragraph(vec![word("before")]),
            BlockTree::new(
                Block::Macro {
                    call,
                    inline: false,
                    executed: true,
                },
                vec![paragraph(vec![word("included")])],
            ),
        ])
    }

    #[rstest]
    #[case::calls(false, "before\n\n{{include document=\"B\"/}}")]
    #[case::content(true, "before\n\nincluded")]
    fn executed_macros(#[case] expand: bool, #[case] expected: &str) {
        assert_eq!(render(&executed_include(), expand), expected);
    }

    #[test]
    fn block_parameters_are_escaped() {
        let xdom = document(vec![BlockTree::new(
            Block::Paragraph {
                parameters: Parameters::new().with("title", "say \"hi\" 100%)"),
            },
            vec![word("x")],
        )]);
        assert_eq!(
            render(&xdom, false),
            "(% title=\"say ~\"hi~\" 100~%~)\" %)\nx"
        );
    }
}
