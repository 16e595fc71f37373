//! Composable event pipelines.
//!
//! A [`ListenerChain`] holds events back in a small lookahead buffer, keeps
//! a [`ChainState`] up to date, and hands every released event to its stages
//! in order together with that state.
use crate::{
    Error, Event, FormatKind, HeaderLevel, ListKind, Listener, MacroCall, Parameters,
    ResourceReference,
};

mod lookahead;
mod state;

pub use lookahead::LOOKAHEAD_DEPTH;
pub use state::{BlockState, ChainState, LineState, NewLineState};

use lookahead::Lookahead;

/// A stage of a [`ListenerChain`].
pub trait ChainingListener {
    /// Handle `event`. `state` already reflects it: on an end event the
    /// construct is no longer open.
    ///
    /// # Errors
    ///
    /// Implementations fail on structural faults they detect.
    fn on_event(&mut self, event: &Event, state: &ChainState) -> Result<(), Error>;
}

/// Ordered stages fed from one event source.
///
/// State lives for one pass; build a new chain per render.
#[derive(Default)]
pub struct ListenerChain<'a> {
    state: ChainState,
    lookahead: Lookahead,
    stages: Vec<&'a mut dyn ChainingListener>,
}

impl<'a> ListenerChain<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, stage: &'a mut dyn ChainingListener) {
        self.stages.push(stage);
    }

    #[must_use]
    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Feed one event. It reaches the stages once the lookahead has seen
    /// what follows it, or when the outermost document ends.
    ///
    /// # Errors
    ///
    /// Returns structural faults from the state stages and any error from a
    /// stage.
    pub fn dispatch(&mut self, event: Event) -> Result<(), Error> {
        let ready = self.lookahead.push(event);
        self.release(ready)
    }

    /// Release whatever the lookahead still holds.
    ///
    /// # Errors
    ///
    /// Same as [`ListenerChain::dispatch`].
    pub fn finish(&mut self) -> Result<(), Error> {
        let ready = self.lookahead.drain();
        self.release(ready)
    }

    fn release(&mut self, ready: Vec<Event>) -> Result<(), Error> {
        let mut ready = ready.into_iter().peekable();
        while let Some(event) = ready.next() {
            let next = ready.peek().or(self.lookahead.front());
            self.state.update(&event, next)?;
            for stage in &mut self.stages {
                stage.on_event(&event, &self.state)?;
            }
        }
        Ok(())
    }
}

macro_rules! forward {
    ($($name:ident($($arg:ident: $ty:ty),*) => $event:expr;)*) => {
        $(
            fn $name(&mut self, $($arg: $ty),*) -> Result<(), Error> {
                self.dispatch($event)
            }
        )*
    };
}

impl Listener for ListenerChain<'_> {
    forward! {
        begin_document(parameters: &Parameters) => Event::BeginDocument { parameters: parameters.clone() };
        end_document(parameters: &Parameters) => Event::EndDocument { parameters: parameters.clone() };
        begin_group(parameters: &Parameters) => Event::BeginGroup { parameters: parameters.clone() };
        end_group(parameters: &Parameters) => Event::EndGroup { parameters: parameters.clone() };
        begin_paragraph(parameters: &Parameters) => Event::BeginParagraph { parameters: parameters.clone() };
        end_paragraph(parameters: &Parameters) => Event::EndParagraph { parameters: parameters.clone() };
        begin_section(level: HeaderLevel, parameters: &Parameters) => Event::BeginSection { level, parameters: parameters.clone() };
        end_section(level: HeaderLevel, parameters: &Parameters) => Event::EndSection { level, parameters: parameters.clone() };
        begin_list(kind: ListKind, parameters: &Parameters) => Event::BeginList { kind, parameters: parameters.clone() };
        end_list(kind: ListKind, parameters: &Parameters) => Event::EndList { kind, parameters: parameters.clone() };
        begin_list_item() => Event::BeginListItem;
        end_list_item() => Event::EndListItem;
        begin_format(kind: FormatKind) => Event::BeginFormat { kind };
        end_format(kind: FormatKind) => Event::EndFormat { kind };
        begin_link(reference: &ResourceReference, free_standing: bool, parameters: &Parameters) => Event::BeginLink {
            reference: reference.clone(),
            free_standing,
            parameters: parameters.clone(),
        };
        end_link(reference: &ResourceReference, free_standing: bool, parameters: &Parameters) => Event::EndLink {
            reference: reference.clone(),
            free_standing,
            parameters: parameters.clone(),
        };
        begin_table(parameters: &Parameters) => Event::BeginTable { parameters: parameters.clone() };
        end_table(parameters: &Parameters) => Event::EndTable { parameters: parameters.clone() };
        begin_table_row(parameters: &Parameters) => Event::BeginTableRow { parameters: parameters.clone() };
        end_table_row(parameters: &Parameters) => Event::EndTableRow { parameters: parameters.clone() };
        begin_table_cell(header: bool, parameters: &Parameters) => Event::BeginTableCell { header, parameters: parameters.clone() };
        end_table_cell(header: bool, parameters: &Parameters) => Event::EndTableCell { header, parameters: parameters.clone() };
        begin_quotation(parameters: &Parameters) => Event::BeginQuotation { parameters: parameters.clone() };
        end_quotation(parameters: &Parameters) => Event::EndQuotation { parameters: parameters.clone() };
        begin_quotation_line() => Event::BeginQuotationLine;
        end_quotation_line() => Event::EndQuotationLine;
        begin_macro_marker(call: &MacroCall, inline: bool) => Event::BeginMacroMarker { call: call.clone(), inline };
        end_macro_marker(call: &MacroCall, inline: bool) => Event::EndMacroMarker { call: call.clone(), inline };
        on_word(text: &str) => Event::word(text);
        on_space() => Event::Space;
        on_special_symbol(symbol: char) => Event::SpecialSymbol { symbol };
        on_escape(text: &str) => Event::Escape { text: text.to_string() };
        on_new_line() => Event::NewLine;
        on_line_break() => Event::LineBreak;
        on_image(reference: &ResourceReference, free_standing: bool, parameters: &Parameters) => Event::Image {
            reference: reference.clone(),
            free_standing,
            parameters: parameters.clone(),
        };
        on_macro(call: &MacroCall, inline: bool) => Event::Macro { call: call.clone(), inline };
        on_verbatim(content: &str, inline: bool, parameters: &Parameters) => Event::Verbatim {
            content: content.to_string(),
            inline,
            parameters: parameters.clone(),
        };
        on_horizontal_line(parameters: &Parameters) => Event::HorizontalLine { parameters: parameters.clone() };
        on_empty_lines(count: usize) => Event::EmptyLines { count };
    }

    fn on_event(&mut self, event: &Event) -> Result<(), Error> {
        self.dispatch(event.clone())
    }
}
