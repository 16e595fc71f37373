use std::collections::VecDeque;

use crate::Event;

/// How many events are held back before being released.
pub const LOOKAHEAD_DEPTH: usize = 2;

/// Small buffer between the event source and the chain stages.
///
/// Holding events back lets stages see the next event, and lets a style
/// span that closes right after it opens be dropped before anyone sees it.
/// A run of begin-format events at the tail may still collapse, so the
/// buffer grows past [`LOOKAHEAD_DEPTH`] until something settles it.
#[derive(Debug, Default)]
pub(crate) struct Lookahead {
    buffer: VecDeque<Event>,
    documents: usize,
}

impl Lookahead {
    /// Queue `event`; returns the events that are ready to be released.
    pub(crate) fn push(&mut self, event: Event) -> Vec<Event> {
        if let Event::EndFormat { kind } = &event {
            if matches!(self.buffer.back(), Some(Event::BeginFormat { kind: open }) if open == kind) {
                tracing::trace!(%kind, "dropping empty format span");
                self.buffer.pop_back();
                return Vec::new();
            }
        } else if matches!(event, Event::BeginDocument { .. }) {
            self.documents += 1;
        } else if matches!(event, Event::EndDocument { .. }) {
            self.documents = self.documents.saturating_sub(1);
        }
        let closes_stream = matches!(event, Event::EndDocument { .. }) && self.documents == 0;
        self.buffer.push_back(event);

        if closes_stream {
            return self.drain();
        }
        let mut ready = Vec::new();
        while self.buffer.len() > LOOKAHEAD_DEPTH && self.settled(1) {
            if let Some(event) = self.buffer.pop_front() {
                ready.push(event);
            }
        }
        ready
    }

    // The event at `index` can no longer be dropped: it is not a
    // begin-format event, or something other than one follows it.
    fn settled(&self, index: usize) -> bool {
        self.buffer
            .range(index..)
            .any(|event| !matches!(event, Event::BeginFormat { .. }))
    }

    /// Release everything still held.
    pub(crate) fn drain(&mut self) -> Vec<Event> {
        self.buffer.drain(..).collect()
    }

    /// The oldest held event, the one that follows whatever was released
    /// last.
    pub(crate) fn front(&self) -> Option<&Event> {
        self.buffer.front()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::FormatKind;

    #[test]
    fn holds_back_two_events() {
        let mut lookahead = Lookahead::default();
        assert!(lookahead.push(Event::begin_document()).is_empty());
        assert!(lookahead.push(Event::begin_paragraph()).is_empty());
        assert_eq!(lookahead.push(Event::word("a")), vec![Event::begin_document()]);
        assert_eq!(lookahead.front(), Some(&Event::begin_paragraph()));
    }

    #[test]
    fn drops_empty_format_pairs() {
        let mut lookahead = Lookahead::default();
        let bold = FormatKind::Bold;
        lookahead.push(Event::begin_document());
        lookahead.push(Event::begin_paragraph());
        lookahead.push(Event::BeginFormat { kind: bold });
        lookahead.push(Event::EndFormat { kind: bold });
        lookahead.push(Event::end_paragraph());
        let rest = lookahead.push(Event::end_document());
        assert_eq!(
            rest,
            vec![Event::begin_paragraph(), Event::end_paragraph(), Event::end_document()]
        );
    }

    #[test]
    fn pending_format_run_is_not_announced() {
        let mut lookahead = Lookahead::default();
        let (bold, italic) = (FormatKind::Bold, FormatKind::Italic);
        lookahead.push(Event::begin_document());
        lookahead.push(Event::begin_paragraph());
        lookahead.push(Event::word("a"));
        lookahead.push(Event::BeginFormat { kind: bold });
        // The word stays held: its successor may still vanish.
        assert!(lookahead.push(Event::BeginFormat { kind: italic }).is_empty());
        assert!(lookahead.push(Event::EndFormat { kind: italic }).is_empty());
        assert!(lookahead.push(Event::EndFormat { kind: bold }).is_empty());
        assert!(lookahead.push(Event::word("b")).is_empty());
        assert_eq!(lookahead.push(Event::end_paragraph()), vec![Event::word("a")]);
        assert_eq!(lookahead.front(), Some(&Event::word("b")));
    }

    #[test]
    fn nested_document_does_not_flush() {
        let mut lookahead = Lookahead::default();
        lookahead.push(Event::begin_document());
        lookahead.push(Event::begin_document());
        assert_eq!(lookahead.push(Event::end_document()).len(), 1);
        let rest = lookahead.push(Event::end_document());
        assert_eq!(rest.len(), 3);
        assert!(lookahead.front().is_none());
    }
}
