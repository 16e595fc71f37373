//! Escaping of free text so that it reads back as the same words.
//!
//! Text runs through an ordered list of passes. The first one protects every
//! escape character; each later pass only looks at characters that are still
//! unprotected, so no pass undoes or repeats the work of an earlier one.
//! Protected characters are printed with a `~` in front of them.
use std::sync::LazyLock;

use regex::Regex;
use xdom_parser::ChainState;

/// The escape character of `xwiki/2.0`.
pub const ESCAPE: char = '~';

/// Text that a block reader would take for a list item, header, table row
/// or quotation when it starts a line.
#[allow(clippy::expect_used)]
static LINE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[*1]*\*|[*1]*1\.)(?:\s|$)|^(?:=|\||!!|>)").expect("line start pattern is valid")
});

const STYLE_DELIMITERS: [&str; 8] = ["**", "//", "__", "--", "^^", ",,", "##", "\\\\"];
const RESOURCE_PREFIXES: [&str; 3] = ["image:", "attach:", "mailto:"];
const LINK_SEPARATORS: [&str; 3] = ["]]", ">>", "||"];

/// Where a piece of text is printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EscapeContext {
    pub at_line_start: bool,
    pub in_table_cell: bool,
    pub in_header: bool,
    /// Number of link labels the text sits in.
    pub link_depth: usize,
}

impl EscapeContext {
    /// The context of the event a chain stage is handling.
    #[must_use]
    pub fn from_state(state: &ChainState) -> Self {
        let blocks = state.blocks();
        Self {
            at_line_start: state.starts_line(),
            in_table_cell: blocks.is_in_table_cell(),
            in_header: blocks.is_in_section(),
            link_depth: blocks.link_depth(),
        }
    }
}

/// Everything [`escape`] needs to know besides the text itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct EscapeRequest<'a> {
    pub context: EscapeContext,
    /// The first character of every match is protected.
    pub escape_first_matching: &'a [&'a Regex],
    /// Protect the final character, for text directly followed by markup
    /// that would otherwise absorb it.
    pub escape_last_char: bool,
}

#[derive(Clone, Copy, Debug)]
struct Unit {
    c: char,
    escaped: bool,
}

/// Text with a protected flag per character.
#[derive(Debug)]
struct Marked(Vec<Unit>);

impl Marked {
    fn new(text: &str) -> Self {
        Self(
            text.chars()
                .map(|c| Unit { c, escaped: false })
                .collect(),
        )
    }

    fn plain(&self) -> String {
        self.0.iter().map(|unit| unit.c).collect()
    }

    fn is_free(&self, index: usize) -> bool {
        self.0.get(index).is_some_and(|unit| !unit.escaped)
    }

    fn protect(&mut self, index: usize) {
        if let Some(unit) = self.0.get_mut(index) {
            unit.escaped = true;
        }
    }

    /// Whether `pattern` starts at `index`, over unprotected characters only.
    fn free_match(&self, index: usize, pattern: &str) -> bool {
        pattern.chars().enumerate().all(|(offset, expected)| {
            self.0
                .get(index + offset)
                .is_some_and(|unit| !unit.escaped && unit.c == expected)
        })
    }

    /// Protect the characters at `offsets` within each free occurrence of
    /// `pattern`, scanning left to right without overlap.
    fn protect_each(&mut self, pattern: &str, offsets: &[usize]) {
        let width = pattern.chars().count();
        let mut index = 0;
        while index < self.0.len() {
            if self.free_match(index, pattern) {
                for offset in offsets {
                    self.protect(index + offset);
                }
                index += width;
            } else {
                index += 1;
            }
        }
    }

    /// Protect whole free occurrences of any of `patterns`, scanned together.
    fn protect_all(&mut self, patterns: &[&str]) {
        let mut index = 0;
        while index < self.0.len() {
            match patterns
                .iter()
                .find(|pattern| self.free_match(index, pattern))
            {
                Some(pattern) => {
                    let width = pattern.chars().count();
                    for offset in 0..width {
                        self.protect(index + offset);
                    }
                    index += width;
                }
                None => index += 1,
            }
        }
    }

    fn protect_last(&mut self) {
        if let Some(unit) = self.0.last_mut() {
            unit.escaped = true;
        }
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        for unit in &self.0 {
            if unit.escaped {
                out.push(ESCAPE);
            }
            out.push(unit.c);
        }
        out
    }
}

type Pass = fn(&mut Marked, &EscapeRequest<'_>);

const PASSES: [Pass; 12] = [
    escape_character,
    block_parameters,
    line_start,
    table_cell,
    caller_patterns,
    header,
    nested_constructs,
    style_delimiters,
    resource_prefixes,
    last_character,
    link_start,
    link_separators,
];

fn escape_character(text: &mut Marked, _: &EscapeRequest<'_>) {
    for unit in &mut text.0 {
        if unit.c == ESCAPE {
            unit.escaped = true;
        }
    }
}

fn block_parameters(text: &mut Marked, _: &EscapeRequest<'_>) {
    text.protect_each("(%", &[0]);
}

fn line_start(text: &mut Marked, request: &EscapeRequest<'_>) {
    if request.context.at_line_start && text.is_free(0) && LINE_START.is_match(&text.plain()) {
        text.protect(0);
    }
}

fn table_cell(text: &mut Marked, request: &EscapeRequest<'_>) {
    if request.context.in_table_cell {
        text.protect_each("|", &[0]);
        text.protect_each("!!", &[0, 1]);
    }
}

fn caller_patterns(text: &mut Marked, request: &EscapeRequest<'_>) {
    let plain = text.plain();
    for pattern in request.escape_first_matching {
        for found in pattern.find_iter(&plain) {
            let index = plain
                .get(..found.start())
                .map_or(0, |before| before.chars().count());
            text.protect(index);
        }
    }
}

fn header(text: &mut Marked, request: &EscapeRequest<'_>) {
    if request.context.in_header {
        text.protect_each("=", &[0]);
    }
}

/// `{{{`, `(((` and `)))` keep their first character, as does `{{`.
fn nested_constructs(text: &mut Marked, _: &EscapeRequest<'_>) {
    let mut index = 0;
    while index < text.0.len() {
        if ["{{{", "(((", ")))"]
            .iter()
            .any(|pattern| text.free_match(index, pattern))
        {
            text.protect(index + 1);
            text.protect(index + 2);
            index += 3;
        } else if text.free_match(index, "{{") {
            text.protect(index + 1);
            index += 2;
        } else {
            index += 1;
        }
    }
}

fn style_delimiters(text: &mut Marked, _: &EscapeRequest<'_>) {
    text.protect_all(&STYLE_DELIMITERS);
}

fn resource_prefixes(text: &mut Marked, _: &EscapeRequest<'_>) {
    for prefix in RESOURCE_PREFIXES {
        let colon = prefix.chars().count() - 1;
        text.protect_each(prefix, &[colon]);
    }
}

fn last_character(text: &mut Marked, request: &EscapeRequest<'_>) {
    if request.escape_last_char {
        text.protect_last();
    }
}

fn link_start(text: &mut Marked, _: &EscapeRequest<'_>) {
    text.protect_each("[[", &[0, 1]);
}

/// A label is unescaped once whatever its nesting, so one round of
/// separators covers every depth.
fn link_separators(text: &mut Marked, request: &EscapeRequest<'_>) {
    if request.context.link_depth > 0 {
        text.protect_all(&LINK_SEPARATORS);
    }
}

/// Escape `text` for the place described by `request`.
#[must_use]
pub fn escape(text: &str, request: &EscapeRequest<'_>) -> String {
    let mut marked = Marked::new(text);
    for pass in PASSES {
        pass(&mut marked, request);
    }
    marked.render()
}

fn protect_sequences(text: &str, sequences: &[&str]) -> String {
    let mut marked = Marked::new(text);
    marked.protect_all(sequences);
    marked.render()
}

/// A quoted macro parameter value.
#[must_use]
pub fn escape_parameter_value(value: &str) -> String {
    protect_sequences(value, &["~", "\"", "}}"])
}

/// A quoted value inside a `(% ... %)` block parameter line.
#[must_use]
pub fn escape_block_parameter_value(value: &str) -> String {
    protect_sequences(value, &["~", "\"", "%)"])
}

/// A quoted value in the parameter part of a link or image.
#[must_use]
pub fn escape_link_parameter_value(value: &str) -> String {
    protect_sequences(value, &["~", "\"", "]]"])
}

/// The reference part of a link or image. It is followed by `]]` or `||`,
/// so a trailing `]` or `|` is protected too.
#[must_use]
pub fn escape_reference(reference: &str) -> String {
    let mut marked = Marked::new(reference);
    marked.protect_all(&["~", ">>", "||", "]]", "[[", "{{"]);
    if marked.0.last().is_some_and(|unit| matches!(unit.c, ']' | '|')) {
        marked.protect_last();
    }
    marked.render()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn plain(text: &str) -> String {
        escape(text, &EscapeRequest::default())
    }

    fn within(context: EscapeContext, text: &str) -> String {
        escape(
            text,
            &EscapeRequest {
                context,
                ..EscapeRequest::default()
            },
        )
    }

    #[rstest]
    #[case("a*b", "a*b")]
    #[case("a**b", "a~*~*b")]
    #[case("***", "~*~**")]
    #[case("~", "~~")]
    #[case("~**", "~~~*~*")]
    #[case("(%x", "~(%x")]
    #[case("{{{x", "{~{~{x")]
    #[case("{{x", "{~{x")]
    #[case("(((", "(~(~(")]
    #[case("x)))", "x)~)~)")]
    #[case("http://x", "http:~/~/x")]
    #[case("a\\\\b", "a~\\~\\b")]
    #[case("image:a", "image~:a")]
    #[case("[[x]]", "~[~[x]]")]
    #[case("plain", "plain")]
    fn free_text(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(plain(text), expected);
    }

    #[rstest]
    #[case("*", "~*")]
    #[case("**", "~**")]
    #[case("1.", "~1.")]
    #[case("*1.", "~*1.")]
    #[case("=", "~=")]
    #[case("|a", "~|a")]
    #[case("!!", "~!!")]
    #[case(">", "~>")]
    #[case("*x", "*x")]
    #[case("1.5", "1.5")]
    fn line_start_markers(#[case] text: &str, #[case] expected: &str) {
        let context = EscapeContext {
            at_line_start: true,
            ..EscapeContext::default()
        };
        assert_eq!(within(context, text), expected);
    }

    #[test]
    fn table_cells_protect_separators() {
        let context = EscapeContext {
            in_table_cell: true,
            ..EscapeContext::default()
        };
        assert_eq!(within(context, "a|b!!c"), "a~|b~!~!c");
    }

    #[test]
    fn headers_protect_equal_signs() {
        let context = EscapeContext {
            in_header: true,
            ..EscapeContext::default()
        };
        assert_eq!(within(context, "a=b"), "a~=b");
    }

    #[rstest]
    #[case(1, "[[x]]", "~[~[x~]~]")]
    #[case(1, "a>>b||c", "a~>~>b~|~|c")]
    #[case(2, "a>>b", "a~>~>b")]
    #[case(0, "a>>b", "a>>b")]
    fn link_labels(#[case] depth: usize, #[case] text: &str, #[case] expected: &str) {
        let context = EscapeContext {
            link_depth: depth,
            ..EscapeContext::default()
        };
        assert_eq!(within(context, text), expected);
    }

    #[test]
    fn caller_patterns_protect_first_character_of_each_match() {
        let before_macro = Regex::new(r"\{$").unwrap();
        let patterns = [&before_macro];
        let request = EscapeRequest {
            escape_first_matching: &patterns,
            ..EscapeRequest::default()
        };
        assert_eq!(escape("x{", &request), "x~{");
        assert_eq!(escape("{x", &request), "{x");
    }

    #[test]
    fn last_character_on_request() {
        let request = EscapeRequest {
            escape_last_char: true,
            ..EscapeRequest::default()
        };
        assert_eq!(escape("a[", &request), "a~[");
        assert_eq!(escape("a~", &request), "a~~");
        assert_eq!(escape("", &request), "");
    }

    #[rstest]
    #[case("Space.Page", "Space.Page")]
    #[case("a>>b", "a~>~>b")]
    #[case("x]", "x~]")]
    #[case("x|", "x~|")]
    #[case("t~", "t~~")]
    #[case("{{m}}", "~{~{m}}")]
    fn references(#[case] reference: &str, #[case] expected: &str) {
        assert_eq!(escape_reference(reference), expected);
    }

    #[test]
    fn parameter_values() {
        assert_eq!(escape_parameter_value(r#"say "hi" }}"#), r#"say ~"hi~" ~}~}"#);
        assert_eq!(escape_block_parameter_value("50%)"), "50~%~)");
        assert_eq!(escape_link_parameter_value("a]]"), "a~]~]");
    }

    /// Walk `escaped`, skipping escape pairs, and report whether `pattern`
    /// occurs over unescaped characters.
    fn has_free(escaped: &str, pattern: &str) -> bool {
        let mut free = Vec::new();
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            if c == ESCAPE {
                chars.next();
                free.push(None);
            } else {
                free.push(Some(c));
            }
        }
        let wanted: Vec<Option<char>> = pattern.chars().map(Some).collect();
        free.windows(wanted.len()).any(|window| window == wanted.as_slice())
    }

    fn contexts() -> impl Strategy<Value = EscapeContext> {
        (any::<bool>(), any::<bool>(), any::<bool>(), 0usize..3).prop_map(
            |(at_line_start, in_table_cell, in_header, link_depth)| EscapeContext {
                at_line_start,
                in_table_cell,
                in_header,
                link_depth,
            },
        )
    }

    proptest! {
        /// Dropping the escapes again gives back the original text, whatever
        /// the passes decided to protect.
        #[test]
        fn unescaping_restores_the_text(
            text in "[a-z1 *./_~=|!>:(){}\\[\\]\\\\%^,#-]{0,24}",
            context in contexts(),
            last in any::<bool>(),
        ) {
            let request = EscapeRequest { context, escape_last_char: last, ..EscapeRequest::default() };
            let escaped = escape(&text, &request);
            prop_assert_eq!(xdom_parser::unescape(&escaped), text);
        }

        /// No style delimiter or link opener survives unescaped.
        #[test]
        fn no_free_markup_survives(
            text in "[a-z*/_~\\[{-]{0,24}",
            context in contexts(),
        ) {
            let escaped = within(context, &text);
            for pattern in STYLE_DELIMITERS.iter().chain(&["[[", "{{"]) {
                prop_assert!(!has_free(&escaped, pattern), "{escaped} keeps {pattern}");
            }
        }
    }
}
