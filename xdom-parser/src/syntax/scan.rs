//! Byte-offset scanners shared by the block and inline readers.
//!
//! Every scanner skips `~x` escape pairs and steps over constructs that may
//! contain the delimiter being searched for (verbatim, macros, groups,
//! links).
use crate::{MacroCall, syntax::parse_parameters};

pub(super) const ESCAPE: char = '~';

/// Byte length of the character at `at`, 1 past the end.
pub(super) fn char_len(text: &str, at: usize) -> usize {
    text.get(at..)
        .and_then(|rest| rest.chars().next())
        .map_or(1, char::len_utf8)
}

/// Offset just past the escape pair starting at `at`.
fn skip_escape(text: &str, at: usize) -> usize {
    let next = at + 1;
    if next >= text.len() {
        next
    } else {
        next + char_len(text, next)
    }
}

/// Start of the `}}}` closing a verbatim whose content begins at `from`.
pub(super) fn find_verbatim_end(text: &str, from: usize) -> Option<usize> {
    text.get(from..)?.find("}}}").map(|offset| from + offset)
}

/// A macro call found in the text, with the offset just past it.
pub(super) struct MacroSpan {
    pub call: MacroCall,
    pub end: usize,
}

struct OpenTag<'a> {
    name: &'a str,
    parameters: &'a str,
    self_closing: bool,
    end: usize,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn open_tag(text: &str, at: usize) -> Option<OpenTag<'_>> {
    let rest = text.get(at..)?;
    if !rest.starts_with("{{") || rest.starts_with("{{{") || rest.starts_with("{{/") {
        return None;
    }
    let name_start = at + 2;
    let after = text.get(name_start..)?;
    if !after.chars().next().is_some_and(char::is_alphabetic) {
        return None;
    }
    let name_len = after
        .char_indices()
        .find(|(_, c)| !is_name_char(*c))
        .map_or(after.len(), |(offset, _)| offset);
    let name_end = name_start + name_len;
    let name = text.get(name_start..name_end)?;

    let mut in_quote = false;
    let mut position = name_end;
    let tail = text.get(name_end..)?;
    if !(tail.starts_with(char::is_whitespace) || tail.starts_with("/}}") || tail.starts_with("}}"))
    {
        return None;
    }
    while position < text.len() {
        let here = text.get(position..)?;
        if in_quote {
            if here.starts_with(ESCAPE) {
                position = skip_escape(text, position);
                continue;
            }
            if here.starts_with('"') {
                in_quote = false;
            }
        } else if here.starts_with('"') {
            in_quote = true;
        } else if here.starts_with("/}}") {
            return Some(OpenTag {
                name,
                parameters: text.get(name_end..position)?,
                self_closing: true,
                end: position + 3,
            });
        } else if here.starts_with("}}") {
            return Some(OpenTag {
                name,
                parameters: text.get(name_end..position)?,
                self_closing: false,
                end: position + 2,
            });
        }
        position += char_len(text, position);
    }
    None
}

/// Parse the macro call starting at `at` (`{{name ...}}`), including its
/// content up to the matching `{{/name}}`. Content is raw text.
pub(super) fn parse_macro(text: &str, at: usize) -> Option<MacroSpan> {
    let tag = open_tag(text, at)?;
    let mut call = MacroCall::new(tag.name);
    call.parameters = parse_parameters(tag.parameters);
    if tag.self_closing {
        return Some(MacroSpan { call, end: tag.end });
    }

    let close = format!("{{{{/{}}}}}", tag.name);
    let mut depth = 0usize;
    let mut position = tag.end;
    while let Some(offset) = text.get(position..).and_then(|rest| rest.find("{{")) {
        let candidate = position + offset;
        let here = text.get(candidate..)?;
        if here.starts_with(&close) {
            if depth == 0 {
                call.content = Some(text.get(tag.end..candidate)?.to_string());
                return Some(MacroSpan {
                    call,
                    end: candidate + close.len(),
                });
            }
            depth -= 1;
            position = candidate + close.len();
            continue;
        }
        if let Some(nested) = open_tag(text, candidate) {
            if nested.name == tag.name && !nested.self_closing {
                depth += 1;
            }
            position = nested.end;
            continue;
        }
        position = candidate + 2;
    }
    None
}

/// Offset just past a verbatim or macro starting at `at`, if one does.
pub(super) fn skip_construct(text: &str, at: usize) -> Option<usize> {
    let rest = text.get(at..)?;
    if rest.starts_with("{{{") {
        return find_verbatim_end(text, at + 3).map(|end| end + 3);
    }
    if rest.starts_with("{{") {
        return parse_macro(text, at).map(|span| span.end);
    }
    None
}

/// Start of the `)))` closing a group whose content begins at `from`.
pub(super) fn find_group_end(text: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut position = from;
    while position < text.len() {
        let rest = text.get(position..)?;
        if rest.starts_with(ESCAPE) {
            position = skip_escape(text, position);
        } else if let Some(end) = skip_construct(text, position) {
            position = end;
        } else if rest.starts_with("(((") {
            depth += 1;
            position += 3;
        } else if rest.starts_with(")))") {
            if depth == 0 {
                return Some(position);
            }
            depth -= 1;
            position += 3;
        } else {
            position += char_len(text, position);
        }
    }
    None
}

/// Start of the `]]` closing a link whose content begins at `from`.
pub(super) fn find_link_end(text: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut position = from;
    while position < text.len() {
        let rest = text.get(position..)?;
        if rest.starts_with(ESCAPE) {
            position = skip_escape(text, position);
        } else if let Some(end) = skip_construct(text, position) {
            position = end;
        } else if rest.starts_with("[[") {
            depth += 1;
            position += 2;
        } else if rest.starts_with("]]") {
            if depth == 0 {
                return Some(position);
            }
            depth -= 1;
            position += 2;
        } else {
            position += char_len(text, position);
        }
    }
    None
}

/// First occurrence of `pattern` outside escapes, nested links and
/// constructs.
pub(super) fn find_unescaped(text: &str, pattern: &str) -> Option<usize> {
    let mut position = 0;
    while position < text.len() {
        let rest = text.get(position..)?;
        if rest.starts_with(pattern) {
            return Some(position);
        }
        if rest.starts_with(ESCAPE) {
            position = skip_escape(text, position);
        } else if let Some(end) = skip_construct(text, position) {
            position = end;
        } else if rest.starts_with("[[") {
            position = find_link_end(text, position + 2).map_or(position + 2, |end| end + 2);
        } else {
            position += char_len(text, position);
        }
    }
    None
}

/// Offset of the new line that ends the logical line starting at `from`.
/// Groups, verbatim and macros may span several physical lines.
pub(super) fn logical_line_end(text: &str, from: usize) -> usize {
    let mut position = from;
    while position < text.len() {
        let Some(rest) = text.get(position..) else {
            break;
        };
        if rest.starts_with('\n') {
            return position;
        }
        if rest.starts_with(ESCAPE) {
            position = skip_escape(text, position);
        } else if let Some(end) = skip_construct(text, position) {
            position = end;
        } else if rest.starts_with("(((") {
            position = find_group_end(text, position + 3).map_or(position + 3, |end| end + 3);
        } else {
            position += char_len(text, position);
        }
    }
    text.len()
}

/// Whether `text` ends inside an escape pair, i.e. its last character is an
/// unpaired `~`.
pub(super) fn has_dangling_escape(text: &str) -> bool {
    let mut pending = false;
    for c in text.chars() {
        pending = !pending && c == ESCAPE;
    }
    pending
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn macro_with_nested_content() {
        let text = "{{box title=\"a}}b\"}}x{{box}}y{{/box}}z{{/box}} tail";
        let span = parse_macro(text, 0).unwrap();
        assert_eq!(span.call.name, "box");
        assert_eq!(span.call.parameters.get("title"), Some("a}}b"));
        assert_eq!(span.call.content.as_deref(), Some("x{{box}}y{{/box}}z"));
        assert_eq!(&text[span.end..], " tail");
    }

    #[test]
    fn self_closing_macro() {
        let span = parse_macro("{{toc/}}", 0).unwrap();
        assert_eq!(span.call.content, None);
        assert_eq!(span.end, 8);
    }

    #[rstest]
    #[case("{{{verbatim}}}")]
    #[case("{{/close}}")]
    #[case("{{ spaced}}")]
    #[case("{{open}} never closed")]
    fn not_a_macro(#[case] text: &str) {
        assert!(parse_macro(text, 0).is_none());
    }

    #[test]
    fn group_end_skips_nested_and_escaped() {
        let text = "a ((( b ))) ~))) c {{{)))}}} ))) rest";
        let end = find_group_end(text, 0).unwrap();
        assert_eq!(&text[end..], "))) rest");
    }

    #[test]
    fn link_end_skips_nested_links() {
        let text = "label [[inner]] ~]] >>Page]] after";
        let end = find_link_end(text, 0).unwrap();
        assert_eq!(&text[end..], "]] after");
    }

    #[test]
    fn logical_line_spans_groups() {
        let text = "a (((\n\nb\n))) c\nnext";
        assert_eq!(&text[..logical_line_end(text, 0)], "a (((\n\nb\n))) c");
    }

    #[rstest]
    #[case("a~", true)]
    #[case("a~~", false)]
    #[case("a~~~", true)]
    #[case("", false)]
    fn dangling_escape(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(has_dangling_escape(text), expected);
    }
}
