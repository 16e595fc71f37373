//! Inline level of the `xwiki/2.0` reader: words, spaces, style spans,
//! links, images, inline macros and verbatim.
use crate::{
    Error, FormatKind, Parameters, ResourceReference,
    syntax::{
        parse_parameters,
        scan::{self, ESCAPE},
        unescape,
        xwiki::Reader,
    },
};

const IMAGE_PREFIX: &str = "image:";

impl Reader<'_> {
    pub(super) fn inline(&mut self, text: &str) -> Result<(), Error> {
        let mut word = String::new();
        let mut formats: Vec<FormatKind> = Vec::new();
        let mut position = 0;
        while position < text.len() {
            let Some(rest) = text.get(position..) else {
                break;
            };
            let Some(c) = rest.chars().next() else {
                break;
            };

            if c == ESCAPE {
                let next = position + 1;
                match text.get(next..).and_then(|after| after.chars().next()) {
                    Some(escaped) => {
                        word.push(escaped);
                        position = next + escaped.len_utf8();
                    }
                    None => {
                        word.push(ESCAPE);
                        position = next;
                    }
                }
                continue;
            }
            if c == ' ' || c == '\t' {
                self.flush(&mut word)?;
                self.listener.on_space()?;
                position += 1;
                continue;
            }
            if c == '\n' {
                self.flush(&mut word)?;
                self.listener.on_new_line()?;
                position += 1;
                continue;
            }
            if rest.starts_with("\\\\") {
                self.flush(&mut word)?;
                self.listener.on_line_break()?;
                position += 2;
                continue;
            }
            if let Some(kind) = FormatKind::from_prefix(rest) {
                self.flush(&mut word)?;
                self.toggle(&mut formats, kind)?;
                position += kind.delimiter().len();
                continue;
            }
            if rest.starts_with("[[") {
                if let Some(end) = scan::find_link_end(text, position + 2) {
                    self.flush(&mut word)?;
                    self.link(text.get(position + 2..end).unwrap_or_default())?;
                    position = end + 2;
                    continue;
                }
            } else if rest.starts_with("{{{") {
                if let Some(end) = scan::find_verbatim_end(text, position + 3) {
                    self.flush(&mut word)?;
                    let content = text.get(position + 3..end).unwrap_or_default();
                    self.listener.on_verbatim(content, true, &Parameters::new())?;
                    position = end + 3;
                    continue;
                }
            } else if rest.starts_with("{{") {
                if let Some(span) = scan::parse_macro(text, position) {
                    self.flush(&mut word)?;
                    self.listener.on_macro(&span.call, true)?;
                    position = span.end;
                    continue;
                }
            } else if rest.starts_with("(((") {
                if let Some(end) = scan::find_group_end(text, position + 3) {
                    self.flush(&mut word)?;
                    let body = text.get(position + 3..end).unwrap_or_default();
                    let body = body.strip_prefix('\n').unwrap_or(body);
                    let body = body.strip_suffix('\n').unwrap_or(body);
                    let parameters = Parameters::new();
                    self.listener.begin_group(&parameters)?;
                    self.blocks(body)?;
                    self.listener.end_group(&parameters)?;
                    position = end + 3;
                    continue;
                }
            }
            word.push(c);
            position += c.len_utf8();
        }
        self.flush(&mut word)?;
        while let Some(kind) = formats.pop() {
            self.listener.end_format(kind)?;
        }
        Ok(())
    }

    fn flush(&mut self, word: &mut String) -> Result<(), Error> {
        if word.is_empty() {
            return Ok(());
        }
        self.listener.on_word(word)?;
        word.clear();
        Ok(())
    }

    /// Open `kind`, or close it when open. Spans opened inside it are closed
    /// first and reopened afterwards.
    fn toggle(&mut self, formats: &mut Vec<FormatKind>, kind: FormatKind) -> Result<(), Error> {
        let Some(index) = formats.iter().rposition(|open| *open == kind) else {
            self.listener.begin_format(kind)?;
            formats.push(kind);
            return Ok(());
        };
        let inner = formats.split_off(index + 1);
        for open in inner.iter().rev() {
            self.listener.end_format(*open)?;
        }
        formats.pop();
        self.listener.end_format(kind)?;
        for open in &inner {
            self.listener.begin_format(*open)?;
        }
        formats.extend(inner);
        Ok(())
    }

    /// `label>>reference||parameters`, `reference||parameters` or
    /// `reference`; `image:` references without a label are images.
    fn link(&mut self, inner: &str) -> Result<(), Error> {
        let (label, target) = match scan::find_unescaped(inner, ">>") {
            Some(split) => (
                inner.get(..split),
                inner.get(split + 2..).unwrap_or_default(),
            ),
            None => (None, inner),
        };
        let (reference, parameters) = match scan::find_unescaped(target, "||") {
            Some(split) => (
                target.get(..split).unwrap_or_default(),
                parse_parameters(target.get(split + 2..).unwrap_or_default()),
            ),
            None => (target, Parameters::new()),
        };
        let reference = unescape(reference);

        if let (None, Some(image)) = (label, reference.strip_prefix(IMAGE_PREFIX)) {
            return self.listener.on_image(
                &ResourceReference::parse_image(image),
                false,
                &parameters,
            );
        }

        let reference = ResourceReference::parse_link(&reference);
        self.listener.begin_link(&reference, false, &parameters)?;
        if let Some(label) = label {
            self.inline(label)?;
        }
        self.listener.end_link(&reference, false, &parameters)
    }
}
