//! Block level of the `xwiki/2.0` reader.
//!
//! The reader is total: text that does not form a construct is read as
//! plain words, and unclosed delimiters are literal.
use std::sync::LazyLock;

use regex::Regex;

use crate::{
    Error, HeaderLevel, ListKind, Listener, Parameters,
    syntax::{
        parse_parameters,
        scan::{self, has_dangling_escape, logical_line_end},
    },
};

#[allow(clippy::expect_used)]
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(={1,6})\s").expect("header pattern is valid"));

#[allow(clippy::expect_used)]
static HORIZONTAL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-{4,}\s*$").expect("horizontal line pattern is valid"));

#[allow(clippy::expect_used)]
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([*1]*\*|[*1]*1\.)\s").expect("list item pattern is valid")
});

pub(super) fn read(input: &str, listener: &mut dyn Listener) -> Result<(), Error> {
    let input = input.replace("\r\n", "\n");
    let empty = Parameters::new();
    listener.begin_document(&empty)?;
    Reader { listener }.blocks(&input)?;
    listener.end_document(&empty)
}

pub(super) struct Reader<'l> {
    pub(super) listener: &'l mut dyn Listener,
}

/// The physical line starting at `from` and the offset of the next one.
fn line_at(text: &str, from: usize) -> (&str, usize) {
    let rest = text.get(from..).unwrap_or_default();
    match rest.find('\n') {
        Some(end) => (rest.get(..end).unwrap_or_default(), from + end + 1),
        None => (rest, text.len()),
    }
}

fn next_line_start(text: &str, end: usize) -> usize {
    if text.get(end..).is_some_and(|rest| rest.starts_with('\n')) {
        end + 1
    } else {
        end
    }
}

/// Drop one new line on each side of a multi-line body.
fn trim_body(body: &str) -> &str {
    let body = body.strip_prefix('\n').unwrap_or(body);
    body.strip_suffix('\n').unwrap_or(body)
}

fn block_parameters(line: &str) -> Option<Parameters> {
    let inner = line.trim().strip_prefix("(%")?.strip_suffix("%)")?;
    if has_dangling_escape(inner) {
        return None;
    }
    Some(parse_parameters(inner))
}

fn is_table_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with('|') || line.starts_with("!!")
}

fn is_quote_line(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

/// Lines that end a paragraph or list item and start a block of their own.
fn interrupts(line: &str) -> bool {
    HEADER.is_match(line)
        || HORIZONTAL_LINE.is_match(line)
        || LIST_ITEM.is_match(line)
        || is_table_line(line)
        || is_quote_line(line)
        || block_parameters(line).is_some()
}

/// `*`, `**`, `1.`, `*1.`: one list kind per level.
fn list_style(marker: &str) -> Vec<ListKind> {
    marker
        .trim_end_matches('.')
        .chars()
        .map(|c| {
            if c == '1' {
                ListKind::Numbered
            } else {
                ListKind::Bulleted
            }
        })
        .collect()
}

impl Reader<'_> {
    /// Read a sequence of blocks, as found in a document or group body.
    pub(super) fn blocks(&mut self, text: &str) -> Result<(), Error> {
        let mut position = 0;
        let mut blank = 0usize;
        let mut first = true;
        let mut parameters = None;
        while position < text.len() {
            let (line, next) = line_at(text, position);
            if line.trim().is_empty() {
                blank += 1;
                position = next;
                continue;
            }
            if let Some(found) = block_parameters(line) {
                parameters = Some(found);
                position = next;
                continue;
            }
            // One blank line is the ordinary separator between blocks.
            let extra = if first { blank } else { blank.saturating_sub(1) };
            if extra > 0 {
                self.listener.on_empty_lines(extra)?;
            }
            blank = 0;
            first = false;
            position = self.block(text, position, parameters.take().unwrap_or_default())?;
        }
        Ok(())
    }

    /// Read the block starting at `from`; returns where the next one starts.
    fn block(&mut self, text: &str, from: usize, parameters: Parameters) -> Result<usize, Error> {
        let (line, next) = line_at(text, from);
        let indent = line.len() - line.trim_start().len();
        let start = from + indent;
        let trimmed = line.trim_start();

        if trimmed.starts_with("(((") {
            if let Some(end) = self.group(text, start, &parameters)? {
                return Ok(end);
            }
        } else if trimmed.starts_with("{{{") {
            if let Some(end) = self.standalone_verbatim(text, start, &parameters)? {
                return Ok(end);
            }
        } else if trimmed.starts_with("{{") {
            if let Some(end) = self.standalone_macro(text, start)? {
                return Ok(end);
            }
        }
        if let Some(captures) = HEADER.captures(line) {
            let marker = captures.get(1).map_or("", |m| m.as_str());
            let content_start = captures.get(0).map_or(0, |m| m.end());
            self.section(marker.len(), line.get(content_start..).unwrap_or_default(), &parameters)?;
            return Ok(next);
        }
        if HORIZONTAL_LINE.is_match(line) {
            self.listener.on_horizontal_line(&parameters)?;
            return Ok(next);
        }
        if LIST_ITEM.is_match(line) {
            return self.list(text, from, &parameters);
        }
        if is_table_line(line) {
            return self.table(text, from, &parameters);
        }
        if is_quote_line(line) {
            return self.quotation(text, from, &parameters);
        }
        self.paragraph(text, from, &parameters)
    }

    fn group(
        &mut self,
        text: &str,
        start: usize,
        parameters: &Parameters,
    ) -> Result<Option<usize>, Error> {
        let Some(end) = scan::find_group_end(text, start + 3) else {
            return Ok(None);
        };
        let after = end + 3;
        let (rest, next) = line_at(text, after);
        if !rest.trim().is_empty() {
            return Ok(None);
        }
        let body = text.get(start + 3..end).unwrap_or_default();
        self.listener.begin_group(parameters)?;
        self.blocks(trim_body(body))?;
        self.listener.end_group(parameters)?;
        Ok(Some(next))
    }

    fn standalone_verbatim(
        &mut self,
        text: &str,
        start: usize,
        parameters: &Parameters,
    ) -> Result<Option<usize>, Error> {
        let Some(end) = scan::find_verbatim_end(text, start + 3) else {
            return Ok(None);
        };
        let (rest, next) = line_at(text, end + 3);
        if !rest.trim().is_empty() {
            return Ok(None);
        }
        let content = text.get(start + 3..end).unwrap_or_default();
        self.listener.on_verbatim(trim_body(content), false, parameters)?;
        Ok(Some(next))
    }

    fn standalone_macro(&mut self, text: &str, start: usize) -> Result<Option<usize>, Error> {
        let Some(mut span) = scan::parse_macro(text, start) else {
            return Ok(None);
        };
        let (rest, next) = line_at(text, span.end);
        if !rest.trim().is_empty() {
            return Ok(None);
        }
        if let Some(content) = span.call.content.take() {
            span.call.content = Some(trim_body(&content).to_string());
        }
        self.listener.on_macro(&span.call, false)?;
        Ok(Some(next))
    }

    fn section(&mut self, level: usize, content: &str, parameters: &Parameters) -> Result<(), Error> {
        let level = HeaderLevel::try_from(u8::try_from(level).unwrap_or(HeaderLevel::MAX))?;
        let content = strip_closing_marker(content);
        self.listener.begin_section(level, parameters)?;
        self.inline(content)?;
        self.listener.end_section(level, parameters)
    }

    fn paragraph(&mut self, text: &str, from: usize, parameters: &Parameters) -> Result<usize, Error> {
        let mut end = logical_line_end(text, from);
        let mut next = next_line_start(text, end);
        while next < text.len() {
            let (line, _) = line_at(text, next);
            if line.trim().is_empty() || interrupts(line) {
                break;
            }
            end = logical_line_end(text, next);
            next = next_line_start(text, end);
        }
        self.listener.begin_paragraph(parameters)?;
        self.inline(text.get(from..end).unwrap_or_default())?;
        self.listener.end_paragraph(parameters)?;
        Ok(next)
    }

    fn list(&mut self, text: &str, from: usize, parameters: &Parameters) -> Result<usize, Error> {
        let mut items: Vec<(Vec<ListKind>, String)> = Vec::new();
        let mut position = from;
        while position < text.len() {
            let (line, _) = line_at(text, position);
            let end = logical_line_end(text, position);
            let logical = text.get(position..end).unwrap_or_default();
            if let Some(captures) = LIST_ITEM.captures(line) {
                let marker = captures.get(1).map_or("", |m| m.as_str());
                let content_start = captures.get(0).map_or(0, |m| m.end());
                items.push((
                    list_style(marker),
                    logical.get(content_start..).unwrap_or_default().to_string(),
                ));
            } else if line.trim().is_empty() || interrupts(line) {
                break;
            } else if let Some((_, content)) = items.last_mut() {
                content.push('\n');
                content.push_str(logical);
            }
            position = next_line_start(text, end);
        }

        let empty = Parameters::new();
        let mut open: Vec<ListKind> = Vec::new();
        for (style, content) in &items {
            let common = open
                .iter()
                .zip(style)
                .take_while(|(open, wanted)| open == wanted)
                .count();
            let keep = if common == style.len() {
                common.saturating_sub(1)
            } else {
                common
            };
            while open.len() > keep + 1 {
                if let Some(kind) = open.pop() {
                    self.listener.end_list_item()?;
                    self.listener.end_list(kind, &empty)?;
                }
            }
            if open.len() == keep + 1 {
                if open.get(keep) == style.get(keep) {
                    self.listener.end_list_item()?;
                    self.listener.begin_list_item()?;
                } else if let Some(kind) = open.pop() {
                    self.listener.end_list_item()?;
                    self.listener.end_list(kind, &empty)?;
                }
            }
            for kind in style.iter().skip(open.len()) {
                let list_parameters = if open.is_empty() { parameters } else { &empty };
                self.listener.begin_list(*kind, list_parameters)?;
                self.listener.begin_list_item()?;
                open.push(*kind);
            }
            self.inline(content)?;
        }
        while let Some(kind) = open.pop() {
            self.listener.end_list_item()?;
            let list_parameters = if open.is_empty() { parameters } else { &empty };
            self.listener.end_list(kind, list_parameters)?;
        }
        Ok(position)
    }

    fn table(&mut self, text: &str, from: usize, parameters: &Parameters) -> Result<usize, Error> {
        let empty = Parameters::new();
        let mut position = from;
        self.listener.begin_table(parameters)?;
        while position < text.len() {
            let (line, _) = line_at(text, position);
            if !is_table_line(line) {
                break;
            }
            let end = logical_line_end(text, position);
            let row = text.get(position..end).unwrap_or_default().trim_start();
            self.listener.begin_table_row(&empty)?;
            for (header, content) in split_cells(row) {
                self.listener.begin_table_cell(header, &empty)?;
                self.inline(content)?;
                self.listener.end_table_cell(header, &empty)?;
            }
            self.listener.end_table_row(&empty)?;
            position = next_line_start(text, end);
        }
        self.listener.end_table(parameters)?;
        Ok(position)
    }

    fn quotation(&mut self, text: &str, from: usize, parameters: &Parameters) -> Result<usize, Error> {
        let empty = Parameters::new();
        let mut position = from;
        let mut depth = 0usize;
        while position < text.len() {
            let (line, _) = line_at(text, position);
            if !is_quote_line(line) {
                break;
            }
            let end = logical_line_end(text, position);
            let logical = text.get(position..end).unwrap_or_default().trim_start();
            let content = logical.trim_start_matches('>');
            let wanted = logical.len() - content.len();
            while depth > wanted {
                depth -= 1;
                self.listener
                    .end_quotation(if depth == 0 { parameters } else { &empty })?;
            }
            while depth < wanted {
                self.listener
                    .begin_quotation(if depth == 0 { parameters } else { &empty })?;
                depth += 1;
            }
            self.listener.begin_quotation_line()?;
            self.inline(content)?;
            self.listener.end_quotation_line()?;
            position = next_line_start(text, end);
        }
        while depth > 0 {
            depth -= 1;
            self.listener
                .end_quotation(if depth == 0 { parameters } else { &empty })?;
        }
        Ok(position)
    }
}

/// Header text without the optional closing `=` run and the single spaces
/// around the content.
fn strip_closing_marker(content: &str) -> &str {
    let trimmed = content.trim_end();
    let without_run = trimmed.trim_end_matches('=');
    let stripped = if without_run.len() < trimmed.len() {
        // A `~` right before the run protects its first `=`.
        if has_dangling_escape(without_run) {
            trimmed.get(..=without_run.len()).unwrap_or(trimmed)
        } else {
            without_run
        }
    } else {
        trimmed
    };
    if stripped.len() < trimmed.len() {
        stripped.strip_suffix(' ').unwrap_or(stripped)
    } else {
        stripped
    }
}

/// Split a table row into `(header, content)` cells. `|=` and `!!` start
/// header cells, `|` plain ones.
fn split_cells(row: &str) -> Vec<(bool, &str)> {
    let mut cells = Vec::new();
    let mut current: Option<(bool, usize)> = None;
    let mut position = 0;
    while position < row.len() {
        let Some(rest) = row.get(position..) else {
            break;
        };
        let separator = if rest.starts_with("|=") {
            Some((true, 2))
        } else if rest.starts_with('|') {
            Some((false, 1))
        } else if rest.starts_with("!!") {
            Some((true, 2))
        } else {
            None
        };
        if let Some((header, width)) = separator {
            if let Some((open_header, start)) = current.take() {
                cells.push((open_header, row.get(start..position).unwrap_or_default()));
            }
            current = Some((header, position + width));
            position += width;
        } else if rest.starts_with(scan::ESCAPE) {
            position += 1 + scan::char_len(row, position + 1);
        } else if rest.starts_with("[[") {
            position = scan::find_link_end(row, position + 2).map_or(position + 2, |end| end + 2);
        } else if rest.starts_with("(((") {
            position = scan::find_group_end(row, position + 3).map_or(position + 3, |end| end + 3);
        } else if let Some(end) = scan::skip_construct(row, position) {
            position = end;
        } else {
            position += scan::char_len(row, position);
        }
    }
    if let Some((header, start)) = current {
        cells.push((header, row.get(start..).unwrap_or_default()));
    }
    cells
}
