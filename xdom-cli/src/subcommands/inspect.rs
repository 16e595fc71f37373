use std::{
    io::{self, IsTerminal, Write},
    path::PathBuf,
};

use clap::Args as ClapArgs;
use crossterm::style::{Color, Stylize};
use xdom_parser::{Block, NodeId, Parameters, Xdom};

use super::Reading;
use crate::error::Report;

/// Inspect the block tree of a wiki document
#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Input file
    pub file: PathBuf,

    /// Print the tree as JSON
    #[arg(long)]
    pub json: bool,

    /// Maximum depth to display (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub max_depth: usize,

    #[command(flatten)]
    pub reading: Reading,
}

struct TreePrinter<'a, W: Write> {
    writer: W,
    xdom: &'a Xdom,
    is_last_stack: Vec<bool>,
    max_depth: usize,
    color: bool,
}

impl<'a, W: Write> TreePrinter<'a, W> {
    fn new(writer: W, xdom: &'a Xdom, max_depth: usize, color: bool) -> Self {
        Self {
            writer,
            xdom,
            is_last_stack: Vec::new(),
            max_depth,
            color,
        }
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.color {
            return text.to_string();
        }
        let styled = text.with(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    }

    fn depth(&self) -> usize {
        self.is_last_stack.len()
    }

    fn should_show(&self) -> bool {
        self.max_depth == 0 || self.depth() <= self.max_depth
    }

    fn print(&mut self) -> io::Result<()> {
        let title = self.paint("Document", Color::Blue, true);
        writeln!(self.writer, "{title}")?;
        self.print_children(self.xdom.root())
    }

    fn print_children(&mut self, id: NodeId) -> io::Result<()> {
        let children = self.xdom.children(id);
        for (index, child) in children.iter().enumerate() {
            self.is_last_stack.push(index + 1 == children.len());
            let result = self.print_node(*child);
            self.is_last_stack.pop();
            result?;
        }
        Ok(())
    }

    fn print_node(&mut self, id: NodeId) -> io::Result<()> {
        if !self.should_show() {
            return Ok(());
        }
        let Some(block) = self.xdom.block(id) else {
            return Ok(());
        };

        // Tree structure: ├─, └─, │
        let depth = self.depth();
        for (level, is_last) in self.is_last_stack.iter().enumerate() {
            let segment = match (level + 1 == depth, *is_last) {
                (true, true) => "└─ ",
                (true, false) => "├─ ",
                (false, true) => "   ",
                (false, false) => "│  ",
            };
            write!(self.writer, "{segment}")?;
        }

        let (name, detail) = describe(self.xdom, id, block);
        let name = self.paint(name, Color::Cyan, true);
        write!(self.writer, "{name}")?;
        if let Some(detail) = detail {
            let detail = self.paint(&detail, Color::Yellow, false);
            write!(self.writer, ": {detail}")?;
        }
        if let Some(parameters) = block.parameters().filter(|parameters| !parameters.is_empty()) {
            let parameters = self.paint(&format_parameters(parameters), Color::DarkGrey, false);
            write!(self.writer, " {parameters}")?;
        }
        writeln!(self.writer)?;

        self.print_children(id)
    }
}

fn format_parameters(parameters: &Parameters) -> String {
    let pairs: Vec<String> = parameters
        .iter()
        .map(|(key, value)| format!("{key}=\"{value}\""))
        .collect();
    format!("(% {} %)", pairs.join(" "))
}

/// Words and spaces below `id`.
fn text_of(xdom: &Xdom, id: NodeId) -> String {
    xdom.descendants(id)
        .filter_map(|node| match xdom.block(node) {
            Some(Block::Word(word)) => Some(word.clone()),
            Some(Block::Space | Block::NewLine | Block::LineBreak) => Some(" ".to_string()),
            Some(Block::SpecialSymbol(symbol)) => Some(symbol.to_string()),
            Some(Block::Escape(text)) => Some(text.clone()),
            Some(_) | None => None,
        })
        .collect()
}

/// Truncate text for display
fn truncate(text: &str, max_len: usize) -> String {
    let count = text.chars().count();
    if count <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len).collect();
        format!("{kept}... ({count} chars)")
    }
}

fn describe(xdom: &Xdom, id: NodeId, block: &Block) -> (&'static str, Option<String>) {
    let count = |what: &str| Some(format!("{} {what}", xdom.children(id).len()));
    match block {
        Block::Document => ("Document", None),
        Block::Group { .. } => ("Group", None),
        Block::Paragraph { .. } => ("Paragraph", Some(truncate(&text_of(xdom, id), 50))),
        Block::Section { level, .. } => (
            "Section",
            Some(format!("Level {} - {}", level.get(), truncate(&text_of(xdom, id), 40))),
        ),
        Block::List { kind, .. } => ("List", Some(format!("{kind:?}, {}", xdom.children(id).len()))),
        Block::ListItem => ("ListItem", None),
        Block::Format { kind } => ("Format", Some(format!("{kind:?}"))),
        Block::Link {
            reference,
            free_standing,
            ..
        } => (
            "Link",
            Some(if *free_standing {
                format!("{reference} (free standing)")
            } else {
                reference.to_string()
            }),
        ),
        Block::Image { reference, .. } => ("Image", Some(truncate(&reference.to_string(), 50))),
        Block::Macro {
            call,
            inline,
            executed,
        } => {
            let mut detail = call.name.clone();
            if *inline {
                detail.push_str(" (inline)");
            }
            if *executed {
                detail.push_str(" (executed)");
            }
            ("Macro", Some(detail))
        }
        Block::Table { .. } => ("Table", count("rows")),
        Block::TableRow { .. } => ("TableRow", count("cells")),
        Block::TableCell { header, .. } => ("TableCell", header.then(|| "header".to_string())),
        Block::Quotation { .. } => ("Quotation", None),
        Block::QuotationLine => ("QuotationLine", Some(truncate(&text_of(xdom, id), 50))),
        Block::HorizontalLine { .. } => ("HorizontalLine", None),
        Block::Verbatim {
            content, inline, ..
        } => (
            if *inline { "Verbatim (inline)" } else { "Verbatim" },
            Some(truncate(content, 50)),
        ),
        Block::EmptyLines(lines) => ("EmptyLines", Some(lines.to_string())),
        Block::Word(word) => ("Word", Some(word.clone())),
        Block::Space => ("Space", None),
        Block::SpecialSymbol(symbol) => ("SpecialSymbol", Some(symbol.to_string())),
        Block::Escape(text) => ("Escape", Some(text.clone())),
        Block::NewLine => ("NewLine", None),
        Block::LineBreak | _ => ("LineBreak", None),
    }
}

pub fn run(args: &Args) -> miette::Result<()> {
    let xdom = args.reading.document_file(&args.file, false)?;
    let context = || format!("printing {}", args.file.display());

    let stdout = io::stdout();
    if args.json {
        let mut writer = stdout.lock();
        serde_json::to_writer_pretty(&mut writer, &xdom)
            .map_err(|error| Report::new(context(), &error))?;
        writeln!(writer).map_err(|error| Report::new(context(), &error))?;
        return Ok(());
    }

    let color = stdout.is_terminal();
    TreePrinter::new(stdout.lock(), &xdom, args.max_depth, color)
        .print()
        .map_err(|error| Report::new(context(), &error))?;
    Ok(())
}
