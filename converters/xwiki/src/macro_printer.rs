use std::fmt;

use xdom_parser::{MacroCall, Parameters};

use crate::escape::escape_parameter_value;

/// Prints a macro call back in `xwiki/2.0` syntax.
///
/// Calls without content close themselves (`{{name/}}`). Standalone calls
/// put their content on lines of its own.
#[derive(Clone, Copy, Debug)]
pub struct MacroPrinter<'a> {
    call: &'a MacroCall,
    inline: bool,
}

impl<'a> MacroPrinter<'a> {
    #[must_use]
    pub fn new(call: &'a MacroCall, inline: bool) -> Self {
        Self { call, inline }
    }
}

/// `key="value"` pairs separated by single spaces.
pub(crate) struct ParameterList<'a> {
    pub parameters: &'a Parameters,
    pub escape_value: fn(&str) -> String,
}

impl fmt::Display for ParameterList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.parameters.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{key}=\"{}\"", (self.escape_value)(value))?;
        }
        Ok(())
    }
}

impl fmt::Display for MacroPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.call.name;
        write!(f, "{{{{{name}")?;
        if !self.call.parameters.is_empty() {
            let parameters = ParameterList {
                parameters: &self.call.parameters,
                escape_value: escape_parameter_value,
            };
            write!(f, " {parameters}")?;
        }
        let Some(content) = &self.call.content else {
            return write!(f, "/}}}}");
        };
        if self.inline {
            write!(f, "}}}}{content}{{{{/{name}}}}}")
        } else {
            write!(f, "}}}}\n{content}\n{{{{/{name}}}}}")
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bare(MacroCall::new("toc"), true, "{{toc/}}")]
    #[case::parameters(
        MacroCall::new("include").with_parameter("document", "Space.Page"),
        false,
        "{{include document=\"Space.Page\"/}}"
    )]
    #[case::inline_content(
        MacroCall::new("info").with_content("note"),
        true,
        "{{info}}note{{/info}}"
    )]
    #[case::standalone_content(
        MacroCall::new("code")
            .with_parameter("language", "rust")
            .with_content("fn main() {}"),
        false,
        "{{code language=\"rust\"}}\nfn main() {}\n{{/code}}"
    )]
    #[case::escaped_value(
        MacroCall::new("box").with_parameter("title", "a \"b\" }}"),
        true,
        "{{box title=\"a ~\"b~\" ~}~}\"/}}"
    )]
    fn prints_calls(#[case] call: MacroCall, #[case] inline: bool, #[case] expected: &str) {
        assert_eq!(MacroPrinter::new(&call, inline).to_string(), expected);
    }
}
