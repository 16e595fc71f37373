//! `set` and `get`: named values carried by the execution context.
use crate::{
    Block, Xdom,
    transformation::{Macro, MacroExecutionError, MacroInvocation, MacroOutput, append_text},
};

pub(super) const SET_MACRO: &str = "set";
pub(super) const GET_MACRO: &str = "get";

const NAME_PURPOSE: &str = "naming the variable";

fn name<'a>(invocation: &'a MacroInvocation<'_>) -> Result<&'a str, MacroExecutionError> {
    invocation
        .call
        .parameters
        .get("name")
        .ok_or(MacroExecutionError::MissingParameter {
            parameter: "name",
            purpose: NAME_PURPOSE,
        })
}

/// `{{set name="x" value="v"/}}`: produces nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SetMacro;

impl Macro for SetMacro {
    fn execute(&self, invocation: &mut MacroInvocation<'_>) -> Result<MacroOutput, MacroExecutionError> {
        let name = name(invocation)?.to_string();
        let value = invocation
            .call
            .parameters
            .get("value")
            .or(invocation.call.content.as_deref())
            .unwrap_or_default()
            .to_string();
        invocation.context.set_variable(name, value);
        Ok(MacroOutput::default())
    }
}

/// `{{get name="x"/}}`: the value as text, empty when unset.
#[derive(Clone, Copy, Debug, Default)]
pub struct GetMacro;

impl Macro for GetMacro {
    fn execute(&self, invocation: &mut MacroInvocation<'_>) -> Result<MacroOutput, MacroExecutionError> {
        let name = name(invocation)?;
        let value = invocation.context.variable(name).unwrap_or_default();
        let mut content = Xdom::new();
        let root = content.root();
        let parent = if invocation.inline {
            root
        } else {
            content.append_child(root, Block::paragraph())?
        };
        if !value.is_empty() {
            append_text(&mut content, parent, value)?;
        }
        Ok(MacroOutput::new(content))
    }
}
