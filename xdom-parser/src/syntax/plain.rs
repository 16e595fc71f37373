use crate::{Error, Listener, Parameters};

/// Plain text: a single paragraph of words, spaces and new lines.
pub(super) fn read(input: &str, listener: &mut dyn Listener) -> Result<(), Error> {
    let empty = Parameters::new();
    listener.begin_document(&empty)?;
    let text = input.replace("\r\n", "\n");
    let text = text.trim_end_matches('\n');
    if !text.trim().is_empty() {
        listener.begin_paragraph(&empty)?;
        let mut word = String::new();
        for c in text.chars() {
            match c {
                ' ' | '\t' | '\n' => {
                    if !word.is_empty() {
                        listener.on_word(&word)?;
                        word.clear();
                    }
                    if c == '\n' {
                        listener.on_new_line()?;
                    } else {
                        listener.on_space()?;
                    }
                }
                other => word.push(other),
            }
        }
        if !word.is_empty() {
            listener.on_word(&word)?;
        }
        listener.end_paragraph(&empty)?;
    }
    listener.end_document(&empty)
}
