use crate::Parameters;

/// Drop escape characters, keeping the characters they protect.
#[must_use]
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('~'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Read `key="value" other=value` pairs. Quoted values may contain `~`
/// escapes; unquoted values stop at whitespace. Malformed pieces are
/// skipped.
#[must_use]
pub fn parse_parameters(text: &str) -> Parameters {
    let mut parameters = Parameters::new();
    let mut chars = text.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            key.push(c);
        }
        if key.is_empty() {
            if chars.next().is_none() {
                break;
            }
            continue;
        }
        if chars.next_if_eq(&'=').is_none() {
            // A bare word without a value.
            parameters.insert(key, "");
            continue;
        }
        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '~' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    other => value.push(other),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                value.push(c);
            }
        }
        parameters.insert(key, value);
    }
    parameters
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn quoted_values_keep_escapes_out() {
        let parameters = parse_parameters(r#"document="Space.Page" title="say ~"hi~" ~~ }}""#);
        let pairs: Vec<_> = parameters.iter().collect();
        assert_eq!(
            pairs,
            vec![("document", "Space.Page"), ("title", r#"say "hi" ~ }}"#)]
        );
    }

    #[test]
    fn unquoted_values_stop_at_whitespace() {
        let parameters = parse_parameters("a=1 b=two  c");
        let pairs: Vec<_> = parameters.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "two"), ("c", "")]);
    }

    #[rstest]
    #[case("~[~[x~]~]", "[[x]]")]
    #[case("a~~b", "a~b")]
    #[case("end~", "end~")]
    fn unescapes(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(unescape(text), expected);
    }
}
