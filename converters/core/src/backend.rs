use std::{fmt, str::FromStr};

/// Output formats, named by their syntax identifier (`xwiki/2.0`) or a
/// short alias (`xwiki`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    #[default]
    XWiki,
    /// The tree's event stream, one `event/1.0` line per event.
    Events,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Self::XWiki, Self::Events];

    /// Full syntax identifier of the produced output.
    #[must_use]
    pub fn syntax_id(self) -> &'static str {
        match self {
            Self::XWiki => "xwiki/2.0",
            Self::Events => "event/1.0",
        }
    }

    #[must_use]
    pub fn alias(self) -> &'static str {
        match self {
            Self::XWiki => "xwiki",
            Self::Events => "events",
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|backend| wanted == backend.alias() || wanted == backend.syntax_id())
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|backend| backend.alias()).collect();
                format!("unknown backend '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.syntax_id())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("xwiki", Backend::XWiki)]
    #[case("XWiki/2.0", Backend::XWiki)]
    #[case(" events", Backend::Events)]
    #[case("event/1.0", Backend::Events)]
    fn reads_aliases_and_identifiers(#[case] text: &str, #[case] expected: Backend) {
        assert_eq!(text.parse::<Backend>().unwrap(), expected);
    }

    #[test]
    fn unknown_backend_lists_the_known_ones() {
        assert_eq!(
            "html".parse::<Backend>().unwrap_err(),
            "unknown backend 'html' (expected one of: xwiki, events)"
        );
    }

    #[test]
    fn displays_as_syntax_identifier() {
        for backend in Backend::ALL {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
    }
}
