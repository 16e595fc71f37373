//! Documents stored as files under a root directory.
//!
//! `wiki:Space.Page` lives in `<root>/Space/Page.xwiki` (or `Page.txt` for
//! plain text). Nested spaces are nested directories: `A.B.Page` is
//! `<root>/A/B/Page.xwiki`. The wiki part of references is ignored.
use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use xdom_parser::{DocumentLoader, DocumentReference, LoadError, LoadedDocument, Syntax};

const DEFAULT_WIKI: &str = "xwiki";
const DEFAULT_SPACE: &str = "Main";

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("no such document (looked for {0})")]
    NotFound(PathBuf),

    #[error("reference does not name a file under the root")]
    OutsideRoot,
}

#[derive(Clone, Debug)]
pub(crate) struct FilesystemLoader {
    root: PathBuf,
}

impl FilesystemLoader {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of `reference` without its extension.
    fn base_path(&self, reference: &DocumentReference) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for part in reference.space().split('.').chain([reference.page()]) {
            if !is_plain_name(part) {
                return None;
            }
            path.push(part);
        }
        Some(path)
    }

    /// The reference of the document stored at `path`, when it sits under
    /// the root; otherwise a page of the default space named after the file.
    pub(crate) fn reference_for(&self, path: &Path) -> DocumentReference {
        let page = path
            .file_stem()
            .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned());
        let space = path
            .strip_prefix(&self.root)
            .ok()
            .and_then(Path::parent)
            .map(|directory| {
                directory
                    .components()
                    .filter_map(|component| match component {
                        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                        Component::Prefix(_)
                        | Component::RootDir
                        | Component::CurDir
                        | Component::ParentDir => None,
                    })
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .filter(|space| !space.is_empty())
            .unwrap_or_else(|| DEFAULT_SPACE.to_string());
        DocumentReference::new(DEFAULT_WIKI, space, page)
    }
}

fn is_plain_name(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
}

/// Syntax of a file, from its extension.
pub(crate) fn syntax_of(path: &Path) -> Syntax {
    if path.extension().is_some_and(|extension| extension == Syntax::Plain.extension()) {
        Syntax::Plain
    } else {
        Syntax::XWiki
    }
}

impl DocumentLoader for FilesystemLoader {
    fn load(&self, reference: &DocumentReference) -> Result<LoadedDocument, LoadError> {
        let base = self.base_path(reference).ok_or(Error::OutsideRoot)?;
        let mut candidates = [Syntax::XWiki, Syntax::Plain]
            .into_iter()
            .map(|syntax| (base.with_extension(syntax.extension()), syntax));
        let Some((path, syntax)) = candidates.find(|(path, _)| path.is_file()) else {
            return Err(Box::new(Error::NotFound(
                base.with_extension(Syntax::XWiki.extension()),
            )));
        };
        tracing::debug!(%reference, path = %path.display(), %syntax, "loading document");
        let content = fs::read_to_string(&path)?;
        Ok(LoadedDocument::new(content, syntax))
    }
}
