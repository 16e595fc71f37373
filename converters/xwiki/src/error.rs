//! Error types for the xwiki/2.0 renderer.

/// Errors that can occur while rendering a tree as `xwiki/2.0`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error while writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The event stream was not well nested.
    #[error("Parser error: {0}")]
    Parser(#[from] xdom_parser::Error),
}
