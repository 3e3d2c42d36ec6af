use crate::errors::CssSyntaxError;
use crate::location::Location;

/// The CSS source a tree was parsed from. One `Input` is shared (via `Rc`)
/// between every node of a tree and every syntax error produced from it, so
/// error excerpts and source map entries need no side tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    /// The full CSS text
    pub css: String,
    /// Optional file identifier (path or url) the text came from
    pub file: Option<String>,
}

impl Input {
    pub fn new(css: String, file: Option<String>) -> Self {
        Self { css, file }
    }

    /// Name used in messages and source maps when no file identifier was given.
    pub fn name(&self) -> String {
        self.file.clone().unwrap_or_else(|| "<css input>".to_string())
    }

    /// Builds a syntax error positioned in this input, with the source text
    /// attached for excerpt rendering.
    pub fn error(&self, reason: &str, location: Location) -> CssSyntaxError {
        CssSyntaxError::new(
            reason,
            self.file.clone(),
            location.line(),
            location.column(),
            Some(self.css.clone()),
        )
    }
}
