//! Error values returned from the parser, the node tree and transformations.

use std::fmt;
use thiserror::Error;

/// A CSS syntax error: the parser could not proceed, or a transformation
/// reported a problem anchored to a source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssSyntaxError {
    /// What went wrong
    pub reason: String,
    /// File identifier of the input, if one was given
    pub file: Option<String>,
    /// Line of the error, 1-indexed
    pub line: usize,
    /// Column of the error, 1-indexed
    pub column: usize,
    /// The full source text, used for excerpt rendering
    pub source: Option<String>,
    /// Name of the transformation that raised the error, if any
    pub plugin: Option<String>,
}

impl CssSyntaxError {
    pub fn new(
        reason: &str,
        file: Option<String>,
        line: usize,
        column: usize,
        source: Option<String>,
    ) -> Self {
        Self {
            reason: reason.to_string(),
            file,
            line,
            column,
            source,
            plugin: None,
        }
    }

    /// Records the transformation the error came through. A plugin already
    /// set is kept; the first wrapper wins.
    pub fn with_plugin(mut self, plugin: &str) -> Self {
        if self.plugin.is_none() {
            self.plugin = Some(plugin.to_string());
        }
        self
    }

    /// Renders the offending source line with a caret under the error
    /// column, plus one line of context on each side. Returns an empty
    /// string when no source text is attached.
    pub fn show_source_code(&self) -> String {
        let Some(source) = &self.source else {
            return String::new();
        };

        let lines: Vec<&str> = source.split('\n').collect();
        if self.line == 0 || self.line > lines.len() {
            return String::new();
        }

        let first = self.line.saturating_sub(1).max(1);
        let last = (self.line + 1).min(lines.len());
        let width = last.to_string().len();

        let mut out = String::new();
        for number in first..=last {
            let text = lines[number - 1].trim_end_matches('\r');
            let marker = if number == self.line { ">" } else { " " };
            out.push_str(&format!("{} {:>width$} | {}\n", marker, number, text));
            if number == self.line {
                let caret_pad = " ".repeat(self.column.saturating_sub(1));
                out.push_str(&format!("  {:>width$} | {}^\n", "", caret_pad));
            }
        }
        out.pop();
        out
    }
}

impl fmt::Display for CssSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(plugin) = &self.plugin {
            write!(f, "{}: ", plugin)?;
        }
        let file = self.file.as_deref().unwrap_or("<css input>");
        write!(f, "{}:{}:{}: {}", file, self.line, self.column, self.reason)
    }
}

impl std::error::Error for CssSyntaxError {}

/// Errors returned from the crate's public entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be parsed, or a transformation raised a
    /// position-carrying error.
    #[error("{0}")]
    Syntax(#[from] CssSyntaxError),

    /// A container was asked to hold a child kind its shape does not allow.
    #[error("structure error: {0}")]
    Structure(String),

    /// An error raised from within a user transformation that carried no
    /// source position.
    #[error("plugin {plugin} failed: {message}")]
    Plugin { plugin: String, message: String },

    #[error("source map error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result that can be returned which holds either T or an Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_and_without_file() {
        let err = CssSyntaxError::new("Unclosed block", Some("main.css".into()), 1, 1, None);
        assert_eq!(err.to_string(), "main.css:1:1: Unclosed block");

        let err = CssSyntaxError::new("Unclosed block", None, 2, 5, None);
        assert_eq!(err.to_string(), "<css input>:2:5: Unclosed block");
    }

    #[test]
    fn display_with_plugin() {
        let err = CssSyntaxError::new("bad value", Some("a.css".into()), 3, 7, None)
            .with_plugin("minifier");
        assert_eq!(err.to_string(), "minifier: a.css:3:7: bad value");
    }

    #[test]
    fn plugin_is_not_overwritten() {
        let err = CssSyntaxError::new("bad value", None, 1, 1, None)
            .with_plugin("first")
            .with_plugin("second");
        assert_eq!(err.plugin.as_deref(), Some("first"));
    }

    #[test]
    fn source_excerpt_has_caret_and_context() {
        let source = "a {\n  colr red\n}\n".to_string();
        let err = CssSyntaxError::new("Unknown word", None, 2, 3, Some(source));
        assert_eq!(
            err.show_source_code(),
            "  1 | a {\n> 2 |   colr red\n    |   ^\n  3 | }"
        );
    }

    #[test]
    fn source_excerpt_at_first_line() {
        let err = CssSyntaxError::new("Unclosed block", None, 1, 1, Some("a {".to_string()));
        assert_eq!(err.show_source_code(), "> 1 | a {\n    | ^");
    }
}
