//! Lossless CSS postprocessing core.
//!
//! CSS text is parsed into an editable node tree that keeps every byte of
//! the original formatting in raw records next to the cleaned values.
//! Stringifying an untouched tree reproduces the input byte for byte;
//! after local edits only the edited nodes change in the output. Source
//! maps can be produced for the emitted text and composed with a map from
//! an upstream preprocessor.
//!
//! ```
//! use cssforge::{decl, parse, stringify, ParseOptions, ProcessOptions};
//!
//! let root = parse("a { color: black }", &ParseOptions::default()).unwrap();
//! let rule = root.first().unwrap();
//! rule.prepend(&decl("margin", "0")).unwrap();
//!
//! let output = stringify(&root, &ProcessOptions::default()).unwrap();
//! assert_eq!(output.css, "a { margin: 0; color: black }");
//! ```

use std::rc::Rc;

pub mod errors;
pub mod input;
pub mod location;
pub mod node;
pub mod options;
mod parser;
pub mod source_map;
mod stringifier;
pub mod tokenizer;

pub use errors::{CssSyntaxError, Error, Result};
pub use input::Input;
pub use location::Location;
pub use node::{ChildRef, Node, NodeType, Raw, Shape, Source};
pub use options::{MapOptions, ParseOptions, ProcessOptions};
pub use source_map::SourceMap;

use parser::Parser;
use source_map::MapBuilder;

/// Result of [`stringify`]: the CSS text and, when requested, the
/// serialized source map. Produced atomically; on error neither exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub css: String,
    pub map: Option<String>,
}

/// Parses CSS text into a root node. The `from` option is recorded as the
/// file identifier on every node's source and in error messages.
pub fn parse(css: &str, options: &ParseOptions) -> Result<Node> {
    let input = Rc::new(Input::new(css.to_string(), options.from.clone()));
    Parser::new(input).parse_root()
}

/// Walks a tree and emits its CSS text, plus a source map when the options
/// ask for one. A map given via [`MapOptions::Prev`] or
/// [`MapOptions::PrevMap`] is treated as the map of an upstream compiler
/// and composed: the produced map points at the upstream sources.
pub fn stringify(root: &Node, options: &ProcessOptions) -> Result<Output> {
    if options.map.is_off() {
        return Ok(Output {
            css: stringifier::to_string(root),
            map: None,
        });
    }

    let upstream = match &options.map {
        MapOptions::Prev(json) => Some(SourceMap::from_json(json)?),
        MapOptions::PrevMap(map) => Some(map.clone()),
        _ => None,
    };

    let mut builder = MapBuilder::new(upstream, options.from.clone());
    let css = stringifier::to_string_with_map(root, &mut builder);
    let map = builder.generate(options.to.clone())?;

    Ok(Output {
        css,
        map: Some(map),
    })
}

/// Creates a detached root container.
pub fn root() -> Node {
    Node::new_root()
}

/// Creates a detached rule with the given selector.
pub fn rule(selector: impl Into<String>) -> Node {
    Node::new_rule(selector.into())
}

/// Creates a detached at-rule. The name is given without the `@`.
pub fn at_rule(name: impl Into<String>, params: impl Into<String>) -> Node {
    Node::new_at_rule(name.into(), params.into())
}

/// Creates a detached declaration.
pub fn decl(prop: impl Into<String>, value: impl Into<String>) -> Node {
    Node::new_decl(prop.into(), value.into())
}

/// Creates a detached comment with the given interior text.
pub fn comment(text: impl Into<String>) -> Node {
    Node::new_comment(text.into())
}

/// Runs a transformation over a tree. The transformation may edit the tree
/// in place and return `Ok(None)`, or hand back a replacement root. Errors
/// are wrapped so the caller can tell which transformation raised them:
/// syntax errors get the plugin name attached, anything else becomes
/// [`Error::Plugin`].
pub fn apply_transform<F>(root: Node, plugin: Option<&str>, transform: F) -> Result<Node>
where
    F: FnOnce(&Node) -> Result<Option<Node>>,
{
    match transform(&root) {
        Ok(Some(replacement)) => Ok(replacement),
        Ok(None) => Ok(root),
        Err(err) => Err(wrap_plugin_error(err, plugin)),
    }
}

fn wrap_plugin_error(err: Error, plugin: Option<&str>) -> Error {
    let Some(plugin) = plugin else {
        return err;
    };
    match err {
        Error::Syntax(e) => Error::Syntax(e.with_plugin(plugin)),
        Error::Plugin { .. } => err,
        other => Error::Plugin {
            plugin: plugin.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_print_round_trip() {
        let css = "a {\n  color: black;\n}\n";
        let root = parse(css, &ParseOptions::default()).unwrap();
        let output = stringify(&root, &ProcessOptions::default()).unwrap();
        assert_eq!(output.css, css);
        assert!(output.map.is_none());
    }

    #[test]
    fn parse_records_the_file_name() {
        let root = parse(
            "a {}",
            &ParseOptions {
                from: Some("main.css".to_string()),
            },
        )
        .unwrap();
        let rule = root.first().unwrap();
        assert_eq!(
            rule.source().unwrap().input.file.as_deref(),
            Some("main.css")
        );
    }

    #[test]
    fn transform_in_place() {
        let root = parse("a { color: black }", &ParseOptions::default()).unwrap();
        let root = apply_transform(root, Some("upcase"), |root| {
            root.each_decl(|decl, _| {
                decl.set_value(decl.value().unwrap().to_uppercase());
                std::ops::ControlFlow::Continue(())
            });
            Ok(None)
        })
        .unwrap();
        assert_eq!(root.to_string(), "a { color: BLACK }");
    }

    #[test]
    fn transform_replacing_the_root() {
        let original = parse("a {}", &ParseOptions::default()).unwrap();
        let replaced = apply_transform(original, None, |_| {
            let fresh = root();
            fresh.append(&rule("b")).unwrap();
            Ok(Some(fresh))
        })
        .unwrap();
        assert_eq!(replaced.to_string(), "b {}");
    }

    #[test]
    fn transform_errors_carry_the_plugin_name() {
        let root = parse("a { color: black }", &ParseOptions::default()).unwrap();
        let err = apply_transform(root, Some("checker"), |root| {
            let decl = root.first().unwrap().first().unwrap();
            Err(decl.error("bad color").into())
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "checker: <css input>:1:5: bad color");
    }

    #[test]
    fn transform_errors_without_position_become_plugin_errors() {
        let root = parse("a {}", &ParseOptions::default()).unwrap();
        let err = apply_transform(root, Some("broken"), |_| {
            Err(Error::Structure("no".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, Error::Plugin { .. }));
        assert_eq!(err.to_string(), "plugin broken failed: structure error: no");
    }
}
