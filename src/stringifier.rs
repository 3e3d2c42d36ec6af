//! Reconstructs CSS text from a node tree. Wherever a node still carries
//! the raw bytes it was parsed from, those bytes are emitted; synthesized
//! nodes have their whitespace derived from their siblings.

use crate::node::{Node, NodeType, Raw, Shape};
use crate::source_map::MapBuilder;

/// Stringifies a subtree without producing a source map. For a root node
/// this is the full document; for a detached node it is the node's own
/// text without any leading `before`.
pub(crate) fn to_string(node: &Node) -> String {
    let mut stringifier = Stringifier::new(None);
    stringifier.body(node);
    stringifier.finish()
}

/// Stringifies a tree while reporting every node start to the map builder.
pub(crate) fn to_string_with_map(node: &Node, map: &mut MapBuilder) -> String {
    let mut stringifier = Stringifier::new(Some(map));
    stringifier.body(node);
    stringifier.finish()
}

struct Stringifier<'m> {
    css: String,
    line: usize,
    column: usize,
    map: Option<&'m mut MapBuilder>,
}

impl<'m> Stringifier<'m> {
    fn new(map: Option<&'m mut MapBuilder>) -> Self {
        Self {
            css: String::new(),
            line: 1,
            column: 1,
            map,
        }
    }

    fn finish(self) -> String {
        self.css
    }

    fn push(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.css.push_str(text);
    }

    /// Reports the current output position as the start of `node`.
    fn mark(&mut self, node: &Node) {
        if let Some(map) = self.map.as_deref_mut() {
            if let Some(source) = node.source() {
                map.add(
                    self.line,
                    self.column,
                    source.input.file.as_deref(),
                    source.start,
                );
            }
        }
    }

    fn body(&mut self, node: &Node) {
        match node.node_type() {
            NodeType::Root => {
                self.children(node);
                if let Some(after) = node.after() {
                    self.push(&after);
                }
            }
            NodeType::Rule => {
                let selector = raw_or(node.selector_raw(), node.selector());
                self.push(&selector);
                let between = node.between().unwrap_or_else(|| " ".to_string());
                self.push(&between);
                self.push("{");
                self.children(node);
                let after = close_whitespace(node);
                self.push(&after);
                self.push("}");
            }
            NodeType::AtRule => {
                self.push("@");
                self.push(&node.name().unwrap_or_default());
                let params = raw_or(node.params_raw(), node.params());
                let after_name = node.after_name().unwrap_or_else(|| {
                    if params.is_empty() {
                        String::new()
                    } else {
                        " ".to_string()
                    }
                });
                self.push(&after_name);
                self.push(&params);

                match node.shape().unwrap_or(Shape::Undecided) {
                    Shape::Undecided | Shape::Childless => {
                        if let Some(between) = node.between() {
                            self.push(&between);
                        }
                        if node.semicolon().unwrap_or(true) {
                            self.push(";");
                        }
                    }
                    Shape::Block | Shape::Decls | Shape::Rules => {
                        let between = node.between().unwrap_or_default();
                        self.push(&between);
                        self.push("{");
                        self.children(node);
                        let after = close_whitespace(node);
                        self.push(&after);
                        self.push("}");
                    }
                }
            }
            NodeType::Decl => {
                self.push(&node.prop().unwrap_or_default());
                let between = node.between().unwrap_or_else(|| ": ".to_string());
                self.push(&between);
                self.push(&raw_or(node.value_raw(), node.value()));
            }
            NodeType::Comment => {
                self.push("/*");
                self.push(&raw_or(node.text_raw(), node.text()));
                self.push("*/");
            }
        }
    }

    fn children(&mut self, container: &Node) {
        let nodes = container.nodes();
        let last = nodes.len().saturating_sub(1);

        for (index, child) in nodes.iter().enumerate() {
            let before = child
                .before()
                .unwrap_or_else(|| derive_before(container, index));
            self.push(&before);
            self.mark(child);
            self.body(child);

            if child.node_type() == NodeType::Decl {
                let semicolon = index != last || container.semicolon().unwrap_or(false);
                if semicolon {
                    self.push(";");
                }
            }
        }
    }
}

/// Raw bytes are preferred while the cleaned value they were derived from
/// still matches the node's current value.
fn raw_or(raw: Option<Raw>, value: Option<String>) -> String {
    let value = value.unwrap_or_default();
    match raw {
        Some(raw) if raw.value == value => raw.raw,
        _ => value,
    }
}

/// Whitespace before a container's closing brace.
fn close_whitespace(node: &Node) -> String {
    match node.after() {
        Some(after) => after,
        None => {
            if node.is_empty() {
                String::new()
            } else {
                "\n".to_string()
            }
        }
    }
}

/// Style inheritance for synthesized nodes: take the `before` of the
/// nearest preceding sibling of the same kind, otherwise of the first
/// sibling that still knows its formatting, otherwise fall back to the
/// container's default indentation.
fn derive_before(container: &Node, index: usize) -> String {
    let node = match container.child(index) {
        Some(node) => node,
        None => return String::new(),
    };
    let kind = node.node_type();
    let siblings = container.nodes();

    for sibling in siblings[..index].iter().rev() {
        if sibling.node_type() == kind {
            if let Some(before) = sibling.before() {
                return before;
            }
        }
    }

    for (i, sibling) in siblings.iter().enumerate() {
        if i == index {
            continue;
        }
        if let Some(before) = sibling.before() {
            return before;
        }
    }

    match container.node_type() {
        NodeType::Root => {
            if index == 0 {
                String::new()
            } else {
                "\n".to_string()
            }
        }
        _ => "\n    ".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{at_rule, comment, decl, root, rule};

    #[test]
    fn synthesized_rule_with_children() {
        let rule = rule("a");
        rule.append(&decl("color", "black")).unwrap();
        assert_eq!(rule.to_string(), "a {\n    color: black\n}");
    }

    #[test]
    fn synthesized_empty_rule() {
        assert_eq!(rule("a").to_string(), "a {}");
    }

    #[test]
    fn detached_declaration() {
        assert_eq!(decl("color", "black").to_string(), "color: black");
    }

    #[test]
    fn synthesized_comment() {
        assert_eq!(comment("note").to_string(), "/*note*/");
    }

    #[test]
    fn synthesized_childless_at_rule() {
        assert_eq!(
            at_rule("charset", "\"utf-8\"").to_string(),
            "@charset \"utf-8\";"
        );
        assert_eq!(at_rule("plain", "").to_string(), "@plain;");
    }

    #[test]
    fn synthesized_at_rule_with_children() {
        let media = at_rule("media", "print");
        let inner = rule("a");
        inner.append(&decl("color", "black")).unwrap();
        media.append(&inner).unwrap();
        assert_eq!(
            media.to_string(),
            "@media print{\n    a {\n    color: black\n}\n}"
        );
    }

    #[test]
    fn root_first_child_has_no_leading_newline() {
        let root = root();
        root.append(&rule("a")).unwrap();
        root.append(&rule("b")).unwrap();
        assert_eq!(root.to_string(), "a {}\nb {}");
    }

    #[test]
    fn second_declaration_inherits_separator_style() {
        let rule = rule("a");
        let first = decl("color", "black");
        first.set_before(" ");
        rule.append(&first).unwrap();
        rule.append(&decl("top", "0")).unwrap();
        assert_eq!(rule.to_string(), "a { color: black; top: 0\n}");
    }
}
