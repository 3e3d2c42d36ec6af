//! Editing behavior: local edits only touch the edited node's output,
//! synthesized nodes pick up the style of their siblings, and iteration
//! survives structural changes.

use cssforge::{decl, parse, stringify, Node, ParseOptions, ProcessOptions};
use std::ops::ControlFlow;

fn parse_ok(css: &str) -> Node {
    parse(css, &ParseOptions::default()).unwrap()
}

fn print(root: &Node) -> String {
    stringify(root, &ProcessOptions::default()).unwrap().css
}

#[test]
fn prepended_declaration_matches_tight_formatting() {
    let root = parse_ok("a::before{color: black}");
    let rule = root.first().unwrap();
    rule.prepend(&decl("content", "\"\"")).unwrap();

    assert_eq!(print(&root), "a::before{content: \"\";color: black}");
}

#[test]
fn prepended_declaration_matches_indented_formatting() {
    let root = parse_ok("a::before {\n  color: black;\n  }");
    let rule = root.first().unwrap();
    rule.prepend(&decl("content", "\"\"")).unwrap();

    assert_eq!(
        print(&root),
        "a::before {\n  content: \"\";\n  color: black;\n  }"
    );
}

#[test]
fn appended_declaration_matches_sibling_indentation() {
    let root = parse_ok("a {\n    color: black;\n}");
    let rule = root.first().unwrap();
    rule.append(&decl("margin", "0")).unwrap();

    assert_eq!(print(&root), "a {\n    color: black;\n    margin: 0;\n}");
}

#[test]
fn clearing_whitespace_minifies() {
    let root = parse_ok("a{\n  color:black\n}\n");
    root.each_rule(|rule, _| {
        rule.set_before("");
        rule.set_after("");
        ControlFlow::Continue(())
    });
    root.each_decl(|decl, _| {
        decl.set_before("");
        ControlFlow::Continue(())
    });
    root.set_after("");

    assert_eq!(print(&root), "a{color:black}");
}

#[test]
fn selector_raw_survives_until_reassignment() {
    let root = parse_ok("a /**/ b {}");
    let rule = root.first().unwrap();
    assert_eq!(rule.selector().as_deref(), Some("a  b"));

    assert_eq!(print(&root), "a /**/ b {}");

    rule.set_selector(".link b");
    assert_eq!(print(&root), ".link b {}");
}

#[test]
fn value_edits_only_touch_their_own_footprint() {
    let css = "a { color: black; }\nb {\n  color: red;\n}\n";
    let root = parse_ok(css);

    let second = root.child(1).unwrap();
    second.first().unwrap().set_value("blue");

    assert_eq!(
        print(&root),
        "a { color: black; }\nb {\n  color: blue;\n}\n"
    );
}

#[test]
fn parent_links_track_insertions() {
    let root = parse_ok("a {}\nb {}");
    let fresh = cssforge::rule("c");
    let first = root.first().unwrap();
    root.insert_after(&first, &fresh).unwrap();

    assert_eq!(fresh.parent().unwrap(), root);
    assert_eq!(root.index(&fresh), Some(1));
    assert_eq!(root.child(1).unwrap(), fresh);
}

#[test]
fn iterating_while_prepending_clones_terminates() {
    let root = parse_ok("a { one: 1; two: 2; three: 3; }");
    let rule = root.first().unwrap();

    let mut visited = Vec::new();
    rule.each(|child, _| {
        visited.push(child.prop().unwrap());
        rule.prepend(&child.deep_clone()).unwrap();
        ControlFlow::Continue(())
    });

    assert_eq!(visited, ["one", "two", "three"]);
    assert_eq!(rule.len(), 6);
}

#[test]
fn removing_every_declaration_while_iterating() {
    let root = parse_ok("a { one: 1; two: 2; three: 3; }");
    let rule = root.first().unwrap();

    let mut visited = 0;
    rule.each(|child, _| {
        visited += 1;
        child.remove_self();
        assert!(child.parent().is_none());
        ControlFlow::Continue(())
    });

    assert_eq!(visited, 3);
    assert!(rule.is_empty());
    assert_eq!(print(&root), "a { }");
}

#[test]
fn recursive_walkers_reach_nested_nodes() {
    let root = parse_ok("@media print { a { color: black } }\nb { top: 0 }");

    let mut decls = Vec::new();
    root.each_decl(|decl, _| {
        decls.push(decl.prop().unwrap());
        ControlFlow::Continue(())
    });
    assert_eq!(decls, ["color", "top"]);

    let mut rules = Vec::new();
    root.each_rule(|rule, _| {
        rules.push(rule.selector().unwrap());
        ControlFlow::Continue(())
    });
    assert_eq!(rules, ["a", "b"]);

    let mut at_rules = 0;
    root.each_at_rule(|_, _| {
        at_rules += 1;
        ControlFlow::Continue(())
    });
    assert_eq!(at_rules, 1);
}

#[test]
fn moving_a_declaration_between_rules() {
    let root = parse_ok("a { color: black }\nb {}");
    let first = root.first().unwrap();
    let second = root.child(1).unwrap();
    let color = first.first().unwrap();

    second.append(&color).unwrap();

    assert!(first.is_empty());
    assert_eq!(color.parent().unwrap(), second);
    // the moved declaration keeps its own texture; the donor rule keeps its
    // whitespace
    assert_eq!(print(&root), "a { }\nb { color: black}");
}
