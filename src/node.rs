//! The node tree: five node variants behind one reference-counted handle,
//! with parent links, ordered child containers and iteration that survives
//! structural edits.

use crate::errors::{CssSyntaxError, Error, Result};
use crate::input::Input;
use crate::location::Location;
use std::cell::RefCell;
use std::fmt;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

/// Original bytes of an attribute paired with the cleaned value they were
/// derived from. The raw form is only emitted while the node's cleaned
/// value still equals `value`; assigning a new value invalidates the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw {
    /// The original bytes, comments and inner whitespace included
    pub raw: String,
    /// The cleaned value those bytes correspond to
    pub value: String,
}

/// Where a node came from: the shared parse input and its span in it.
/// `end` points one past the node's last character.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub input: Rc<Input>,
    pub start: Location,
    pub end: Location,
}

/// Discriminant of the five node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Root,
    Rule,
    AtRule,
    Decl,
    Comment,
}

/// Container shape of an at-rule. The shape is fixed the moment the parser
/// sees the at-rule's terminator, or when the first child is appended to a
/// manually constructed at-rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Manually constructed, nothing decided yet
    Undecided,
    /// Parsed without a body, e.g. `@charset "utf-8";`
    Childless,
    /// Parsed with a body whose first child has not been seen yet
    Block,
    /// Holds declarations, e.g. `@font-face`
    Decls,
    /// Holds rules and nested at-rules, e.g. `@media`
    Rules,
}

#[derive(Debug, Clone)]
pub(crate) enum Kind {
    Root,
    Rule {
        selector: String,
        selector_raw: Option<Raw>,
        /// Text between the selector and the `{`
        between: Option<String>,
    },
    AtRule {
        name: String,
        /// Text between `@name` and the params
        after_name: Option<String>,
        params: String,
        params_raw: Option<Raw>,
        /// Text between the params and the body or `;`
        between: Option<String>,
        shape: Shape,
    },
    Decl {
        prop: String,
        /// Text between the prop and the value, colon included
        between: Option<String>,
        value: String,
        value_raw: Option<Raw>,
    },
    Comment {
        text: String,
        text_raw: Option<Raw>,
    },
}

#[derive(Debug)]
struct NodeInner {
    kind: Kind,
    source: Option<Source>,
    /// Whitespace and comments preceding the node inside its parent.
    /// `None` means the node was synthesized and its style is derived at
    /// stringification time.
    before: Option<String>,
    /// Containers: whitespace between the last child and the closing
    /// delimiter (or end of input for the root)
    after: Option<String>,
    /// Containers holding declarations: whether the last declaration ended
    /// with a semicolon. Childless at-rules: whether to emit their own.
    semicolon: Option<bool>,
    parent: Option<Weak<RefCell<NodeInner>>>,
    children: Vec<Node>,
    /// Active iteration cursors over `children`, adjusted by every
    /// structural mutation so iteration survives edits
    cursors: Vec<isize>,
}

/// Handle to a node. Cloning the handle clones the reference, not the node;
/// use [`Node::deep_clone`] for a detached copy of the subtree.
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<NodeInner>>,
}

/// A way to address a child of a container: either its index or the child
/// node itself.
pub trait ChildRef {
    fn resolve(&self, container: &Node) -> Option<usize>;
}

impl ChildRef for usize {
    fn resolve(&self, container: &Node) -> Option<usize> {
        (*self < container.len()).then_some(*self)
    }
}

impl ChildRef for &Node {
    fn resolve(&self, container: &Node) -> Option<usize> {
        container.index(self)
    }
}

impl Node {
    fn from_kind(kind: Kind) -> Node {
        Node {
            inner: Rc::new(RefCell::new(NodeInner {
                kind,
                source: None,
                before: None,
                after: None,
                semicolon: None,
                parent: None,
                children: Vec::new(),
                cursors: Vec::new(),
            })),
        }
    }

    pub(crate) fn new_root() -> Node {
        Node::from_kind(Kind::Root)
    }

    pub(crate) fn new_rule(selector: String) -> Node {
        Node::from_kind(Kind::Rule {
            selector,
            selector_raw: None,
            between: None,
        })
    }

    pub(crate) fn new_at_rule(name: String, params: String) -> Node {
        Node::from_kind(Kind::AtRule {
            name,
            after_name: None,
            params,
            params_raw: None,
            between: None,
            shape: Shape::Undecided,
        })
    }

    pub(crate) fn new_decl(prop: String, value: String) -> Node {
        Node::from_kind(Kind::Decl {
            prop,
            between: None,
            value,
            value_raw: None,
        })
    }

    pub(crate) fn new_comment(text: String) -> Node {
        Node::from_kind(Kind::Comment {
            text,
            text_raw: None,
        })
    }

    /// Two handles are equal when they point at the same node.
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn node_type(&self) -> NodeType {
        match self.inner.borrow().kind {
            Kind::Root => NodeType::Root,
            Kind::Rule { .. } => NodeType::Rule,
            Kind::AtRule { .. } => NodeType::AtRule,
            Kind::Decl { .. } => NodeType::Decl,
            Kind::Comment { .. } => NodeType::Comment,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self.node_type(),
            NodeType::Root | NodeType::Rule | NodeType::AtRule
        )
    }

    // ------------------------------------------------------------------
    // Attribute access. Getters return `None` on other node kinds; the
    // typed setters invalidate the matching raw record and are no-ops on
    // other node kinds.

    pub fn selector(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            Kind::Rule { selector, .. } => Some(selector.clone()),
            _ => None,
        }
    }

    pub fn set_selector(&self, selector: impl Into<String>) {
        if let Kind::Rule {
            selector: current,
            selector_raw,
            ..
        } = &mut self.inner.borrow_mut().kind
        {
            *current = selector.into();
            *selector_raw = None;
        }
    }

    pub fn name(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            Kind::AtRule { name, .. } => Some(name.clone()),
            _ => None,
        }
    }

    pub fn set_name(&self, name: impl Into<String>) {
        if let Kind::AtRule { name: current, .. } = &mut self.inner.borrow_mut().kind {
            *current = name.into();
        }
    }

    pub fn params(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            Kind::AtRule { params, .. } => Some(params.clone()),
            _ => None,
        }
    }

    pub fn set_params(&self, params: impl Into<String>) {
        if let Kind::AtRule {
            params: current,
            params_raw,
            ..
        } = &mut self.inner.borrow_mut().kind
        {
            *current = params.into();
            *params_raw = None;
        }
    }

    pub fn prop(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            Kind::Decl { prop, .. } => Some(prop.clone()),
            _ => None,
        }
    }

    pub fn set_prop(&self, prop: impl Into<String>) {
        if let Kind::Decl { prop: current, .. } = &mut self.inner.borrow_mut().kind {
            *current = prop.into();
        }
    }

    pub fn value(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            Kind::Decl { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    pub fn set_value(&self, value: impl Into<String>) {
        if let Kind::Decl {
            value: current,
            value_raw,
            ..
        } = &mut self.inner.borrow_mut().kind
        {
            *current = value.into();
            *value_raw = None;
        }
    }

    pub fn text(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            Kind::Comment { text, .. } => Some(text.clone()),
            _ => None,
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        if let Kind::Comment {
            text: current,
            text_raw,
        } = &mut self.inner.borrow_mut().kind
        {
            *current = text.into();
            *text_raw = None;
        }
    }

    pub fn before(&self) -> Option<String> {
        self.inner.borrow().before.clone()
    }

    pub fn set_before(&self, before: impl Into<String>) {
        self.inner.borrow_mut().before = Some(before.into());
    }

    pub fn after(&self) -> Option<String> {
        self.inner.borrow().after.clone()
    }

    pub fn set_after(&self, after: impl Into<String>) {
        self.inner.borrow_mut().after = Some(after.into());
    }

    pub fn between(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            Kind::Rule { between, .. }
            | Kind::AtRule { between, .. }
            | Kind::Decl { between, .. } => between.clone(),
            _ => None,
        }
    }

    pub fn set_between(&self, text: impl Into<String>) {
        if let Kind::Rule { between, .. }
        | Kind::AtRule { between, .. }
        | Kind::Decl { between, .. } = &mut self.inner.borrow_mut().kind
        {
            *between = Some(text.into());
        }
    }

    pub fn after_name(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            Kind::AtRule { after_name, .. } => after_name.clone(),
            _ => None,
        }
    }

    pub fn set_after_name(&self, text: impl Into<String>) {
        if let Kind::AtRule { after_name, .. } = &mut self.inner.borrow_mut().kind {
            *after_name = Some(text.into());
        }
    }

    pub fn semicolon(&self) -> Option<bool> {
        self.inner.borrow().semicolon
    }

    pub fn set_semicolon(&self, semicolon: bool) {
        self.inner.borrow_mut().semicolon = Some(semicolon);
    }

    pub fn shape(&self) -> Option<Shape> {
        match &self.inner.borrow().kind {
            Kind::AtRule { shape, .. } => Some(*shape),
            _ => None,
        }
    }

    pub(crate) fn set_shape(&self, new_shape: Shape) {
        if let Kind::AtRule { shape, .. } = &mut self.inner.borrow_mut().kind {
            *shape = new_shape;
        }
    }

    pub fn source(&self) -> Option<Source> {
        self.inner.borrow().source.clone()
    }

    pub(crate) fn set_source(&self, source: Source) {
        self.inner.borrow_mut().source = Some(source);
    }

    pub(crate) fn set_source_end(&self, end: Location) {
        if let Some(source) = self.inner.borrow_mut().source.as_mut() {
            source.end = end;
        }
    }

    pub(crate) fn selector_raw(&self) -> Option<Raw> {
        match &self.inner.borrow().kind {
            Kind::Rule { selector_raw, .. } => selector_raw.clone(),
            _ => None,
        }
    }

    pub(crate) fn set_selector_raw(&self, raw: Raw) {
        if let Kind::Rule { selector_raw, .. } = &mut self.inner.borrow_mut().kind {
            *selector_raw = Some(raw);
        }
    }

    pub(crate) fn params_raw(&self) -> Option<Raw> {
        match &self.inner.borrow().kind {
            Kind::AtRule { params_raw, .. } => params_raw.clone(),
            _ => None,
        }
    }

    pub(crate) fn set_params_raw(&self, raw: Raw) {
        if let Kind::AtRule { params_raw, .. } = &mut self.inner.borrow_mut().kind {
            *params_raw = Some(raw);
        }
    }

    pub(crate) fn value_raw(&self) -> Option<Raw> {
        match &self.inner.borrow().kind {
            Kind::Decl { value_raw, .. } => value_raw.clone(),
            _ => None,
        }
    }

    pub(crate) fn set_value_raw(&self, raw: Raw) {
        if let Kind::Decl { value_raw, .. } = &mut self.inner.borrow_mut().kind {
            *value_raw = Some(raw);
        }
    }

    pub(crate) fn text_raw(&self) -> Option<Raw> {
        match &self.inner.borrow().kind {
            Kind::Comment { text_raw, .. } => text_raw.clone(),
            _ => None,
        }
    }

    pub(crate) fn set_text_raw(&self, raw: Raw) {
        if let Kind::Comment { text_raw, .. } = &mut self.inner.borrow_mut().kind {
            *text_raw = Some(raw);
        }
    }

    // ------------------------------------------------------------------
    // Tree navigation

    pub fn parent(&self) -> Option<Node> {
        let weak = self.inner.borrow().parent.clone()?;
        weak.upgrade().map(|inner| Node { inner })
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles to the current children, in order.
    pub fn nodes(&self) -> Vec<Node> {
        self.inner.borrow().children.clone()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        self.inner.borrow().children.get(index).cloned()
    }

    pub fn first(&self) -> Option<Node> {
        self.child(0)
    }

    pub fn last(&self) -> Option<Node> {
        let inner = self.inner.borrow();
        inner.children.last().cloned()
    }

    /// Index of a direct child, by identity.
    pub fn index(&self, child: &Node) -> Option<usize> {
        self.inner
            .borrow()
            .children
            .iter()
            .position(|n| Node::ptr_eq(n, child))
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        parent.child(parent.index(self)? + 1)
    }

    pub fn prev_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        parent.child(parent.index(self)?.checked_sub(1)?)
    }

    /// Builds a syntax error anchored at this node's start position, with
    /// the originating input attached for excerpt rendering.
    pub fn error(&self, reason: &str) -> CssSyntaxError {
        match self.source() {
            Some(source) => source.input.error(reason, source.start),
            None => CssSyntaxError::new(reason, None, 1, 1, None),
        }
    }

    // ------------------------------------------------------------------
    // Structural mutation

    /// Appends a child at the end. The child is detached from any previous
    /// parent first.
    pub fn append(&self, child: &Node) -> Result<()> {
        self.admit(child)?;
        child.detach();
        let index = self.len();
        self.raw_insert(index, child);
        Ok(())
    }

    /// Inserts a child at the front.
    pub fn prepend(&self, child: &Node) -> Result<()> {
        self.admit(child)?;
        child.detach();
        self.raw_insert(0, child);
        Ok(())
    }

    /// Inserts `child` before the referenced child. The reference may be a
    /// child node or an index.
    pub fn insert_before(&self, reference: impl ChildRef, child: &Node) -> Result<()> {
        self.admit(child)?;
        child.detach();
        let index = reference
            .resolve(self)
            .ok_or_else(|| Error::Structure("reference is not a child of this container".into()))?;
        self.raw_insert(index, child);
        Ok(())
    }

    /// Inserts `child` after the referenced child.
    pub fn insert_after(&self, reference: impl ChildRef, child: &Node) -> Result<()> {
        self.admit(child)?;
        child.detach();
        let index = reference
            .resolve(self)
            .ok_or_else(|| Error::Structure("reference is not a child of this container".into()))?;
        self.raw_insert(index + 1, child);
        Ok(())
    }

    /// Removes and returns the referenced child. Its `parent` becomes
    /// `None`.
    pub fn remove(&self, reference: impl ChildRef) -> Option<Node> {
        let index = reference.resolve(self)?;
        let child = {
            let mut inner = self.inner.borrow_mut();
            let child = inner.children.remove(index);
            for cursor in inner.cursors.iter_mut() {
                if *cursor >= index as isize {
                    *cursor -= 1;
                }
            }
            child
        };
        child.inner.borrow_mut().parent = None;
        Some(child)
    }

    /// Detaches this node from its parent, if it has one.
    pub fn remove_self(&self) {
        self.detach();
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove(self);
        }
    }

    fn raw_insert(&self, index: usize, child: &Node) {
        {
            let mut inner = self.inner.borrow_mut();
            let index = index.min(inner.children.len());
            inner.children.insert(index, child.clone());
            for cursor in inner.cursors.iter_mut() {
                if index as isize <= *cursor {
                    *cursor += 1;
                }
            }
        }
        child.inner.borrow_mut().parent = Some(Rc::downgrade(&self.inner));
    }

    /// Checks a child against this container's kind and, for at-rules,
    /// fixes the shape on the first real child.
    fn admit(&self, child: &Node) -> Result<()> {
        let child_type = child.node_type();
        if child_type == NodeType::Root {
            return Err(Error::Structure(
                "a root cannot be added to a container".into(),
            ));
        }

        match self.node_type() {
            NodeType::Root => match child_type {
                NodeType::Rule | NodeType::AtRule | NodeType::Comment => Ok(()),
                _ => Err(Error::Structure(
                    "declarations cannot be added at the root".into(),
                )),
            },
            NodeType::Rule => match child_type {
                NodeType::Decl | NodeType::Comment => Ok(()),
                _ => Err(Error::Structure(
                    "only declarations and comments can be added to a rule".into(),
                )),
            },
            NodeType::AtRule => {
                let shape = self.shape().expect("at-rules always have a shape");
                match (shape, child_type) {
                    (Shape::Undecided | Shape::Block, NodeType::Decl) => {
                        self.set_shape(Shape::Decls);
                        Ok(())
                    }
                    (Shape::Undecided | Shape::Block, NodeType::Rule | NodeType::AtRule) => {
                        self.set_shape(Shape::Rules);
                        Ok(())
                    }
                    // only comments remain; roots were rejected above
                    (Shape::Undecided | Shape::Block, _) => Ok(()),
                    (Shape::Childless, _) => Err(Error::Structure(
                        "this at-rule was closed with a semicolon and cannot have children".into(),
                    )),
                    (Shape::Decls, NodeType::Decl | NodeType::Comment) => Ok(()),
                    (Shape::Decls, _) => Err(Error::Structure(
                        "rules cannot be added to a declaration-holding at-rule".into(),
                    )),
                    (Shape::Rules, NodeType::Rule | NodeType::AtRule | NodeType::Comment) => Ok(()),
                    (Shape::Rules, _) => Err(Error::Structure(
                        "declarations cannot be added to a rule-holding at-rule".into(),
                    )),
                }
            }
            NodeType::Decl | NodeType::Comment => Err(Error::Structure(
                "declarations and comments cannot have children".into(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Iteration

    /// Iterates the direct children. Iteration survives structural edits
    /// made from the callback: no child is visited twice and none is
    /// skipped. Returning `ControlFlow::Break` stops the iteration and
    /// propagates.
    pub fn each<F>(&self, mut callback: F) -> ControlFlow<()>
    where
        F: FnMut(&Node, usize) -> ControlFlow<()>,
    {
        let slot = {
            let mut inner = self.inner.borrow_mut();
            inner.cursors.push(0);
            inner.cursors.len() - 1
        };

        let flow = loop {
            let (child, index) = {
                let mut inner = self.inner.borrow_mut();
                let cursor = inner.cursors[slot].max(0);
                inner.cursors[slot] = cursor;
                let cursor = cursor as usize;
                if cursor >= inner.children.len() {
                    break ControlFlow::Continue(());
                }
                (inner.children[cursor].clone(), cursor)
            };

            let result = callback(&child, index);
            self.inner.borrow_mut().cursors[slot] += 1;

            if result.is_break() {
                break ControlFlow::Break(());
            }
        };

        self.inner.borrow_mut().cursors.pop();
        flow
    }

    /// Depth-first pre-order visit of every descendant.
    pub fn walk<F>(&self, callback: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&Node, usize) -> ControlFlow<()>,
    {
        self.each(|child, index| {
            callback(child, index)?;
            if child.is_container() {
                child.walk(&mut *callback)?;
            }
            ControlFlow::Continue(())
        })
    }

    fn walk_type<F>(&self, node_type: NodeType, mut callback: F) -> ControlFlow<()>
    where
        F: FnMut(&Node, usize) -> ControlFlow<()>,
    {
        self.walk(&mut |node, index| {
            if node.node_type() == node_type {
                callback(node, index)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Visits every declaration in the subtree, depth-first pre-order.
    pub fn each_decl<F>(&self, callback: F) -> ControlFlow<()>
    where
        F: FnMut(&Node, usize) -> ControlFlow<()>,
    {
        self.walk_type(NodeType::Decl, callback)
    }

    /// Visits every rule in the subtree.
    pub fn each_rule<F>(&self, callback: F) -> ControlFlow<()>
    where
        F: FnMut(&Node, usize) -> ControlFlow<()>,
    {
        self.walk_type(NodeType::Rule, callback)
    }

    /// Visits every at-rule in the subtree.
    pub fn each_at_rule<F>(&self, callback: F) -> ControlFlow<()>
    where
        F: FnMut(&Node, usize) -> ControlFlow<()>,
    {
        self.walk_type(NodeType::AtRule, callback)
    }

    /// Visits every comment in the subtree.
    pub fn each_comment<F>(&self, callback: F) -> ControlFlow<()>
    where
        F: FnMut(&Node, usize) -> ControlFlow<()>,
    {
        self.walk_type(NodeType::Comment, callback)
    }

    /// True if the predicate holds for some direct child. Short-circuits.
    pub fn some<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&Node, usize) -> bool,
    {
        let mut found = false;
        self.each(|node, index| {
            if predicate(node, index) {
                found = true;
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        found
    }

    /// True if the predicate holds for every direct child. Short-circuits.
    pub fn every<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&Node, usize) -> bool,
    {
        let mut holds = true;
        self.each(|node, index| {
            if predicate(node, index) {
                ControlFlow::Continue(())
            } else {
                holds = false;
                ControlFlow::Break(())
            }
        });
        holds
    }

    // ------------------------------------------------------------------

    /// Produces a detached deep copy: children are copied recursively, raw
    /// records and source spans verbatim, and the copy has no parent.
    pub fn deep_clone(&self) -> Node {
        let copy = {
            let inner = self.inner.borrow();
            Node {
                inner: Rc::new(RefCell::new(NodeInner {
                    kind: inner.kind.clone(),
                    source: inner.source.clone(),
                    before: inner.before.clone(),
                    after: inner.after.clone(),
                    semicolon: inner.semicolon,
                    parent: None,
                    children: Vec::new(),
                    cursors: Vec::new(),
                })),
            }
        };

        let children = self.nodes();
        for child in children {
            let child_copy = child.deep_clone();
            child_copy.inner.borrow_mut().parent = Some(Rc::downgrade(&copy.inner));
            copy.inner.borrow_mut().children.push(child_copy);
        }
        copy
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Node::ptr_eq(self, other)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Node")
            .field("kind", &inner.kind)
            .field("before", &inner.before)
            .field("after", &inner.after)
            .field("semicolon", &inner.semicolon)
            .field("children", &inner.children)
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::stringifier::to_string(self))
    }
}
