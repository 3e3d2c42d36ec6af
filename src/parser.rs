//! Recursive-descent parser producing the node tree. Raw bytes the cleaned
//! attributes were derived from are kept on the nodes, so an untouched tree
//! stringifies back to the original input byte for byte.

use crate::errors::{Error, Result};
use crate::input::Input;
use crate::location::Location;
use crate::node::{Node, Raw, Source};
use crate::tokenizer::{Token, TokenType, Tokenizer};
use std::rc::Rc;

mod at_rule;
mod declaration;
mod rule;

/// What kinds of children the container currently being parsed may hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BlockMode {
    /// Top level: rules, at-rules and comments
    Root,
    /// A rule body: declarations and comments
    RuleBody,
    /// An at-rule body: the first child fixes the shape
    AtRuleBody,
}

/// How a token run ended.
pub(crate) enum RunEnd {
    /// A `{`: the run is a rule head
    BlockOpen(Token),
    /// A `;`: the run is a declaration
    Semicolon(Token),
    /// A `}` or the end of input, left for the caller to consume
    ContainerEnd,
}

pub(crate) struct Parser {
    pub(crate) tokenizer: Tokenizer,
    input: Rc<Input>,
    /// Whitespace waiting to become the next node's `before`, or the
    /// enclosing container's `after` when the block ends first.
    pending: String,
}

impl Parser {
    pub(crate) fn new(input: Rc<Input>) -> Self {
        Self {
            tokenizer: Tokenizer::new(Rc::clone(&input)),
            input,
            pending: String::new(),
        }
    }

    pub(crate) fn parse_root(&mut self) -> Result<Node> {
        log::trace!("parse_root");

        let root = Node::new_root();
        root.set_source(Source {
            input: Rc::clone(&self.input),
            start: Location::default(),
            end: Location::default(),
        });

        let end = self.parse_nodes(&root, BlockMode::Root)?;
        root.set_source_end(end);
        Ok(root)
    }

    /// Parses one container's children until the block (or the input) ends.
    /// Returns the location just past the closing delimiter.
    pub(crate) fn parse_nodes(&mut self, container: &Node, mode: BlockMode) -> Result<Location> {
        log::trace!("parse_nodes mode={:?}", mode);

        loop {
            let t = self.consume()?;
            match t.token_type {
                TokenType::Whitespace => {
                    let text = self.tokenizer.text(&t).to_string();
                    self.pending.push_str(&text);
                }
                TokenType::Comment => {
                    self.parse_comment(container, &t)?;
                }
                TokenType::Semicolon => {
                    // a semicolon with nothing before it carries no content;
                    // its surrounding whitespace stays pending
                    log::warn!("dropping stray ';' at {}", t.location);
                }
                TokenType::AtKeyword => {
                    self.parse_at_rule(container, t)?;
                }
                TokenType::RCurly => {
                    if mode == BlockMode::Root {
                        return Err(self.input.error("Unexpected '}'", t.location).into());
                    }
                    container.set_after(self.take_pending());
                    return Ok(t.end);
                }
                TokenType::Eof => {
                    if mode == BlockMode::Root {
                        container.set_after(self.take_pending());
                        return Ok(t.location);
                    }
                    let start = container.source().map(|s| s.start).unwrap_or_default();
                    return Err(self.input.error("Unclosed block", start).into());
                }
                _ => {
                    self.tokenizer.reconsume();
                    self.parse_rule_or_declaration(container, mode)?;
                }
            }
        }
    }

    /// Collects a run and builds whichever node its terminator calls for.
    fn parse_rule_or_declaration(&mut self, container: &Node, mode: BlockMode) -> Result<()> {
        let (run, end) = self.collect_run()?;

        match end {
            RunEnd::BlockOpen(open) => {
                if mode == BlockMode::RuleBody {
                    return Err(self.input.error("Unexpected '{'", open.location).into());
                }
                self.parse_rule(container, run, open)
            }
            RunEnd::Semicolon(semi) => {
                if mode == BlockMode::Root {
                    return Err(self.input.error("Unknown word", run[0].location).into());
                }
                self.parse_declaration(container, run, Some(semi))
            }
            RunEnd::ContainerEnd => {
                if mode == BlockMode::Root {
                    return Err(self.input.error("Unknown word", run[0].location).into());
                }
                self.parse_declaration(container, run, None)
            }
        }
    }

    /// Collects tokens up to a `{`, `;`, `}` or the end of input, outside
    /// any parenthesis group. The terminating `}`/EOF is reconsumed for the
    /// caller; an open `(` at that point is an error.
    fn collect_run(&mut self) -> Result<(Vec<Token>, RunEnd)> {
        let mut run: Vec<Token> = Vec::new();
        let mut parens: Vec<Token> = Vec::new();

        loop {
            let t = self.consume()?;
            match t.token_type {
                TokenType::LParen => {
                    parens.push(t);
                    run.push(t);
                }
                TokenType::RParen => {
                    parens.pop();
                    run.push(t);
                }
                TokenType::LCurly if parens.is_empty() => return Ok((run, RunEnd::BlockOpen(t))),
                TokenType::Semicolon if parens.is_empty() => return Ok((run, RunEnd::Semicolon(t))),
                TokenType::RCurly | TokenType::Eof => {
                    if let Some(open) = parens.first() {
                        return Err(self.input.error("Unclosed bracket", open.location).into());
                    }
                    self.tokenizer.reconsume();
                    return Ok((run, RunEnd::ContainerEnd));
                }
                _ => run.push(t),
            }
        }
    }

    fn parse_comment(&mut self, container: &Node, t: &Token) -> Result<()> {
        log::trace!("parse_comment");

        let raw = self.tokenizer.text(t);
        let interior = &raw[2..raw.len() - 2];
        let text = interior.trim().to_string();

        let node = Node::new_comment(text.clone());
        if interior != text {
            node.set_text_raw(Raw {
                raw: interior.to_string(),
                value: text,
            });
        }
        node.set_before(self.take_pending());
        node.set_source(Source {
            input: Rc::clone(&self.input),
            start: t.location,
            end: t.end,
        });
        self.append_node(container, &node, t.location)
    }

    /// Appends a parsed child, turning shape violations into positioned
    /// syntax errors.
    fn append_node(&mut self, container: &Node, node: &Node, location: Location) -> Result<()> {
        match container.append(node) {
            Ok(()) => Ok(()),
            Err(Error::Structure(message)) => {
                Err(self.input.error(&message, location).into())
            }
            Err(other) => Err(other),
        }
    }

    fn consume(&mut self) -> Result<Token> {
        Ok(self.tokenizer.consume()?)
    }

    fn take_pending(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    fn source(&self, start: Location, end: Location) -> Source {
        Source {
            input: Rc::clone(&self.input),
            start,
            end,
        }
    }

    /// Concatenated raw text of a token slice.
    fn run_text(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for t in tokens {
            out.push_str(self.tokenizer.text(t));
        }
        out
    }

    /// Splits trailing whitespace tokens off a run, returning the remainder
    /// and the whitespace text.
    fn split_trailing_whitespace<'t>(&self, run: &'t [Token]) -> (&'t [Token], String) {
        let mut end = run.len();
        while end > 0 && run[end - 1].token_type == TokenType::Whitespace {
            end -= 1;
        }
        (&run[..end], self.run_text(&run[end..]))
    }

    /// Raw text with comment tokens elided and outer whitespace trimmed:
    /// the cleaned form of a selector, params or value run.
    fn clean_text(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for t in tokens {
            if t.token_type != TokenType::Comment {
                out.push_str(self.tokenizer.text(t));
            }
        }
        out.trim().to_string()
    }

    /// Raw positioned syntax error helper for the submodules.
    fn error(&self, reason: &str, location: Location) -> Error {
        self.input.error(reason, location).into()
    }
}
