use crate::errors::Result;
use crate::node::{Node, Raw, Shape};
use crate::parser::{BlockMode, Parser, RunEnd};
use crate::tokenizer::{Token, TokenType};

impl Parser {
    /// Parses an at-rule whose `@name` token was just consumed. The params
    /// run decides the shape: a `;` (or the container ending) makes it
    /// childless, a `{` opens a body whose first child fixes the kind.
    pub(crate) fn parse_at_rule(&mut self, container: &Node, at: Token) -> Result<()> {
        log::trace!("parse_at_rule");

        let name = self.tokenizer.text(&at)[1..].to_string();
        let before = self.take_pending();
        let (run, end) = self.collect_run()?;

        let mut params_from = 0;
        let mut after_name = String::new();
        while params_from < run.len() && run[params_from].token_type == TokenType::Whitespace {
            after_name.push_str(self.tokenizer.text(&run[params_from]));
            params_from += 1;
        }

        let (params_tokens, between) = self.split_trailing_whitespace(&run[params_from..]);
        let raw = self.run_text(params_tokens);
        let params = self.clean_text(params_tokens);

        let node = Node::new_at_rule(name, params.clone());
        node.set_after_name(after_name);
        node.set_between(between);
        if raw != params {
            node.set_params_raw(Raw { raw, value: params });
        }
        node.set_before(before);
        node.set_source(self.source(at.location, at.end));
        self.append_node(container, &node, at.location)?;

        match end {
            RunEnd::Semicolon(semi) => {
                node.set_shape(Shape::Childless);
                node.set_semicolon(true);
                node.set_source_end(semi.end);
            }
            RunEnd::ContainerEnd => {
                node.set_shape(Shape::Childless);
                node.set_semicolon(false);
                let end = params_tokens.last().map(|t| t.end).unwrap_or(at.end);
                node.set_source_end(end);
            }
            RunEnd::BlockOpen(_) => {
                node.set_shape(Shape::Block);
                let end = self.parse_nodes(&node, BlockMode::AtRuleBody)?;
                node.set_source_end(end);
            }
        }
        Ok(())
    }
}
