use crate::errors::Result;
use crate::node::{Node, Raw};
use crate::parser::{BlockMode, Parser};
use crate::tokenizer::Token;

impl Parser {
    /// Builds a rule from a selector run whose terminating `{` was just
    /// consumed, then parses its body.
    pub(crate) fn parse_rule(
        &mut self,
        container: &Node,
        run: Vec<Token>,
        open: Token,
    ) -> Result<()> {
        log::trace!("parse_rule");

        let (selector_tokens, between) = self.split_trailing_whitespace(&run);
        let raw = self.run_text(selector_tokens);
        let selector = self.clean_text(selector_tokens);

        let node = Node::new_rule(selector.clone());
        if raw != selector {
            node.set_selector_raw(Raw {
                raw,
                value: selector,
            });
        }
        node.set_between(between);
        node.set_before(self.take_pending());

        let start = run.first().map(|t| t.location).unwrap_or(open.location);
        node.set_source(self.source(start, open.end));
        self.append_node(container, &node, start)?;

        let end = self.parse_nodes(&node, BlockMode::RuleBody)?;
        node.set_source_end(end);
        Ok(())
    }
}
