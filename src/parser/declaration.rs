use crate::errors::Result;
use crate::node::{Node, Raw};
use crate::parser::Parser;
use crate::tokenizer::{Token, TokenType};

impl Parser {
    /// Builds a declaration from a run. `semi` is the terminating `;`, or
    /// `None` when the run was ended by the container closing; in that case
    /// the trailing whitespace of the run is handed back to the container.
    pub(crate) fn parse_declaration(
        &mut self,
        container: &Node,
        mut run: Vec<Token>,
        semi: Option<Token>,
    ) -> Result<()> {
        log::trace!("parse_declaration");

        let before = self.take_pending();
        if semi.is_none() {
            while run
                .last()
                .is_some_and(|t| t.token_type == TokenType::Whitespace)
            {
                let t = run.pop().expect("checked non-empty");
                let text = self.tokenizer.text(&t).to_string();
                self.pending.insert_str(0, &text);
            }
        }

        let first = run[0];

        let mut depth = 0usize;
        let mut colon = None;
        for (index, t) in run.iter().enumerate() {
            match t.token_type {
                TokenType::LParen => depth += 1,
                TokenType::RParen => depth = depth.saturating_sub(1),
                TokenType::Colon if depth == 0 => {
                    colon = Some(index);
                    break;
                }
                _ => {}
            }
        }
        let Some(colon) = colon else {
            return Err(self.error("Unknown word", first.location));
        };
        if colon == 0 {
            return Err(self.error("Unknown word", first.location));
        }

        let (prop_tokens, prop_trailing) = self.split_trailing_whitespace(&run[..colon]);
        let prop = self.run_text(prop_tokens);

        let mut between = prop_trailing;
        between.push(':');
        let mut value_start = colon + 1;
        while value_start < run.len()
            && matches!(
                run[value_start].token_type,
                TokenType::Whitespace | TokenType::Comment
            )
        {
            between.push_str(self.tokenizer.text(&run[value_start]));
            value_start += 1;
        }

        let value_tokens = &run[value_start..];
        if value_tokens.is_empty() {
            return Err(self.error("Missing declaration value", first.location));
        }
        let raw = self.run_text(value_tokens);
        let value = self.clean_text(value_tokens);

        let node = Node::new_decl(prop, value.clone());
        node.set_between(between);
        if raw != value {
            node.set_value_raw(Raw { raw, value });
        }
        node.set_before(before);

        let end = match &semi {
            Some(t) => t.end,
            None => run.last().expect("run is never empty here").end,
        };
        node.set_source(self.source(first.location, end));
        self.append_node(container, &node, first.location)?;
        container.set_semicolon(semi.is_some());
        Ok(())
    }
}
