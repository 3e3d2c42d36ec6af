use crate::errors::CssSyntaxError;
use crate::input::Input;
use crate::location::Location;
use std::rc::Rc;

/// The lexical token kinds of CSS as this crate reads it. Tokens carry no
/// text of their own; their bytes live in the shared [`Input`] and are
/// addressed by the half-open range `location.offset()..end.offset()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// A run of consecutive whitespace characters
    Whitespace,
    /// A `/* ... */` block comment, delimiters included
    Comment,
    /// A single- or double-quoted string, quotes included, escapes untouched
    QuotedString,
    /// An identifier-like word: idents, numbers, dimensions, combinators.
    /// Everything that is not whitespace, punctuation or a quote lands here.
    Word,
    /// `@` followed by word characters, e.g. `@media`
    AtKeyword,
    /// `#` followed by word characters, e.g. `#header`
    Hash,
    /// A `{`
    LCurly,
    /// A `}`
    RCurly,
    /// A `(`
    LParen,
    /// A `)`
    RParen,
    /// A `[`
    LBracket,
    /// A `]`
    RBracket,
    /// A `:`
    Colon,
    /// A `;`
    Semicolon,
    /// A `,`
    Comma,
    /// Any other single character
    Delim(char),
    Eof,
}

/// A single lexical token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    /// Type of the token
    pub token_type: TokenType,
    /// Location of the token's first character
    pub location: Location,
    /// Location one past the token's last character
    pub end: Location,
}

impl Token {
    fn new(token_type: TokenType, location: Location, end: Location) -> Token {
        Token {
            token_type,
            location,
            end,
        }
    }
}

/// Tokenizer producing the token sequence lazily. Produced tokens are kept
/// in an internal buffer so the parser can look ahead and reconsume.
pub struct Tokenizer {
    input: Rc<Input>,
    /// Decoded characters of the input
    chars: Vec<char>,
    /// Byte offset of each character, with the total length as a sentinel
    offsets: Vec<usize>,
    /// Index of the next character to read
    char_pos: usize,
    line: usize,
    column: usize,
    /// Full list of all tokens produced so far
    tokens: Vec<Token>,
    /// Position of the NEXT token to consume
    position: usize,
}

impl Tokenizer {
    pub fn new(input: Rc<Input>) -> Self {
        let chars: Vec<char> = input.css.chars().collect();
        let mut offsets = Vec::with_capacity(chars.len() + 1);
        let mut offset = 0;
        for c in &chars {
            offsets.push(offset);
            offset += c.len_utf8();
        }
        offsets.push(offset);

        Self {
            input,
            chars,
            offsets,
            char_pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            position: 0,
        }
    }

    /// Location of the character cursor: the end of the furthest token
    /// produced so far.
    pub fn current_location(&self) -> Location {
        Location::new(self.line, self.column, self.offsets[self.char_pos])
    }

    /// The raw text of a token.
    pub fn text(&self, token: &Token) -> &str {
        &self.input.css[token.location.offset()..token.end.offset()]
    }

    /// Consumes the next token and returns it. At the end of the input this
    /// keeps returning `Eof` tokens.
    pub fn consume(&mut self) -> Result<Token, CssSyntaxError> {
        if self.position == self.tokens.len() {
            let token = self.consume_token()?;
            self.tokens.push(token);
        }

        let token = self.tokens[self.position];
        self.position += 1;
        Ok(token)
    }

    /// Looks ahead at the token `offset` positions after the one `consume`
    /// would return next.
    pub fn lookahead(&mut self, offset: usize) -> Result<Token, CssSyntaxError> {
        while self.tokens.len() <= self.position + offset {
            let token = self.consume_token()?;
            self.tokens.push(token);
        }

        Ok(self.tokens[self.position + offset])
    }

    /// Pushes the position back so the next read returns the same token.
    pub fn reconsume(&mut self) {
        if self.position > 0 {
            self.position -= 1;
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.char_pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = *self.chars.get(self.char_pos)?;
        self.char_pos += 1;

        // \r\n advances the line once, on the \n
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\r' if self.peek(0) != Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }

        Some(c)
    }

    fn consume_token(&mut self) -> Result<Token, CssSyntaxError> {
        let start = self.current_location();

        let Some(c) = self.peek(0) else {
            return Ok(Token::new(TokenType::Eof, start, start));
        };

        let token_type = match c {
            c if c.is_whitespace() => {
                while self.peek(0).is_some_and(|c| c.is_whitespace()) {
                    self.advance();
                }
                TokenType::Whitespace
            }
            '/' if self.peek(1) == Some('*') => {
                self.consume_comment(start)?;
                TokenType::Comment
            }
            '"' | '\'' => {
                self.consume_string(start)?;
                TokenType::QuotedString
            }
            '{' => {
                self.advance();
                TokenType::LCurly
            }
            '}' => {
                self.advance();
                TokenType::RCurly
            }
            '(' => {
                self.advance();
                TokenType::LParen
            }
            ')' => {
                self.advance();
                TokenType::RParen
            }
            '[' => {
                self.advance();
                TokenType::LBracket
            }
            ']' => {
                self.advance();
                TokenType::RBracket
            }
            ':' => {
                self.advance();
                TokenType::Colon
            }
            ';' => {
                self.advance();
                TokenType::Semicolon
            }
            ',' => {
                self.advance();
                TokenType::Comma
            }
            '@' => {
                self.advance();
                if self.consume_word() > 0 {
                    TokenType::AtKeyword
                } else {
                    TokenType::Delim('@')
                }
            }
            '#' => {
                self.advance();
                if self.consume_word() > 0 {
                    TokenType::Hash
                } else {
                    TokenType::Delim('#')
                }
            }
            '\\' => {
                if self.consume_word() > 0 {
                    TokenType::Word
                } else {
                    self.advance();
                    TokenType::Delim('\\')
                }
            }
            c if is_word_char(c) => {
                self.consume_word();
                TokenType::Word
            }
            c => {
                self.advance();
                TokenType::Delim(c)
            }
        };

        Ok(Token::new(token_type, start, self.current_location()))
    }

    /// Consumes a run of word characters, treating `\` as an escape that
    /// carries the following character along. Stops before a comment
    /// opener. Returns the number of characters consumed.
    fn consume_word(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.peek(0) {
                Some('\\') if self.peek(1).is_some() => {
                    self.advance();
                    self.advance();
                    count += 2;
                }
                Some('/') if self.peek(1) == Some('*') => break,
                Some(c) if is_word_char(c) => {
                    self.advance();
                    count += 1;
                }
                _ => break,
            }
        }
        count
    }

    fn consume_comment(&mut self, start: Location) -> Result<(), CssSyntaxError> {
        // consume '/*'
        self.advance();
        self.advance();

        loop {
            if self.peek(0) == Some('*') && self.peek(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            if self.advance().is_none() {
                return Err(self.input.error("Unclosed comment", start));
            }
        }
    }

    fn consume_string(&mut self, start: Location) -> Result<(), CssSyntaxError> {
        let quote = self.advance().expect("string opener was peeked");

        loop {
            match self.peek(0) {
                None => return Err(self.input.error("Unclosed string", start)),
                Some('\\') => {
                    self.advance();
                    if self.peek(0).is_some() {
                        self.advance();
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }
}

/// Word characters: everything except whitespace, structural punctuation,
/// quotes and the markers that start other token kinds. `/` is a word
/// character unless it opens a comment.
fn is_word_char(c: char) -> bool {
    if c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '{' | '}' | '(' | ')' | '[' | ']' | ':' | ';' | ',' | '"' | '\'' | '@' | '#' | '!' | '\\'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(css: &str) -> Vec<(TokenType, String)> {
        let input = Rc::new(Input::new(css.to_string(), None));
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        loop {
            let t = tokenizer.consume().unwrap();
            if t.token_type == TokenType::Eof {
                break;
            }
            out.push((t.token_type, tokenizer.text(&t).to_string()));
        }
        out
    }

    macro_rules! tokens {
        ($($token_type:expr => $text:expr),* $(,)?) => {
            vec![$(($token_type, $text.to_string())),*]
        };
    }

    #[test]
    fn tokenize_simple_rule() {
        assert_eq!(
            tokenize("a { color: black }"),
            tokens![
                TokenType::Word => "a",
                TokenType::Whitespace => " ",
                TokenType::LCurly => "{",
                TokenType::Whitespace => " ",
                TokenType::Word => "color",
                TokenType::Colon => ":",
                TokenType::Whitespace => " ",
                TokenType::Word => "black",
                TokenType::Whitespace => " ",
                TokenType::RCurly => "}",
            ]
        );
    }

    #[test]
    fn tokenize_selector_punctuation() {
        assert_eq!(
            tokenize("#header .nav::before,a>b {}"),
            tokens![
                TokenType::Hash => "#header",
                TokenType::Whitespace => " ",
                TokenType::Word => ".nav",
                TokenType::Colon => ":",
                TokenType::Colon => ":",
                TokenType::Word => "before",
                TokenType::Comma => ",",
                TokenType::Word => "a>b",
                TokenType::Whitespace => " ",
                TokenType::LCurly => "{",
                TokenType::RCurly => "}",
            ]
        );
    }

    #[test]
    fn tokenize_at_keywords() {
        assert_eq!(
            tokenize("@media screen (max-width: 200px) {}"),
            tokens![
                TokenType::AtKeyword => "@media",
                TokenType::Whitespace => " ",
                TokenType::Word => "screen",
                TokenType::Whitespace => " ",
                TokenType::LParen => "(",
                TokenType::Word => "max-width",
                TokenType::Colon => ":",
                TokenType::Whitespace => " ",
                TokenType::Word => "200px",
                TokenType::RParen => ")",
                TokenType::Whitespace => " ",
                TokenType::LCurly => "{",
                TokenType::RCurly => "}",
            ]
        );
    }

    #[test]
    fn bare_at_sign_is_a_delim() {
        assert_eq!(
            tokenize("@ x"),
            tokens![
                TokenType::Delim('@') => "@",
                TokenType::Whitespace => " ",
                TokenType::Word => "x",
            ]
        );
    }

    #[test]
    fn tokenize_strings() {
        assert_eq!(
            tokenize("content: \"me \\\" you\" 'single'"),
            tokens![
                TokenType::Word => "content",
                TokenType::Colon => ":",
                TokenType::Whitespace => " ",
                TokenType::QuotedString => "\"me \\\" you\"",
                TokenType::Whitespace => " ",
                TokenType::QuotedString => "'single'",
            ]
        );
    }

    #[test]
    fn tokenize_comments_and_words() {
        assert_eq!(
            tokenize("a/* c */b"),
            tokens![
                TokenType::Word => "a",
                TokenType::Comment => "/* c */",
                TokenType::Word => "b",
            ]
        );
    }

    #[test]
    fn slash_stays_inside_words() {
        assert_eq!(
            tokenize("font: 1em/1.5 serif"),
            tokens![
                TokenType::Word => "font",
                TokenType::Colon => ":",
                TokenType::Whitespace => " ",
                TokenType::Word => "1em/1.5",
                TokenType::Whitespace => " ",
                TokenType::Word => "serif",
            ]
        );
    }

    #[test]
    fn important_bang_is_a_delim() {
        assert_eq!(
            tokenize("red !important"),
            tokens![
                TokenType::Word => "red",
                TokenType::Whitespace => " ",
                TokenType::Delim('!') => "!",
                TokenType::Word => "important",
            ]
        );
    }

    #[test]
    fn escapes_are_carried_in_words() {
        assert_eq!(
            tokenize("\\26 B"),
            tokens![
                TokenType::Word => "\\26",
                TokenType::Whitespace => " ",
                TokenType::Word => "B",
            ]
        );
    }

    #[test]
    fn locations_are_tracked_per_line() {
        let input = Rc::new(Input::new("a{\n  b:c;\n}".to_string(), None));
        let mut tokenizer = Tokenizer::new(input);

        let mut locations = Vec::new();
        loop {
            let t = tokenizer.consume().unwrap();
            if t.token_type == TokenType::Eof {
                break;
            }
            locations.push((
                tokenizer.text(&t).to_string(),
                t.location.line(),
                t.location.column(),
                t.location.offset(),
            ));
        }

        assert_eq!(
            locations,
            vec![
                ("a".to_string(), 1, 1, 0),
                ("{".to_string(), 1, 2, 1),
                ("\n  ".to_string(), 1, 3, 2),
                ("b".to_string(), 2, 3, 5),
                (":".to_string(), 2, 4, 6),
                ("c".to_string(), 2, 5, 7),
                (";".to_string(), 2, 6, 8),
                ("\n".to_string(), 2, 7, 9),
                ("}".to_string(), 3, 1, 10),
            ]
        );
    }

    #[test]
    fn carriage_returns_advance_lines_once() {
        let input = Rc::new(Input::new("a\r\nb\rc".to_string(), None));
        let mut tokenizer = Tokenizer::new(input);

        let a = tokenizer.consume().unwrap();
        assert_eq!((a.location.line(), a.location.column()), (1, 1));
        tokenizer.consume().unwrap(); // \r\n
        let b = tokenizer.consume().unwrap();
        assert_eq!((b.location.line(), b.location.column()), (2, 1));
        tokenizer.consume().unwrap(); // \r
        let c = tokenizer.consume().unwrap();
        assert_eq!((c.location.line(), c.location.column()), (3, 1));
    }

    #[test]
    fn unclosed_comment_points_at_opener() {
        let input = Rc::new(Input::new("a /* no end".to_string(), None));
        let mut tokenizer = Tokenizer::new(input);

        tokenizer.consume().unwrap();
        tokenizer.consume().unwrap();
        let err = tokenizer.consume().unwrap_err();
        assert_eq!(err.reason, "Unclosed comment");
        assert_eq!((err.line, err.column), (1, 3));
    }

    #[test]
    fn unclosed_string_points_at_opener() {
        let input = Rc::new(Input::new("\"drifting".to_string(), None));
        let mut tokenizer = Tokenizer::new(input);

        let err = tokenizer.consume().unwrap_err();
        assert_eq!(err.reason, "Unclosed string");
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn lookahead_and_reconsume() {
        let input = Rc::new(Input::new("a:b".to_string(), None));
        let mut tokenizer = Tokenizer::new(input);

        assert_eq!(tokenizer.lookahead(1).unwrap().token_type, TokenType::Colon);
        let first = tokenizer.consume().unwrap();
        assert_eq!(first.token_type, TokenType::Word);
        tokenizer.reconsume();
        assert_eq!(tokenizer.consume().unwrap(), first);
    }
}
