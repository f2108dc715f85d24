use std::collections::HashMap;
use std::str::Chars;
use std::sync::OnceLock;

use strum_macros::Display;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals.
    Identifier,
    String,
    Number,

    // Keywords.
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Error,
    Eof,
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf::phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

/// Hand-rolled trie over `KEYWORDS`, built once, so a maximal identifier run
/// is classified by walking the trie character by character instead of
/// probing a hash map per candidate keyword length.
#[derive(Debug)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    token_type: Option<TokenType>,
}

impl TrieNode {
    fn new() -> Self {
        TrieNode { children: HashMap::new(), token_type: None }
    }
}

static KEYWORD_TRIE: OnceLock<TrieNode> = OnceLock::new();

fn keyword_trie() -> &'static TrieNode {
    KEYWORD_TRIE.get_or_init(|| {
        let mut root = TrieNode::new();
        for (keyword, token) in KEYWORDS.entries() {
            let mut node = &mut root;
            for c in keyword.chars() {
                node = node.children.entry(c).or_insert_with(TrieNode::new);
            }
            node.token_type = Some(*token);
        }
        root
    })
}

#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    pub token_type: TokenType,
    pub lexeme: &'a str,
    pub line: u32,
}

/// Lazily produces tokens from `source` on demand via `scan_token`. Holds no
/// lookahead buffer beyond a single peeked character.
pub struct Scanner<'a> {
    source: &'a str,
    chars: Chars<'a>,
    start: usize,
    current: usize,
    line: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        keyword_trie();
        Scanner { source, chars: source.chars(), start: 0, current: 0, line: 1 }
    }

    pub fn scan_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenType::Eof);
        }

        let c = self.advance();

        if Self::is_alpha(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        match c {
            '(' => self.make_token(TokenType::LeftParen),
            ')' => self.make_token(TokenType::RightParen),
            '{' => self.make_token(TokenType::LeftBrace),
            '}' => self.make_token(TokenType::RightBrace),
            ';' => self.make_token(TokenType::Semicolon),
            ',' => self.make_token(TokenType::Comma),
            '.' => self.make_token(TokenType::Dot),
            '-' => self.make_token(TokenType::Minus),
            '+' => self.make_token(TokenType::Plus),
            '/' => self.make_token(TokenType::Slash),
            '*' => self.make_token(TokenType::Star),
            '"' => self.string(),
            '!' => {
                let matched = self.match_char('=');
                self.make_token(if matched { TokenType::BangEqual } else { TokenType::Bang })
            }
            '=' => {
                let matched = self.match_char('=');
                self.make_token(if matched { TokenType::EqualEqual } else { TokenType::Equal })
            }
            '<' => {
                let matched = self.match_char('=');
                self.make_token(if matched { TokenType::LessEqual } else { TokenType::Less })
            }
            '>' => {
                let matched = self.match_char('=');
                self.make_token(if matched { TokenType::GreaterEqual } else { TokenType::Greater })
            }
            _ => self.error_token("Unexpected character."),
        }
    }

    fn is_alpha(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_alnum(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    fn identifier(&mut self) -> Token<'a> {
        while let Some(c) = self.peek() {
            if Self::is_alnum(c) {
                self.advance();
            } else {
                break;
            }
        }
        self.make_token(self.identifier_type())
    }

    fn identifier_type(&self) -> TokenType {
        let text = &self.source[self.start..self.current];
        let mut node = keyword_trie();
        for c in text.chars() {
            match node.children.get(&c) {
                Some(child) => node = child,
                None => return TokenType::Identifier,
            }
        }
        node.token_type.unwrap_or(TokenType::Identifier)
    }

    fn number(&mut self) -> Token<'a> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        // A trailing '.' is only consumed if followed by a digit.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.make_token(TokenType::Number)
    }

    fn string(&mut self) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            return self.error_token("Unterminated string.");
        }
        self.advance(); // closing quote
        self.make_token(TokenType::String)
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\r') | Some('\t') => {
                    self.advance();
                }
                Some('\n') => {
                    self.line += 1;
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.chars.next().expect("advance called past end of source");
        self.current += c.len_utf8();
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_token(&self, token_type: TokenType) -> Token<'a> {
        Token { token_type, lexeme: &self.source[self.start..self.current], line: self.line }
    }

    fn error_token(&self, message: &'static str) -> Token<'a> {
        Token { token_type: TokenType::Error, lexeme: message, line: self.line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<TokenType> {
        let mut scanner = Scanner::new(source);
        let mut types = Vec::new();
        loop {
            let token = scanner.scan_token();
            let done = token.token_type == TokenType::Eof;
            types.push(token.token_type);
            if done {
                break;
            }
        }
        types
    }

    #[test]
    fn recognizes_keywords_and_identifiers() {
        let types = token_types("this is for if fun fun1 forfor");
        assert_eq!(
            types,
            vec![
                TokenType::This,
                TokenType::Identifier,
                TokenType::For,
                TokenType::If,
                TokenType::Fun,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn numbers_reject_trailing_dot_without_digit() {
        let mut scanner = Scanner::new("1.5 2.");
        let first = scanner.scan_token();
        assert_eq!(first.token_type, TokenType::Number);
        assert_eq!(first.lexeme, "1.5");

        let second = scanner.scan_token();
        assert_eq!(second.token_type, TokenType::Number);
        assert_eq!(second.lexeme, "2");

        let dot = scanner.scan_token();
        assert_eq!(dot.token_type, TokenType::Dot);
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let mut scanner = Scanner::new("\"abc");
        let token = scanner.scan_token();
        assert_eq!(token.token_type, TokenType::Error);
        assert_eq!(token.lexeme, "Unterminated string.");
    }

    #[test]
    fn strings_may_span_lines() {
        let mut scanner = Scanner::new("\"a\nb\" 1");
        let string_token = scanner.scan_token();
        assert_eq!(string_token.token_type, TokenType::String);
        let number_token = scanner.scan_token();
        assert_eq!(number_token.line, 2);
    }

    #[test]
    fn two_character_operators() {
        let types = token_types("!= == <= >= ! = < >");
        assert_eq!(
            types,
            vec![
                TokenType::BangEqual,
                TokenType::EqualEqual,
                TokenType::LessEqual,
                TokenType::GreaterEqual,
                TokenType::Bang,
                TokenType::Equal,
                TokenType::Less,
                TokenType::Greater,
                TokenType::Eof,
            ]
        );
    }
}
