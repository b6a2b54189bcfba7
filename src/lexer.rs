use crate::error::{CrustError, Span};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Dot,

    // Binary operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    SlashSlash,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,

    // Prefix operators
    UnaryPlus,
    UnaryMinus,
    Bang,

    // Assignment
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    StarStarEqual,
    SlashSlashEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    Set,
    Keep,
    Fn,
    Return,
    If,
    Else,
    Elif,
    While,
    For,
    In,
    Break,
    Continue,
    Try,
    Catch,

    Eof,
}

impl TokenKind {
    fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::StarStar
                | TokenKind::SlashSlash
                | TokenKind::EqualEqual
                | TokenKind::BangEqual
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::UnaryPlus
                | TokenKind::UnaryMinus
                | TokenKind::Bang
                | TokenKind::Equal
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
                | TokenKind::StarStarEqual
                | TokenKind::SlashSlashEqual
        )
    }

    fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Set
                | TokenKind::Keep
                | TokenKind::Fn
                | TokenKind::Return
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::Elif
                | TokenKind::While
                | TokenKind::For
                | TokenKind::In
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Try
                | TokenKind::Catch
        )
    }

    /// True when a `+`, `-` or `!` following a token of this kind starts an operand.
    fn expects_operand(self) -> bool {
        self.is_operator()
            || self.is_keyword()
            || matches!(
                self,
                TokenKind::LeftParen
                    | TokenKind::LeftBrace
                    | TokenKind::LeftBracket
                    | TokenKind::Comma
                    | TokenKind::Colon
            )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Dot => "'.'",
            TokenKind::Plus | TokenKind::UnaryPlus => "'+'",
            TokenKind::Minus | TokenKind::UnaryMinus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::StarStar => "'**'",
            TokenKind::SlashSlash => "'//'",
            TokenKind::EqualEqual => "'=='",
            TokenKind::BangEqual => "'!='",
            TokenKind::Less => "'<'",
            TokenKind::LessEqual => "'<='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Equal => "'='",
            TokenKind::PlusEqual => "'+='",
            TokenKind::MinusEqual => "'-='",
            TokenKind::StarEqual => "'*='",
            TokenKind::SlashEqual => "'/='",
            TokenKind::PercentEqual => "'%='",
            TokenKind::StarStarEqual => "'**='",
            TokenKind::SlashSlashEqual => "'//='",
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Set => "'set'",
            TokenKind::Keep => "'keep'",
            TokenKind::Fn => "'fn'",
            TokenKind::Return => "'return'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::Elif => "'elif'",
            TokenKind::While => "'while'",
            TokenKind::For => "'for'",
            TokenKind::In => "'in'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Try => "'try'",
            TokenKind::Catch => "'catch'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text, or the unescaped contents for string literals.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: String, span: Span) -> Self {
        Self { kind, text, span }
    }
}

/// Convenience wrapper: `Lexer::new(source).scan_tokens()`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CrustError> {
    Lexer::new(source).scan_tokens()
}

pub struct Lexer {
    chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    /// A `;` was skipped since the last emitted token.
    after_separator: bool,
    keywords: HashMap<&'static str, TokenKind>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("set", TokenKind::Set);
        keywords.insert("keep", TokenKind::Keep);
        keywords.insert("fn", TokenKind::Fn);
        keywords.insert("return", TokenKind::Return);
        keywords.insert("if", TokenKind::If);
        keywords.insert("else", TokenKind::Else);
        keywords.insert("elif", TokenKind::Elif);
        keywords.insert("while", TokenKind::While);
        keywords.insert("for", TokenKind::For);
        keywords.insert("in", TokenKind::In);
        keywords.insert("break", TokenKind::Break);
        keywords.insert("continue", TokenKind::Continue);
        keywords.insert("try", TokenKind::Try);
        keywords.insert("catch", TokenKind::Catch);

        Self {
            chars: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            after_separator: false,
            keywords,
        }
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, CrustError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            Span::single(self.current),
        ));

        tracing::trace!(count = self.tokens.len(), "tokenized source");
        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn scan_token(&mut self) -> Result<(), CrustError> {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            '[' => self.add_token(TokenKind::LeftBracket),
            ']' => self.add_token(TokenKind::RightBracket),
            ',' => self.add_token(TokenKind::Comma),
            ':' => self.add_token(TokenKind::Colon),
            '.' => self.add_token(TokenKind::Dot),
            ';' => self.after_separator = true,
            '#' => {
                while self.peek() != '\n' && !self.is_at_end() {
                    self.advance();
                }
            }
            ' ' | '\r' | '\t' | '\n' => {}
            '+' => {
                let kind = if self.match_char('=') {
                    TokenKind::PlusEqual
                } else if self.operand_expected() {
                    TokenKind::UnaryPlus
                } else {
                    TokenKind::Plus
                };
                self.add_token(kind);
            }
            '-' => {
                let kind = if self.match_char('=') {
                    TokenKind::MinusEqual
                } else if self.operand_expected() {
                    TokenKind::UnaryMinus
                } else {
                    TokenKind::Minus
                };
                self.add_token(kind);
            }
            '*' => {
                let kind = if self.match_char('*') {
                    if self.match_char('=') {
                        TokenKind::StarStarEqual
                    } else {
                        TokenKind::StarStar
                    }
                } else if self.match_char('=') {
                    TokenKind::StarEqual
                } else {
                    TokenKind::Star
                };
                self.add_token(kind);
            }
            '/' => {
                let kind = if self.match_char('/') {
                    if self.match_char('=') {
                        TokenKind::SlashSlashEqual
                    } else {
                        TokenKind::SlashSlash
                    }
                } else if self.match_char('=') {
                    TokenKind::SlashEqual
                } else {
                    TokenKind::Slash
                };
                self.add_token(kind);
            }
            '%' => {
                let kind = if self.match_char('=') {
                    TokenKind::PercentEqual
                } else {
                    TokenKind::Percent
                };
                self.add_token(kind);
            }
            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            '&' if self.match_char('&') => self.add_token(TokenKind::AndAnd),
            '|' if self.match_char('|') => self.add_token(TokenKind::OrOr),
            '"' | '\'' => self.string(c)?,
            c if c.is_ascii_digit() => self.number()?,
            c if c.is_alphabetic() => self.identifier(),
            _ => {
                return Err(CrustError::lexer_error(
                    Span::single(self.start),
                    format!("Unexpected character: '{}'", c),
                ));
            }
        }

        Ok(())
    }

    /// Whether a `+`/`-` at this position is a prefix operator: nothing precedes it,
    /// a `;` was skipped right before it, or the previous token cannot end an operand.
    fn operand_expected(&self) -> bool {
        if self.after_separator {
            return true;
        }
        match self.tokens.last() {
            None => true,
            Some(token) => token.kind.expects_operand(),
        }
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.current += 1;
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn string(&mut self, quote: char) -> Result<(), CrustError> {
        let mut value = String::new();

        loop {
            if self.is_at_end() {
                return Err(CrustError::lexer_error(
                    Span::new(self.start, self.current),
                    "Unterminated string",
                )
                .with_help(format!("Close the string with a matching {}", quote)));
            }

            let c = self.advance();
            if c == quote {
                break;
            }
            if c != '\\' {
                value.push(c);
                continue;
            }

            if self.is_at_end() {
                continue;
            }
            match self.advance() {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '\\' => value.push('\\'),
                '"' => value.push('"'),
                '\'' => value.push('\''),
                other => {
                    value.push('\\');
                    value.push(other);
                }
            }
        }

        self.add_token_with_text(TokenKind::String, value);
        Ok(())
    }

    fn number(&mut self) -> Result<(), CrustError> {
        let mut seen_dot = false;

        loop {
            let c = self.peek();
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.advance();
            } else if c == '.' {
                return Err(CrustError::lexer_error(
                    Span::new(self.start, self.current + 1),
                    format!("Invalid number: {}.", self.lexeme()),
                )
                .with_help("A number may contain at most one '.'"));
            } else {
                break;
            }
        }

        self.add_token(TokenKind::Number);
        Ok(())
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = self.lexeme();
        let kind = self
            .keywords
            .get(text.as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier);

        self.add_token_with_text(kind, text);
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        let text = self.lexeme();
        self.add_token_with_text(kind, text);
    }

    fn add_token_with_text(&mut self, kind: TokenKind, text: String) {
        self.after_separator = false;
        self.tokens
            .push(Token::new(kind, text, Span::new(self.start, self.current)));
    }
}
