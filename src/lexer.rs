//! Grin lexer — tokenizes one source line into a stream of tokens.
//!
//! Grin is strictly line-oriented: every physical line is one statement, so
//! the lexer works a line at a time and stamps each token with its 1-based
//! line and column.

use std::fmt;

use crate::error::{GrinDiagnostic, GrinError, GrinResult, SourceLoc};
use crate::value::Value;

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Let,
    Print,
    InNum,
    InStr,
    Add,
    Sub,
    Mult,
    Div,
    Goto,
    Gosub,
    Return,
    End,
    If,

    // Operands
    Identifier(String),
    Integer(i64),
    Real(f64),
    Str(String),

    // Punctuation
    Colon,

    // Comparison
    Equal,     // =
    NotEqual,  // <>
    Less,      // <
    LessEq,    // <=
    Greater,   // >
    GreaterEq, // >=
}

impl TokenKind {
    fn keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "LET" => Self::Let,
            "PRINT" => Self::Print,
            "INNUM" => Self::InNum,
            "INSTR" => Self::InStr,
            "ADD" => Self::Add,
            "SUB" => Self::Sub,
            "MULT" => Self::Mult,
            "DIV" => Self::Div,
            "GOTO" => Self::Goto,
            "GOSUB" => Self::Gosub,
            "RETURN" => Self::Return,
            "END" => Self::End,
            "IF" => Self::If,
            _ => return None,
        };
        Some(kind)
    }

    /// True for identifiers and literals, the things a statement can read.
    pub fn is_operand(&self) -> bool {
        matches!(
            self,
            Self::Identifier(_) | Self::Integer(_) | Self::Real(_) | Self::Str(_)
        )
    }

    pub fn is_relop(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessEq
                | Self::Greater
                | Self::GreaterEq
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Let => "LET",
            Self::Print => "PRINT",
            Self::InNum => "INNUM",
            Self::InStr => "INSTR",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mult => "MULT",
            Self::Div => "DIV",
            Self::Goto => "GOTO",
            Self::Gosub => "GOSUB",
            Self::Return => "RETURN",
            Self::End => "END",
            Self::If => "IF",
            Self::Identifier(_) => "identifier",
            Self::Integer(_) => "integer literal",
            Self::Real(_) => "real literal",
            Self::Str(_) => "string literal",
            Self::Colon => "':'",
            Self::Equal => "'='",
            Self::NotEqual => "'<>'",
            Self::Less => "'<'",
            Self::LessEq => "'<='",
            Self::Greater => "'>'",
            Self::GreaterEq => "'>='",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source text of the token, quotes included for strings.
    pub text: String,
    pub loc: SourceLoc,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, loc: SourceLoc) -> Self {
        Self {
            kind,
            text: text.into(),
            loc,
        }
    }

    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn location(&self) -> &SourceLoc {
        &self.loc
    }

    /// The literal value carried by the token, if it is a literal.
    pub fn value(&self) -> Option<Value> {
        match &self.kind {
            TokenKind::Integer(n) => Some(Value::Integer(*n)),
            TokenKind::Real(r) => Some(Value::Real(*r)),
            TokenKind::Str(s) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }

    /// The variable name, if the token is an identifier.
    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

pub struct Lexer {
    source: Vec<char>,
    text: String,
    line: usize,
    pos: usize,
}

impl Lexer {
    /// Create a lexer over a single source line. `line` is 1-based.
    pub fn new(text: &str, line: usize) -> Self {
        Self {
            source: text.chars().collect(),
            text: text.to_string(),
            line,
            pos: 0,
        }
    }

    pub fn tokenize(&mut self) -> GrinResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() {
                break;
            }
            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    fn loc_at(&self, pos: usize) -> SourceLoc {
        SourceLoc::new(self.line, pos + 1).with_source(self.text.clone())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.source.get(self.pos + n).copied()
    }

    fn slice(&self, start: usize) -> String {
        self.source[start..self.pos].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> GrinResult<Token> {
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(GrinDiagnostic::new(GrinError::Syntax)
                .at(self.loc_at(start))
                .with_detail("unexpected end of line"));
        };

        match ch {
            '"' => self.lex_string(),
            '0'..='9' => self.lex_number(),
            '-' if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
            c if c.is_ascii_alphabetic() => Ok(self.lex_word()),
            ':' => Ok(self.single(TokenKind::Colon, start)),
            '=' => Ok(self.single(TokenKind::Equal, start)),
            '<' => {
                self.pos += 1;
                let kind = match self.peek() {
                    Some('=') => {
                        self.pos += 1;
                        TokenKind::LessEq
                    }
                    Some('>') => {
                        self.pos += 1;
                        TokenKind::NotEqual
                    }
                    _ => TokenKind::Less,
                };
                Ok(Token::new(kind, self.slice(start), self.loc_at(start)))
            }
            '>' => {
                self.pos += 1;
                let kind = if self.peek() == Some('=') {
                    self.pos += 1;
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                };
                Ok(Token::new(kind, self.slice(start), self.loc_at(start)))
            }
            other => Err(GrinDiagnostic::new(GrinError::InvalidCharacter)
                .at(self.loc_at(start))
                .with_detail(format!("unexpected character '{other}'"))),
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.pos += 1;
        Token::new(kind, self.slice(start), self.loc_at(start))
    }

    fn lex_string(&mut self) -> GrinResult<Token> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let body_start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '"' {
                let body: String = self.source[body_start..self.pos].iter().collect();
                self.pos += 1; // closing quote
                return Ok(Token::new(
                    TokenKind::Str(body),
                    self.slice(start),
                    self.loc_at(start),
                ));
            }
            self.pos += 1;
        }
        Err(GrinDiagnostic::new(GrinError::UnterminatedString).at(self.loc_at(start)))
    }

    fn lex_number(&mut self) -> GrinResult<Token> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_real = false;
        if self.peek() == Some('.') {
            is_real = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        // A number must end at whitespace, an operator, or the end of the line.
        if let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '.' || c == '"' {
                while self
                    .peek()
                    .is_some_and(|c| !c.is_whitespace() && c != ':')
                {
                    self.pos += 1;
                }
                return Err(GrinDiagnostic::new(GrinError::InvalidNumber)
                    .at(self.loc_at(start))
                    .with_detail(format!("'{}' is not a number", self.slice(start))));
            }
        }

        let text = self.slice(start);
        let kind = if is_real {
            text.parse::<f64>().map(TokenKind::Real).ok()
        } else {
            text.parse::<i64>().map(TokenKind::Integer).ok()
        };
        let kind = kind.ok_or_else(|| {
            GrinDiagnostic::new(GrinError::InvalidNumber)
                .at(self.loc_at(start))
                .with_detail(format!("'{text}' is out of range"))
        })?;
        Ok(Token::new(kind, text, self.loc_at(start)))
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let text = self.slice(start);
        let kind = TokenKind::keyword(&text).unwrap_or_else(|| TokenKind::Identifier(text.clone()));
        Token::new(kind, text, self.loc_at(start))
    }
}
