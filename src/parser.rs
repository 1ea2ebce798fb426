//! Grin parser — source lines to a validated `Program`.
//!
//! Each line is lexed on its own and checked against the shape of the
//! statement its keyword introduces. Nothing here evaluates anything; a
//! program that parses may still fail at run time.

use crate::error::{GrinDiagnostic, GrinError, GrinResult, SourceLoc};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::statement::{Program, Statement};

/// The line that ends a program.
pub const TERMINATOR: &str = ".";

/// Parse program text. Parsing stops at the terminator line, if any.
pub fn parse(source: &str) -> GrinResult<Program> {
    parse_lines(source.lines())
}

/// Parse a sequence of source lines, numbering them from 1.
pub fn parse_lines<I, S>(lines: I) -> GrinResult<Program>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut statements = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        if line.trim() == TERMINATOR {
            break;
        }
        let line_no = i + 1;
        let tokens = Lexer::new(line, line_no).tokenize()?;
        if tokens.is_empty() {
            return Err(GrinDiagnostic::new(GrinError::Syntax)
                .at(SourceLoc::new(line_no, 1).with_source(line))
                .with_detail("empty line; every line must hold a statement"));
        }
        statements.push(Parser::new(tokens).parse()?);
    }
    Ok(Program { statements })
}

/// Validates the tokens of one line.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> GrinResult<Statement> {
        // Optional `NAME:` prefix.
        if matches!(self.peek_kind_at(0), Some(TokenKind::Identifier(_)))
            && matches!(self.peek_kind_at(1), Some(TokenKind::Colon))
        {
            self.pos = 2;
            if self.at_end() {
                return Err(self.error_at_end("a statement after the label"));
            }
        }

        let keyword = self.advance()?;
        match keyword.kind {
            TokenKind::Let | TokenKind::Add | TokenKind::Sub | TokenKind::Mult | TokenKind::Div => {
                self.expect_identifier()?;
                self.expect_operand()?;
            }
            TokenKind::Print => {
                self.expect_operand()?;
            }
            TokenKind::InNum | TokenKind::InStr => {
                self.expect_identifier()?;
            }
            TokenKind::Goto | TokenKind::Gosub => {
                self.expect_target()?;
                if !self.at_end() {
                    self.expect(&TokenKind::If)?;
                    self.expect_operand()?;
                    self.expect_relop()?;
                    self.expect_operand()?;
                }
            }
            TokenKind::Return | TokenKind::End => {}
            _ => {
                return Err(GrinDiagnostic::new(GrinError::Syntax)
                    .at(keyword.loc)
                    .with_detail(format!("expected a statement, found {}", keyword.kind)));
            }
        }

        if let Some(extra) = self.tokens.get(self.pos) {
            return Err(GrinDiagnostic::new(GrinError::Syntax)
                .at(extra.loc.clone())
                .with_detail(format!("unexpected {} at end of statement", extra.kind)));
        }
        Ok(Statement::new(self.tokens))
    }

    // ── helpers ──────────────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek_kind_at(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    fn advance(&mut self) -> GrinResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error_at_end("a statement"))?;
        self.pos += 1;
        Ok(token)
    }

    fn error_at_end(&self, expected: &str) -> GrinDiagnostic {
        let mut diag =
            GrinDiagnostic::new(GrinError::Syntax).with_detail(format!("expected {expected}"));
        if let Some(last) = self.tokens.last() {
            let mut loc = last.loc.clone();
            loc.col += last.text.chars().count();
            diag = diag.at(loc);
        }
        diag
    }

    fn expect_with(
        &mut self,
        expected: &str,
        accept: impl FnOnce(&TokenKind) -> bool,
    ) -> GrinResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error_at_end(expected))?;
        if !accept(&token.kind) {
            return Err(GrinDiagnostic::new(GrinError::Syntax)
                .at(token.loc)
                .with_detail(format!("expected {expected}, found {}", token.kind)));
        }
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: &TokenKind) -> GrinResult<Token> {
        self.expect_with(&kind.to_string(), |k| k == kind)
    }

    fn expect_identifier(&mut self) -> GrinResult<Token> {
        self.expect_with("a variable name", |k| matches!(k, TokenKind::Identifier(_)))
    }

    fn expect_operand(&mut self) -> GrinResult<Token> {
        self.expect_with("a variable or literal", TokenKind::is_operand)
    }

    fn expect_relop(&mut self) -> GrinResult<Token> {
        self.expect_with("a comparison operator", TokenKind::is_relop)
    }

    fn expect_target(&mut self) -> GrinResult<Token> {
        self.expect_with("a label, line offset, or variable", |k| {
            matches!(
                k,
                TokenKind::Str(_) | TokenKind::Integer(_) | TokenKind::Identifier(_)
            )
        })
    }
}
