//! Grin programs as sequences of token statements.
//!
//! A statement keeps the tokens the lexer produced for its line. The first
//! token decides what kind of statement it is; the executor reads operands
//! by position.

use std::fmt;

use crate::error::{GrinDiagnostic, GrinError, GrinResult, SourceLoc};
use crate::lexer::{Token, TokenKind};
use crate::value::{ArithOp, RelOp};

/// A complete Grin program, in source order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// One executable line.
#[derive(Debug, Clone)]
pub struct Statement {
    tokens: Vec<Token>,
}

/// What a statement does, decided by its first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Let,
    Print,
    InNum,
    InStr,
    Arith(ArithOp),
    Goto,
    Gosub,
    Return,
    End,
}

impl StatementKind {
    pub fn classify(token: &Token) -> Option<Self> {
        let kind = match token.kind {
            TokenKind::Let => Self::Let,
            TokenKind::Print => Self::Print,
            TokenKind::InNum => Self::InNum,
            TokenKind::InStr => Self::InStr,
            TokenKind::Add => Self::Arith(ArithOp::Add),
            TokenKind::Sub => Self::Arith(ArithOp::Sub),
            TokenKind::Mult => Self::Arith(ArithOp::Mult),
            TokenKind::Div => Self::Arith(ArithOp::Div),
            TokenKind::Goto => Self::Goto,
            TokenKind::Gosub => Self::Gosub,
            TokenKind::Return => Self::Return,
            TokenKind::End => Self::End,
            _ => return None,
        };
        Some(kind)
    }
}

/// Where a GOTO or GOSUB goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    /// Absolute: the statement carrying this label.
    ByLabel(String),
    /// Relative to the jumping statement.
    ByOffset(i64),
}

impl RelOp {
    pub fn from_token(token: &Token) -> Option<Self> {
        let op = match token.kind {
            TokenKind::Equal => Self::Eq,
            TokenKind::NotEqual => Self::NotEq,
            TokenKind::Less => Self::Lt,
            TokenKind::LessEq => Self::LtEq,
            TokenKind::Greater => Self::Gt,
            TokenKind::GreaterEq => Self::GtEq,
            _ => return None,
        };
        Some(op)
    }
}

impl Statement {
    /// Wrap a token sequence. Callers guarantee it is not empty.
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(!tokens.is_empty(), "statement with no tokens");
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn first(&self) -> Option<&Token> {
        self.tokens.first()
    }

    pub fn kind(&self) -> Option<StatementKind> {
        self.first().and_then(StatementKind::classify)
    }

    /// Location of the statement's first token.
    pub fn loc(&self) -> SourceLoc {
        self.first()
            .map_or_else(|| SourceLoc::new(0, 0), |t| t.loc.clone())
    }

    /// The label this statement defines, if it starts with `NAME:`.
    pub fn label(&self) -> Option<&str> {
        match self.tokens.as_slice() {
            [name, colon, ..] if matches!(colon.kind, TokenKind::Colon) => name.identifier(),
            _ => None,
        }
    }

    /// A copy of this statement with its label prefix removed.
    pub fn without_label(&self) -> Self {
        if self.label().is_some() {
            Self::new(self.tokens[2..].to_vec())
        } else {
            self.clone()
        }
    }

    /// The token at `index`, or a syntax error naming what was expected.
    pub fn operand(&self, index: usize, expected: &str) -> GrinResult<&Token> {
        self.tokens.get(index).ok_or_else(|| {
            GrinDiagnostic::new(GrinError::Syntax)
                .at(self.loc())
                .with_detail(format!("missing {expected}"))
        })
    }

    /// The variable name at `index`.
    pub fn variable(&self, index: usize) -> GrinResult<&str> {
        let token = self.operand(index, "variable name")?;
        token.identifier().ok_or_else(|| {
            GrinDiagnostic::new(GrinError::Syntax)
                .at(token.loc.clone())
                .with_detail(format!("expected a variable name, found {}", token.kind))
        })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&token.text)?;
        }
        Ok(())
    }
}
