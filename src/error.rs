//! Grin error types and diagnostic formatting.
//!
//! Every failure in the interpreter, from a bad character in the source to an
//! unbalanced RETURN, is reported as a `GrinDiagnostic`. The engine never
//! exits the process; the shell decides what to do with the diagnostic.

use std::fmt;

/// Source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub line: usize,
    pub col: usize,
    /// Original source line text for display.
    pub source_line: Option<String>,
}

impl SourceLoc {
    pub fn new(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            source_line: None,
        }
    }

    pub fn with_source(mut self, text: impl Into<String>) -> Self {
        self.source_line = Some(text.into());
        self
    }
}

/// The kinds of failure the interpreter can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrinError {
    // Lexical and syntactic errors, reported before execution starts.
    UnterminatedString,
    InvalidCharacter,
    InvalidNumber,
    Syntax,

    // Runtime errors.
    LabelNotFound,
    JumpOutOfRange,
    InvalidJumpTarget,
    UnbalancedReturn,
    UnboundVariable,
    TypeMismatch,
    DivisionByZero,
    ArithmeticOverflow,
    MalformedInput,
    EndOfInput,
    UnknownOperator,
    UnknownStatement,
    Io,
}

impl GrinError {
    /// Short human-readable message for the error kind.
    pub fn message(self) -> &'static str {
        match self {
            Self::UnterminatedString => "Unterminated string literal",
            Self::InvalidCharacter => "Invalid character in program",
            Self::InvalidNumber => "Invalid numeric literal",
            Self::Syntax => "Syntax error",
            Self::LabelNotFound => "Label not found",
            Self::JumpOutOfRange => "Jump target out of range",
            Self::InvalidJumpTarget => "Invalid jump target",
            Self::UnbalancedReturn => "RETURN without GOSUB",
            Self::UnboundVariable => "Variable has no value",
            Self::TypeMismatch => "Incompatible operand types",
            Self::DivisionByZero => "Division by zero",
            Self::ArithmeticOverflow => "Arithmetic overflow",
            Self::MalformedInput => "Input is not a number",
            Self::EndOfInput => "Unexpected end of input",
            Self::UnknownOperator => "Unknown comparison operator",
            Self::UnknownStatement => "Unknown statement",
            Self::Io => "Input/output failure",
        }
    }
}

/// A Grin error with location and context.
#[derive(Debug, Clone)]
pub struct GrinDiagnostic {
    pub error: GrinError,
    pub location: Option<SourceLoc>,
    pub detail: Option<String>,
}

impl GrinDiagnostic {
    pub fn new(error: GrinError) -> Self {
        Self {
            error,
            location: None,
            detail: None,
        }
    }

    pub fn at(mut self, loc: SourceLoc) -> Self {
        self.location = Some(loc);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach `loc` unless a more precise location is already set.
    pub fn or_at(self, loc: SourceLoc) -> Self {
        if self.location.is_some() {
            self
        } else {
            self.at(loc)
        }
    }
}

impl fmt::Display for GrinDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error.message())?;

        if let Some(ref detail) = self.detail {
            write!(f, ": {detail}")?;
        }

        if let Some(ref loc) = self.location {
            write!(f, "\n  at line {}, column {}", loc.line, loc.col)?;
            if let Some(ref source) = loc.source_line {
                write!(f, "\n  | {source}")?;
                write!(f, "\n  | {:>width$}", "^", width = loc.col)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for GrinDiagnostic {}

/// Convenience alias.
pub type GrinResult<T> = Result<T, GrinDiagnostic>;
