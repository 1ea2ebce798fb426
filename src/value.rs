//! Grin runtime values and the operators defined over them.
//!
//! A value is one of three dynamic types. Each operator is a total function
//! over every pair of variants: combinations the language does not define
//! produce a `TypeMismatch` diagnostic instead of a value.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{GrinDiagnostic, GrinError, GrinResult};

/// A dynamically typed Grin value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
}

/// A binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mult,
    Div,
}

impl ArithOp {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mult => "MULT",
            Self::Div => "DIV",
        }
    }
}

/// One of the six relational operators usable in an IF clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Real(_))
    }

    /// Parse a line of numeric input: a decimal point means real, otherwise integer.
    pub fn parse_number(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.contains('.') {
            trimmed.parse::<f64>().ok().map(Self::Real)
        } else {
            trimmed.parse::<i64>().ok().map(Self::Integer)
        }
    }

    /// Apply `op` with `self` on the left and `rhs` on the right.
    pub fn apply(&self, op: ArithOp, rhs: &Value) -> GrinResult<Value> {
        match op {
            ArithOp::Add => self.add(rhs),
            ArithOp::Sub => self.sub(rhs),
            ArithOp::Mult => self.mult(rhs),
            ArithOp::Div => self.div(rhs),
        }
    }

    pub fn add(&self, rhs: &Value) -> GrinResult<Value> {
        match (self, rhs) {
            (Self::Text(a), Self::Text(b)) => Ok(Self::Text(format!("{a}{b}"))),
            _ => self.numeric(ArithOp::Add, rhs, i64::checked_add, |a, b| a + b),
        }
    }

    pub fn sub(&self, rhs: &Value) -> GrinResult<Value> {
        self.numeric(ArithOp::Sub, rhs, i64::checked_sub, |a, b| a - b)
    }

    /// Numbers multiply; a string and an integer, in either order, repeat the
    /// string. A negative count gives the empty string.
    pub fn mult(&self, rhs: &Value) -> GrinResult<Value> {
        match (self, rhs) {
            (Self::Text(s), Self::Integer(n)) | (Self::Integer(n), Self::Text(s)) => {
                repeat(s, *n).map(Self::Text)
            }
            _ => self.numeric(ArithOp::Mult, rhs, i64::checked_mul, |a, b| a * b),
        }
    }

    /// Integer division truncates toward zero; any real operand gives real division.
    pub fn div(&self, rhs: &Value) -> GrinResult<Value> {
        let zero = match rhs {
            Self::Integer(n) => *n == 0,
            Self::Real(r) => *r == 0.0,
            Self::Text(_) => false,
        };
        if zero && self.is_numeric() {
            return Err(GrinDiagnostic::new(GrinError::DivisionByZero));
        }
        self.numeric(ArithOp::Div, rhs, i64::checked_div, |a, b| a / b)
    }

    fn numeric(
        &self,
        op: ArithOp,
        rhs: &Value,
        int_op: impl FnOnce(i64, i64) -> Option<i64>,
        real_op: impl FnOnce(f64, f64) -> f64,
    ) -> GrinResult<Value> {
        match (self, rhs) {
            (Self::Integer(a), Self::Integer(b)) => int_op(*a, *b).map(Self::Integer).ok_or_else(|| {
                GrinDiagnostic::new(GrinError::ArithmeticOverflow)
                    .with_detail(format!("{} {a} {b}", op.keyword()))
            }),
            _ => match (self.as_real(), rhs.as_real()) {
                (Some(a), Some(b)) => Ok(Self::Real(real_op(a, b))),
                _ => Err(mismatch(op.keyword(), self, rhs)),
            },
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_real(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Real(r) => Some(*r),
            Self::Text(_) => None,
        }
    }

    /// Evaluate `self op rhs`.
    ///
    /// Numbers compare numerically (an integer against a real compares as
    /// reals) and strings compare lexicographically. A string against a number
    /// is never equal; ordering them is a type mismatch.
    pub fn compare(&self, op: RelOp, rhs: &Value) -> GrinResult<bool> {
        let ordering = match (self, rhs) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => match (self.as_real(), rhs.as_real()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => {
                    return match op {
                        RelOp::Eq => Ok(false),
                        RelOp::NotEq => Ok(true),
                        _ => Err(mismatch(op.symbol(), self, rhs)),
                    };
                }
            },
        };
        // NaN only arises from real arithmetic like 0.0 / 0.0 and is unordered.
        let Some(ordering) = ordering else {
            return Ok(op == RelOp::NotEq);
        };
        Ok(match op {
            RelOp::Eq => ordering == Ordering::Equal,
            RelOp::NotEq => ordering != Ordering::Equal,
            RelOp::Lt => ordering == Ordering::Less,
            RelOp::LtEq => ordering != Ordering::Greater,
            RelOp::Gt => ordering == Ordering::Greater,
            RelOp::GtEq => ordering != Ordering::Less,
        })
    }
}

/// Longest string MULT may build, in bytes.
pub const MAX_TEXT_LEN: usize = 1 << 30;

fn repeat(s: &str, n: i64) -> GrinResult<String> {
    let count = usize::try_from(n).unwrap_or(0);
    match s.len().checked_mul(count) {
        Some(len) if len <= MAX_TEXT_LEN => Ok(s.repeat(count)),
        _ => Err(GrinDiagnostic::new(GrinError::ArithmeticOverflow)
            .with_detail(format!("repeating a string {n} times exceeds {MAX_TEXT_LEN} bytes"))),
    }
}

fn mismatch(op: &str, left: &Value, right: &Value) -> GrinDiagnostic {
    GrinDiagnostic::new(GrinError::TypeMismatch).with_detail(format!(
        "cannot apply {op} to {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(r) => f.write_str(&format_real(*r)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip form: scientific notation below 1e-4 and from 1e16
/// up, with a signed two-digit exponent (`1e+300`, `1.5e-07`); whole reals
/// otherwise keep a trailing `.0`.
fn format_real(r: f64) -> String {
    if r.is_nan() {
        return "nan".to_string();
    }
    if r.is_infinite() {
        return if r > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = r.abs();
    if r != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{r:e}");
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    if r.fract() == 0.0 {
        format!("{r:.1}")
    } else {
        format!("{r}")
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Self::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
