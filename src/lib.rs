#![allow(clippy::return_self_not_must_use)]

pub mod env;
pub mod error;
pub mod exec;
pub mod labels;
pub mod lexer;
pub mod parser;
pub mod shell;
pub mod statement;
pub mod value;

pub use env::Environment;
pub use error::{GrinDiagnostic, GrinError, GrinResult};
pub use exec::Executor;
pub use statement::Program;
pub use value::Value;
