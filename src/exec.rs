//! Grin statement executor — a program counter walking a statement list.
//!
//! The executor owns everything that changes during a run: the program
//! counter, the GOSUB return stack and the variable environment. Each step
//! fetches the statement under the counter, dispatches on its kind and then
//! either advances, jumps or halts. Every failure comes back as a
//! `GrinDiagnostic`; the caller decides whether that ends the process.

use std::io::{self, BufRead, Write};

use tracing::{debug, trace};

use crate::env::Environment;
use crate::error::{GrinDiagnostic, GrinError, GrinResult};
use crate::labels::{self, LabelTable};
use crate::lexer::{Token, TokenKind};
use crate::statement::{JumpTarget, Program, Statement, StatementKind};
use crate::value::{ArithOp, RelOp, Value};

/// A program ready to run: label prefixes stripped, labels indexed.
#[derive(Debug, Clone)]
pub struct LoadedProgram {
    statements: Vec<Statement>,
    labels: LabelTable,
}

impl LoadedProgram {
    pub fn load(program: &Program) -> Self {
        let (statements, labels) = labels::index(&program.statements);
        Self { statements, labels }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Mutable state of one run.
#[derive(Debug, Clone, Default)]
pub struct ExecState {
    /// Index of the statement about to execute.
    pub pc: usize,
    /// Index of each GOSUB still waiting for its RETURN, innermost last.
    pub call_stack: Vec<usize>,
    pub env: Environment,
}

/// What a statement asks the executor to do next.
enum Flow {
    Advance,
    /// Already range-checked.
    Jump(usize),
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    Finished,
}

/// Where INNUM/INSTR read from and PRINT writes to.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Read one line, without its line terminator.
    fn read_line(&mut self) -> GrinResult<String> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(|e| {
            GrinDiagnostic::new(GrinError::Io).with_detail(format!("failed to read input: {e}"))
        })?;
        if read == 0 {
            return Err(GrinDiagnostic::new(GrinError::EndOfInput));
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    fn write_line(&mut self, value: &Value) -> GrinResult<()> {
        writeln!(self.output, "{value}").map_err(write_failure)
    }

    fn flush(&mut self) -> GrinResult<()> {
        self.output.flush().map_err(write_failure)
    }
}

fn write_failure(e: io::Error) -> GrinDiagnostic {
    GrinDiagnostic::new(GrinError::Io).with_detail(format!("failed to write output: {e}"))
}

pub struct Executor<R, W> {
    program: LoadedProgram,
    state: ExecState,
    console: Console<R, W>,
    halted: bool,
}

impl<R: BufRead, W: Write> Executor<R, W> {
    pub fn new(program: &Program, input: R, output: W) -> Self {
        Self {
            program: LoadedProgram::load(program),
            state: ExecState::default(),
            console: Console::new(input, output),
            halted: false,
        }
    }

    pub fn program(&self) -> &LoadedProgram {
        &self.program
    }

    pub fn state(&self) -> &ExecState {
        &self.state
    }

    /// Execute one statement.
    pub fn step(&mut self) -> GrinResult<StepOutcome> {
        let len = self.program.len();
        if self.halted || self.state.pc >= len {
            return Ok(StepOutcome::Finished);
        }

        let statement = &self.program.statements[self.state.pc];
        debug!(pc = self.state.pc, statement = %statement, "execute");
        let flow = self
            .state
            .exec_statement(statement, &self.program.labels, len, &mut self.console)
            .map_err(|diag| diag.or_at(statement.loc()))?;

        match flow {
            Flow::Advance => self.state.pc += 1,
            Flow::Jump(target) => {
                trace!(from = self.state.pc, to = target, "jump");
                self.state.pc = target;
            }
            Flow::Halt => {
                debug!(pc = self.state.pc, "halted by END");
                self.halted = true;
                return Ok(StepOutcome::Finished);
            }
        }

        if self.state.pc >= len {
            Ok(StepOutcome::Finished)
        } else {
            Ok(StepOutcome::Running)
        }
    }

    /// Run until the program falls off its end or executes END, and return
    /// the final variables.
    pub fn run(mut self) -> GrinResult<Environment> {
        debug!(
            statements = self.program.len(),
            labels = self.program.labels.len(),
            "run started"
        );
        while self.step()? == StepOutcome::Running {}
        self.console.flush()?;
        debug!(variables = self.state.env.len(), "run finished");
        Ok(self.state.env)
    }
}

impl ExecState {
    fn exec_statement<R: BufRead, W: Write>(
        &mut self,
        statement: &Statement,
        labels: &LabelTable,
        len: usize,
        console: &mut Console<R, W>,
    ) -> GrinResult<Flow> {
        let first = statement.operand(0, "statement")?;
        let kind = StatementKind::classify(first).ok_or_else(|| {
            GrinDiagnostic::new(GrinError::UnknownStatement)
                .at(first.loc.clone())
                .with_detail(format!("'{}' does not start a statement", first.text))
        })?;

        match kind {
            StatementKind::Let => {
                let name = statement.variable(1)?;
                let value = self.evaluate(statement.operand(2, "value")?)?;
                self.env.set(name, value);
                Ok(Flow::Advance)
            }
            StatementKind::Arith(op) => self.exec_arith(statement, op),
            StatementKind::Print => self.exec_print(statement, console),
            StatementKind::InNum => {
                let name = statement.variable(1)?;
                let line = console.read_line()?;
                let value = Value::parse_number(&line).ok_or_else(|| {
                    GrinDiagnostic::new(GrinError::MalformedInput)
                        .with_detail(format!("'{line}' is neither an integer nor a real"))
                })?;
                self.env.set(name, value);
                Ok(Flow::Advance)
            }
            StatementKind::InStr => {
                let name = statement.variable(1)?;
                let line = console.read_line()?;
                self.env.set(name, Value::Text(line));
                Ok(Flow::Advance)
            }
            StatementKind::Goto => self.exec_jump(statement, false, labels, len),
            StatementKind::Gosub => self.exec_jump(statement, true, labels, len),
            StatementKind::Return => {
                let caller = self.call_stack.pop().ok_or_else(|| {
                    GrinDiagnostic::new(GrinError::UnbalancedReturn)
                        .with_detail("no GOSUB is waiting for this RETURN")
                })?;
                // The normal advance moves past the GOSUB.
                self.pc = caller;
                Ok(Flow::Advance)
            }
            StatementKind::End => Ok(Flow::Halt),
        }
    }

    /// Value of an operand. An identifier with no binding evaluates to its
    /// own name, as text.
    fn evaluate(&self, token: &Token) -> GrinResult<Value> {
        if let TokenKind::Identifier(name) = &token.kind {
            return Ok(self
                .env
                .get(name)
                .cloned()
                .unwrap_or_else(|| Value::Text(name.clone())));
        }
        token.value().ok_or_else(|| {
            GrinDiagnostic::new(GrinError::Syntax)
                .at(token.loc.clone())
                .with_detail(format!("expected a value, found {}", token.kind))
        })
    }

    fn exec_arith(&mut self, statement: &Statement, op: ArithOp) -> GrinResult<Flow> {
        let name = statement.variable(1)?;
        let current = self.env.get(name).ok_or_else(|| {
            GrinDiagnostic::new(GrinError::UnboundVariable).with_detail(format!(
                "'{name}' must be assigned before {}",
                op.keyword()
            ))
        })?;
        let rhs = self.evaluate(statement.operand(2, "value")?)?;
        let result = current.apply(op, &rhs)?;
        trace!(variable = name, result = %result, "{}", op.keyword());
        self.env.set(name, result);
        Ok(Flow::Advance)
    }

    /// An unbound variable prints as 0; a literal prints as itself.
    fn exec_print<R: BufRead, W: Write>(
        &self,
        statement: &Statement,
        console: &mut Console<R, W>,
    ) -> GrinResult<Flow> {
        let token = statement.operand(1, "value to print")?;
        let value = match &token.kind {
            TokenKind::Identifier(name) => self.env.get(name).cloned().unwrap_or(Value::Integer(0)),
            _ => self.evaluate(token)?,
        };
        console.write_line(&value)?;
        Ok(Flow::Advance)
    }

    fn exec_jump(
        &mut self,
        statement: &Statement,
        is_call: bool,
        labels: &LabelTable,
        len: usize,
    ) -> GrinResult<Flow> {
        if !self.condition_holds(statement)? {
            return Ok(Flow::Advance);
        }
        let target = self.jump_target(statement.operand(1, "jump target")?)?;
        if is_call {
            self.call_stack.push(self.pc);
        }
        let destination = self.resolve(&target, labels, len)?;
        Ok(Flow::Jump(destination))
    }

    /// True when the statement has no IF clause or its comparison holds.
    fn condition_holds(&self, statement: &Statement) -> GrinResult<bool> {
        let Some(keyword) = statement.tokens().get(2) else {
            return Ok(true);
        };
        if !matches!(keyword.kind, TokenKind::If) {
            return Err(GrinDiagnostic::new(GrinError::Syntax)
                .at(keyword.loc.clone())
                .with_detail(format!("expected IF, found {}", keyword.kind)));
        }
        let lhs = self.evaluate(statement.operand(3, "left operand")?)?;
        let op_token = statement.operand(4, "comparison operator")?;
        let op = RelOp::from_token(op_token).ok_or_else(|| {
            GrinDiagnostic::new(GrinError::UnknownOperator)
                .at(op_token.loc.clone())
                .with_detail(format!("'{}'", op_token.text))
        })?;
        let rhs = self.evaluate(statement.operand(5, "right operand")?)?;
        let holds = lhs.compare(op, &rhs)?;
        trace!(lhs = %lhs, op = op.symbol(), rhs = %rhs, holds, "condition");
        Ok(holds)
    }

    /// A string literal names a label and an integer literal is an offset.
    /// A variable is looked up and its value read the same way.
    fn jump_target(&self, token: &Token) -> GrinResult<JumpTarget> {
        let value = match &token.kind {
            TokenKind::Str(name) => return Ok(JumpTarget::ByLabel(name.clone())),
            TokenKind::Integer(delta) => return Ok(JumpTarget::ByOffset(*delta)),
            TokenKind::Identifier(_) => self.evaluate(token)?,
            _ => {
                return Err(GrinDiagnostic::new(GrinError::InvalidJumpTarget)
                    .at(token.loc.clone())
                    .with_detail(format!("{} cannot be a jump target", token.kind)));
            }
        };
        match value {
            Value::Text(name) => Ok(JumpTarget::ByLabel(name)),
            Value::Integer(delta) => Ok(JumpTarget::ByOffset(delta)),
            Value::Real(_) => Err(GrinDiagnostic::new(GrinError::InvalidJumpTarget)
                .at(token.loc.clone())
                .with_detail(format!("'{}' holds a real number", token.text))),
        }
    }

    /// Turn a target into a statement index in `[0, len]`.
    fn resolve(&self, target: &JumpTarget, labels: &LabelTable, len: usize) -> GrinResult<usize> {
        let destination = match target {
            JumpTarget::ByLabel(name) => {
                let idx = labels.get(name).ok_or_else(|| {
                    GrinDiagnostic::new(GrinError::LabelNotFound)
                        .with_detail(format!("no label named '{name}'"))
                })?;
                as_i64(idx)
            }
            JumpTarget::ByOffset(delta) => as_i64(self.pc).saturating_add(*delta),
        };
        usize::try_from(destination)
            .ok()
            .filter(|&idx| idx <= len)
            .ok_or_else(|| {
                GrinDiagnostic::new(GrinError::JumpOutOfRange).with_detail(format!(
                    "statement {destination} is outside the program (0 to {len})"
                ))
            })
    }
}

fn as_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_lines;
    use pretty_assertions::assert_eq;

    fn program(lines: &[&str]) -> Program {
        parse_lines(lines).unwrap()
    }

    /// Run with the given stdin text; return the outcome and everything printed.
    fn run_with_input(lines: &[&str], input: &str) -> (GrinResult<Environment>, String) {
        let program = program(lines);
        let mut out = Vec::new();
        let result = Executor::new(&program, input.as_bytes(), &mut out).run();
        (result, String::from_utf8(out).expect("non-utf8 output"))
    }

    fn run(lines: &[&str]) -> Environment {
        let (result, _) = run_with_input(lines, "");
        result.unwrap()
    }

    fn run_err(lines: &[&str]) -> GrinDiagnostic {
        let (result, _) = run_with_input(lines, "");
        result.unwrap_err()
    }

    fn env(pairs: &[(&str, Value)]) -> Environment {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn let_integer() {
        assert_eq!(run(&["LET X 10"]), env(&[("X", Value::from(10))]));
    }

    #[test]
    fn let_string() {
        assert_eq!(
            run(&[r#"LET NAME "AKSHAT""#]),
            env(&[("NAME", Value::from("AKSHAT"))])
        );
    }

    #[test]
    fn let_copies_variable() {
        assert_eq!(
            run(&["LET A 1", "LET B A", "ADD A 1"]),
            env(&[("A", Value::from(2)), ("B", Value::from(1))])
        );
    }

    #[test]
    fn let_from_unbound_variable_takes_its_name() {
        assert_eq!(run(&["LET A B"]), env(&[("A", Value::from("B"))]));
    }

    #[test]
    fn add_numbers() {
        assert_eq!(run(&["LET A 10", "ADD A 9"]), env(&[("A", Value::from(19))]));
    }

    #[test]
    fn subtract_numbers() {
        assert_eq!(run(&["LET A 15", "SUB A 3"]), env(&[("A", Value::from(12))]));
    }

    #[test]
    fn add_variables() {
        assert_eq!(
            run(&["LET A 10", "LET B 20", "ADD A B", "ADD B 2"]),
            env(&[("A", Value::from(30)), ("B", Value::from(22))])
        );
    }

    #[test]
    fn multiply_variables() {
        assert_eq!(
            run(&["LET A 10", "LET B 20", "MULT A B"]),
            env(&[("A", Value::from(200)), ("B", Value::from(20))])
        );
    }

    #[test]
    fn concatenation() {
        assert_eq!(
            run(&[r#"LET A "AKSHAT""#, r#"ADD A " TALWAR""#]),
            env(&[("A", Value::from("AKSHAT TALWAR"))])
        );
    }

    #[test]
    fn string_repetition() {
        assert_eq!(
            run(&[r#"LET A "AKSHAT""#, "MULT A 4"]),
            env(&[("A", Value::from("AKSHATAKSHATAKSHATAKSHAT"))])
        );
    }

    #[test]
    fn integer_division_stays_integer() {
        assert_eq!(
            run(&["LET A 50", "DIV A 5", "MULT A 4"]),
            env(&[("A", Value::from(40))])
        );
    }

    #[test]
    fn real_division() {
        assert_eq!(
            run(&["LET A 5", "DIV A 2.0"]),
            env(&[("A", Value::from(2.5))])
        );
    }

    #[test]
    fn arithmetic_on_unbound_variable_fails() {
        let err = run_err(&["ADD A 1"]);
        assert_eq!(err.error, GrinError::UnboundVariable);
        assert_eq!(err.location.unwrap().line, 1);
    }

    #[test]
    fn type_mismatch_fails() {
        let err = run_err(&[r#"LET A "X""#, "SUB A 1"]);
        assert_eq!(err.error, GrinError::TypeMismatch);
        assert_eq!(err.location.unwrap().line, 2);
    }

    #[test]
    fn division_by_zero_fails() {
        assert_eq!(
            run_err(&["LET A 1", "DIV A 0"]).error,
            GrinError::DivisionByZero
        );
    }

    #[test]
    fn label_and_subroutine_flow() {
        let (result, out) = run_with_input(
            &[
                "LET A 3",
                "PRINT A",
                r#"GOSUB "CHUNK""#,
                "PRINT A",
                "PRINT B",
                r#"GOTO "FINAL""#,
                "CHUNK:  LET A 4",
                "LET B 6",
                "RETURN",
                "FINAL:  PRINT A",
            ],
            "",
        );
        assert_eq!(
            result.unwrap(),
            env(&[("A", Value::from(4)), ("B", Value::from(6))])
        );
        assert_eq!(out, "3\n4\n6\n4\n");
    }

    #[test]
    fn conditional_jump_taken() {
        let (result, out) = run_with_input(
            &["LET A 3", "LET B 5", "GOTO 2 IF A < 4", "PRINT A", "PRINT B"],
            "",
        );
        assert_eq!(
            result.unwrap(),
            env(&[("A", Value::from(3)), ("B", Value::from(5))])
        );
        assert_eq!(out, "5\n");
    }

    #[test]
    fn conditional_jump_not_taken() {
        let (result, out) = run_with_input(
            &["LET A 3", "LET B 5", "GOTO 2 IF A > 4", "PRINT A", "PRINT B"],
            "",
        );
        assert_eq!(
            result.unwrap(),
            env(&[("A", Value::from(3)), ("B", Value::from(5))])
        );
        assert_eq!(out, "3\n5\n");
    }

    #[test]
    fn false_gosub_does_not_push() {
        let err = run_err(&["GOSUB 2 IF 1 = 2", "RETURN"]);
        assert_eq!(err.error, GrinError::UnbalancedReturn);
    }

    #[test]
    fn unconditional_goto_skips() {
        assert_eq!(
            run(&["LET A 10", "GOTO 2", "LET B 9", "LET C 5"]),
            env(&[("A", Value::from(10)), ("C", Value::from(5))])
        );
    }

    #[test]
    fn relative_gosub_and_nested_returns() {
        let (result, out) = run_with_input(
            &[
                "LET A 1",
                "GOSUB 5",
                "PRINT A",
                "END",
                "LET A 3",
                "RETURN",
                "PRINT A",
                "LET A 2",
                "GOSUB -4",
                "PRINT A",
                "RETURN",
            ],
            "",
        );
        assert_eq!(result.unwrap(), env(&[("A", Value::from(3))]));
        assert_eq!(out, "1\n3\n3\n");
    }

    #[test]
    fn end_halts_immediately() {
        assert_eq!(
            run(&["LET A 1", "END", "LET A 2"]),
            env(&[("A", Value::from(1))])
        );
    }

    #[test]
    fn jump_to_end_of_program_terminates() {
        assert_eq!(run(&["GOTO 2", "LET A 1"]), env(&[]));
    }

    #[test]
    fn jump_past_end_fails() {
        let err = run_err(&["GOTO 3", "LET A 1"]);
        assert_eq!(err.error, GrinError::JumpOutOfRange);
    }

    #[test]
    fn jump_before_start_fails() {
        let err = run_err(&["LET A 1", "GOSUB -2"]);
        assert_eq!(err.error, GrinError::JumpOutOfRange);
    }

    #[test]
    fn unknown_label_fails() {
        let err = run_err(&[r#"GOTO "NOWHERE""#]);
        assert_eq!(err.error, GrinError::LabelNotFound);
    }

    #[test]
    fn unbalanced_return_fails() {
        // The first RETURN resumes at itself, so the second pass underflows.
        let err = run_err(&["GOSUB 1", "RETURN"]);
        assert_eq!(err.error, GrinError::UnbalancedReturn);
        assert_eq!(err.location.unwrap().line, 2);
    }

    #[test]
    fn variable_jump_targets() {
        assert_eq!(
            run(&[
                r#"LET T "DONE""#,
                "GOTO T",
                "LET X 1",
                "DONE: LET N 2",
                "GOTO N IF N = 2",
                "LET Y 1"
            ]),
            env(&[("T", Value::from("DONE")), ("N", Value::from(2))])
        );
    }

    #[test]
    fn real_variable_is_not_a_jump_target() {
        let err = run_err(&["LET R 1.5", "GOTO R"]);
        assert_eq!(err.error, GrinError::InvalidJumpTarget);
    }

    #[test]
    fn loop_with_counter() {
        let (result, out) = run_with_input(
            &[
                "LET I 0",
                "TOP: ADD I 1",
                "PRINT I",
                r#"GOTO "TOP" IF I < 3"#,
            ],
            "",
        );
        assert_eq!(result.unwrap(), env(&[("I", Value::from(3))]));
        assert_eq!(out, "1\n2\n3\n");
    }

    #[test]
    fn print_forms() {
        let (_, out) = run_with_input(
            &[
                "LET A 2.5",
                "PRINT A",
                "PRINT MISSING",
                r#"PRINT "hello world""#,
                "PRINT 7",
                "PRINT 10.0",
            ],
            "",
        );
        assert_eq!(out, "2.5\n0\nhello world\n7\n10.0\n");
    }

    #[test]
    fn numeric_input() {
        let (result, _) = run_with_input(&["INNUM A", "INNUM B"], "42\n3.5\n");
        assert_eq!(
            result.unwrap(),
            env(&[("A", Value::from(42)), ("B", Value::from(3.5))])
        );
    }

    #[test]
    fn malformed_numeric_input_fails() {
        let (result, _) = run_with_input(&["INNUM A"], "forty\n");
        assert_eq!(result.unwrap_err().error, GrinError::MalformedInput);
    }

    #[test]
    fn string_input_is_verbatim() {
        let (result, _) = run_with_input(&["INSTR S"], "  hi there 12 \r\n");
        assert_eq!(result.unwrap(), env(&[("S", Value::from("  hi there 12 "))]));
    }

    #[test]
    fn input_exhausted_fails() {
        let (result, _) = run_with_input(&["INSTR S"], "");
        assert_eq!(result.unwrap_err().error, GrinError::EndOfInput);
    }

    #[test]
    fn step_by_step() {
        let program = program(&["LET A 1", "GOSUB 2", "END", "RETURN"]);
        let mut out = Vec::new();
        let mut exec = Executor::new(&program, "".as_bytes(), &mut out);
        assert_eq!(exec.step().unwrap(), StepOutcome::Running);
        assert_eq!(exec.state().pc, 1);
        assert_eq!(exec.step().unwrap(), StepOutcome::Running);
        assert_eq!(exec.state().pc, 3);
        assert_eq!(exec.state().call_stack, vec![1]);
        assert_eq!(exec.step().unwrap(), StepOutcome::Running);
        assert_eq!(exec.state().pc, 2);
        assert!(exec.state().call_stack.is_empty());
        assert_eq!(exec.step().unwrap(), StepOutcome::Finished);
        assert_eq!(exec.step().unwrap(), StepOutcome::Finished);
    }

    #[test]
    fn empty_program() {
        assert_eq!(run(&[]), Environment::new());
    }

    #[test]
    fn runs_are_independent() {
        let lines = ["LET A 1", "ADD A 1"];
        assert_eq!(run(&lines), run(&lines));
    }

    #[test]
    fn mixed_comparison_ordering_fails() {
        let err = run_err(&[r#"LET A "x""#, "GOTO 1 IF A < 3"]);
        assert_eq!(err.error, GrinError::TypeMismatch);
    }

    #[test]
    fn loaded_program_strips_labels() {
        let program = program(&["L: PRINT 1", "GOTO \"L\" IF 1 = 2"]);
        let exec = Executor::new(&program, "".as_bytes(), Vec::new());
        assert_eq!(exec.program().labels().get("L"), Some(0));
        assert_eq!(exec.program().statements()[0].to_string(), "PRINT 1");
    }
}
