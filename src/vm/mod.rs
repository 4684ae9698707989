pub mod chunk;
pub mod compiler;
pub mod exec;
pub mod value;

use crate::ast::Stmt;
use crate::parser::{parse_program, ParseError};
use chunk::Chunk;
use compiler::{CompileError, Compiler};
use exec::{RuntimeError, Vm};
use value::Value;

/// Any failure on the source → value path.
#[derive(Debug)]
pub enum EvalError {
    Parse(ParseError),
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Parse(e) => write!(f, "{}", e),
            EvalError::Compile(e) => write!(f, "{}", e),
            EvalError::Runtime(e) => write!(f, "{}", e),
        }
    }
}

/// Compile a parsed program to bytecode.
pub fn compile(stmts: &[Stmt]) -> Result<Chunk, CompileError> {
    Compiler::new().compile_program(stmts)
}

/// Parse, compile, and execute a source string in a fresh VM.
pub fn eval_source(source: &str) -> Result<Value, EvalError> {
    let stmts = parse_program(source).map_err(EvalError::Parse)?;
    let chunk = compile(&stmts).map_err(EvalError::Compile)?;
    let mut vm = Vm::new();
    vm.execute(&chunk).map_err(EvalError::Runtime)
}
