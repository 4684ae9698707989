//! Structured diagnostics for the `check` command's JSON output.

use serde::{Deserialize, Serialize};

use crate::parser::{ParseError, ParseErrorKind};
use crate::vm::compiler::CompileError;
use crate::vm::exec::{RuntimeError, RuntimeErrorKind};

/// Diagnostic severity level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// The result of checking a Quill source file.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckResult {
    pub fn ok() -> Self {
        CheckResult {
            status: "ok".into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        CheckResult {
            status: "error".into(),
            diagnostics,
        }
    }
}

/// A single diagnostic message.
#[derive(Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
}

/// Source location for a diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub col: usize,
}

impl Diagnostic {
    fn error(code: &str, file: &str, line: usize, col: usize, message: String) -> Self {
        Diagnostic {
            code: code.into(),
            severity: Severity::Error,
            location: Location {
                file: file.into(),
                line,
                col,
            },
            message,
        }
    }

    pub fn from_parse_error(err: &ParseError, file: &str) -> Self {
        let code = match err.kind {
            ParseErrorKind::Lexical => "E_LEX",
            ParseErrorKind::Syntax => "E_PARSE",
        };
        Self::error(code, file, err.line, err.col, err.message.clone())
    }

    pub fn from_compile_error(err: &CompileError, file: &str) -> Self {
        Self::error("E_COMPILE", file, err.line, err.col, err.message.clone())
    }

    pub fn from_runtime_error(err: &RuntimeError, file: &str) -> Self {
        let code = match err.kind {
            RuntimeErrorKind::RangeOrder => "E_RUN_RANGE_ORDER",
            RuntimeErrorKind::RangeSize => "E_RUN_RANGE_SIZE",
            RuntimeErrorKind::UnsupportedOperand => "E_RUN_UNSUPPORTED",
            RuntimeErrorKind::DivisionByZero => "E_RUN_DIV_ZERO",
            RuntimeErrorKind::TypeMismatch => "E_RUN_TYPE",
            RuntimeErrorKind::IndexOutOfBounds => "E_RUN_INDEX",
            RuntimeErrorKind::InvalidProgram => "E_RUN_INVALID",
        };
        Self::error(code, file, err.line, err.col, err.message.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
