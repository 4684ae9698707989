use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use quillc::diagnostics::{CheckResult, Diagnostic, Location, Severity};
use quillc::parser::parse_program;
use quillc::repl;
use quillc::vm::{self, EvalError};

#[derive(Parser)]
#[command(name = "quillc")]
#[command(about = "The Quill language compiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a Quill source file and print its final value
    Run {
        /// The file to run
        file: PathBuf,
    },

    /// Check a Quill source file for errors without running it
    Check {
        /// The file to check
        file: PathBuf,

        /// Output diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a source string given on the command line
    Eval {
        /// The source to evaluate
        source: String,
    },

    /// Compile a file and print its bytecode
    Disasm {
        /// The file to compile
        file: PathBuf,
    },

    /// Start an interactive session
    Repl,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file } => {
            let source = match read_source(&file) {
                Ok(s) => s,
                Err(code) => return code,
            };
            run_source(&source)
        }
        Commands::Check { file, json } => {
            let result = check_file(&file);
            if json {
                match serde_json::to_string_pretty(&result) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Failed to serialize diagnostics: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_human_readable(&result);
            }
            if result.status == "ok" {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Eval { source } => run_source(&source),
        Commands::Disasm { file } => {
            let source = match read_source(&file) {
                Ok(s) => s,
                Err(code) => return code,
            };
            let stmts = match parse_program(&source) {
                Ok(stmts) => stmts,
                Err(e) => {
                    eprintln!("Parse error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match vm::compile(&stmts) {
                Ok(chunk) => {
                    print!("{}", chunk.disassemble());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Compile error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Repl => {
            repl::run();
            ExitCode::SUCCESS
        }
    }
}

fn read_source(path: &PathBuf) -> Result<String, ExitCode> {
    std::fs::read_to_string(path).map_err(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn run_source(source: &str) -> ExitCode {
    match vm::eval_source(source) {
        Ok(value) => {
            if !matches!(value, vm::value::Value::Unit) {
                println!("{}", value);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e {
                EvalError::Parse(e) => eprintln!("Parse error: {}", e),
                EvalError::Compile(e) => eprintln!("Compile error: {}", e),
                EvalError::Runtime(e) => eprintln!("Runtime error: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn check_file(path: &PathBuf) -> CheckResult {
    let file = path.display().to_string();
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            return CheckResult::failed(vec![Diagnostic {
                code: "E_IO".into(),
                severity: Severity::Error,
                location: Location {
                    file,
                    line: 0,
                    col: 0,
                },
                message: format!("Failed to read file: {}", e),
            }])
        }
    };

    // Check stops at the first failing stage: a program that does not
    // parse is never compiled.
    let stmts = match parse_program(&source) {
        Ok(stmts) => stmts,
        Err(e) => {
            return CheckResult::failed(vec![Diagnostic::from_parse_error(&e, &file)]);
        }
    };
    match vm::compile(&stmts) {
        Ok(_) => CheckResult::ok(),
        Err(e) => CheckResult::failed(vec![Diagnostic::from_compile_error(&e, &file)]),
    }
}

fn print_human_readable(result: &CheckResult) {
    if result.diagnostics.is_empty() {
        println!("✓ No errors found");
        return;
    }
    for diag in &result.diagnostics {
        eprintln!(
            "{}:{}:{}: {} [{}]",
            diag.location.file, diag.location.line, diag.location.col, diag.message, diag.code
        );
    }
    eprintln!("\n{} error(s) found", result.diagnostics.len());
}
