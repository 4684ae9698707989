use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::vm::{self, EvalError};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Accumulated `let` bindings, replayed ahead of each new input.
struct ReplContext {
    let_bindings: Vec<String>,
}

impl ReplContext {
    fn new() -> Self {
        ReplContext {
            let_bindings: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.let_bindings.clear();
    }

    /// Build synthetic source: prior bindings, then the new input.
    fn build_source(&self, input: &str) -> String {
        let mut src = String::new();
        for binding in &self.let_bindings {
            src.push_str(binding);
            src.push('\n');
        }
        src.push_str(input);
        src.push('\n');
        src
    }
}

// ---------------------------------------------------------------------------
// Input classification
// ---------------------------------------------------------------------------

enum InputKind {
    Expression(String),
    LetBinding(String),
    Command(String),
    Empty,
}

fn classify_input(input: &str) -> InputKind {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return InputKind::Empty;
    }
    if trimmed.starts_with(':') {
        return InputKind::Command(trimmed.to_string());
    }
    if trimmed.starts_with("let ") {
        return InputKind::LetBinding(trimmed.to_string());
    }
    InputKind::Expression(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// REPL commands
// ---------------------------------------------------------------------------

fn handle_command(cmd: &str, ctx: &mut ReplContext) {
    match cmd {
        ":help" | ":h" => {
            println!("Commands:");
            println!("  :help    :h   Show this help");
            println!("  :quit    :q   Exit REPL");
            println!("  :clear   :c   Clear accumulated bindings");
            println!("  :context      Show accumulated bindings");
        }
        ":quit" | ":q" => std::process::exit(0),
        ":clear" | ":c" => {
            ctx.clear();
            println!("Context cleared.");
        }
        ":context" => {
            if ctx.let_bindings.is_empty() {
                println!("(empty)");
            } else {
                for binding in &ctx.let_bindings {
                    println!("{}", binding);
                }
            }
        }
        _ => {
            println!("Unknown command: {}. Type :help for available commands.", cmd);
        }
    }
}

// ---------------------------------------------------------------------------
// Main REPL loop
// ---------------------------------------------------------------------------

pub fn run() {
    println!("Quill REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type :help for commands, :quit to exit\n");

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to initialize line editor: {}", e);
            return;
        }
    };
    let mut ctx = ReplContext::new();

    loop {
        let input = match read_input(&mut rl) {
            Some(input) => input,
            None => break, // Ctrl-D
        };

        match classify_input(&input) {
            InputKind::Empty => continue,
            InputKind::Command(cmd) => handle_command(&cmd, &mut ctx),
            InputKind::Expression(expr) => eval_expression(&expr, &ctx),
            InputKind::LetBinding(binding) => eval_let_binding(&binding, &mut ctx),
        }
    }

    println!();
}

fn read_input(rl: &mut DefaultEditor) -> Option<String> {
    let input = match rl.readline(">> ") {
        Ok(line) => line,
        Err(ReadlineError::Interrupted) => return Some(String::new()),
        Err(ReadlineError::Eof) => return None,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Some(String::new());
        }
    };

    if !input.trim().is_empty() {
        let _ = rl.add_history_entry(&input);
    }

    Some(input)
}

fn eval_expression(expr: &str, ctx: &ReplContext) {
    let source = ctx.build_source(expr);
    match vm::eval_source(&source) {
        Ok(val) => {
            if !matches!(val, vm::value::Value::Unit) {
                println!("{}", val);
            }
        }
        Err(e) => report(&e),
    }
}

fn eval_let_binding(binding: &str, ctx: &mut ReplContext) {
    // Validate by running before the binding joins the context.
    let source = ctx.build_source(binding);
    match vm::eval_source(&source) {
        Ok(_) => ctx.let_bindings.push(binding.to_string()),
        Err(e) => report(&e),
    }
}

fn report(err: &EvalError) {
    match err {
        EvalError::Parse(e) => eprintln!("Parse error: {}", e),
        EvalError::Compile(e) => eprintln!("Compile error: {}", e),
        EvalError::Runtime(e) => eprintln!("Runtime error: {}", e),
    }
}
