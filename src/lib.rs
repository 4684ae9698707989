//! The Quill language: lexer, Pratt parser, three-address bytecode
//! compiler, and a dispatch-loop VM with an inclusive range operator.

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod vm;
