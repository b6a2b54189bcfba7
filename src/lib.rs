// Crust language interpreter library
//
// A small dynamically typed scripting language: lexer, parser, tree-walking
// evaluator and a source printer, with ariadne diagnostics for every error.

pub mod ast;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod repl;
pub mod runner;
mod stack;
pub mod stdlib;
pub mod value;

pub use ast::{Expr, Program, Stmt};
pub use environment::{Environment, ScopeId};
pub use error::{CrustError, ErrorKind, Span};
pub use evaluator::{Interpreter, InterpreterConfig};
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::{parse, Parser};
pub use printer::print_program;
pub use value::Value;

pub use repl::start as start_repl;
pub use runner::run;
