use crate::ast::{Expr, Stmt};
use crate::evaluator::{Interpreter, InterpreterConfig};
use crate::parser;
use crate::value::Value;
use std::io::{self, BufRead, Write};

/// Interactive loop. Declarations persist between lines because every line is
/// evaluated against the same global scope.
pub fn start(config: InterpreterConfig) {
    println!("Crust {}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let mut interpreter = Interpreter::new().with_config(config);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(error)) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
            None => {
                println!();
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        if let Some(value) = eval_line(&mut interpreter, line) {
            println!("{}", value);
        }
    }
}

/// The value to echo for one line, if any. Errors are reported here.
fn eval_line(interpreter: &mut Interpreter, source: &str) -> Option<Value> {
    let program = match parser::parse(source) {
        Ok(program) => program,
        Err(error) => {
            error.report(source, None);
            return None;
        }
    };

    // `x = 5` would otherwise echo 5.
    let ends_in_assignment = matches!(
        program.body.last(),
        Some(Stmt::Expression {
            expr: Expr::Assignment { .. } | Expr::CompoundAssignment { .. },
            ..
        })
    );

    match interpreter.evaluate(&program) {
        Ok(Value::Null) => None,
        Ok(_) if ends_in_assignment => None,
        Ok(value) => Some(value),
        Err(error) => {
            error.report(source, None);
            None
        }
    }
}
