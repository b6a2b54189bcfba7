use crate::error::CrustError;
use crate::evaluator::{Interpreter, InterpreterConfig};
use crate::parser;
use crate::printer;
use crate::value::Value;

/// Run a whole script. Errors are reported to stderr with source context and
/// also returned so the caller can pick an exit code.
pub fn run(source: &str, filename: Option<&str>, config: InterpreterConfig) -> Result<Value, CrustError> {
    let result = parser::parse(source).and_then(|program| {
        tracing::debug!(file = filename.unwrap_or("<input>"), "evaluating script");
        Interpreter::new().with_config(config).evaluate(&program)
    });

    if let Err(error) = &result {
        error.report(source, filename);
    }
    result
}

/// Parse a script and print it back in canonical form instead of running it.
pub fn print_ast(source: &str, filename: Option<&str>) -> Result<String, CrustError> {
    match parser::parse(source) {
        Ok(program) => Ok(printer::print_program(&program)),
        Err(error) => {
            error.report(source, filename);
            Err(error)
        }
    }
}
