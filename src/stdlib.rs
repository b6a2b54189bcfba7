//! Built-in functions installed in the root scope.

use crate::error::{CrustError, ErrorKind};
use crate::value::{format_number, ArrayRef, Value};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

const MAX_FIXED_DIGITS: f64 = 100.0;

/// Every global the interpreter starts with, besides `true`, `false` and `null`.
pub fn bindings() -> Vec<(String, Value)> {
    let mut globals = vec![
        native("output", output),
        native("debug", debug),
        native("typeof", type_of),
        native("len", len),
        native("Int", int),
        native("Float", float),
        native("parseInt", int),
        native("parseFloat", float),
        native("fixed", fixed),
        native("input", input),
        native("String", string),
        native("Array", array),
        native("push", push),
        native("append", push),
        native("pop", pop),
        native("shift", shift),
        native("unshift", unshift),
        native("remove", remove),
        native("reverse", reverse),
        native("range", range),
        native("throw", throw),
    ];
    globals.push(("Math".to_string(), math()));
    globals
}

fn native(name: &str, function: fn(&[Value]) -> Result<Value, CrustError>) -> (String, Value) {
    (
        name.to_string(),
        Value::native(name, move |arguments, _, _| function(arguments)),
    )
}

fn argument(arguments: &[Value], index: usize) -> Value {
    arguments.get(index).cloned().unwrap_or(Value::Null)
}

fn number_argument(arguments: &[Value], index: usize, function: &str) -> Result<f64, CrustError> {
    match argument(arguments, index) {
        Value::Number(n) => Ok(n),
        other => Err(CrustError::type_error(format!(
            "{}() expects a number as argument {} but got [ {} ]",
            function,
            index + 1,
            other.type_name()
        ))),
    }
}

fn array_argument(arguments: &[Value], function: &str) -> Result<ArrayRef, CrustError> {
    match argument(arguments, 0) {
        Value::Array(elements) => Ok(elements),
        other => Err(CrustError::type_error(format!(
            "{}() expects an array but got [ {} ]",
            function,
            other.type_name()
        ))),
    }
}

fn joined(arguments: &[Value]) -> String {
    arguments
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn output(arguments: &[Value]) -> Result<Value, CrustError> {
    println!("{}", joined(arguments));
    Ok(Value::Null)
}

fn debug(arguments: &[Value]) -> Result<Value, CrustError> {
    let described = arguments
        .iter()
        .map(|value| format!("<{}> {}", value.type_name(), value))
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", described);
    Ok(Value::Null)
}

fn type_of(arguments: &[Value]) -> Result<Value, CrustError> {
    Ok(Value::string(argument(arguments, 0).type_name()))
}

fn len(arguments: &[Value]) -> Result<Value, CrustError> {
    let length = match argument(arguments, 0) {
        Value::String(s) => s.chars().count(),
        Value::Array(elements) => elements.borrow().len(),
        Value::Object(properties) => properties.borrow().len(),
        other => {
            return Err(CrustError::type_error(format!(
                "len() is not supported for [ {} ]",
                other.type_name()
            )))
        }
    };
    Ok(Value::Number(length as f64))
}

/// Longest leading decimal number in `text`, ignoring leading whitespace:
/// `"100a"` gives 100 and `"a"` gives `None`.
fn parse_number_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let candidate: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        .collect();

    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
}

fn to_number(arguments: &[Value], function: &str) -> Result<f64, CrustError> {
    match argument(arguments, 0) {
        Value::Number(n) => Ok(n),
        Value::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
        Value::String(text) => parse_number_prefix(&text).ok_or_else(|| {
            CrustError::type_error(format!("Cannot convert '{}' to a number", text))
                .with_help(format!("{}() needs text that starts with digits.", function))
        }),
        other => Err(CrustError::type_error(format!(
            "{}() cannot convert [ {} ] to a number",
            function,
            other.type_name()
        ))),
    }
}

fn int(arguments: &[Value]) -> Result<Value, CrustError> {
    Ok(Value::Number(to_number(arguments, "Int")?.trunc()))
}

fn float(arguments: &[Value]) -> Result<Value, CrustError> {
    Ok(Value::Number(to_number(arguments, "Float")?))
}

/// `fixed(number, digits = 0)` formats with exactly `digits` decimals.
fn fixed(arguments: &[Value]) -> Result<Value, CrustError> {
    let number = number_argument(arguments, 0, "fixed")?;
    let digits = match arguments.get(1) {
        Some(Value::Number(digits)) => *digits,
        _ => 0.0,
    };
    if digits.fract() != 0.0 || !(0.0..=MAX_FIXED_DIGITS).contains(&digits) {
        return Err(CrustError::runtime_error(format!(
            "fixed() digits must be an integer between 0 and {} but got {}",
            MAX_FIXED_DIGITS,
            format_number(digits)
        )));
    }
    Ok(Value::String(format!("{:.*}", digits as usize, number)))
}

/// Reads one line from standard input after printing the optional prompt.
/// End of input reads as the empty string.
fn input(arguments: &[Value]) -> Result<Value, CrustError> {
    match argument(arguments, 0) {
        Value::Null => {}
        Value::String(prompt) => {
            print!("{}", prompt);
            io::stdout().flush().map_err(io_error)?;
        }
        other => {
            return Err(CrustError::type_error(format!(
                "input() expects a string prompt but got [ {} ]",
                other.type_name()
            )))
        }
    }

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(io_error)?;
    Ok(Value::String(line.trim_end_matches(&['\n', '\r'][..]).to_string()))
}

fn io_error(error: io::Error) -> CrustError {
    CrustError::runtime_error(format!("input() failed: {}", error))
}

fn string(arguments: &[Value]) -> Result<Value, CrustError> {
    Ok(Value::String(argument(arguments, 0).to_string()))
}

fn array(arguments: &[Value]) -> Result<Value, CrustError> {
    Ok(Value::array(arguments.to_vec()))
}

fn push(arguments: &[Value]) -> Result<Value, CrustError> {
    let elements = array_argument(arguments, "push")?;
    elements.borrow_mut().extend(arguments.iter().skip(1).cloned());
    Ok(Value::Null)
}

fn pop(arguments: &[Value]) -> Result<Value, CrustError> {
    array_argument(arguments, "pop")?
        .borrow_mut()
        .pop()
        .ok_or_else(|| CrustError::index_out_of_bounds("pop() called on an empty array"))
}

fn shift(arguments: &[Value]) -> Result<Value, CrustError> {
    let elements = array_argument(arguments, "shift")?;
    let mut elements = elements.borrow_mut();
    if elements.is_empty() {
        return Err(CrustError::index_out_of_bounds("shift() called on an empty array"));
    }
    Ok(elements.remove(0))
}

/// Inserts the remaining arguments at the front, keeping their order.
fn unshift(arguments: &[Value]) -> Result<Value, CrustError> {
    let elements = array_argument(arguments, "unshift")?;
    let mut elements = elements.borrow_mut();
    let tail = std::mem::take(&mut *elements);
    elements.extend(arguments.iter().skip(1).cloned());
    elements.extend(tail);
    Ok(Value::Null)
}

fn remove(arguments: &[Value]) -> Result<Value, CrustError> {
    let elements = array_argument(arguments, "remove")?;
    let index = match arguments.get(1) {
        Some(_) => number_argument(arguments, 1, "remove")?,
        None => 0.0,
    };

    let mut elements = elements.borrow_mut();
    if index.fract() != 0.0 || index < 0.0 || index >= elements.len() as f64 {
        return Err(CrustError::index_out_of_bounds(format!(
            "remove() index {} is out of bounds for an array of length {}",
            format_number(index),
            elements.len()
        )));
    }
    Ok(elements.remove(index as usize))
}

fn reverse(arguments: &[Value]) -> Result<Value, CrustError> {
    array_argument(arguments, "reverse")?.borrow_mut().reverse();
    Ok(Value::Null)
}

/// `range(start, end, step = 1)`, end exclusive. A negative step counts down.
fn range(arguments: &[Value]) -> Result<Value, CrustError> {
    let start = number_argument(arguments, 0, "range")?;
    let end = number_argument(arguments, 1, "range")?;
    let step = match arguments.get(2) {
        Some(_) => number_argument(arguments, 2, "range")?,
        None => 1.0,
    };

    if step == 0.0 || !step.is_finite() {
        return Err(CrustError::runtime_error("range() step must be a non-zero number"));
    }

    let mut numbers = Vec::new();
    let mut current = start;
    while (step > 0.0 && current < end) || (step < 0.0 && current > end) {
        numbers.push(Value::Number(current));
        current += step;
    }
    Ok(Value::array(numbers))
}

/// `throw(message, kind = "RuntimeError")`
fn throw(arguments: &[Value]) -> Result<Value, CrustError> {
    let message = match argument(arguments, 0) {
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let kind = match argument(arguments, 1) {
        Value::String(kind) => ErrorKind::from_name(&kind),
        _ => ErrorKind::RuntimeError,
    };
    Err(CrustError::new(kind, message))
}

fn math() -> Value {
    let mut functions = vec![
        native("min", min),
        native("max", max),
        native("pow", pow),
        native("random", random),
    ];

    let unary: [(&str, fn(f64) -> f64); 12] = [
        ("abs", f64::abs),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("round", f64::round),
        ("trunc", f64::trunc),
        ("sqrt", f64::sqrt),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("log", f64::ln),
        ("exp", f64::exp),
        ("sign", sign),
    ];
    for (name, function) in unary {
        functions.push((
            name.to_string(),
            Value::native(name, move |arguments, _, _| {
                Ok(Value::Number(function(number_argument(arguments, 0, name)?)))
            }),
        ));
    }

    let mut properties: BTreeMap<String, Value> = functions.into_iter().collect();
    properties.insert("PI".to_string(), Value::Number(std::f64::consts::PI));
    properties.insert("E".to_string(), Value::Number(std::f64::consts::E));
    Value::object(properties)
}

/// Zero keeps its sign instead of becoming 1.
fn sign(n: f64) -> f64 {
    if n == 0.0 || n.is_nan() {
        n
    } else {
        n.signum()
    }
}

fn extremum(arguments: &[Value], function: &str, pick: fn(f64, f64) -> f64) -> Result<Value, CrustError> {
    if arguments.is_empty() {
        return Err(CrustError::type_error(format!("{}() needs at least one number", function)));
    }
    let mut result = number_argument(arguments, 0, function)?;
    for index in 1..arguments.len() {
        result = pick(result, number_argument(arguments, index, function)?);
    }
    Ok(Value::Number(result))
}

fn min(arguments: &[Value]) -> Result<Value, CrustError> {
    extremum(arguments, "min", f64::min)
}

fn max(arguments: &[Value]) -> Result<Value, CrustError> {
    extremum(arguments, "max", f64::max)
}

fn pow(arguments: &[Value]) -> Result<Value, CrustError> {
    let base = number_argument(arguments, 0, "pow")?;
    let exponent = number_argument(arguments, 1, "pow")?;
    Ok(Value::Number(base.powf(exponent)))
}

/// Uniform in `[0, 1)`.
fn random(_: &[Value]) -> Result<Value, CrustError> {
    Ok(Value::Number(rand::random::<f64>()))
}
