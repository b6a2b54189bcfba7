//! Turns a syntax tree back into source text that parses to an equivalent tree.
//!
//! Parentheses are only emitted where precedence requires them. A few statement
//! forms are adjusted so the output reads back the same way: an expression
//! statement that would otherwise be glued onto the previous statement (one
//! starting with `(`, `[`, `+` or `-`) is wrapped in a block, and a bare `return`
//! followed by more statements becomes `return null`.

use crate::ast::{BinaryOp, Expr, Program, Property, Stmt};
use crate::stack::ensure_sufficient_stack;
use crate::value::format_number;
use std::fmt;

const INDENT: &str = "    ";

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Assignment,
    Object,
    Logical,
    Comparison,
    Additive,
    Multiplicative,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn of(operator: BinaryOp) -> Self {
        match operator {
            BinaryOp::And | BinaryOp::Or => Precedence::Logical,
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => Precedence::Comparison,
            BinaryOp::Add | BinaryOp::Subtract => Precedence::Additive,
            BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Modulo
            | BinaryOp::Power
            | BinaryOp::FloorDivide => Precedence::Multiplicative,
        }
    }

    fn next(self) -> Self {
        match self {
            Precedence::Assignment => Precedence::Object,
            Precedence::Object => Precedence::Logical,
            Precedence::Logical => Precedence::Comparison,
            Precedence::Comparison => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::default();
    printer.statements(&program.body);
    printer.out
}

pub fn print_expression(expr: &Expr) -> String {
    expression(expr, Precedence::Assignment)
}

fn expression(expr: &Expr, min: Precedence) -> String {
    ensure_sufficient_stack(|| parenthesized(expr, min))
}

fn parenthesized(expr: &Expr, min: Precedence) -> String {
    let (text, precedence) = match expr {
        Expr::Assignment { target, value, .. } => (
            format!(
                "{} = {}",
                expression(target, Precedence::Call),
                expression(value, Precedence::Assignment)
            ),
            Precedence::Assignment,
        ),
        Expr::CompoundAssignment {
            target,
            operator,
            value,
            ..
        } => (
            format!(
                "{} {}= {}",
                expression(target, Precedence::Call),
                operator.symbol(),
                expression(value, Precedence::Assignment)
            ),
            Precedence::Assignment,
        ),
        Expr::Binary {
            left,
            operator,
            right,
            ..
        } => {
            let precedence = Precedence::of(*operator);
            // Comparisons don't chain, so neither side may be another comparison.
            let left_min = if precedence == Precedence::Comparison {
                precedence.next()
            } else {
                precedence
            };
            (
                format!(
                    "{} {} {}",
                    expression(left, left_min),
                    operator.symbol(),
                    expression(right, precedence.next())
                ),
                precedence,
            )
        }
        Expr::Unary {
            operator, operand, ..
        } => (
            format!("{}{}", operator.symbol(), expression(operand, Precedence::Unary)),
            Precedence::Unary,
        ),
        Expr::Member {
            object,
            property,
            computed,
            ..
        } => {
            // `1.x` would lex as the number `1.` followed by `x`.
            let object = match object.as_ref() {
                Expr::NumericLiteral { .. } => format!("({})", expression(object, Precedence::Primary)),
                other => expression(other, Precedence::Call),
            };
            let text = match (computed, property.as_ref()) {
                (false, Expr::Identifier { name, .. }) => format!("{}.{}", object, name),
                _ => format!("{}[{}]", object, expression(property, Precedence::Assignment)),
            };
            (text, Precedence::Call)
        }
        Expr::Call {
            callee, arguments, ..
        } => (
            format!("{}({})", expression(callee, Precedence::Call), list(arguments)),
            Precedence::Call,
        ),
        Expr::ObjectLiteral { properties, .. } => {
            let text = if properties.is_empty() {
                "{}".to_string()
            } else {
                let entries: Vec<String> = properties.iter().map(property).collect();
                format!("{{ {} }}", entries.join(", "))
            };
            (text, Precedence::Object)
        }
        Expr::ArrayLiteral { elements, .. } => (format!("[{}]", list(elements)), Precedence::Primary),
        Expr::Identifier { name, .. } => (name.clone(), Precedence::Primary),
        Expr::NumericLiteral { value, .. } => (format_number(*value), Precedence::Primary),
        Expr::StringLiteral { value, .. } => (quote(value), Precedence::Primary),
    };

    if precedence < min {
        format!("({})", text)
    } else {
        text
    }
}

fn list(items: &[Expr]) -> String {
    items
        .iter()
        .map(|item| expression(item, Precedence::Assignment))
        .collect::<Vec<_>>()
        .join(", ")
}

fn property(property: &Property) -> String {
    let key = if is_identifier(&property.key) {
        property.key.clone()
    } else {
        quote(&property.key)
    };
    match &property.value {
        Some(value) => format!("{}: {}", key, expression(value, Precedence::Assignment)),
        None => key,
    }
}

fn is_identifier(text: &str) -> bool {
    const KEYWORDS: [&str; 14] = [
        "set", "keep", "fn", "return", "if", "else", "elif", "while", "for", "in", "break",
        "continue", "try", "catch",
    ];
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {
            chars.all(|c| c.is_alphanumeric() || c == '_') && !KEYWORDS.contains(&text)
        }
        _ => false,
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn statements(&mut self, statements: &[Stmt]) {
        for (index, stmt) in statements.iter().enumerate() {
            ensure_sufficient_stack(|| self.statement(stmt, index == 0, index + 1 == statements.len()));
        }
    }

    fn nested(&mut self, statements: &[Stmt]) {
        self.depth += 1;
        self.statements(statements);
        self.depth -= 1;
    }

    fn statement(&mut self, stmt: &Stmt, first: bool, last: bool) {
        match stmt {
            Stmt::Expression { expr, .. } => {
                let min = match expr {
                    Expr::ObjectLiteral { .. } => Precedence::Logical,
                    _ => Precedence::Assignment,
                };
                let text = expression(expr, min);
                if !first && text.starts_with(&['(', '[', '+', '-'][..]) {
                    self.line("{");
                    self.depth += 1;
                    self.line(&text);
                    self.depth -= 1;
                    self.line("}");
                } else {
                    self.line(&text);
                }
            }
            Stmt::VariableDeclaration {
                name,
                constant,
                value,
                ..
            } => {
                let keyword = if *constant { "keep" } else { "set" };
                match value {
                    Some(value) => self.line(&format!("{} {} = {}", keyword, name, print_expression(value))),
                    None => self.line(&format!("{} {}", keyword, name)),
                }
            }
            Stmt::FunctionDeclaration(declaration) => {
                self.line(&format!(
                    "fn {}({}) {{",
                    declaration.name,
                    declaration.parameters.join(", ")
                ));
                self.nested(&declaration.body);
                self.line("}");
            }
            Stmt::Block { statements, .. } => {
                self.line("{");
                self.nested(statements);
                self.line("}");
            }
            Stmt::If { .. } => self.if_chain(stmt, "if"),
            Stmt::While { condition, body, .. } => {
                self.line(&format!("while {} {{", print_expression(condition)));
                self.nested(body);
                self.line("}");
            }
            Stmt::For {
                variable,
                collection,
                body,
                ..
            } => {
                self.line(&format!("for {} in {} {{", variable, print_expression(collection)));
                self.nested(body);
                self.line("}");
            }
            Stmt::Break { .. } => self.line("break"),
            Stmt::Continue { .. } => self.line("continue"),
            Stmt::Return { value, .. } => match value {
                Some(value) => self.line(&format!("return {}", print_expression(value))),
                None if last => self.line("return"),
                None => self.line("return null"),
            },
            Stmt::TryCatch {
                try_block,
                error_name,
                catch_block,
                ..
            } => {
                self.line("try {");
                self.nested(try_block);
                match error_name {
                    Some(name) => self.line(&format!("}} catch ({}) {{", name)),
                    None => self.line("} catch {"),
                }
                self.nested(catch_block);
                self.line("}");
            }
        }
    }

    /// `if`, then one `elif` per alternate that is exactly one `if`, then `else`.
    fn if_chain(&mut self, stmt: &Stmt, opening: &str) {
        let Stmt::If {
            condition,
            consequent,
            alternate,
            ..
        } = stmt
        else {
            return;
        };

        self.line(&format!("{} {} {{", opening, print_expression(condition)));
        self.nested(consequent);

        match alternate.as_deref() {
            Some([next @ Stmt::If { .. }]) => self.if_chain(next, "} elif"),
            Some(statements) => {
                self.line("} else {");
                self.nested(statements);
                self.line("}");
            }
            None => self.line("}"),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&print_program(self))
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut printer = Printer::default();
        printer.statement(self, true, true);
        f.write_str(printer.out.trim_end())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&print_expression(self))
    }
}
