use crate::ast::{BinaryOp, Expr, Program, Stmt, UnaryOp};
use crate::environment::{Environment, ScopeId};
use crate::error::{CrustError, Span};
use crate::parser;
use crate::stack::ensure_sufficient_stack;
use crate::stdlib;
use crate::value::{format_number, ArrayRef, ErrorValue, Function, ObjectRef, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Longest string `*` may build.
const MAX_STRING_LENGTH: usize = 1 << 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Nested user-function calls allowed before a `RuntimeError` is raised.
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self { max_call_depth: 200 }
    }
}

/// How a statement finished. `Break`, `Continue` and `Return` unwind to the
/// innermost loop or function call; errors travel separately through `Err`, so a
/// `try` never sees loop control.
#[derive(Debug, Clone, PartialEq)]
enum ControlFlow {
    Normal(Value),
    Return(Value),
    Break(Span),
    Continue(Span),
}

/// What a `for` loop walks. Arrays are read by index on every iteration, so
/// elements pushed by the body are visited too.
enum Iteration {
    Live(ArrayRef),
    Snapshot(Vec<Value>),
}

impl Iteration {
    fn get(&self, index: usize) -> Option<Value> {
        match self {
            Iteration::Live(elements) => elements.borrow().get(index).cloned(),
            Iteration::Snapshot(items) => items.get(index).cloned(),
        }
    }
}

/// Assignable location, resolved once so compound assignment evaluates the
/// target's object expression a single time.
enum Place {
    Variable(String),
    Property(ObjectRef, String),
    Index(ArrayRef, usize),
}

pub struct Interpreter {
    environment: Environment,
    global: ScopeId,
    config: InterpreterConfig,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter whose root scope holds the standard library.
    pub fn new() -> Self {
        let environment = Environment::with_bindings(stdlib::bindings())
            .expect("standard library bindings have unique names");
        Self::with_environment(environment)
    }

    /// Interpreter over a caller-built root environment.
    pub fn with_environment(environment: Environment) -> Self {
        let global = environment.root();
        Self {
            environment,
            global,
            config: InterpreterConfig::default(),
            depth: 0,
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global
    }

    /// Parse and evaluate `source` against the global scope.
    pub fn run(&mut self, source: &str) -> Result<Value, CrustError> {
        let program = parser::parse(source)?;
        self.evaluate(&program)
    }

    /// Evaluate a program in the global scope; its value is that of the last
    /// statement, or of a top-level `return`.
    pub fn evaluate(&mut self, program: &Program) -> Result<Value, CrustError> {
        let value = match self.execute_statements(&program.body, self.global)? {
            ControlFlow::Normal(value) | ControlFlow::Return(value) => value,
            ControlFlow::Break(span) => return Err(Self::stray_signal("break", span)),
            ControlFlow::Continue(span) => return Err(Self::stray_signal("continue", span)),
        };

        tracing::debug!(result = value.type_name(), "program finished");
        Ok(value)
    }

    /// Call a function value from host code, as if from the global scope.
    pub fn call_value(&mut self, callee: &Value, arguments: &[Value]) -> Result<Value, CrustError> {
        self.call(callee, arguments, self.global)
    }

    fn stray_signal(keyword: &str, span: Span) -> CrustError {
        CrustError::runtime_error(format!("'{}' used outside of a loop", keyword))
            .with_help(format!("'{}' only works inside 'while' and 'for' bodies.", keyword))
            .at(span)
    }

    fn execute_statements(&mut self, statements: &[Stmt], scope: ScopeId) -> Result<ControlFlow, CrustError> {
        let mut last = Value::Null;

        for statement in statements {
            match self.execute(statement, scope)? {
                ControlFlow::Normal(value) => last = value,
                signal => return Ok(signal),
            }
        }

        Ok(ControlFlow::Normal(last))
    }

    /// Run `statements` in a fresh child scope of `parent`.
    fn execute_block(&mut self, statements: &[Stmt], parent: ScopeId) -> Result<ControlFlow, CrustError> {
        let scope = self.environment.push_scope(parent);
        let result = self.execute_statements(statements, scope);
        self.environment.pop_scope(scope);
        result
    }

    fn execute(&mut self, stmt: &Stmt, scope: ScopeId) -> Result<ControlFlow, CrustError> {
        ensure_sufficient_stack(|| self.execute_statement(stmt, scope))
    }

    fn execute_statement(&mut self, stmt: &Stmt, scope: ScopeId) -> Result<ControlFlow, CrustError> {
        match stmt {
            Stmt::Expression { expr, .. } => Ok(ControlFlow::Normal(self.evaluate_expression(expr, scope)?)),
            Stmt::VariableDeclaration {
                name,
                constant,
                value,
                span,
            } => {
                let value = match value {
                    Some(expr) => self.evaluate_expression(expr, scope)?,
                    None => Value::Null,
                };
                self.environment
                    .declare(scope, name, value, *constant)
                    .map_err(|error| error.at(*span))?;
                Ok(ControlFlow::Normal(Value::Null))
            }
            Stmt::FunctionDeclaration(declaration) => {
                let function = Value::Function(Rc::new(Function {
                    declaration: Rc::clone(declaration),
                    closure: self.environment.capture(scope),
                }));
                self.environment
                    .declare(scope, &declaration.name, function, true)
                    .map_err(|error| error.at(declaration.span))?;
                Ok(ControlFlow::Normal(Value::Null))
            }
            Stmt::Block { statements, .. } => self.execute_block(statements, scope),
            Stmt::If {
                condition,
                consequent,
                alternate,
                ..
            } => {
                if self.condition(condition, scope, "if statement")? {
                    self.execute_block(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.execute_block(alternate, scope)
                } else {
                    Ok(ControlFlow::Normal(Value::Null))
                }
            }
            Stmt::While { condition, body, .. } => {
                let mut last = Value::Null;

                while self.condition(condition, scope, "while loop")? {
                    match self.execute_block(body, scope)? {
                        ControlFlow::Normal(value) => last = value,
                        ControlFlow::Break(_) => break,
                        ControlFlow::Continue(_) => continue,
                        ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                    }
                }

                Ok(ControlFlow::Normal(last))
            }
            Stmt::For {
                variable,
                collection,
                body,
                span,
            } => {
                let items = self.iteration_items(collection, scope)?;

                let loop_scope = self.environment.push_scope(scope);
                let result = self.execute_for(variable, items, body, loop_scope);
                self.environment.pop_scope(loop_scope);
                result.map_err(|error| error.at(*span))
            }
            Stmt::Break { span } => Ok(ControlFlow::Break(*span)),
            Stmt::Continue { span } => Ok(ControlFlow::Continue(*span)),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expression(expr, scope)?,
                    None => Value::Null,
                };
                Ok(ControlFlow::Return(value))
            }
            Stmt::TryCatch {
                try_block,
                error_name,
                catch_block,
                ..
            } => match self.execute_block(try_block, scope) {
                Ok(flow) => Ok(flow),
                Err(error) => {
                    tracing::debug!(kind = %error.kind, message = %error.message, "caught error");

                    let catch_scope = self.environment.push_scope(scope);
                    let result = match error_name {
                        Some(name) => {
                            let caught = Value::Error(Rc::new(ErrorValue::from(&error)));
                            self.environment
                                .declare(catch_scope, name, caught, true)
                                .and_then(|_| self.execute_statements(catch_block, catch_scope))
                        }
                        None => self.execute_statements(catch_block, catch_scope),
                    };
                    self.environment.pop_scope(catch_scope);
                    result
                }
            },
        }
    }

    fn condition(&mut self, condition: &Expr, scope: ScopeId, construct: &str) -> Result<bool, CrustError> {
        match self.evaluate_expression(condition, scope)? {
            Value::Boolean(value) => Ok(value),
            other => Err(CrustError::runtime_error(format!(
                "The condition of the {} must be a boolean but got [ {} ]",
                construct,
                other.type_name()
            ))
            .with_help("Compare explicitly, for example 'x != 0' or 'len(s) > 0'.")
            .at(condition.span())),
        }
    }

    /// Elements a `for` loop visits: array elements, one-character strings, or
    /// object keys. Strings and objects are walked as they were when the loop began.
    fn iteration_items(&mut self, collection: &Expr, scope: ScopeId) -> Result<Iteration, CrustError> {
        match self.evaluate_expression(collection, scope)? {
            Value::Array(elements) => Ok(Iteration::Live(elements)),
            Value::String(text) => Ok(Iteration::Snapshot(
                text.chars().map(|c| Value::String(c.to_string())).collect(),
            )),
            Value::Object(properties) => Ok(Iteration::Snapshot(
                properties
                    .borrow()
                    .keys()
                    .map(|key| Value::String(key.clone()))
                    .collect(),
            )),
            other => Err(CrustError::runtime_error(format!(
                "The collection of the for loop must be an array, a string or an object but got [ {} ]",
                other.type_name()
            ))
            .at(collection.span())),
        }
    }

    fn execute_for(
        &mut self,
        variable: &str,
        items: Iteration,
        body: &[Stmt],
        loop_scope: ScopeId,
    ) -> Result<ControlFlow, CrustError> {
        self.environment.declare(loop_scope, variable, Value::Null, false)?;
        let mut last = Value::Null;
        let mut index = 0;

        while let Some(item) = items.get(index) {
            index += 1;
            self.environment.assign(loop_scope, variable, item)?;
            match self.execute_block(body, loop_scope)? {
                ControlFlow::Normal(value) => last = value,
                ControlFlow::Break(_) => break,
                ControlFlow::Continue(_) => continue,
                ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
            }
        }

        Ok(ControlFlow::Normal(last))
    }

    pub fn evaluate_expression(&mut self, expr: &Expr, scope: ScopeId) -> Result<Value, CrustError> {
        ensure_sufficient_stack(|| self.evaluate_node(expr, scope))
    }

    fn evaluate_node(&mut self, expr: &Expr, scope: ScopeId) -> Result<Value, CrustError> {
        match expr {
            Expr::NumericLiteral { value, .. } => Ok(Value::Number(*value)),
            Expr::StringLiteral { value, .. } => Ok(Value::String(value.clone())),
            Expr::Identifier { name, span } => self
                .environment
                .get(scope, name)
                .map_err(|error| error.at(*span)),
            Expr::ArrayLiteral { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate_expression(element, scope)?);
                }
                Ok(Value::array(values))
            }
            Expr::ObjectLiteral { properties, .. } => {
                let mut values = BTreeMap::new();
                for property in properties {
                    let value = match &property.value {
                        Some(expr) => self.evaluate_expression(expr, scope)?,
                        None => self
                            .environment
                            .get(scope, &property.key)
                            .map_err(|error| error.at(property.span))?,
                    };
                    values.insert(property.key.clone(), value);
                }
                Ok(Value::object(values))
            }
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left = self.evaluate_expression(left, scope)?;
                let right = self.evaluate_expression(right, scope)?;
                binary_operation(*operator, left, right).map_err(|error| error.at(*span))
            }
            Expr::Unary {
                operator,
                operand,
                span,
            } => {
                let operand = self.evaluate_expression(operand, scope)?;
                unary_operation(*operator, operand).map_err(|error| error.at(*span))
            }
            Expr::Member {
                object,
                property,
                computed,
                span,
            } => self
                .evaluate_member(object, property, *computed, scope)
                .map_err(|error| error.at(*span)),
            Expr::Call {
                callee,
                arguments,
                span,
            } => {
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate_expression(argument, scope)?);
                }
                let callee = self.evaluate_expression(callee, scope)?;
                self.call(&callee, &values, scope).map_err(|error| error.at(*span))
            }
            Expr::Assignment { target, value, span } => {
                let value = self.evaluate_expression(value, scope)?;
                let place = self.resolve_place(target, scope)?;
                self.write_place(place, value.clone(), scope)
                    .map_err(|error| error.at(*span))?;
                Ok(value)
            }
            Expr::CompoundAssignment {
                target,
                operator,
                value,
                span,
            } => {
                let place = self.resolve_place(target, scope)?;
                let current = self.read_place(&place, scope).map_err(|error| error.at(target.span()))?;
                let right = self.evaluate_expression(value, scope)?;
                let result = binary_operation(*operator, current, right).map_err(|error| error.at(*span))?;
                self.write_place(place, result.clone(), scope)
                    .map_err(|error| error.at(*span))?;
                Ok(result)
            }
        }
    }

    /// The key of a member expression: the evaluated index for `a[k]`, or the
    /// identifier's name as a string for `a.k`.
    fn member_key(&mut self, property: &Expr, computed: bool, scope: ScopeId) -> Result<Value, CrustError> {
        if computed {
            return self.evaluate_expression(property, scope);
        }
        match property {
            Expr::Identifier { name, .. } => Ok(Value::String(name.clone())),
            other => Err(CrustError::runtime_error(
                "Member expression must be an identifier",
            )
            .at(other.span())),
        }
    }

    fn evaluate_member(
        &mut self,
        object: &Expr,
        property: &Expr,
        computed: bool,
        scope: ScopeId,
    ) -> Result<Value, CrustError> {
        let target = self.evaluate_expression(object, scope)?;
        let key = self.member_key(property, computed, scope)?;

        match target {
            Value::Object(properties) => {
                let key = object_key(&key)?;
                Ok(properties.borrow().get(&key).cloned().unwrap_or(Value::Null))
            }
            Value::Array(elements) => {
                if !computed {
                    return Err(array_dot_access(&key));
                }
                let elements = elements.borrow();
                let index = array_index(&key, elements.len())?;
                Ok(elements[index].clone())
            }
            Value::Error(error) => match key.as_str() {
                Some("kind") => Ok(Value::String(error.kind.name().to_string())),
                Some("message") => Ok(Value::String(error.message.clone())),
                _ => Ok(Value::Null),
            },
            other => Err(CrustError::runtime_error(format!(
                "The member expression is not supported for [ {} ]",
                other.type_name()
            ))),
        }
    }

    fn resolve_place(&mut self, target: &Expr, scope: ScopeId) -> Result<Place, CrustError> {
        match target {
            Expr::Identifier { name, .. } => Ok(Place::Variable(name.clone())),
            Expr::Member {
                object,
                property,
                computed,
                span,
            } => {
                let container = self.evaluate_expression(object, scope)?;
                let key = self.member_key(property, *computed, scope)?;

                let place = match container {
                    Value::Object(properties) => object_key(&key).map(|key| Place::Property(properties, key)),
                    Value::Array(elements) if *computed => {
                        let len = elements.borrow().len();
                        array_index(&key, len).map(|index| Place::Index(elements, index))
                    }
                    Value::Array(_) => Err(array_dot_access(&key)),
                    other => Err(CrustError::runtime_error(format!(
                        "Cannot assign to a member of [ {} ]",
                        other.type_name()
                    ))),
                };
                place.map_err(|error| error.at(*span))
            }
            other => Err(CrustError::runtime_error("Invalid assignment target").at(other.span())),
        }
    }

    fn read_place(&self, place: &Place, scope: ScopeId) -> Result<Value, CrustError> {
        match place {
            Place::Variable(name) => self.environment.get(scope, name),
            Place::Property(properties, key) => {
                Ok(properties.borrow().get(key).cloned().unwrap_or(Value::Null))
            }
            Place::Index(elements, index) => {
                let elements = elements.borrow();
                elements
                    .get(*index)
                    .cloned()
                    .ok_or_else(|| out_of_bounds(*index as f64, elements.len()))
            }
        }
    }

    fn write_place(&mut self, place: Place, value: Value, scope: ScopeId) -> Result<(), CrustError> {
        match place {
            Place::Variable(name) => {
                self.environment.assign(scope, &name, value)?;
            }
            Place::Property(properties, key) => {
                properties.borrow_mut().insert(key, value);
            }
            Place::Index(elements, index) => {
                let mut elements = elements.borrow_mut();
                let len = elements.len();
                match elements.get_mut(index) {
                    Some(slot) => *slot = value,
                    None => return Err(out_of_bounds(index as f64, len)),
                }
            }
        }
        Ok(())
    }

    fn call(&mut self, callee: &Value, arguments: &[Value], scope: ScopeId) -> Result<Value, CrustError> {
        match callee {
            Value::NativeFunction(native) => {
                tracing::trace!(function = %native.name, "calling native function");
                native.call(arguments, &mut self.environment, scope)
            }
            Value::Function(function) => self.call_function(Rc::clone(function), arguments),
            other => Err(CrustError::runtime_error(format!(
                "Call expression is not supported for [ {} ]",
                other.type_name()
            ))
            .with_help("Only functions declared with 'fn' and built-in functions can be called.")),
        }
    }

    /// Parameters are bound positionally in a child of the function's closure
    /// scope. Missing arguments are `null`; extra arguments are ignored.
    #[tracing::instrument(level = "trace", skip_all, fields(function = %function.name()))]
    fn call_function(&mut self, function: Rc<Function>, arguments: &[Value]) -> Result<Value, CrustError> {
        if self.depth >= self.config.max_call_depth {
            return Err(CrustError::runtime_error(format!(
                "Maximum call depth of {} exceeded in '{}'",
                self.config.max_call_depth,
                function.name()
            ))
            .with_help("Check for recursion without a base case."));
        }

        self.depth += 1;
        let scope = self.environment.push_scope(function.scope());
        let result = self.execute_function_body(&function, arguments, scope);
        self.environment.pop_scope(scope);
        self.depth -= 1;

        match result? {
            ControlFlow::Normal(value) | ControlFlow::Return(value) => Ok(value),
            ControlFlow::Break(span) => Err(Self::stray_signal("break", span)),
            ControlFlow::Continue(span) => Err(Self::stray_signal("continue", span)),
        }
    }

    fn execute_function_body(
        &mut self,
        function: &Function,
        arguments: &[Value],
        scope: ScopeId,
    ) -> Result<ControlFlow, CrustError> {
        for (index, parameter) in function.parameters().iter().enumerate() {
            let argument = arguments.get(index).cloned().unwrap_or(Value::Null);
            self.environment.declare(scope, parameter, argument, false)?;
        }
        self.execute_statements(function.body(), scope)
    }
}

fn object_key(key: &Value) -> Result<String, CrustError> {
    match key {
        Value::String(key) => Ok(key.clone()),
        other => Err(CrustError::runtime_error(format!(
            "You can only access object properties using strings but got [ {} ]",
            other.type_name()
        ))),
    }
}

fn array_dot_access(key: &Value) -> CrustError {
    CrustError::runtime_error(format!("Arrays have no property '{}'", key))
        .with_help("Array elements are accessed by index: items[0]. Use len(items) for the length.")
}

fn out_of_bounds(index: f64, len: usize) -> CrustError {
    CrustError::index_out_of_bounds(format!(
        "Index {} is out of bounds for an array of length {}",
        index, len
    ))
}

/// Validates `key` as an index into an array of `len` elements.
fn array_index(key: &Value, len: usize) -> Result<usize, CrustError> {
    match key {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n < len as f64 => Ok(*n as usize),
        Value::Number(n) => Err(out_of_bounds(*n, len)),
        other => Err(CrustError::runtime_error(format!(
            "You can only access array elements using numbers but got [ {} ]",
            other.type_name()
        ))),
    }
}

/// Operand-type directed dispatch. Combinations without a rule evaluate to `null`.
pub fn binary_operation(operator: BinaryOp, left: Value, right: Value) -> Result<Value, CrustError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => numeric_binary(operator, l, r),
        (Value::String(l), Value::String(r)) => string_binary(operator, &l, &r),
        (Value::Boolean(l), Value::Boolean(r)) => boolean_binary(operator, l, r),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            string_number_binary(operator, &s, n)
        }
        (Value::Error(e), Value::String(s)) | (Value::String(s), Value::Error(e)) => {
            error_string_binary(operator, &e, &s)
        }
        _ => Ok(Value::Null),
    }
}

fn unsupported(operator: BinaryOp, operands: &str) -> CrustError {
    CrustError::runtime_error(format!(
        "The operator [ {} ] is not supported for {} binary expressions",
        operator.symbol(),
        operands
    ))
}

fn numeric_binary(operator: BinaryOp, l: f64, r: f64) -> Result<Value, CrustError> {
    let value = match operator {
        BinaryOp::Add => Value::Number(l + r),
        BinaryOp::Subtract => Value::Number(l - r),
        BinaryOp::Multiply => Value::Number(l * r),
        BinaryOp::Divide | BinaryOp::Modulo | BinaryOp::FloorDivide if r == 0.0 => {
            return Err(CrustError::division_by_zero());
        }
        BinaryOp::Divide => Value::Number(l / r),
        BinaryOp::Modulo => Value::Number(l % r),
        BinaryOp::FloorDivide => Value::Number((l / r).floor()),
        BinaryOp::Power => Value::Number(l.powf(r)),
        BinaryOp::Equal => Value::Boolean(l == r),
        BinaryOp::NotEqual => Value::Boolean(l != r),
        BinaryOp::Less => Value::Boolean(l < r),
        BinaryOp::LessEqual => Value::Boolean(l <= r),
        BinaryOp::Greater => Value::Boolean(l > r),
        BinaryOp::GreaterEqual => Value::Boolean(l >= r),
        BinaryOp::And | BinaryOp::Or => return Err(unsupported(operator, "number and number")),
    };
    Ok(value)
}

fn string_binary(operator: BinaryOp, l: &str, r: &str) -> Result<Value, CrustError> {
    let value = match operator {
        BinaryOp::Add => Value::String(format!("{}{}", l, r)),
        BinaryOp::Equal => Value::Boolean(l == r),
        BinaryOp::NotEqual => Value::Boolean(l != r),
        BinaryOp::Less => Value::Boolean(l < r),
        BinaryOp::LessEqual => Value::Boolean(l <= r),
        BinaryOp::Greater => Value::Boolean(l > r),
        BinaryOp::GreaterEqual => Value::Boolean(l >= r),
        _ => return Err(unsupported(operator, "string and string")),
    };
    Ok(value)
}

fn boolean_binary(operator: BinaryOp, l: bool, r: bool) -> Result<Value, CrustError> {
    let value = match operator {
        BinaryOp::Equal => l == r,
        BinaryOp::NotEqual => l != r,
        BinaryOp::And => l && r,
        BinaryOp::Or => l || r,
        _ => return Err(unsupported(operator, "boolean and boolean")),
    };
    Ok(Value::Boolean(value))
}

/// `*` repeats the string; the count is floored and must not be negative, and
/// the result may not grow past `MAX_STRING_LENGTH` bytes.
fn string_number_binary(operator: BinaryOp, text: &str, count: f64) -> Result<Value, CrustError> {
    if operator != BinaryOp::Multiply {
        return Err(unsupported(operator, "string and number"));
    }
    if !count.is_finite() || count < 0.0 {
        return Err(CrustError::runtime_error(format!(
            "Cannot repeat a string {} times",
            format_number(count)
        )));
    }

    let times = count.floor() as usize;
    match text.len().checked_mul(times) {
        Some(length) if length <= MAX_STRING_LENGTH => Ok(Value::String(text.repeat(times))),
        _ => Err(CrustError::runtime_error(format!(
            "Repeating a string {} times exceeds the maximum string length of {} bytes",
            format_number(count),
            MAX_STRING_LENGTH
        ))),
    }
}

/// Lets a handler test `e == "TypeError"`.
fn error_string_binary(operator: BinaryOp, error: &ErrorValue, kind: &str) -> Result<Value, CrustError> {
    match operator {
        BinaryOp::Equal => Ok(Value::Boolean(error.kind.name() == kind)),
        BinaryOp::NotEqual => Ok(Value::Boolean(error.kind.name() != kind)),
        _ => Err(unsupported(operator, "error and string")),
    }
}

/// `!` yields whether a number or string is non-empty/non-zero (so `!0` and
/// `!''` are `false`); `+` is absolute value.
pub fn unary_operation(operator: UnaryOp, operand: Value) -> Result<Value, CrustError> {
    match (operator, operand) {
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOp::Not, Value::String(s)) => Ok(Value::Boolean(!s.is_empty())),
        (UnaryOp::Not, Value::Number(n)) => Ok(Value::Boolean(n != 0.0)),
        (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Absolute, Value::Number(n)) => Ok(Value::Number(n.abs())),
        (operator, other) => Err(CrustError::runtime_error(format!(
            "The operator [ {} ] is not supported for unary expressions with [ {} ]",
            operator.symbol(),
            other.type_name()
        ))),
    }
}
