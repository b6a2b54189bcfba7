use crate::ast::{FunctionDeclaration, Stmt};
use crate::environment::{CapturedScope, Environment, ScopeId};
use crate::error::{CrustError, ErrorKind};
use crate::stack::ensure_sufficient_stack;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type ObjectRef = Rc<RefCell<BTreeMap<String, Value>>>;
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Host callback behind a native function: evaluated arguments plus the calling scope.
pub type NativeCallback =
    dyn Fn(&[Value], &mut Environment, ScopeId) -> Result<Value, CrustError>;

/// Objects and arrays are shared references: assigning one to another binding aliases it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Boolean(bool),
    String(String),
    Object(ObjectRef),
    Array(ArrayRef),
    Function(Rc<Function>),
    NativeFunction(NativeFunction),
    Error(Rc<ErrorValue>),
}

/// A user function closed over the scope it was declared in.
#[derive(Debug)]
pub struct Function {
    pub declaration: Rc<FunctionDeclaration>,
    pub closure: Rc<CapturedScope>,
}

impl Function {
    pub fn scope(&self) -> ScopeId {
        self.closure.scope()
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn parameters(&self) -> &[String] {
        &self.declaration.parameters
    }

    pub fn body(&self) -> &[Stmt] {
        &self.declaration.body
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration) && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: Rc<str>,
    callback: Rc<NativeCallback>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&[Value], &mut Environment, ScopeId) -> Result<Value, CrustError> + 'static,
    {
        Self {
            name: Rc::from(name),
            callback: Rc::new(callback),
        }
    }

    pub fn call(
        &self,
        arguments: &[Value],
        environment: &mut Environment,
        scope: ScopeId,
    ) -> Result<Value, CrustError> {
        (self.callback)(arguments, environment, scope)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

/// What a `catch (e)` clause binds.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CrustError> for ErrorValue {
    fn from(error: &CrustError) -> Self {
        Self {
            kind: error.kind.clone(),
            message: error.message.clone(),
        }
    }
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn object(properties: BTreeMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(properties)))
    }

    pub fn native<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&[Value], &mut Environment, ScopeId) -> Result<Value, CrustError> + 'static,
    {
        Value::NativeFunction(NativeFunction::new(name, callback))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
            Value::NativeFunction(_) => "native-function",
            Value::Error(_) => "error",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// `Display` with the arrays and objects currently being written in `open`, so
    /// a container that holds itself prints as `[...]` or `{...}`. Elements of
    /// containers quote their strings.
    fn write(&self, f: &mut fmt::Formatter, open: &mut Vec<*const ()>, nested: bool) -> fmt::Result {
        match self {
            Value::String(s) if nested => write!(f, "{:?}", s),
            Value::Array(elements) => {
                let address = Rc::as_ptr(elements) as *const ();
                if open.contains(&address) {
                    return write!(f, "[...]");
                }
                open.push(address);
                write!(f, "[")?;
                for (i, item) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    ensure_sufficient_stack(|| item.write(f, open, true))?;
                }
                open.pop();
                write!(f, "]")
            }
            Value::Object(properties) => {
                let address = Rc::as_ptr(properties) as *const ();
                if open.contains(&address) {
                    return write!(f, "{{...}}");
                }
                let properties = properties.borrow();
                if properties.is_empty() {
                    return write!(f, "{{}}");
                }
                open.push(address);
                write!(f, "{{")?;
                for (i, (key, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: ", key)?;
                    ensure_sufficient_stack(|| value.write(f, open, true))?;
                }
                open.pop();
                write!(f, " }}")
            }
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Function(function) => write!(f, "function<{}>", function.name()),
            Value::NativeFunction(native) => write!(f, "native-function<{}>", native.name),
            Value::Error(error) => write!(f, "error({})<{}>", error.kind, error.message),
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write(f, &mut Vec::new(), false)
    }
}
