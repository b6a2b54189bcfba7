use crate::error::Span;
use std::rc::Rc;

/// Root of the tree: statements in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression {
        expr: Expr,
        span: Span,
    },
    /// `set name = value` or `keep name = value`.
    VariableDeclaration {
        name: String,
        constant: bool,
        value: Option<Expr>,
        span: Span,
    },
    FunctionDeclaration(Rc<FunctionDeclaration>),
    Block {
        statements: Vec<Stmt>,
        span: Span,
    },
    /// `elif` is an `If` that is the only statement of `alternate`.
    If {
        condition: Expr,
        consequent: Vec<Stmt>,
        alternate: Option<Vec<Stmt>>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    /// `for variable in collection { body }`
    For {
        variable: String,
        collection: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    TryCatch {
        try_block: Vec<Stmt>,
        error_name: Option<String>,
        catch_block: Vec<Stmt>,
        span: Span,
    },
}

/// Shared with every function value created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expression { span, .. } => *span,
            Stmt::VariableDeclaration { span, .. } => *span,
            Stmt::FunctionDeclaration(declaration) => declaration.span,
            Stmt::Block { span, .. } => *span,
            Stmt::If { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::For { span, .. } => *span,
            Stmt::Break { span } => *span,
            Stmt::Continue { span } => *span,
            Stmt::Return { span, .. } => *span,
            Stmt::TryCatch { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `target = value`; the target is an `Identifier` or `Member`.
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    /// `target op= value`, evaluated as `target = target op value`.
    CompoundAssignment {
        target: Box<Expr>,
        operator: BinaryOp,
        value: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    /// `object.property` (`computed == false`, property is an `Identifier`)
    /// or `object[property]`.
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        span: Span,
    },
    ObjectLiteral {
        properties: Vec<Property>,
        span: Span,
    },
    ArrayLiteral {
        elements: Vec<Expr>,
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    NumericLiteral {
        value: f64,
        span: Span,
    },
    StringLiteral {
        value: String,
        span: Span,
    },
}

/// Object literal entry. `value == None` is the shorthand `{ key }`, which reads
/// the variable `key` from the current scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub value: Option<Expr>,
    pub span: Span,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Assignment { span, .. } => *span,
            Expr::CompoundAssignment { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Member { span, .. } => *span,
            Expr::Call { span, .. } => *span,
            Expr::ObjectLiteral { span, .. } => *span,
            Expr::ArrayLiteral { span, .. } => *span,
            Expr::Identifier { span, .. } => *span,
            Expr::NumericLiteral { span, .. } => *span,
            Expr::StringLiteral { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    FloorDivide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::FloorDivide => "//",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Negate,
    /// `+`, absolute value
    Absolute,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Absolute => "+",
        }
    }
}
