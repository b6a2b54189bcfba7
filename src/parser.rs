use crate::ast::{BinaryOp, Expr, FunctionDeclaration, Program, Property, Stmt, UnaryOp};
use crate::error::{CrustError, Span};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::stack::ensure_sufficient_stack;
use std::rc::Rc;

/// Tokenize and parse a whole program. Either the full tree or the first error.
pub fn parse(source: &str) -> Result<Program, CrustError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> Result<Program, CrustError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.statement()?);
        }

        tracing::debug!(statements = body.len(), "parsed program");
        Ok(Program { body })
    }

    fn statement(&mut self) -> Result<Stmt, CrustError> {
        ensure_sufficient_stack(|| self.statement_by_keyword())
    }

    fn statement_by_keyword(&mut self) -> Result<Stmt, CrustError> {
        match self.peek().kind {
            TokenKind::LeftBrace => {
                let start = self.advance().span;
                let statements = self.block()?;
                Ok(Stmt::Block {
                    statements,
                    span: start.to(self.previous().span),
                })
            }
            TokenKind::Fn => self.function_declaration(),
            TokenKind::Set | TokenKind::Keep => self.variable_declaration(),
            TokenKind::If => {
                self.advance();
                self.if_statement()
            }
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Break => Ok(Stmt::Break {
                span: self.advance().span,
            }),
            TokenKind::Continue => Ok(Stmt::Continue {
                span: self.advance().span,
            }),
            TokenKind::Return => self.return_statement(),
            TokenKind::Try => self.try_statement(),
            _ => self.expression_statement(),
        }
    }

    /// Statements up to the closing `}`; the opening brace is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt>, CrustError> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume_with_help(
            TokenKind::RightBrace,
            "Expected '}' after block",
            "Block statements must be closed with '}' after the opening '{'.",
        )?;
        Ok(statements)
    }

    fn braced_block(&mut self, after: &str) -> Result<Vec<Stmt>, CrustError> {
        self.consume_with_help(
            TokenKind::LeftBrace,
            &format!("Expected '{{' after {}", after),
            "Bodies are always wrapped in braces: { ... }",
        )?;
        self.block()
    }

    fn function_declaration(&mut self) -> Result<Stmt, CrustError> {
        let start = self.advance().span;
        let name = self
            .consume(TokenKind::Identifier, "Expected function name after 'fn'")?
            .text
            .clone();

        self.consume_with_help(
            TokenKind::LeftParen,
            "Expected '(' after function name",
            "Function declarations look like: fn name(a, b) { ... }",
        )?;
        let mut parameters = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let parameter =
                    self.consume(TokenKind::Identifier, "Expected parameter name")?;
                parameters.push(parameter.text.clone());
                if !self.match_kinds(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;

        let body = self.braced_block("function parameters")?;
        Ok(Stmt::FunctionDeclaration(Rc::new(FunctionDeclaration {
            name,
            parameters,
            body,
            span: start.to(self.previous().span),
        })))
    }

    fn variable_declaration(&mut self) -> Result<Stmt, CrustError> {
        let keyword = self.advance().clone();
        let constant = keyword.kind == TokenKind::Keep;
        let name = self
            .consume_with_help(
                TokenKind::Identifier,
                &format!("Expected variable name after '{}'", keyword.text),
                "Declarations look like: set name = value",
            )?
            .text
            .clone();

        let value = if self.match_kinds(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else if constant {
            return Err(CrustError::parse_error(
                self.previous().span,
                format!("Constant '{}' must be initialized", name),
            )
            .with_help("Use 'keep name = value', or 'set' for a variable without a value."));
        } else {
            None
        };

        Ok(Stmt::VariableDeclaration {
            name,
            constant,
            value,
            span: keyword.span.to(self.previous().span),
        })
    }

    /// The `if` or `elif` keyword is already consumed.
    fn if_statement(&mut self) -> Result<Stmt, CrustError> {
        let start = self.previous().span;
        let condition = self.expression()?;
        let consequent = self.braced_block("if condition")?;

        let alternate = if self.match_kinds(&[TokenKind::Elif]) {
            Some(vec![self.if_statement()?])
        } else if self.match_kinds(&[TokenKind::Else]) {
            Some(self.braced_block("'else'")?)
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            consequent,
            alternate,
            span: start.to(self.previous().span),
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, CrustError> {
        let start = self.advance().span;
        let condition = self.expression()?;
        let body = self.braced_block("while condition")?;

        Ok(Stmt::While {
            condition,
            body,
            span: start.to(self.previous().span),
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, CrustError> {
        let start = self.advance().span;
        let variable = self
            .consume_with_help(
                TokenKind::Identifier,
                "Expected loop variable after 'for'",
                "For loops look like: for item in collection { ... }",
            )?
            .text
            .clone();
        self.consume_with_help(
            TokenKind::In,
            "Expected 'in' after loop variable",
            "For loops look like: for item in collection { ... }",
        )?;
        let collection = self.expression()?;
        let body = self.braced_block("for collection")?;

        Ok(Stmt::For {
            variable,
            collection,
            body,
            span: start.to(self.previous().span),
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, CrustError> {
        let start = self.advance().span;
        let value = if self.is_at_end()
            || matches!(
                self.peek().kind,
                TokenKind::RightBrace
                    | TokenKind::Set
                    | TokenKind::Keep
                    | TokenKind::Fn
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::For
                    | TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::Return
                    | TokenKind::Try
            ) {
            None
        } else {
            Some(self.expression()?)
        };

        Ok(Stmt::Return {
            value,
            span: start.to(self.previous().span),
        })
    }

    fn try_statement(&mut self) -> Result<Stmt, CrustError> {
        let start = self.advance().span;
        let try_block = self.braced_block("'try'")?;

        self.consume_with_help(
            TokenKind::Catch,
            "Expected 'catch' after try block",
            "Every try block needs a handler: try { ... } catch (e) { ... }",
        )?;
        let error_name = if self.match_kinds(&[TokenKind::LeftParen]) {
            let name = self
                .consume(TokenKind::Identifier, "Expected error name in catch clause")?
                .text
                .clone();
            self.consume(TokenKind::RightParen, "Expected ')' after error name")?;
            Some(name)
        } else {
            None
        };
        let catch_block = self.braced_block("'catch'")?;

        Ok(Stmt::TryCatch {
            try_block,
            error_name,
            catch_block,
            span: start.to(self.previous().span),
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt, CrustError> {
        let expr = self.expression()?;
        let span = expr.span();
        Ok(Stmt::Expression { expr, span })
    }

    pub fn expression(&mut self) -> Result<Expr, CrustError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, CrustError> {
        let target = self.object_literal()?;

        if self.match_kinds(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.right_operand(&equals, Self::assignment)?;
            Self::check_target(&target, &equals)?;
            let span = target.span().to(value.span());
            return Ok(Expr::Assignment {
                target: Box::new(target),
                value: Box::new(value),
                span,
            });
        }

        if self.match_kinds(&[
            TokenKind::PlusEqual,
            TokenKind::MinusEqual,
            TokenKind::StarEqual,
            TokenKind::SlashEqual,
            TokenKind::PercentEqual,
            TokenKind::StarStarEqual,
            TokenKind::SlashSlashEqual,
        ]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.kind {
                TokenKind::PlusEqual => BinaryOp::Add,
                TokenKind::MinusEqual => BinaryOp::Subtract,
                TokenKind::StarEqual => BinaryOp::Multiply,
                TokenKind::SlashEqual => BinaryOp::Divide,
                TokenKind::PercentEqual => BinaryOp::Modulo,
                TokenKind::StarStarEqual => BinaryOp::Power,
                TokenKind::SlashSlashEqual => BinaryOp::FloorDivide,
                _ => unreachable!(),
            };
            let value = self.right_operand(&operator_token, Self::assignment)?;
            Self::check_target(&target, &operator_token)?;
            let span = target.span().to(value.span());
            return Ok(Expr::CompoundAssignment {
                target: Box::new(target),
                operator,
                value: Box::new(value),
                span,
            });
        }

        Ok(target)
    }

    fn check_target(target: &Expr, operator: &Token) -> Result<(), CrustError> {
        match target {
            Expr::Identifier { .. } | Expr::Member { .. } => Ok(()),
            _ => Err(CrustError::parse_error(
                target.span().to(operator.span),
                "Invalid assignment target",
            )
            .with_help("Only variables, properties and indexes can be assigned to. Examples: 'x = 1', 'obj.a = 1', 'arr[0] = 1'")),
        }
    }

    fn object_literal(&mut self) -> Result<Expr, CrustError> {
        if !self.check(TokenKind::LeftBrace) {
            return self.logical();
        }

        let start = self.advance().span;
        let mut properties = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let key_token = self.advance().clone();
            if !matches!(key_token.kind, TokenKind::Identifier | TokenKind::String) {
                return Err(CrustError::parse_error(
                    key_token.span,
                    format!("Expected property name, found {}", Self::describe(&key_token)),
                )
                .with_help("Object literals look like: { key: value, other }"));
            }

            let value = if self.match_kinds(&[TokenKind::Colon]) {
                Some(self.expression()?)
            } else if key_token.kind == TokenKind::Identifier {
                None
            } else {
                return Err(CrustError::parse_error(
                    self.peek().span,
                    "Expected ':' after string key",
                )
                .with_help("Only identifier keys can use the shorthand form { key }."));
            };
            properties.push(Property {
                key: key_token.text.clone(),
                span: key_token.span.to(self.previous().span),
                value,
            });

            if !self.check(TokenKind::RightBrace) {
                self.consume_with_help(
                    TokenKind::Comma,
                    "Expected ',' between object properties",
                    "Object literals look like: { key: value, other }",
                )?;
            }
        }

        let end = self.consume_with_help(
            TokenKind::RightBrace,
            "Expected '}' after object properties",
            "Object literals must be closed with '}'.",
        )?;
        Ok(Expr::ObjectLiteral {
            properties,
            span: start.to(end.span),
        })
    }

    fn logical(&mut self) -> Result<Expr, CrustError> {
        let mut expr = self.comparison()?;

        while self.match_kinds(&[TokenKind::AndAnd, TokenKind::OrOr]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.kind {
                TokenKind::AndAnd => BinaryOp::And,
                TokenKind::OrOr => BinaryOp::Or,
                _ => unreachable!(),
            };
            let right = self.right_operand(&operator_token, Self::comparison)?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    /// Comparisons do not chain: `a < b < c` is a parse error.
    fn comparison(&mut self) -> Result<Expr, CrustError> {
        let expr = self.additive()?;

        if self.match_kinds(&[
            TokenKind::EqualEqual,
            TokenKind::BangEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::BangEqual => BinaryOp::NotEqual,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => unreachable!(),
            };
            let right = self.right_operand(&operator_token, Self::additive)?;
            return Ok(Self::binary(expr, operator, right));
        }

        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expr, CrustError> {
        let mut expr = self.multiplicative()?;

        while self.match_kinds(&[TokenKind::Plus, TokenKind::Minus]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => unreachable!(),
            };
            let right = self.right_operand(&operator_token, Self::multiplicative)?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn multiplicative(&mut self) -> Result<Expr, CrustError> {
        let mut expr = self.unary()?;

        while self.match_kinds(&[
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::StarStar,
            TokenKind::SlashSlash,
        ]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                TokenKind::StarStar => BinaryOp::Power,
                TokenKind::SlashSlash => BinaryOp::FloorDivide,
                _ => unreachable!(),
            };
            let right = self.right_operand(&operator_token, Self::unary)?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    /// Prefix operators apply to the whole call/member chain: `-f(x)` is `-(f(x))`.
    fn unary(&mut self) -> Result<Expr, CrustError> {
        ensure_sufficient_stack(|| self.prefix())
    }

    fn prefix(&mut self) -> Result<Expr, CrustError> {
        if self.match_kinds(&[TokenKind::Bang, TokenKind::UnaryMinus, TokenKind::UnaryPlus]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.kind {
                TokenKind::Bang => UnaryOp::Not,
                TokenKind::UnaryMinus => UnaryOp::Negate,
                TokenKind::UnaryPlus => UnaryOp::Absolute,
                _ => unreachable!(),
            };
            let operand = self.right_operand(&operator_token, Self::unary)?;
            let span = operator_token.span.to(operand.span());
            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
                span,
            });
        }

        self.call_member()
    }

    fn call_member(&mut self) -> Result<Expr, CrustError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_kinds(&[TokenKind::Dot]) {
                let property = self
                    .consume_with_help(
                        TokenKind::Identifier,
                        "Expected property name after '.'",
                        "Use brackets for computed keys: obj[\"key\"]",
                    )?
                    .clone();
                let span = expr.span().to(property.span);
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(Expr::Identifier {
                        name: property.text,
                        span: property.span,
                    }),
                    computed: false,
                    span,
                };
            } else if self.match_kinds(&[TokenKind::LeftBracket]) {
                let property = self.expression()?;
                let end = self.consume_with_help(
                    TokenKind::RightBracket,
                    "Expected ']' after index",
                    "Index expressions look like: items[0] or obj[\"key\"]",
                )?;
                let span = expr.span().to(end.span);
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                    computed: true,
                    span,
                };
            } else if self.match_kinds(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, CrustError> {
        let mut arguments = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                if self.is_at_end() {
                    return Err(CrustError::parse_error(
                        self.peek().span,
                        "Unexpected end of input in function call",
                    )
                    .with_help("Function calls must be closed with ')' after the arguments. Example: func(arg1, arg2)"));
                }
                arguments.push(self.expression()?);
                if !self.match_kinds(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume_with_help(
            TokenKind::RightParen,
            "Expected ')' after arguments",
            "Function calls must be closed with ')' after the arguments. Example: func(arg1, arg2)",
        )?;
        let span = callee.span().to(paren.span);
        Ok(Expr::Call {
            callee: Box::new(callee),
            arguments,
            span,
        })
    }

    fn primary(&mut self) -> Result<Expr, CrustError> {
        if self.is_at_end() {
            return Err(CrustError::parse_error(
                self.peek().span,
                "Unexpected end of input",
            )
            .with_help("Expected an expression here. Check for unmatched parentheses, brackets, or incomplete statements."));
        }

        let token = self.advance().clone();

        match token.kind {
            TokenKind::Identifier => Ok(Expr::Identifier {
                name: token.text,
                span: token.span,
            }),
            TokenKind::Number => {
                let value = token.text.parse::<f64>().map_err(|_| {
                    CrustError::parse_error(token.span, format!("Invalid number '{}'", token.text))
                })?;
                Ok(Expr::NumericLiteral {
                    value,
                    span: token.span,
                })
            }
            TokenKind::String => Ok(Expr::StringLiteral {
                value: token.text,
                span: token.span,
            }),
            TokenKind::LeftParen => {
                if self.check(TokenKind::RightParen) {
                    return Err(CrustError::parse_error(
                        token.span.to(self.peek().span),
                        "Empty parentheses are not allowed",
                    )
                    .with_help("Parentheses must contain an expression. Use 'null' for a null value: (null)"));
                }

                let expr = self.expression()?;
                self.consume_with_help(
                    TokenKind::RightParen,
                    "Expected ')' after expression",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'.",
                )?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.array_literal(token.span),
            _ => {
                let help = match token.kind {
                    TokenKind::RightParen => "Found ')' without matching '('. Check for unbalanced parentheses.",
                    TokenKind::RightBrace => "Found '}' without matching '{'. Check for unbalanced braces.",
                    TokenKind::RightBracket => "Found ']' without matching '['. Check for unbalanced brackets.",
                    TokenKind::Else | TokenKind::Elif => "'else' and 'elif' must directly follow the closing '}' of an if block.",
                    TokenKind::Catch => "'catch' must directly follow a try block.",
                    _ => "Expected a literal value, variable, or parenthesized expression here.",
                };

                Err(CrustError::parse_error(
                    token.span,
                    format!("Expected expression, found {}", Self::describe(&token)),
                )
                .with_help(help))
            }
        }
    }

    fn array_literal(&mut self, start: Span) -> Result<Expr, CrustError> {
        let mut elements = Vec::new();

        if !self.check(TokenKind::RightBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.match_kinds(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        let end = self.consume_with_help(
            TokenKind::RightBracket,
            "Expected ']' after array elements",
            "Array literals must be closed with ']' after the opening '['. Example: [1, 2, 3]",
        )?;
        Ok(Expr::ArrayLiteral {
            elements,
            span: start.to(end.span),
        })
    }

    fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
        let span = left.span().to(right.span());
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span,
        }
    }

    /// Parse the operand that must follow `operator`, with a targeted message when
    /// there is none.
    fn right_operand(
        &mut self,
        operator: &Token,
        next: fn(&mut Self) -> Result<Expr, CrustError>,
    ) -> Result<Expr, CrustError> {
        if !self.starts_operand() {
            return Err(CrustError::parse_error(
                self.peek().span,
                format!(
                    "Expected expression after '{}', found {}",
                    operator.text,
                    Self::describe(self.peek())
                ),
            )
            .with_help("Operators require an expression on both sides."));
        }
        next(self)
    }

    fn starts_operand(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Identifier
                | TokenKind::Number
                | TokenKind::String
                | TokenKind::LeftParen
                | TokenKind::LeftBracket
                | TokenKind::LeftBrace
                | TokenKind::Bang
                | TokenKind::UnaryMinus
                | TokenKind::UnaryPlus
        )
    }

    fn describe(token: &Token) -> String {
        match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::String => format!("string \"{}\"", token.text),
            _ => format!("'{}'", token.text),
        }
    }

    fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            false
        } else {
            self.peek().kind == kind
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, CrustError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(kind, message))
        }
    }

    fn consume_with_help(
        &mut self,
        kind: TokenKind,
        message: &str,
        help: &str,
    ) -> Result<&Token, CrustError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(kind, message).with_help(help))
        }
    }

    fn expected(&self, kind: TokenKind, message: &str) -> CrustError {
        // At EOF, point just past the last real token.
        let error_span = if self.is_at_end() && self.current > 0 {
            Span::single(self.tokens[self.current - 1].span.end)
        } else {
            self.peek().span
        };

        CrustError::parse_error(
            error_span,
            format!(
                "{} (expected {}, found {})",
                message,
                kind,
                Self::describe(self.peek())
            ),
        )
    }
}
