use std::fmt;

use crate::{
    ast::{
        BinaryOperator, Block, Expr, ExprKind, For, Function, Ident, If, Literal, Param, Program,
        Stmt, StmtKind, TypeName, UnaryOperator, Untyped,
    },
    token::{Span, Spanned, Token, TokenKind},
    types::Type,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Binding power of the prefix `+` and `-` operators.
const PREFIX_BP: u8 = 100;

pub fn parse_program(tokens: &[Token]) -> Result<Program<Untyped>> {
    let _span = tracing::debug_span!("parse").entered();
    let program = Parser::new(tokens).parse_program()?;
    tracing::debug!(functions = program.functions.len(), "parsed program");
    Ok(program)
}

/// Parses a single expression, optionally followed by a statement
/// terminator.
pub fn parse_expr(tokens: &[Token]) -> Result<Expr<Untyped>> {
    let mut p = Parser::new(tokens);
    let expr = p.parse_expr()?;
    p.take(&TokenKind::Semicolon);
    p.consume(&TokenKind::Eof)?;
    Ok(expr)
}

struct Parser<'tok> {
    tokens: &'tok [Token],
    cursor: usize,
}

impl Parser<'_> {
    fn parse_program(&mut self) -> Result<Program<Untyped>> {
        let mut functions = Vec::with_capacity(4);
        loop {
            while self.take(&TokenKind::Semicolon) {}
            if self.is(&TokenKind::Eof) {
                break;
            }
            functions.push(self.within("function definition", Self::parse_function)?);
        }
        if functions.is_empty() {
            let eof = self.peek();
            return Err(eof.span().wrap(Error::new(ErrorKind::EmptyProgram)));
        }
        Ok(Program { functions })
    }

    fn parse_function(&mut self) -> Result<Function<Untyped>> {
        let name = self.parse_ident()?;
        self.consume(&TokenKind::ColonColon)?;

        let mut params = Vec::new();
        if !self.is(&TokenKind::Arrow) {
            loop {
                params.push(self.parse_param()?);
                if !self.take(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::Arrow)?;

        let mut returns = vec![self.parse_type()?];
        while self.take(&TokenKind::Comma) {
            returns.push(self.parse_type()?);
        }

        let body = self.parse_block()?;
        Ok(Function {
            name,
            params,
            returns,
            body,
        })
    }

    fn parse_param(&mut self) -> Result<Param> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        Ok(Param { ty, name })
    }

    fn parse_type(&mut self) -> Result<TypeName> {
        let token = self.advance();
        match token.kind {
            TokenKind::Type(kind) => Ok(TypeName {
                ty: Type::Basic(kind),
                span: token.span(),
            }),
            // Array type: '[' INT ']' type
            TokenKind::LBracket => {
                let len_token = self.advance();
                let TokenKind::Int(len) = len_token.kind else {
                    return Err(self.unexpected(len_token, Wanted::Description("array length")));
                };
                let Ok(len) = u64::try_from(len) else {
                    return Err(len_token.span().wrap(Error::new(ErrorKind::InvalidArrayLength)));
                };
                self.consume(&TokenKind::RBracket)?;
                let elem = self.parse_type()?;
                Ok(TypeName {
                    ty: Type::Array(Box::new(elem.ty), len),
                    span: token.span().to(elem.span),
                })
            }
            _ => Err(self.unexpected(token, Wanted::Description("type"))),
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Ident(name) => Ok(Ident::new(name, token.span())),
            _ => Err(self.unexpected(token, Wanted::Description("identifier"))),
        }
    }

    /// Parses `'{' [stmt (';' stmt)*] '}'`. Empty statements are skipped and
    /// the separator before the closing brace is optional.
    fn parse_block(&mut self) -> Result<Block<Untyped>> {
        let open = self.consume(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            while self.take(&TokenKind::Semicolon) {}
            if self.is(&TokenKind::RBrace) || self.is(&TokenKind::Eof) {
                break;
            }
            stmts.push(self.parse_stmt()?);
            if !self.take(&TokenKind::Semicolon) && !self.is(&TokenKind::RBrace) {
                let c = self.peek();
                return Err(self.unexpected(c, Wanted::Description("';' or '}'")));
            }
        }
        let close = self.consume(&TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: open.span().to(close.span()),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt<Untyped>> {
        match self.peek().kind {
            TokenKind::Return => self.within("return statement", |p| {
                let keyword = p.advance();
                let value = p.parse_expr()?;
                let span = keyword.span().to(value.span);
                Ok(Stmt {
                    kind: StmtKind::Return(value),
                    span,
                })
            }),
            TokenKind::LBrace => self.within("block", |p| {
                let block = p.parse_block()?;
                let span = block.span;
                Ok(Stmt {
                    kind: StmtKind::Block(block),
                    span,
                })
            }),
            TokenKind::If => self.within("if statement", |p| {
                let lo = p.peek().span();
                let if_stmt = p.parse_if()?;
                Ok(Stmt {
                    span: lo.to(p.previous_span()),
                    kind: StmtKind::If(if_stmt),
                })
            }),
            TokenKind::For => self.within("for statement", Self::parse_for),
            _ => self.within("simple statement", Self::parse_simple_stmt),
        }
    }

    fn parse_if(&mut self) -> Result<If<Untyped>> {
        self.consume(&TokenKind::If)?;
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        let else_branch = if self.take(&TokenKind::Else) {
            let branch = if self.is(&TokenKind::If) {
                self.parse_if()?
            } else {
                If {
                    condition: None,
                    body: self.parse_block()?,
                    else_branch: None,
                }
            };
            Some(Box::new(branch))
        } else {
            None
        };
        Ok(If {
            condition: Some(condition),
            body,
            else_branch,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt<Untyped>> {
        let keyword = self.consume(&TokenKind::For)?;
        let init = self.within("loop initializer", Self::parse_simple_stmt)?;
        self.consume(&TokenKind::Semicolon)?;
        let condition = self.within("loop condition", Self::parse_expr)?;
        self.consume(&TokenKind::Semicolon)?;
        let increment = self.within("loop increment", Self::parse_simple_stmt)?;
        let body = self.parse_block()?;
        let span = keyword.span().to(body.span);
        Ok(Stmt {
            kind: StmtKind::For(For {
                init: Box::new(init),
                condition,
                increment: Box::new(increment),
                body,
            }),
            span,
        })
    }

    /// Parses declarations, assignments and call statements.
    fn parse_simple_stmt(&mut self) -> Result<Stmt<Untyped>> {
        if matches!(self.peek().kind, TokenKind::Type(_) | TokenKind::LBracket) {
            return self.parse_typed_declaration();
        }

        let lhs = self.parse_expr()?;
        let lo = lhs.span;
        let op_token = self.peek();
        let kind = match op_token.kind {
            TokenKind::Assign | TokenKind::Define => {
                let target = Self::assignment_target(&lhs)?;
                self.advance();
                let value = self.parse_expr()?;
                StmtKind::Assignment {
                    target,
                    ty: None,
                    value,
                    is_declaration: op_token.kind == TokenKind::Define,
                }
            }
            // Compound assignment: `x += e` is `x = x + e`.
            TokenKind::PlusAssign | TokenKind::MinusAssign => {
                let target = Self::assignment_target(&lhs)?;
                self.advance();
                let rhs = self.parse_expr()?;
                let op = if op_token.kind == TokenKind::PlusAssign {
                    BinaryOperator::Add
                } else {
                    BinaryOperator::Sub
                };
                StmtKind::Assignment {
                    target,
                    ty: None,
                    value: binary(op, lhs, rhs),
                    is_declaration: false,
                }
            }
            // Postfix step: `x++` is `x = x + 1`.
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let target = Self::assignment_target(&lhs)?;
                self.advance();
                let one = Expr::new(ExprKind::Literal(Literal::Int(1)), op_token.span());
                let op = if op_token.kind == TokenKind::PlusPlus {
                    BinaryOperator::Add
                } else {
                    BinaryOperator::Sub
                };
                StmtKind::Assignment {
                    target,
                    ty: None,
                    value: binary(op, lhs, one),
                    is_declaration: false,
                }
            }
            _ if matches!(lhs.kind, ExprKind::Call { .. }) => StmtKind::Expr(lhs),
            _ => {
                let error = Error::new(ErrorKind::ExprNotStatement);
                return Err(lhs.span.wrap(error));
            }
        };
        Ok(Stmt {
            kind,
            span: lo.to(self.previous_span()),
        })
    }

    /// Parses `type ID '=' expr`.
    fn parse_typed_declaration(&mut self) -> Result<Stmt<Untyped>> {
        let ty = self.parse_type()?;
        let target = self.parse_ident()?;
        self.consume(&TokenKind::Assign)?;
        let value = self.parse_expr()?;
        let span = ty.span.to(value.span);
        Ok(Stmt {
            kind: StmtKind::Assignment {
                target,
                ty: Some(ty.ty),
                value,
                is_declaration: true,
            },
            span,
        })
    }

    fn assignment_target(lhs: &Expr<Untyped>) -> Result<Ident> {
        match &lhs.kind {
            ExprKind::Id(ident) => Ok(ident.clone()),
            _ => Err(lhs
                .span
                .wrap(Error::new(ErrorKind::InvalidAssignmentTarget))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr<Untyped>> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr<Untyped>> {
        let lhs_token = self.advance();
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.peek();
            match Self::infix_binding_power(&op_token.kind) {
                // Operators of equal power stop the loop, making them
                // left-associative.
                Some(bp) if bp > min_bp => {
                    self.advance(); // Operator
                    lhs = self.parse_led(op_token, lhs, bp)?;
                }
                _ => break,
            }
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, grouping)
    fn parse_nud(&mut self, token: &Token) -> Result<Expr<Untyped>> {
        let (kind, span) = match &token.kind {
            TokenKind::Ident(name) => (ExprKind::Id(Ident::new(name, token.span())), token.span()),
            TokenKind::Int(value) => (ExprKind::Literal(Literal::Int(*value)), token.span()),
            TokenKind::Float(value) => (ExprKind::Literal(Literal::Float(*value)), token.span()),
            TokenKind::True => (ExprKind::Literal(Literal::Bool(true)), token.span()),
            TokenKind::False => (ExprKind::Literal(Literal::Bool(false)), token.span()),

            // Prefix operators: +, -
            kind @ (TokenKind::Plus | TokenKind::Minus) => {
                let op = if *kind == TokenKind::Plus {
                    UnaryOperator::Plus
                } else {
                    UnaryOperator::Neg
                };
                let expr = self.parse_expr_bp(PREFIX_BP)?;
                let span = token.span().to(expr.span);
                let unary = ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                };
                (unary, span)
            }

            // Grouping or tuple: `()`, `(e)`, `(e, ...)`
            TokenKind::LParen => {
                if let Some(end) = self.take_token(&TokenKind::RParen) {
                    (ExprKind::ParenList(Vec::new()), token.span().to(end.span()))
                } else {
                    let first = self.parse_expr()?;
                    if self.take(&TokenKind::RParen) {
                        return Ok(first);
                    }
                    self.consume(&TokenKind::Comma)?;
                    let mut items = vec![first];
                    items.extend(self.parse_list(&TokenKind::RParen, Self::parse_expr)?);
                    let end = self.consume(&TokenKind::RParen)?;
                    (ExprKind::ParenList(items), token.span().to(end.span()))
                }
            }

            // Array literal: `[e, ...]`
            TokenKind::LBracket => {
                let items = self.parse_list(&TokenKind::RBracket, Self::parse_expr)?;
                let end = self.consume(&TokenKind::RBracket)?;
                (ExprKind::SquareList(items), token.span().to(end.span()))
            }

            other => {
                let error = Error::new(ErrorKind::UnexpectedTokenInExpr {
                    token: other.clone(),
                });
                return Err(token.span().wrap(error));
            }
        };

        Ok(Expr::new(kind, span))
    }

    /// led: Parses tokens that follow a left-hand-side expression
    /// (infix/postfix operators)
    fn parse_led(&mut self, op_token: &Token, lhs: Expr<Untyped>, bp: u8) -> Result<Expr<Untyped>> {
        let (kind, span) = match op_token.kind {
            // Binary operators
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::SlashSlash
            | TokenKind::Percent
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq
            | TokenKind::EqEq
            | TokenKind::NotEq => {
                let op = match op_token.kind {
                    TokenKind::Plus => BinaryOperator::Add,
                    TokenKind::Minus => BinaryOperator::Sub,
                    TokenKind::Star => BinaryOperator::Mul,
                    TokenKind::Slash => BinaryOperator::Div,
                    TokenKind::SlashSlash => BinaryOperator::FloorDiv,
                    TokenKind::Percent => BinaryOperator::Rem,
                    TokenKind::Less => BinaryOperator::Lt,
                    TokenKind::LessEq => BinaryOperator::Le,
                    TokenKind::Greater => BinaryOperator::Gt,
                    TokenKind::GreaterEq => BinaryOperator::Ge,
                    TokenKind::EqEq => BinaryOperator::Eq,
                    TokenKind::NotEq => BinaryOperator::Ne,
                    _ => unreachable!(),
                };
                // Parse right operand with correct precedence
                let rhs = self.parse_expr_bp(bp)?;
                return Ok(binary(op, lhs, rhs));
            }

            // Call: ID ( [expr [, expr]*] )
            TokenKind::LParen => {
                let ExprKind::Id(callee) = lhs.kind else {
                    return Err(lhs.span.wrap(Error::new(ErrorKind::InvalidCallee)));
                };
                // LParen was already consumed.
                let args = self.parse_list(&TokenKind::RParen, Self::parse_expr)?;
                let end = self.consume(&TokenKind::RParen)?;
                let span = lhs.span.to(end.span());
                (ExprKind::Call { callee, args }, span)
            }

            // Index: expr [ expr ]
            TokenKind::LBracket => {
                let index = self.parse_expr()?;
                let end = self.consume(&TokenKind::RBracket)?;
                let span = lhs.span.to(end.span());
                let index = ExprKind::Index {
                    array: Box::new(lhs),
                    index: Box::new(index),
                };
                (index, span)
            }

            ref other => {
                let error = Error::new(ErrorKind::UnexpectedOperator {
                    actual: other.clone(),
                });
                return Err(op_token.span().wrap(error));
            }
        };

        Ok(Expr::new(kind, span))
    }

    /// Parses `item (',' item)* [',']` until `end_delim` is found. Does
    /// **NOT** consume the end delimiter.
    fn parse_list<T>(
        &mut self,
        end_delim: &TokenKind,
        parse_item: impl Fn(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while !self.is(end_delim) {
            items.push(parse_item(self)?);

            // After consuming an item, we must consume the separator, unless
            // the list ends right here.
            if !self.take(&TokenKind::Comma) {
                if self.is(end_delim) {
                    break;
                }
                let c = self.peek();
                return Err(self.unexpected(
                    c,
                    Wanted::Any(vec![TokenKind::Comma, end_delim.clone()]),
                ));
            }
        }
        Ok(items)
    }

    fn infix_binding_power(kind: &TokenKind) -> Option<u8> {
        let bp = match kind {
            TokenKind::Plus | TokenKind::Minus => 10,

            TokenKind::Star | TokenKind::Slash | TokenKind::SlashSlash | TokenKind::Percent => 20,

            TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq
            | TokenKind::EqEq
            | TokenKind::NotEq => 60,

            // Call and index bind tighter than the prefix operators.
            TokenKind::LParen | TokenKind::LBracket => 150,

            _ => return None,
        };
        Some(bp)
    }
}

impl<'tok> Parser<'tok> {
    fn new(tokens: &'tok [Token]) -> Parser<'tok> {
        assert!(
            tokens.last().is_some_and(Token::is_eof),
            "token stream must end with Eof"
        );
        Parser { tokens, cursor: 0 }
    }

    /// Runs `f`, recording `rule` on the error's rule stack if it fails.
    fn within<T>(
        &mut self,
        rule: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        tracing::trace!(rule, at = %self.peek().pos, "enter");
        f(self).map_err(|mut error| {
            error.inner.contexts.push(rule);
            error
        })
    }

    /// Returns the current token. Past the end, this is always the final
    /// [`TokenKind::Eof`].
    fn peek(&self) -> &'tok Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.cursor.min(last)]
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> &'tok Token {
        let c = self.peek();
        self.cursor += 1;
        c
    }

    /// Span of the last consumed token.
    fn previous_span(&self) -> Span {
        let last = self.tokens.len() - 1;
        self.tokens[self.cursor.saturating_sub(1).min(last)].span()
    }

    /// Checks whether the current token matches the given one, ignoring
    /// payloads.
    fn is(&self, expect: &TokenKind) -> bool {
        self.peek().kind.same_kind(expect)
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: &TokenKind) -> bool {
        self.take_token(expect).is_some()
    }

    fn take_token(&mut self, expect: &TokenKind) -> Option<&'tok Token> {
        if self.is(expect) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Advances if the current token matches the provided one. If not, fails.
    fn consume(&mut self, expect: &TokenKind) -> Result<&'tok Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            Err(self.unexpected(c, Wanted::Specific(expect.clone())))
        }
    }

    #[allow(clippy::unused_self)]
    fn unexpected(&self, actual: &Token, expected: Wanted) -> Spanned<Error> {
        actual.span().wrap(Error::new(ErrorKind::Unexpected {
            expected,
            actual: actual.kind.clone(),
        }))
    }
}

fn binary(op: BinaryOperator, lhs: Expr<Untyped>, rhs: Expr<Untyped>) -> Expr<Untyped> {
    let span = lhs.span.to(rhs.span);
    let kind = ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        is_fp: (),
    };
    Expr::new(kind, span)
}

/// What the parser was looking for when it failed.
#[derive(Clone, Debug, PartialEq)]
pub enum Wanted {
    Specific(TokenKind),
    Any(Vec<TokenKind>),
    Description(&'static str),
}

impl fmt::Display for Wanted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wanted::Specific(kind) => write!(f, "{kind}"),
            Wanted::Any(kinds) => {
                for (i, kind) in kinds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{kind}")?;
                }
                Ok(())
            }
            Wanted::Description(desc) => f.write_str(desc),
        }
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("expected {expected}, but got {actual}")]
    Unexpected { expected: Wanted, actual: TokenKind },
    #[error("unexpected {token} in expression")]
    UnexpectedTokenInExpr { token: TokenKind },
    #[error("unexpected operator {actual}")]
    UnexpectedOperator { actual: TokenKind },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("only named functions can be called")]
    InvalidCallee,
    #[error("expression is not a statement")]
    ExprNotStatement,
    #[error("invalid array length")]
    InvalidArrayLength,
    #[error("empty program")]
    EmptyProgram,
}

/// A parse failure along with the grammar rules that were being parsed
/// when it happened, innermost first.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub contexts: Vec<&'static str>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error {
            kind,
            contexts: Vec::new(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
