// program ::= definition*
// definition ::= ID '::' [param (',' param)*] '->' type (',' type)* block
// param ::= type ID
// type ::= 'int' | 'i8' | 'i16' | 'i32' | 'i64' | 'f32' | 'f64' | 'bool'
//        | 'string' | '[' INT ']' type
// block ::= '{' [stmt (';' stmt)*] '}'
// stmt ::= 'return' expr
//        | block
//        | 'if' expr block ['else' ('if' ... | block)]
//        | 'for' stmt ';' expr ';' stmt block
//        | type ID '=' expr
//        | ID ('=' | ':=' | '+=' | '-=') expr
//        | ID ('++' | '--')
//        | ID '(' [expr (',' expr)*] ')'
// expr ::= expr binop expr
//        | ('+' | '-') expr
//        | ID '(' [expr (',' expr)*] ')'
//        | expr '[' expr ']'
//        | '(' [expr (',' expr)*] ')'
//        | '[' [expr (',' expr)*] ']'
//        | ID | INT | FLOAT | 'true' | 'false'

// Precedence
//
// call, index
// unary + -
// < <= > >= == !=
// * / // %
// + -

use std::fmt;

use crate::{token::Span, types::Type};

/// The annotations a tree carries. The parser produces [`Untyped`] trees;
/// the analyzer turns them into [`Typed`] ones.
pub trait Info {
    /// Attached to every expression.
    type Expr: fmt::Debug + Clone + PartialEq;
    /// The declared type of an assignment.
    type Decl: fmt::Debug + Clone + PartialEq;
    /// Whether a binary expression operates on floating-point values.
    type Fp: fmt::Debug + Copy + PartialEq;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Untyped;

impl Info for Untyped {
    type Expr = ();
    type Decl = Option<Type>;
    type Fp = ();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Typed;

impl Info for Typed {
    type Expr = Type;
    type Decl = Type;
    type Fp = bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program<I: Info> {
    pub functions: Vec<Function<I>>,
}

impl<I: Info> Default for Program<I> {
    fn default() -> Self {
        Program {
            functions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function<I: Info> {
    pub name: Ident,
    pub params: Vec<Param>,
    /// Never empty. Only the first one is meaningful past parsing.
    pub returns: Vec<TypeName>,
    pub body: Block<I>,
}

impl<I: Info> Function<I> {
    pub fn return_ty(&self) -> &Type {
        &self.returns[0].ty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeName,
    pub name: Ident,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block<I: Info> {
    pub stmts: Vec<Stmt<I>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt<I: Info> {
    pub kind: StmtKind<I>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind<I: Info> {
    Assignment {
        target: Ident,
        ty: I::Decl,
        value: Expr<I>,
        /// Whether this statement introduces `target` (`:=` or a typed
        /// declaration) rather than updating it.
        is_declaration: bool,
    },
    Return(Expr<I>),
    Block(Block<I>),
    If(If<I>),
    For(For<I>),
    /// A call evaluated for its effects.
    Expr(Expr<I>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct If<I: Info> {
    /// `None` for a bare `else` branch.
    pub condition: Option<Expr<I>>,
    pub body: Block<I>,
    pub else_branch: Option<Box<If<I>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct For<I: Info> {
    pub init: Box<Stmt<I>>,
    pub condition: Expr<I>,
    pub increment: Box<Stmt<I>>,
    pub body: Block<I>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr<I: Info> {
    pub kind: ExprKind<I>,
    pub span: Span,
    pub info: I::Expr,
}

impl Expr<Untyped> {
    pub fn new(kind: ExprKind<Untyped>, span: Span) -> Self {
        Expr {
            kind,
            span,
            info: (),
        }
    }
}

impl Expr<Typed> {
    pub fn ty(&self) -> &Type {
        &self.info
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind<I: Info> {
    Literal(Literal),
    Id(Ident),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr<I>>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr<I>>,
        rhs: Box<Expr<I>>,
        is_fp: I::Fp,
    },
    /// Only the analyzer introduces casts.
    Cast {
        expr: Box<Expr<I>>,
        ty: Type,
    },
    Call {
        callee: Ident,
        args: Vec<Expr<I>>,
    },
    Index {
        array: Box<Expr<I>>,
        index: Box<Expr<I>>,
    },
    /// A tuple: `()` or `(a, b, ...)`.
    ParenList(Vec<Expr<I>>),
    /// An array literal: `[a, b, ...]`.
    SquareList(Vec<Expr<I>>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    /// `//`
    FloorDiv,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Lt | Le | Gt | Ge | Eq | Ne)
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            FloorDiv => "//",
            Rem => "%",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub ty: Type,
    pub span: Span,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: Box<str>,
    pub span: Span,
}

impl Ident {
    pub fn new(name: &str, span: Span) -> Ident {
        Ident {
            name: name.into(),
            span,
        }
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ident({:?}, {})", self.name, self.span)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Forgets the analysis results while keeping inserted casts, so an analyzed
/// tree can be fed to the analyzer again.
impl From<Program<Typed>> for Program<Untyped> {
    fn from(program: Program<Typed>) -> Self {
        Program {
            functions: program.functions.into_iter().map(Function::from).collect(),
        }
    }
}

impl From<Function<Typed>> for Function<Untyped> {
    fn from(function: Function<Typed>) -> Self {
        Function {
            name: function.name,
            params: function.params,
            returns: function.returns,
            body: function.body.into(),
        }
    }
}

impl From<Block<Typed>> for Block<Untyped> {
    fn from(block: Block<Typed>) -> Self {
        Block {
            stmts: block.stmts.into_iter().map(Stmt::from).collect(),
            span: block.span,
        }
    }
}

impl From<Stmt<Typed>> for Stmt<Untyped> {
    fn from(stmt: Stmt<Typed>) -> Self {
        let kind = match stmt.kind {
            StmtKind::Assignment {
                target,
                ty,
                value,
                is_declaration,
            } => StmtKind::Assignment {
                target,
                ty: Some(ty),
                value: value.into(),
                is_declaration,
            },
            StmtKind::Return(value) => StmtKind::Return(value.into()),
            StmtKind::Block(block) => StmtKind::Block(block.into()),
            StmtKind::If(if_stmt) => StmtKind::If(if_stmt.into()),
            StmtKind::For(for_stmt) => StmtKind::For(For {
                init: Box::new((*for_stmt.init).into()),
                condition: for_stmt.condition.into(),
                increment: Box::new((*for_stmt.increment).into()),
                body: for_stmt.body.into(),
            }),
            StmtKind::Expr(expr) => StmtKind::Expr(expr.into()),
        };
        Stmt {
            kind,
            span: stmt.span,
        }
    }
}

impl From<If<Typed>> for If<Untyped> {
    fn from(if_stmt: If<Typed>) -> Self {
        If {
            condition: if_stmt.condition.map(Expr::from),
            body: if_stmt.body.into(),
            else_branch: if_stmt.else_branch.map(|e| Box::new((*e).into())),
        }
    }
}

impl From<Expr<Typed>> for Expr<Untyped> {
    fn from(expr: Expr<Typed>) -> Self {
        let boxed = |e: Box<Expr<Typed>>| -> Box<Expr<Untyped>> { Box::new((*e).into()) };
        let list = |items: Vec<Expr<Typed>>| -> Vec<Expr<Untyped>> {
            items.into_iter().map(Expr::from).collect()
        };
        let kind = match expr.kind {
            ExprKind::Literal(literal) => ExprKind::Literal(literal),
            ExprKind::Id(ident) => ExprKind::Id(ident),
            ExprKind::Unary { op, expr } => ExprKind::Unary {
                op,
                expr: boxed(expr),
            },
            ExprKind::Binary { op, lhs, rhs, .. } => ExprKind::Binary {
                op,
                lhs: boxed(lhs),
                rhs: boxed(rhs),
                is_fp: (),
            },
            ExprKind::Cast { expr, ty } => ExprKind::Cast {
                expr: boxed(expr),
                ty,
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee,
                args: list(args),
            },
            ExprKind::Index { array, index } => ExprKind::Index {
                array: boxed(array),
                index: boxed(index),
            },
            ExprKind::ParenList(items) => ExprKind::ParenList(list(items)),
            ExprKind::SquareList(items) => ExprKind::SquareList(list(items)),
        };
        Expr::new(kind, expr.span)
    }
}
