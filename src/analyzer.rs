use crate::{
    ast::{
        BinaryOperator, Block, Expr, ExprKind, For, Function, If, Literal, Program, Stmt,
        StmtKind, Typed, UnaryOperator, Untyped,
    },
    scope::Scope,
    token::{Span, Spanned},
    types::Type,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Infers the type of every expression in `program`, inserting the casts
/// its operations need.
///
/// Analysis is idempotent: feeding the result back (as an untyped tree)
/// yields the same tree.
pub fn check(program: Program<Untyped>) -> Result<Program<Typed>> {
    let _span = tracing::debug_span!("analyze").entered();
    let program = Analyzer::new().check_program(program)?;
    tracing::debug!(functions = program.functions.len(), "analyzed program");
    Ok(program)
}

/// Analyzes a standalone expression, with nothing in scope.
pub fn check_expr(expr: Expr<Untyped>) -> Result<Expr<Typed>> {
    Analyzer::new().check_expr(expr)
}

#[derive(Clone, Debug)]
enum Symbol {
    Var(Type),
    Func { params: Vec<Type>, ret: Type },
}

struct Analyzer {
    scope: Scope<Symbol>,
    /// Return type of the function being analyzed.
    ret: Type,
}

impl Analyzer {
    fn new() -> Analyzer {
        Analyzer {
            scope: Scope::new(),
            ret: Type::INT,
        }
    }

    fn check_program(mut self, program: Program<Untyped>) -> Result<Program<Typed>> {
        // Bind every function first, so that calls may precede definitions.
        for function in &program.functions {
            if let Some(extra) = function.returns.get(1) {
                return Err(extra.span.wrap(Error::MultipleReturnTypes));
            }
            let symbol = Symbol::Func {
                params: function.params.iter().map(|p| p.ty.ty.clone()).collect(),
                ret: function.return_ty().clone(),
            };
            self.define(&function.name.name, function.name.span, symbol)?;
        }

        let functions = program
            .functions
            .into_iter()
            .map(|function| self.check_function(function))
            .collect::<Result<_>>()?;
        Ok(Program { functions })
    }

    fn check_function(&mut self, function: Function<Untyped>) -> Result<Function<Typed>> {
        tracing::trace!(name = %function.name, "analyzing function");
        self.ret = function.return_ty().clone();

        // Parameters share the frame of the body's outermost statements.
        self.scope.push();
        for param in &function.params {
            self.define(&param.name.name, param.name.span, Symbol::Var(param.ty.ty.clone()))?;
        }
        let stmts = self.check_stmts(function.body.stmts)?;
        self.scope.pop();

        Ok(Function {
            name: function.name,
            params: function.params,
            returns: function.returns,
            body: Block {
                stmts,
                span: function.body.span,
            },
        })
    }

    /// Analyzes `block` in a new scope.
    fn check_block(&mut self, block: Block<Untyped>) -> Result<Block<Typed>> {
        self.scope.push();
        let stmts = self.check_stmts(block.stmts)?;
        self.scope.pop();
        Ok(Block {
            stmts,
            span: block.span,
        })
    }

    fn check_stmts(&mut self, stmts: Vec<Stmt<Untyped>>) -> Result<Vec<Stmt<Typed>>> {
        stmts.into_iter().map(|stmt| self.check_stmt(stmt)).collect()
    }

    fn check_stmt(&mut self, stmt: Stmt<Untyped>) -> Result<Stmt<Typed>> {
        let span = stmt.span;
        let kind = match stmt.kind {
            StmtKind::Assignment {
                target,
                ty,
                value,
                is_declaration: true,
            } => {
                let value = self.check_expr(value)?;
                let (ty, value) = match ty {
                    Some(declared) => {
                        let value = coerce(value, &declared)?;
                        (declared, value)
                    }
                    None => (value.ty().clone(), value),
                };
                self.define(&target.name, target.span, Symbol::Var(ty.clone()))?;
                StmtKind::Assignment {
                    target,
                    ty,
                    value,
                    is_declaration: true,
                }
            }
            StmtKind::Assignment {
                target,
                value,
                is_declaration: false,
                ..
            } => {
                let ty = match self.scope.lookup(&target.name) {
                    Some(Symbol::Var(ty)) => ty.clone(),
                    Some(Symbol::Func { .. }) => {
                        return Err(target.span.wrap(Error::NotAValue(target.name)));
                    }
                    None => return Err(target.span.wrap(Error::UndefinedName(target.name))),
                };
                let value = coerce(self.check_expr(value)?, &ty)?;
                StmtKind::Assignment {
                    target,
                    ty,
                    value,
                    is_declaration: false,
                }
            }
            // The value keeps its own type; lowering converts it.
            StmtKind::Return(value) => {
                let value = self.check_expr(value)?;
                if !convertible(value.ty(), &self.ret) {
                    return Err(value.span.wrap(Error::Mismatch {
                        expected: self.ret.clone(),
                        actual: value.ty().clone(),
                    }));
                }
                StmtKind::Return(value)
            }
            StmtKind::Block(block) => StmtKind::Block(self.check_block(block)?),
            StmtKind::If(if_stmt) => StmtKind::If(self.check_if(if_stmt)?),
            StmtKind::For(for_stmt) => {
                self.scope.push();
                let init = self.check_stmt(*for_stmt.init)?;
                let condition = self.check_condition(for_stmt.condition)?;
                let increment = self.check_stmt(*for_stmt.increment)?;
                let body = self.check_block(for_stmt.body)?;
                self.scope.pop();
                StmtKind::For(For {
                    init: Box::new(init),
                    condition,
                    increment: Box::new(increment),
                    body,
                })
            }
            StmtKind::Expr(expr) => StmtKind::Expr(self.check_expr(expr)?),
        };
        Ok(Stmt { kind, span })
    }

    fn check_if(&mut self, if_stmt: If<Untyped>) -> Result<If<Typed>> {
        let condition = if_stmt
            .condition
            .map(|condition| self.check_condition(condition))
            .transpose()?;
        let body = self.check_block(if_stmt.body)?;
        let else_branch = match if_stmt.else_branch {
            Some(branch) => Some(Box::new(self.check_if(*branch)?)),
            None => None,
        };
        Ok(If {
            condition,
            body,
            else_branch,
        })
    }

    fn check_condition(&mut self, condition: Expr<Untyped>) -> Result<Expr<Typed>> {
        let condition = self.check_expr(condition)?;
        if !condition.ty().is_bool() {
            let error = Error::NonBoolCondition(condition.ty().clone());
            return Err(condition.span.wrap(error));
        }
        Ok(condition)
    }

    fn check_expr(&mut self, expr: Expr<Untyped>) -> Result<Expr<Typed>> {
        let span = expr.span;
        let (kind, ty) = match expr.kind {
            ExprKind::Literal(literal) => {
                let ty = match literal {
                    Literal::Int(_) => Type::INT,
                    Literal::Float(_) => Type::F64,
                    Literal::Bool(_) => Type::BOOL,
                };
                (ExprKind::Literal(literal), ty)
            }
            ExprKind::Id(ident) => match self.scope.lookup(&ident.name) {
                Some(Symbol::Var(ty)) => {
                    let ty = ty.clone();
                    (ExprKind::Id(ident), ty)
                }
                Some(Symbol::Func { .. }) => {
                    return Err(span.wrap(Error::NotAValue(ident.name)));
                }
                None => return Err(span.wrap(Error::UndefinedName(ident.name))),
            },
            ExprKind::Unary { op, expr } => {
                let expr = self.check_expr(*expr)?;
                if !expr.ty().is_numeric() {
                    let symbol = match op {
                        UnaryOperator::Plus => "+",
                        UnaryOperator::Neg => "-",
                    };
                    let error = Error::InvalidUnary {
                        op: symbol,
                        ty: expr.ty().clone(),
                    };
                    return Err(span.wrap(error));
                }
                let ty = expr.ty().clone();
                let unary = ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                };
                (unary, ty)
            }
            ExprKind::Binary { op, lhs, rhs, .. } => {
                let lhs = self.check_expr(*lhs)?;
                let rhs = self.check_expr(*rhs)?;
                return binary(op, lhs, rhs, span);
            }
            ExprKind::Cast { expr, ty } => {
                let expr = self.check_expr(*expr)?;
                if expr.ty().identical(&ty) {
                    return Ok(expr);
                }
                if !convertible(expr.ty(), &ty) {
                    let error = Error::InvalidCast {
                        from: expr.ty().clone(),
                        to: ty,
                    };
                    return Err(span.wrap(error));
                }
                let cast = ExprKind::Cast {
                    expr: Box::new(expr),
                    ty: ty.clone(),
                };
                (cast, ty)
            }
            ExprKind::Call { callee, args } => {
                let (params, ret) = match self.scope.lookup(&callee.name) {
                    Some(Symbol::Func { params, ret }) => (params.clone(), ret.clone()),
                    Some(Symbol::Var(_)) => {
                        return Err(callee.span.wrap(Error::NotAFunction(callee.name)));
                    }
                    None => {
                        return Err(callee.span.wrap(Error::UndefinedFunction(callee.name)));
                    }
                };
                if params.len() != args.len() {
                    let error = Error::ArgumentCount {
                        callee: callee.name,
                        expected: params.len(),
                        actual: args.len(),
                    };
                    return Err(span.wrap(error));
                }
                let args = args
                    .into_iter()
                    .zip(&params)
                    .map(|(arg, param)| coerce(self.check_expr(arg)?, param))
                    .collect::<Result<_>>()?;
                (ExprKind::Call { callee, args }, ret)
            }
            ExprKind::Index { array, index } => {
                let array = self.check_expr(*array)?;
                let Type::Array(elem, _) = array.ty() else {
                    return Err(array.span.wrap(Error::NotIndexable(array.ty().clone())));
                };
                let elem = (**elem).clone();
                let index = self.check_expr(*index)?;
                if !index.ty().is_integer() {
                    return Err(index.span.wrap(Error::Mismatch {
                        expected: Type::INT,
                        actual: index.ty().clone(),
                    }));
                }
                let index = coerce(index, &Type::INT)?;
                let kind = ExprKind::Index {
                    array: Box::new(array),
                    index: Box::new(index),
                };
                (kind, elem)
            }
            ExprKind::ParenList(_) => return Err(span.wrap(Error::TupleUnsupported)),
            ExprKind::SquareList(items) => {
                let items = items
                    .into_iter()
                    .map(|item| self.check_expr(item))
                    .collect::<Result<Vec<_>>>()?;
                let elem = common_type(&items, span)?;
                let len = items.len() as u64;
                let items = items
                    .into_iter()
                    .map(|item| coerce(item, &elem))
                    .collect::<Result<_>>()?;
                (ExprKind::SquareList(items), Type::Array(Box::new(elem), len))
            }
        };
        Ok(Expr {
            kind,
            span,
            info: ty,
        })
    }

    fn define(&mut self, name: &str, span: Span, symbol: Symbol) -> Result<()> {
        self.scope.define(name, symbol).map_err(|_| {
            span.wrap(Error::AlreadyDeclared {
                name: name.into(),
            })
        })
    }
}

/// Types a binary expression whose operands were already analyzed.
fn binary(op: BinaryOperator, lhs: Expr<Typed>, rhs: Expr<Typed>, span: Span) -> Result<Expr<Typed>> {
    let invalid = |lhs: &Expr<Typed>, rhs: &Expr<Typed>| {
        span.wrap(Error::InvalidOperands {
            op: op.symbol(),
            lhs: lhs.ty().clone(),
            rhs: rhs.ty().clone(),
        })
    };

    let operand_ty = match Type::promote(lhs.ty(), rhs.ty()) {
        Some(ty) => ty,
        // Booleans only support equality.
        None if matches!(op, BinaryOperator::Eq | BinaryOperator::Ne)
            && lhs.ty().is_bool()
            && rhs.ty().is_bool() =>
        {
            Type::BOOL
        }
        None => return Err(invalid(&lhs, &rhs)),
    };
    if op == BinaryOperator::FloorDiv && !operand_ty.is_integer() {
        return Err(span.wrap(Error::IntegerOnlyOperator(operand_ty)));
    }

    let is_fp = operand_ty.is_float();
    let ty = if op.is_comparison() {
        Type::BOOL
    } else {
        operand_ty.clone()
    };
    let kind = ExprKind::Binary {
        op,
        lhs: Box::new(coerce(lhs, &operand_ty)?),
        rhs: Box::new(coerce(rhs, &operand_ty)?),
        is_fp,
    };
    Ok(Expr {
        kind,
        span,
        info: ty,
    })
}

/// The element type of an array literal: the promotion of numeric elements,
/// or the one type all other elements share.
fn common_type(items: &[Expr<Typed>], span: Span) -> Result<Type> {
    let Some((first, rest)) = items.split_first() else {
        return Err(span.wrap(Error::EmptyArrayLiteral));
    };
    rest.iter().try_fold(first.ty().clone(), |acc, item| {
        if acc.identical(item.ty()) {
            return Ok(acc);
        }
        Type::promote(&acc, item.ty()).ok_or_else(|| {
            item.span.wrap(Error::Mismatch {
                expected: acc,
                actual: item.ty().clone(),
            })
        })
    })
}

/// Whether a value of type `from` may be implicitly converted to `to`.
fn convertible(from: &Type, to: &Type) -> bool {
    from.identical(to) || (from.is_numeric() && to.is_numeric())
}

/// Converts `expr` to `target`, wrapping it in a cast unless it already has
/// that type. Array literals are converted element-wise.
fn coerce(expr: Expr<Typed>, target: &Type) -> Result<Expr<Typed>> {
    if expr.ty().identical(target) {
        return Ok(expr);
    }
    let Expr { kind, span, info } = expr;
    match (kind, target) {
        (ExprKind::SquareList(items), Type::Array(elem, len))
            if u64::try_from(items.len()) == Ok(*len) =>
        {
            let items = items
                .into_iter()
                .map(|item| coerce(item, elem))
                .collect::<Result<_>>()?;
            Ok(Expr {
                kind: ExprKind::SquareList(items),
                span,
                info: target.clone(),
            })
        }
        (kind, _) if info.is_numeric() && target.is_numeric() => {
            let expr = Expr { kind, span, info };
            Ok(Expr {
                kind: ExprKind::Cast {
                    expr: Box::new(expr),
                    ty: target.clone(),
                },
                span,
                info: target.clone(),
            })
        }
        _ => Err(span.wrap(Error::Mismatch {
            expected: target.clone(),
            actual: info,
        })),
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("undefined: {0}")]
    UndefinedName(Box<str>),
    #[error("undefined function: {0}")]
    UndefinedFunction(Box<str>),
    #[error("{0} is a function, not a value")]
    NotAValue(Box<str>),
    #[error("{0} is not a function")]
    NotAFunction(Box<str>),
    #[error("{name} redeclared in this block")]
    AlreadyDeclared { name: Box<str> },
    #[error("wrong number of arguments in call to {callee}: expected {expected}, but got {actual}")]
    ArgumentCount {
        callee: Box<str>,
        expected: usize,
        actual: usize,
    },
    #[error("expected type {expected}, but got {actual}")]
    Mismatch { expected: Type, actual: Type },
    #[error("invalid operation: operator {op} not defined on {lhs} and {rhs}")]
    InvalidOperands {
        op: &'static str,
        lhs: Type,
        rhs: Type,
    },
    #[error("invalid operation: operator {op} not defined on {ty}")]
    InvalidUnary { op: &'static str, ty: Type },
    #[error("operator // requires integer operands, but got {0}")]
    IntegerOnlyOperator(Type),
    #[error("non-boolean condition of type {0}")]
    NonBoolCondition(Type),
    #[error("cannot index a value of type {0}")]
    NotIndexable(Type),
    #[error("cannot convert {from} to {to}")]
    InvalidCast { from: Type, to: Type },
    #[error("tuples are not supported")]
    TupleUnsupported,
    #[error("cannot infer the type of an empty array literal")]
    EmptyArrayLiteral,
    #[error("functions may only return a single value")]
    MultipleReturnTypes,
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests! {
        use analyzer;

        fn test_float_promotion() {
            let expr = "10 + 14.5";
            let tree_ok = "
                binary Add fp (0..9 %: f64)
                  cast f64 (0..2 %: f64)
                    int 10 (0..2 %: int)
                  float 14.5 (5..9 %: f64)
            ";
        }

        fn test_comparison_is_bool() {
            let expr = "1.5 < 2";
            let tree_ok = "
                binary Lt fp (0..7 %: bool)
                  float 1.5 (0..3 %: f64)
                  cast f64 (6..7 %: f64)
                    int 2 (6..7 %: int)
            ";
        }

        fn test_call_arguments() {
            let program = "add :: i32 a, i64 b -> i64 { return a + b }\nmain :: -> i32 { return add(10, 243) }\n";
            let tree_ok = "
                function add(a: i32, b: i64) -> i64
                  return (29..41)
                    binary Add (36..41 %: i64)
                      cast i64 (36..37 %: i64)
                        ident a (36..37 %: i32)
                      ident b (40..41 %: i64)
                function main() -> i32
                  return (61..80)
                    call add (68..80 %: i64)
                      cast i32 (72..74 %: i32)
                        int 10 (72..74 %: int)
                      int 243 (76..79 %: int)
            ";
        }

        fn test_declarations_and_shadowing() {
            let program = "f :: -> f32 {\n\tx := 1\n\tf32 y = x\n\t{\n\t\tx := 2.5\n\t\ty = x\n\t}\n\treturn y\n}";
            let tree_ok = "
                function f() -> f32
                  declare x: int (15..21)
                    int 1 (20..21 %: int)
                  declare y: f32 (23..32)
                    cast f32 (31..32 %: f32)
                      ident x (31..32 %: int)
                  block (34..58)
                    declare x: f64 (38..46)
                      float 2.5 (43..46 %: f64)
                    assign y: f32 (50..55)
                      cast f32 (54..55 %: f32)
                        ident x (54..55 %: f64)
                  return (60..68)
                    ident y (67..68 %: f32)
            ";
        }

        fn test_for_has_its_own_scope() {
            let program = "h :: -> int { i := 0; for i := 0; i < 10; i = i + 1 { }; return i }";
            let tree_ok = "
                function h() -> int
                  declare i: int (14..20)
                    int 0 (19..20 %: int)
                  for (22..55)
                    declare i: int (26..32)
                      int 0 (31..32 %: int)
                    binary Lt (34..40 %: bool)
                      ident i (34..35 %: int)
                      int 10 (38..40 %: int)
                    assign i: int (42..51)
                      binary Add (46..51 %: int)
                        ident i (46..47 %: int)
                        int 1 (50..51 %: int)
                    do
                  return (57..65)
                    ident i (64..65 %: int)
            ";
        }

        fn test_forward_call() {
            let program = "main :: -> int { return f() }\nf :: -> int { return 1 }";
            let tree_ok = "
                function main() -> int
                  return (17..27)
                    call f (24..27 %: int)
                function f() -> int
                  return (44..52)
                    int 1 (51..52 %: int)
            ";
        }

        fn test_array_literal_and_index() {
            let program = "f :: -> f64 {\n\t[3]f64 a = [1, 2.5, 3]\n\treturn a[1]\n}";
            let tree_ok = "
                function f() -> f64
                  declare a: [3]f64 (15..37)
                    array (26..37 %: [3]f64)
                      cast f64 (27..28 %: f64)
                        int 1 (27..28 %: int)
                      float 2.5 (30..33 %: f64)
                      cast f64 (35..36 %: f64)
                        int 3 (35..36 %: int)
                  return (39..50)
                    index (46..50 %: f64)
                      ident a (46..47 %: [3]f64)
                      int 1 (48..49 %: int)
            ";
        }

        fn test_undefined_name() {
            let program = "main :: -> int { return y }";
            let expected_errors = &["24..25: undefined: y"];
        }

        fn test_undefined_function() {
            let program = "main :: -> int { return g(1) }";
            let expected_errors = &["24..25: undefined function: g"];
        }

        fn test_argument_count() {
            let program = "f :: int a -> int { return a }\nmain :: -> int { return f(1, 2) }";
            let expected_errors = &["55..62: wrong number of arguments in call to f: expected 1, but got 2"];
        }

        fn test_redeclaration() {
            let program = "main :: -> int {\n\tx := 1\n\tx := 2\n\treturn x\n}";
            let expected_errors = &["26..27: x redeclared in this block"];
        }

        fn test_assignment_to_undeclared() {
            let program = "main :: -> int {\n\tx = 1\n\treturn 0\n}";
            let expected_errors = &["18..19: undefined: x"];
        }

        fn test_non_bool_condition() {
            let program = "main :: -> int {\n\tif 1 { return 1 }\n\treturn 0\n}";
            let expected_errors = &["21..22: non-boolean condition of type int"];
        }

        fn test_bool_arithmetic() {
            let expr = "true + 1";
            let expected_errors = &["0..8: invalid operation: operator + not defined on bool and int"];
        }

        fn test_bool_equality() {
            let expr = "true == false";
            let tree_ok = "
                binary Eq (0..13 %: bool)
                  bool true (0..4 %: bool)
                  bool false (8..13 %: bool)
            ";
        }

        fn test_floor_division_on_floats() {
            let expr = "1.5 // 2";
            let expected_errors = &["0..8: operator // requires integer operands, but got f64"];
        }

        fn test_tuple() {
            let expr = "(1, 2)";
            let expected_errors = &["0..6: tuples are not supported"];
        }

        fn test_return_mismatch() {
            let program = "main :: -> bool { return 1 }";
            let expected_errors = &["25..26: expected type bool, but got int"];
        }

        fn test_multiple_return_types() {
            let program = "f :: -> i32, bool { return 1 }";
            let expected_errors = &["13..17: functions may only return a single value"];
        }

        fn test_function_as_value() {
            let program = "f :: -> int { return f }";
            let expected_errors = &["21..22: f is a function, not a value"];
        }

        fn test_index_non_array() {
            let program = "f :: int a -> int { return a[0] }";
            let expected_errors = &["27..28: cannot index a value of type int"];
        }
    }

    mod properties {
        use pretty_assertions::assert_eq;

        use crate::{
            analyzer,
            ast::{Expr, ExprKind, Program, Stmt, StmtKind, Typed, Untyped},
            lexer::lex_in_new,
            parser,
        };

        const SOURCES: &[&str] = &[
            include_str!("../demos/big.fur"),
            "add :: i32 a, i64 b -> i64 { return a + b }\nmain :: -> i32 { return add(10, 243) }\n",
            "f :: -> i8 {\n\t[2]i8 a = [1, 2]\n\tx := a[0] * 2.5\n\treturn x\n}\n",
        ];

        fn analyze(src: &str) -> Program<Typed> {
            let tokens = lex_in_new(src).unwrap();
            analyzer::check(parser::parse_program(&tokens).unwrap()).unwrap()
        }

        #[test]
        fn test_idempotent() {
            for src in SOURCES {
                let first = analyze(src);
                let second = analyzer::check(Program::<Untyped>::from(first.clone())).unwrap();
                assert_eq!(first, second);
            }
        }

        #[test]
        fn test_typed_tree_is_consistent() {
            fn visit_expr(expr: &Expr<Typed>) {
                let settled = expr.ty().base().basic().map_or(true, |kind| !kind.is_untyped());
                assert!(settled, "untyped kind left in {expr:?}");
                match &expr.kind {
                    ExprKind::Binary { lhs, rhs, is_fp, op } => {
                        assert!(lhs.ty().identical(rhs.ty()), "{lhs:?} {op:?} {rhs:?}");
                        assert_eq!(*is_fp, lhs.ty().is_float());
                        visit_expr(lhs);
                        visit_expr(rhs);
                    }
                    ExprKind::Unary { expr, .. } | ExprKind::Cast { expr, .. } => visit_expr(expr),
                    ExprKind::Call { args, .. } => args.iter().for_each(visit_expr),
                    ExprKind::SquareList(items) => items.iter().for_each(visit_expr),
                    ExprKind::Index { array, index } => {
                        visit_expr(array);
                        visit_expr(index);
                    }
                    _ => {}
                }
            }
            fn visit_stmt(stmt: &Stmt<Typed>) {
                match &stmt.kind {
                    StmtKind::Assignment { ty, value, .. } => {
                        assert!(value.ty().identical(ty));
                        visit_expr(value);
                    }
                    StmtKind::Return(value) | StmtKind::Expr(value) => visit_expr(value),
                    StmtKind::Block(block) => block.stmts.iter().for_each(visit_stmt),
                    StmtKind::If(if_stmt) => {
                        let mut arm = Some(if_stmt);
                        while let Some(current) = arm {
                            if let Some(condition) = &current.condition {
                                assert!(condition.ty().is_bool());
                                visit_expr(condition);
                            }
                            current.body.stmts.iter().for_each(visit_stmt);
                            arm = current.else_branch.as_deref();
                        }
                    }
                    StmtKind::For(for_stmt) => {
                        visit_stmt(&for_stmt.init);
                        assert!(for_stmt.condition.ty().is_bool());
                        visit_expr(&for_stmt.condition);
                        visit_stmt(&for_stmt.increment);
                        for_stmt.body.stmts.iter().for_each(visit_stmt);
                    }
                }
            }

            for src in SOURCES {
                for function in analyze(src).functions {
                    function.body.stmts.iter().for_each(visit_stmt);
                }
            }
        }

        #[test]
        fn test_call_arguments_match_parameters() {
            let program = analyze(SOURCES[1]);
            let params: Vec<_> = program.functions[0]
                .params
                .iter()
                .map(|p| p.ty.ty.clone())
                .collect();
            let StmtKind::Return(value) = &program.functions[1].body.stmts[0].kind else {
                panic!("expected return");
            };
            let ExprKind::Call { args, .. } = &value.kind else {
                panic!("expected call");
            };
            assert_eq!(args.len(), params.len());
            for (arg, param) in args.iter().zip(&params) {
                assert!(arg.ty().identical(param));
            }
            assert!(matches!(args[0].kind, ExprKind::Cast { .. }));
            assert!(matches!(args[1].kind, ExprKind::Literal(_)));
        }
    }
}
