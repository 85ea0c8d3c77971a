use std::io::Write;

use crate::{ast::*, types::Type};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string<I: InfoWriter>(program: &Program<I>) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program).expect("writing to a Vec can't fail");
    String::from_utf8(buf).expect("tree output is UTF-8")
}

pub fn print_expr_string<I: InfoWriter>(expr: &Expr<I>) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, 0, expr).expect("writing to a Vec can't fail");
    String::from_utf8(buf).expect("tree output is UTF-8")
}

pub fn print_program<I: InfoWriter>(
    w: &mut impl Write,
    program: &Program<I>,
) -> std::io::Result<()> {
    for function in &program.functions {
        print_function(w, 0, function)?;
    }
    Ok(())
}

fn print_function<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    function: &Function<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    write!(w, "function {}(", function.name)?;
    for (idx, param) in function.params.iter().enumerate() {
        if idx > 0 {
            write!(w, ", ")?;
        }
        write!(w, "{}: {}", param.name, param.ty.ty)?;
    }
    write!(w, ") ->")?;
    for (idx, ret) in function.returns.iter().enumerate() {
        let sep = if idx > 0 { "," } else { "" };
        write!(w, "{sep} {}", ret.ty)?;
    }
    writeln!(w)?;
    print_stmts(w, i + 1, &function.body.stmts)
}

fn print_stmts<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    stmts: &[Stmt<I>],
) -> std::io::Result<()> {
    for stmt in stmts {
        print_stmt(w, i, stmt)?;
    }
    Ok(())
}

pub fn print_stmt<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    stmt: &Stmt<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::Assignment {
            target,
            ty,
            value,
            is_declaration,
        } => {
            let verb = if *is_declaration { "declare" } else { "assign" };
            let ty = ty.write_declared();
            writeln!(w, "{verb} {target}{ty} ({span})")?;
            print_expr(w, i + 1, value)?;
        }
        StmtKind::Return(value) => {
            writeln!(w, "return ({span})")?;
            print_expr(w, i + 1, value)?;
        }
        StmtKind::Block(block) => {
            writeln!(w, "block ({span})")?;
            print_stmts(w, i + 1, &block.stmts)?;
        }
        StmtKind::If(if_stmt) => {
            writeln!(w, "if ({span})")?;
            print_if_arms(w, i + 1, if_stmt)?;
        }
        StmtKind::For(For {
            init,
            condition,
            increment,
            body,
        }) => {
            writeln!(w, "for ({span})")?;
            print_stmt(w, i + 1, init)?;
            print_expr(w, i + 1, condition)?;
            print_stmt(w, i + 1, increment)?;
            sp(w, i + 1)?;
            writeln!(w, "do")?;
            print_stmts(w, i + 2, &body.stmts)?;
        }
        StmtKind::Expr(expr) => {
            writeln!(w, "expr ({span})")?;
            print_expr(w, i + 1, expr)?;
        }
    }
    Ok(())
}

fn print_if_arms<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    if_stmt: &If<I>,
) -> std::io::Result<()> {
    if let Some(condition) = &if_stmt.condition {
        print_expr(w, i, condition)?;
    }
    sp(w, i)?;
    writeln!(w, "then")?;
    print_stmts(w, i + 1, &if_stmt.body.stmts)?;

    if let Some(else_branch) = &if_stmt.else_branch {
        sp(w, i)?;
        if else_branch.condition.is_some() {
            writeln!(w, "else if")?;
            print_if_arms(w, i + 1, else_branch)?;
        } else {
            writeln!(w, "else")?;
            print_stmts(w, i + 1, &else_branch.body.stmts)?;
        }
    }
    Ok(())
}

pub fn print_expr<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    expr: &Expr<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    let info = expr.info.write_resolved(); // inferred type, for typed trees
    let span = expr.span;
    match &expr.kind {
        ExprKind::Literal(Literal::Int(val)) => {
            writeln!(w, "int {val} ({span}{info})")?;
        }
        ExprKind::Literal(Literal::Float(val)) => {
            writeln!(w, "float {val:?} ({span}{info})")?;
        }
        ExprKind::Literal(Literal::Bool(val)) => {
            writeln!(w, "bool {val} ({span}{info})")?;
        }
        ExprKind::Id(ident) => {
            writeln!(w, "ident {ident} ({span}{info})")?;
        }
        ExprKind::Unary {
            op,
            expr: inner_expr,
        } => {
            writeln!(w, "unary {op:?} ({span}{info})")?;
            print_expr(w, i + 1, inner_expr)?;
        }
        ExprKind::Binary { op, lhs, rhs, is_fp } => {
            let fp = is_fp.write_fp();
            writeln!(w, "binary {op:?}{fp} ({span}{info})")?;
            print_expr(w, i + 1, lhs)?;
            print_expr(w, i + 1, rhs)?;
        }
        ExprKind::Cast {
            expr: inner_expr,
            ty,
        } => {
            writeln!(w, "cast {ty} ({span}{info})")?;
            print_expr(w, i + 1, inner_expr)?;
        }
        ExprKind::Call { callee, args } => {
            writeln!(w, "call {callee} ({span}{info})")?;
            for arg in args {
                print_expr(w, i + 1, arg)?;
            }
        }
        ExprKind::Index { array, index } => {
            writeln!(w, "index ({span}{info})")?;
            print_expr(w, i + 1, array)?;
            print_expr(w, i + 1, index)?;
        }
        ExprKind::ParenList(items) => {
            writeln!(w, "tuple ({span}{info})")?;
            for item in items {
                print_expr(w, i + 1, item)?;
            }
        }
        ExprKind::SquareList(items) => {
            writeln!(w, "array ({span}{info})")?;
            for item in items {
                print_expr(w, i + 1, item)?;
            }
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub trait InfoWriter: Info<Expr: NameWriter, Decl: DeclWriter, Fp: FpWriter> {}

impl<I> InfoWriter for I
where
    I: Info,
    I::Expr: NameWriter,
    I::Decl: DeclWriter,
    I::Fp: FpWriter,
{
}

pub trait NameWriter {
    fn write_resolved(&self) -> impl std::fmt::Display + '_;
}

impl NameWriter for () {
    fn write_resolved(&self) -> impl std::fmt::Display + '_ {
        ""
    }
}

impl NameWriter for Type {
    fn write_resolved(&self) -> impl std::fmt::Display + '_ {
        pub struct TypeWriter<'a>(&'a Type);

        impl std::fmt::Display for TypeWriter<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, " %: {}", self.0)
            }
        }

        TypeWriter(self)
    }
}

pub trait DeclWriter {
    fn write_declared(&self) -> String;
}

impl DeclWriter for Option<Type> {
    fn write_declared(&self) -> String {
        self.as_ref().map(|ty| format!(": {ty}")).unwrap_or_default()
    }
}

impl DeclWriter for Type {
    fn write_declared(&self) -> String {
        format!(": {self}")
    }
}

pub trait FpWriter {
    fn write_fp(&self) -> &'static str;
}

impl FpWriter for () {
    fn write_fp(&self) -> &'static str {
        ""
    }
}

impl FpWriter for bool {
    fn write_fp(&self) -> &'static str {
        if *self {
            " fp"
        } else {
            ""
        }
    }
}
