use crate::{
    ast::{
        BinaryOperator, Block, Expr, ExprKind, For, Function, If, Literal, Program, Stmt,
        StmtKind, Typed, UnaryOperator,
    },
    ir::{self, BinOp, FloatPredicate, IntPredicate, Value},
    scope::Scope,
    token::{Span, Spanned},
    types::Type,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Lowers an analyzed program to the textual IR of a module named
/// `module_name`.
pub fn emit(program: &Program<Typed>, module_name: &str) -> Result<String> {
    let _span = tracing::debug_span!("emit").entered();

    let mut scope = Scope::new();
    for function in &program.functions {
        let binding = Binding::Func {
            ret: function.return_ty().clone(),
        };
        if scope.define(&function.name.name, binding).is_err() {
            let error = Error::Redefined(function.name.name.clone());
            return Err(function.name.span.wrap(error));
        }
    }

    let mut module = ir::Module::new(module_name);
    for function in &program.functions {
        module.push(FunctionEmitter::emit(&mut scope, function)?);
    }

    let text = module.render_text();
    tracing::debug!(bytes = text.len(), "emitted module");
    Ok(text)
}

#[derive(Clone, Debug)]
enum Binding {
    /// Address of a stack slot.
    Local(Value),
    Func { ret: Type },
}

struct FunctionEmitter<'s> {
    scope: &'s mut Scope<Binding>,
    f: ir::Function,
    ret: Type,
}

impl FunctionEmitter<'_> {
    fn emit(scope: &mut Scope<Binding>, function: &Function<Typed>) -> Result<ir::Function> {
        tracing::trace!(name = %function.name, "emitting function");
        let params: Vec<_> = function
            .params
            .iter()
            .map(|param| (&*param.name.name, param.ty.ty.lower()))
            .collect();
        let ret = function.return_ty().clone();
        let f = ir::Function::new(&function.name.name, &params, ret.lower());
        let mut this = FunctionEmitter { scope, f, ret };

        // Parameters are spilled so that they can be assigned like locals.
        this.scope.push();
        for (index, param) in function.params.iter().enumerate() {
            let ptr = this.f.alloca(&param.ty.ty.lower());
            let value = this.f.param(index).clone();
            this.f.store(&value, &ptr).at(param.name.span)?;
            this.bind(&param.name.name, param.name.span, ptr)?;
        }
        this.emit_stmts(&function.body.stmts)?;
        this.scope.pop();

        // Falling off the end is undefined.
        if !this.f.is_terminated() {
            this.f.unreachable().at(function.body.span)?;
        }
        this.f.verify().at(function.name.span)?;
        Ok(this.f)
    }

    fn emit_stmts(&mut self, stmts: &[Stmt<Typed>]) -> Result<()> {
        stmts.iter().try_for_each(|stmt| self.emit_stmt(stmt))
    }

    /// Emits `block`'s statements in a new scope, at the current position.
    fn emit_scoped(&mut self, block: &Block<Typed>) -> Result<()> {
        self.scope.push();
        let result = self.emit_stmts(&block.stmts);
        self.scope.pop();
        result
    }

    fn emit_stmt(&mut self, stmt: &Stmt<Typed>) -> Result<()> {
        // Code following a terminator can't run, but still needs a block.
        if self.f.is_terminated() {
            let dead = self.f.new_block("block");
            self.f.position_at_end(dead);
        }

        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Assignment {
                target,
                ty,
                value,
                is_declaration,
            } => {
                let value = self.emit_expr(value)?;
                let ptr = if *is_declaration {
                    let ptr = self.f.alloca(&ty.lower());
                    self.bind(&target.name, target.span, ptr.clone())?;
                    ptr
                } else {
                    self.local(&target.name, target.span)?
                };
                self.f.store(&value, &ptr).at(span)?;
            }
            StmtKind::Return(value) => {
                let result = self.emit_expr(value)?;
                let result = self.f.cast(&result, &self.ret.lower()).at(value.span)?;
                self.f.ret(&result).at(span)?;
            }
            StmtKind::Block(block) => {
                let body = self.f.new_block("block");
                self.f.br(body).at(span)?;
                self.f.position_at_end(body);
                self.emit_scoped(block)?;
                if !self.f.is_terminated() {
                    let next = self.f.new_block("block.end");
                    self.f.br(next).at(span)?;
                    self.f.position_at_end(next);
                }
            }
            StmtKind::If(if_stmt) => self.emit_if(if_stmt, span)?,
            StmtKind::For(for_stmt) => {
                self.scope.push();
                let result = self.emit_for(for_stmt, span);
                self.scope.pop();
                result?;
            }
            StmtKind::Expr(expr) => {
                self.emit_expr(expr)?;
            }
        }
        Ok(())
    }

    /// Emits a conditional. The join block is only created if some arm
    /// falls through.
    fn emit_if(&mut self, if_stmt: &If<Typed>, span: Span) -> Result<()> {
        let Some(condition) = &if_stmt.condition else {
            return self.emit_scoped(&if_stmt.body);
        };
        let cond = self.emit_expr(condition)?;
        let then = self.f.new_block("if.then");

        let Some(else_branch) = &if_stmt.else_branch else {
            let end = self.f.new_block("if.end");
            self.f.cond_br(&cond, then, end).at(span)?;
            self.f.position_at_end(then);
            self.emit_scoped(&if_stmt.body)?;
            if !self.f.is_terminated() {
                self.f.br(end).at(span)?;
            }
            self.f.position_at_end(end);
            return Ok(());
        };

        let otherwise = self.f.new_block("if.else");
        self.f.cond_br(&cond, then, otherwise).at(span)?;

        let mut open_arms = Vec::with_capacity(2);
        self.f.position_at_end(then);
        self.emit_scoped(&if_stmt.body)?;
        if !self.f.is_terminated() {
            open_arms.push(self.f.current_block());
        }
        self.f.position_at_end(otherwise);
        self.emit_if(else_branch, span)?;
        if !self.f.is_terminated() {
            open_arms.push(self.f.current_block());
        }

        if !open_arms.is_empty() {
            let end = self.f.new_block("if.end");
            for arm in open_arms {
                self.f.position_at_end(arm);
                self.f.br(end).at(span)?;
            }
            self.f.position_at_end(end);
        }
        Ok(())
    }

    /// Emits a loop whose condition is tested before the first iteration and
    /// again at the end of the body.
    fn emit_for(&mut self, for_stmt: &For<Typed>, span: Span) -> Result<()> {
        self.emit_stmt(&for_stmt.init)?;
        let cond = self.emit_expr(&for_stmt.condition)?;
        let body = self.f.new_block("for.body");
        let end = self.f.new_block("for.end");
        self.f.cond_br(&cond, body, end).at(span)?;

        self.f.position_at_end(body);
        self.emit_scoped(&for_stmt.body)?;
        if !self.f.is_terminated() {
            self.emit_stmt(&for_stmt.increment)?;
            let cond = self.emit_expr(&for_stmt.condition)?;
            self.f.cond_br(&cond, body, end).at(span)?;
        }
        self.f.position_at_end(end);
        Ok(())
    }

    fn emit_expr(&mut self, expr: &Expr<Typed>) -> Result<Value> {
        let span = expr.span;
        let ty = expr.ty().lower();
        let value = match &expr.kind {
            ExprKind::Literal(Literal::Int(value)) => Value::int(ty, *value),
            ExprKind::Literal(Literal::Float(value)) => Value::float(ty, *value),
            ExprKind::Literal(Literal::Bool(value)) => Value::bool(*value),
            ExprKind::Id(ident) => {
                let ptr = self.local(&ident.name, span)?;
                self.f.load(&ty, &ptr).at(span)?
            }
            ExprKind::Unary {
                op: UnaryOperator::Plus,
                expr,
            } => self.emit_expr(expr)?,
            ExprKind::Unary {
                op: UnaryOperator::Neg,
                expr,
            } => {
                let value = self.emit_expr(expr)?;
                if ty.is_float() {
                    self.f.fneg(&value).at(span)?
                } else {
                    self.f.binary(BinOp::Sub, &Value::zero(&ty), &value).at(span)?
                }
            }
            ExprKind::Binary {
                op,
                lhs,
                rhs,
                is_fp,
            } => {
                let lhs = self.emit_expr(lhs)?;
                let rhs = self.emit_expr(rhs)?;
                self.emit_binary(*op, *is_fp, &lhs, &rhs).at(span)?
            }
            ExprKind::Cast { expr, ty: target } => {
                let value = self.emit_expr(expr)?;
                self.f.cast(&value, &target.lower()).at(span)?
            }
            ExprKind::Call { callee, args } => {
                let ret = match self.scope.lookup(&callee.name) {
                    Some(Binding::Func { ret }) => ret.lower(),
                    _ => return Err(callee.span.wrap(Error::UndefinedFunction(callee.name.clone()))),
                };
                let args = args
                    .iter()
                    .map(|arg| self.emit_expr(arg))
                    .collect::<Result<Vec<_>>>()?;
                self.f.call(&ret, &callee.name, &args).at(span)?
            }
            ExprKind::Index { array, index } => {
                let ptr = self.emit_address(array)?;
                let index = self.emit_expr(index)?;
                let elem_ptr = self
                    .f
                    .element_ptr(&array.ty().lower(), &ptr, &index)
                    .at(span)?;
                self.f.load(&ty, &elem_ptr).at(span)?
            }
            ExprKind::SquareList(items) => {
                let mut aggregate = Value::undef(ty);
                for (index, item) in (0..).zip(items) {
                    let item = self.emit_expr(item)?;
                    aggregate = self.f.insert_value(&aggregate, &item, index).at(span)?;
                }
                aggregate
            }
            ExprKind::ParenList(_) => return Err(span.wrap(Error::Unsupported("tuple"))),
        };
        Ok(value)
    }

    fn emit_binary(
        &mut self,
        op: BinaryOperator,
        is_fp: bool,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<Value, ir::Error> {
        use BinaryOperator::*;
        if is_fp {
            let arith = match op {
                Add => BinOp::FAdd,
                Sub => BinOp::FSub,
                Mul => BinOp::FMul,
                Div | FloorDiv => BinOp::FDiv,
                Rem => BinOp::FRem,
                Lt | Le | Gt | Ge | Eq | Ne => {
                    let pred = match op {
                        Lt => FloatPredicate::Olt,
                        Le => FloatPredicate::Ole,
                        Gt => FloatPredicate::Ogt,
                        Ge => FloatPredicate::Oge,
                        Eq => FloatPredicate::Oeq,
                        _ => FloatPredicate::One,
                    };
                    return self.f.fcmp(pred, lhs, rhs);
                }
            };
            self.f.binary(arith, lhs, rhs)
        } else {
            let arith = match op {
                Add => BinOp::Add,
                Sub => BinOp::Sub,
                Mul => BinOp::Mul,
                Div | FloorDiv => BinOp::SDiv,
                Rem => BinOp::SRem,
                Lt | Le | Gt | Ge | Eq | Ne => {
                    let pred = match op {
                        Lt => IntPredicate::Slt,
                        Le => IntPredicate::Sle,
                        Gt => IntPredicate::Sgt,
                        Ge => IntPredicate::Sge,
                        Eq => IntPredicate::Eq,
                        _ => IntPredicate::Ne,
                    };
                    return self.f.icmp(pred, lhs, rhs);
                }
            };
            self.f.binary(arith, lhs, rhs)
        }
    }

    /// Returns a pointer to the storage of an array-typed expression.
    /// Variables are addressed in place; other values are spilled first.
    fn emit_address(&mut self, array: &Expr<Typed>) -> Result<Value> {
        if let ExprKind::Id(ident) = &array.kind {
            return self.local(&ident.name, array.span);
        }
        let value = self.emit_expr(array)?;
        let ptr = self.f.alloca(value.ty());
        self.f.store(&value, &ptr).at(array.span)?;
        Ok(ptr)
    }

    fn local(&self, name: &str, span: Span) -> Result<Value> {
        match self.scope.lookup(name) {
            Some(Binding::Local(ptr)) => Ok(ptr.clone()),
            _ => Err(span.wrap(Error::UndefinedName(name.into()))),
        }
    }

    fn bind(&mut self, name: &str, span: Span, ptr: Value) -> Result<()> {
        self.scope
            .define(name, Binding::Local(ptr))
            .map_err(|_| span.wrap(Error::Redefined(name.into())))
    }
}

trait At<T> {
    /// Attaches the span of the construct being lowered to a builder error.
    fn at(self, span: Span) -> Result<T>;
}

impl<T> At<T> for Result<T, ir::Error> {
    fn at(self, span: Span) -> Result<T> {
        self.map_err(|error| span.wrap(Error::Ir(error)))
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Ir(#[from] ir::Error),
    #[error("undefined: {0}")]
    UndefinedName(Box<str>),
    #[error("undefined function: {0}")]
    UndefinedFunction(Box<str>),
    #[error("{0} redefined")]
    Redefined(Box<str>),
    #[error("{0} values can't be lowered")]
    Unsupported(&'static str),
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests! {
        use emitter;

        fn test_return_is_converted() {
            let program = "f :: -> i32 { return 123 }\n";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i32 @f() {
                entry:
                  %t1 = trunc i64 123 to i32
                  ret i32 %t1
                }
            ";
        }

        fn test_brace_on_next_line() {
            let program = "main :: -> int\n{\n    return 0\n}\n";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i64 @main() {
                entry:
                  ret i64 0
                }
            ";
        }

        fn test_call_arguments() {
            let program = "add :: i32 a, i64 b -> i64 { return a + b }\nmain :: -> i32 { return add(10, 243) }\n";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i64 @add(i32 %p.a, i64 %p.b) {
                entry:
                  %t1 = alloca i32
                  %t2 = alloca i64
                  store i32 %p.a, ptr %t1
                  store i64 %p.b, ptr %t2
                  %t3 = load i32, ptr %t1
                  %t4 = sext i32 %t3 to i64
                  %t5 = load i64, ptr %t2
                  %t6 = add i64 %t4, %t5
                  ret i64 %t6
                }

                define i32 @main() {
                entry:
                  %t1 = trunc i64 10 to i32
                  %t2 = call i64 @add(i32 %t1, i64 243)
                  %t3 = trunc i64 %t2 to i32
                  ret i32 %t3
                }
            ";
        }

        fn test_if_else_without_join() {
            let program = "
g :: i32 x -> i32 {
    if x > 0 {
        return 1
    } else {
        return -1
    }
}
";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i32 @g(i32 %p.x) {
                entry:
                  %t1 = alloca i32
                  store i32 %p.x, ptr %t1
                  %t2 = load i32, ptr %t1
                  %t3 = sext i32 %t2 to i64
                  %t4 = icmp sgt i64 %t3, 0
                  br i1 %t4, label %if.then1, label %if.else2

                if.then1:
                  %t5 = trunc i64 1 to i32
                  ret i32 %t5

                if.else2:
                  %t6 = sub i64 0, 1
                  %t7 = trunc i64 %t6 to i32
                  ret i32 %t7
                }
            ";
        }

        fn test_if_else_with_join() {
            let program = "p :: i32 a -> i32 { b := 0; if a == 1 { b = 2 } else { b = 3 }; return b }";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i32 @p(i32 %p.a) {
                entry:
                  %t1 = alloca i32
                  %t2 = alloca i64
                  store i32 %p.a, ptr %t1
                  store i64 0, ptr %t2
                  %t3 = load i32, ptr %t1
                  %t4 = sext i32 %t3 to i64
                  %t5 = icmp eq i64 %t4, 1
                  br i1 %t5, label %if.then1, label %if.else2

                if.then1:
                  store i64 2, ptr %t2
                  br label %if.end3

                if.else2:
                  store i64 3, ptr %t2
                  br label %if.end3

                if.end3:
                  %t6 = load i64, ptr %t2
                  %t7 = trunc i64 %t6 to i32
                  ret i32 %t7
                }
            ";
        }

        fn test_if_without_else() {
            let program = "k :: bool c -> i8 { if c { return 1 }; return 2 }";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i8 @k(i1 %p.c) {
                entry:
                  %t1 = alloca i1
                  store i1 %p.c, ptr %t1
                  %t2 = load i1, ptr %t1
                  br i1 %t2, label %if.then1, label %if.end2

                if.then1:
                  %t3 = trunc i64 1 to i8
                  ret i8 %t3

                if.end2:
                  %t4 = trunc i64 2 to i8
                  ret i8 %t4
                }
            ";
        }

        fn test_for_loop() {
            let program = "h :: -> int { i := 0; for i := 0; i < 10; i = i + 1 { }; return i }";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i64 @h() {
                entry:
                  %t1 = alloca i64
                  %t2 = alloca i64
                  store i64 0, ptr %t1
                  store i64 0, ptr %t2
                  %t3 = load i64, ptr %t2
                  %t4 = icmp slt i64 %t3, 10
                  br i1 %t4, label %for.body1, label %for.end2

                for.body1:
                  %t5 = load i64, ptr %t2
                  %t6 = add i64 %t5, 1
                  store i64 %t6, ptr %t2
                  %t7 = load i64, ptr %t2
                  %t8 = icmp slt i64 %t7, 10
                  br i1 %t8, label %for.body1, label %for.end2

                for.end2:
                  %t9 = load i64, ptr %t1
                  ret i64 %t9
                }
            ";
        }

        fn test_code_after_return_gets_a_block() {
            let program = "m :: -> int { return 1; return 2 }";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i64 @m() {
                entry:
                  ret i64 1

                block1:
                  ret i64 2
                }
            ";
        }

        fn test_fall_through_is_unreachable() {
            let program = "n :: -> int { x := 1 }";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i64 @n() {
                entry:
                  %t1 = alloca i64
                  store i64 1, ptr %t1
                  unreachable
                }
            ";
        }

        fn test_nested_block() {
            let program = "b :: -> f64 { x := 1.5; { x = -x }; return x }";
            let ir_ok = "
                ; ModuleID = 'ben'

                define double @b() {
                entry:
                  %t1 = alloca double
                  store double 0x3FF8000000000000, ptr %t1
                  br label %block1

                block1:
                  %t2 = load double, ptr %t1
                  %t3 = fneg double %t2
                  store double %t3, ptr %t1
                  br label %block.end2

                block.end2:
                  %t4 = load double, ptr %t1
                  ret double %t4
                }
            ";
        }

        fn test_arrays() {
            let program = "q :: -> i32 { [3]i32 a = [1, 2, 3]; return a[1] }";
            let ir_ok = "
                ; ModuleID = 'ben'

                define i32 @q() {
                entry:
                  %t7 = alloca [3 x i32]
                  %t1 = trunc i64 1 to i32
                  %t2 = insertvalue [3 x i32] undef, i32 %t1, 0
                  %t3 = trunc i64 2 to i32
                  %t4 = insertvalue [3 x i32] %t2, i32 %t3, 1
                  %t5 = trunc i64 3 to i32
                  %t6 = insertvalue [3 x i32] %t4, i32 %t5, 2
                  store [3 x i32] %t6, ptr %t7
                  %t8 = getelementptr inbounds [3 x i32], ptr %t7, i64 0, i64 1
                  %t9 = load i32, ptr %t8
                  ret i32 %t9
                }
            ";
        }

        fn test_float_arithmetic() {
            let program = "r :: f32 x -> f32 { return x * 2.0 }";
            let ir_ok = "
                ; ModuleID = 'ben'

                define float @r(float %p.x) {
                entry:
                  %t1 = alloca float
                  store float %p.x, ptr %t1
                  %t2 = load float, ptr %t1
                  %t3 = fpext float %t2 to double
                  %t4 = fmul double %t3, 0x4000000000000000
                  %t5 = fptrunc double %t4 to float
                  ret float %t5
                }
            ";
        }

        fn test_tuples_are_rejected() {
            let program = "t :: -> int { x := (1, 2); return 0 }";
            let expected_errors = &["19..25: tuples are not supported"];
        }
    }
}
