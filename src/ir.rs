//! A small builder for LLVM's textual IR.
//!
//! A [`Function`] is a list of basic blocks, each of which is a sequence of
//! instructions ending in exactly one terminator (`br`, `ret` or
//! `unreachable`). Once a block is terminated, appending to it fails with
//! [`Error::Terminated`]; callers must position the builder at another block
//! first. Stack slots are always allocated in the entry block.

use std::fmt;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    I1,
    I8,
    I16,
    I32,
    I64,
    Float,
    Double,
    Ptr,
    Array(u64, Box<Type>),
}

impl Type {
    pub fn int_bits(&self) -> Option<u32> {
        match self {
            Type::I1 => Some(1),
            Type::I8 => Some(8),
            Type::I16 => Some(16),
            Type::I32 => Some(32),
            Type::I64 => Some(64),
            _ => None,
        }
    }

    pub fn float_bits(&self) -> Option<u32> {
        match self {
            Type::Float => Some(32),
            Type::Double => Some(64),
            _ => None,
        }
    }

    pub fn is_float(&self) -> bool {
        self.float_bits().is_some()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I1 => f.write_str("i1"),
            Type::I8 => f.write_str("i8"),
            Type::I16 => f.write_str("i16"),
            Type::I32 => f.write_str("i32"),
            Type::I64 => f.write_str("i64"),
            Type::Float => f.write_str("float"),
            Type::Double => f.write_str("double"),
            Type::Ptr => f.write_str("ptr"),
            Type::Array(len, elem) => write!(f, "[{len} x {elem}]"),
        }
    }
}

/// An operand: either a constant or a register.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    ty: Type,
    repr: Box<str>,
}

impl Value {
    pub fn int(ty: Type, value: i64) -> Value {
        debug_assert!(ty.int_bits().is_some());
        Value {
            ty,
            repr: value.to_string().into(),
        }
    }

    pub fn bool(value: bool) -> Value {
        Value {
            ty: Type::I1,
            repr: if value { "true" } else { "false" }.into(),
        }
    }

    /// Floating-point constants are written as the hexadecimal bits of the
    /// equivalent `double`, as the textual format requires.
    pub fn float(ty: Type, value: f64) -> Value {
        let bits = match ty {
            Type::Float => f64::from(value as f32).to_bits(),
            _ => value.to_bits(),
        };
        Value {
            ty,
            repr: format!("0x{bits:016X}").into(),
        }
    }

    pub fn zero(ty: &Type) -> Value {
        if ty.is_float() {
            Value::float(ty.clone(), 0.0)
        } else {
            Value::int(ty.clone(), 0)
        }
    }

    /// An unspecified value, used as the seed of aggregate constructions.
    pub fn undef(ty: Type) -> Value {
        Value {
            ty,
            repr: "undef".into(),
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

/// Handle to a block of the function that created it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinOp {
    fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::SRem => "srem",
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::FRem => "frem",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FloatPredicate {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
    Une,
}

#[derive(Debug)]
struct Block {
    label: Box<str>,
    insts: Vec<String>,
    terminated: bool,
}

#[derive(Debug)]
pub struct Function {
    name: Box<str>,
    params: Vec<Value>,
    ret: Type,
    blocks: Vec<Block>,
    /// Blocks in the order the builder first entered them.
    order: Vec<usize>,
    allocas: Vec<String>,
    current: usize,
    next_reg: u32,
    next_label: u32,
}

impl Function {
    /// Creates a function positioned at its (empty) entry block. Each
    /// parameter is named after its source name.
    pub fn new(name: &str, params: &[(&str, Type)], ret: Type) -> Function {
        let params = params
            .iter()
            .map(|(name, ty)| Value {
                ty: ty.clone(),
                repr: format!("%p.{name}").into(),
            })
            .collect();
        Function {
            name: name.into(),
            params,
            ret,
            blocks: vec![Block {
                label: "entry".into(),
                insts: Vec::new(),
                terminated: false,
            }],
            order: vec![0],
            allocas: Vec::new(),
            current: 0,
            next_reg: 1,
            next_label: 1,
        }
    }

    pub fn param(&self, index: usize) -> &Value {
        &self.params[index]
    }

    /// Creates a new block named after `prefix`. The builder stays where it
    /// is.
    pub fn new_block(&mut self, prefix: &str) -> Label {
        let label = format!("{prefix}{}", self.next_label);
        self.next_label += 1;
        tracing::trace!(%label, "new block");
        self.blocks.push(Block {
            label: label.into(),
            insts: Vec::new(),
            terminated: false,
        });
        Label(self.blocks.len() - 1)
    }

    pub fn position_at_end(&mut self, label: Label) {
        if !self.order.contains(&label.0) {
            self.order.push(label.0);
        }
        self.current = label.0;
    }

    pub fn current_block(&self) -> Label {
        Label(self.current)
    }

    pub fn is_terminated(&self) -> bool {
        self.blocks[self.current].terminated
    }

    /// Allocates a stack slot in the entry block, returning its address.
    pub fn alloca(&mut self, ty: &Type) -> Value {
        let reg = self.fresh_reg(Type::Ptr);
        self.allocas.push(format!("{reg} = alloca {ty}"));
        reg
    }

    pub fn store(&mut self, value: &Value, ptr: &Value) -> Result<()> {
        self.push(format!("store {} {value}, ptr {ptr}", value.ty))
    }

    pub fn load(&mut self, ty: &Type, ptr: &Value) -> Result<Value> {
        let reg = self.fresh_reg(ty.clone());
        self.push(format!("{reg} = load {ty}, ptr {ptr}"))?;
        Ok(reg)
    }

    pub fn binary(&mut self, op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value> {
        Self::same_operands(lhs, rhs)?;
        let reg = self.fresh_reg(lhs.ty.clone());
        let mnemonic = op.mnemonic();
        self.push(format!("{reg} = {mnemonic} {} {lhs}, {rhs}", lhs.ty))?;
        Ok(reg)
    }

    pub fn fneg(&mut self, value: &Value) -> Result<Value> {
        let reg = self.fresh_reg(value.ty.clone());
        self.push(format!("{reg} = fneg {} {value}", value.ty))?;
        Ok(reg)
    }

    pub fn icmp(&mut self, pred: IntPredicate, lhs: &Value, rhs: &Value) -> Result<Value> {
        Self::same_operands(lhs, rhs)?;
        let pred = format!("{pred:?}").to_lowercase();
        let reg = self.fresh_reg(Type::I1);
        self.push(format!("{reg} = icmp {pred} {} {lhs}, {rhs}", lhs.ty))?;
        Ok(reg)
    }

    pub fn fcmp(&mut self, pred: FloatPredicate, lhs: &Value, rhs: &Value) -> Result<Value> {
        Self::same_operands(lhs, rhs)?;
        let pred = format!("{pred:?}").to_lowercase();
        let reg = self.fresh_reg(Type::I1);
        self.push(format!("{reg} = fcmp {pred} {} {lhs}, {rhs}", lhs.ty))?;
        Ok(reg)
    }

    /// Converts `value` to `to`, picking the conversion from the two types.
    /// Returns `value` itself if it already has that type.
    pub fn cast(&mut self, value: &Value, to: &Type) -> Result<Value> {
        let from = &value.ty;
        if from == to {
            return Ok(value.clone());
        }
        let op = match (from.int_bits(), from.float_bits(), to.int_bits(), to.float_bits()) {
            // Anything to bool compares against zero.
            (Some(_), _, Some(1), _) => {
                return self.icmp(IntPredicate::Ne, value, &Value::zero(from));
            }
            (_, Some(_), Some(1), _) => {
                return self.fcmp(FloatPredicate::Une, value, &Value::zero(from));
            }
            (Some(1), _, Some(_), _) => "zext",
            (Some(a), _, Some(b), _) if a < b => "sext",
            (Some(_), _, Some(_), _) => "trunc",
            (Some(1), _, _, Some(_)) => "uitofp",
            (Some(_), _, _, Some(_)) => "sitofp",
            (_, Some(_), Some(_), _) => "fptosi",
            (_, Some(a), _, Some(b)) if a < b => "fpext",
            (_, Some(_), _, Some(_)) => "fptrunc",
            _ => {
                return Err(Error::InvalidCast {
                    from: from.clone(),
                    to: to.clone(),
                })
            }
        };
        let reg = self.fresh_reg(to.clone());
        self.push(format!("{reg} = {op} {from} {value} to {to}"))?;
        Ok(reg)
    }

    /// Computes the address of `array[index]`, where `ptr` points to a value
    /// of type `array_ty`.
    pub fn element_ptr(&mut self, array_ty: &Type, ptr: &Value, index: &Value) -> Result<Value> {
        let reg = self.fresh_reg(Type::Ptr);
        self.push(format!(
            "{reg} = getelementptr inbounds {array_ty}, ptr {ptr}, i64 0, {} {index}",
            index.ty
        ))?;
        Ok(reg)
    }

    /// Returns a copy of `aggregate` with the element at `index` replaced.
    pub fn insert_value(&mut self, aggregate: &Value, elem: &Value, index: u64) -> Result<Value> {
        let ty = &aggregate.ty;
        let reg = self.fresh_reg(ty.clone());
        self.push(format!(
            "{reg} = insertvalue {ty} {aggregate}, {} {elem}, {index}",
            elem.ty
        ))?;
        Ok(reg)
    }

    pub fn call(&mut self, ret: &Type, callee: &str, args: &[Value]) -> Result<Value> {
        let reg = self.fresh_reg(ret.clone());
        let args: Vec<_> = args.iter().map(|arg| format!("{} {arg}", arg.ty)).collect();
        self.push(format!("{reg} = call {ret} @{callee}({})", args.join(", ")))?;
        Ok(reg)
    }

    pub fn br(&mut self, target: Label) -> Result<()> {
        let target = &self.blocks[target.0].label;
        let inst = format!("br label %{target}");
        self.terminate(inst)
    }

    pub fn cond_br(&mut self, cond: &Value, then: Label, otherwise: Label) -> Result<()> {
        let then = &self.blocks[then.0].label;
        let otherwise = &self.blocks[otherwise.0].label;
        let inst = format!("br i1 {cond}, label %{then}, label %{otherwise}");
        self.terminate(inst)
    }

    pub fn ret(&mut self, value: &Value) -> Result<()> {
        self.terminate(format!("ret {} {value}", value.ty))
    }

    pub fn unreachable(&mut self) -> Result<()> {
        self.terminate("unreachable".to_owned())
    }

    /// Checks that every block the builder entered was terminated.
    pub fn verify(&self) -> Result<()> {
        for &index in &self.order {
            let block = &self.blocks[index];
            if !block.terminated {
                return Err(Error::Unterminated(block.label.clone()));
            }
        }
        Ok(())
    }

    fn fresh_reg(&mut self, ty: Type) -> Value {
        let repr = format!("%t{}", self.next_reg).into();
        self.next_reg += 1;
        Value { ty, repr }
    }

    fn push(&mut self, inst: String) -> Result<()> {
        let block = &mut self.blocks[self.current];
        if block.terminated {
            return Err(Error::Terminated(block.label.clone()));
        }
        block.insts.push(inst);
        Ok(())
    }

    fn terminate(&mut self, inst: String) -> Result<()> {
        self.push(inst)?;
        self.blocks[self.current].terminated = true;
        Ok(())
    }

    fn same_operands(lhs: &Value, rhs: &Value) -> Result<()> {
        if lhs.ty != rhs.ty {
            return Err(Error::OperandMismatch {
                lhs: lhs.ty.clone(),
                rhs: rhs.ty.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define {} @{}(", self.ret, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {param}", param.ty)?;
        }
        writeln!(f, ") {{")?;
        for (i, &index) in self.order.iter().enumerate() {
            let block = &self.blocks[index];
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            if index == 0 {
                for alloca in &self.allocas {
                    writeln!(f, "  {alloca}")?;
                }
            }
            for inst in &block.insts {
                writeln!(f, "  {inst}")?;
            }
        }
        writeln!(f, "}}")
    }
}

#[derive(Debug, Default)]
pub struct Module {
    name: Box<str>,
    functions: Vec<Function>,
}

impl Module {
    pub fn new(name: &str) -> Module {
        Module {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn push(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("block {0} already has a terminator")]
    Terminated(Box<str>),
    #[error("block {0} has no terminator")]
    Unterminated(Box<str>),
    #[error("operand types differ: {lhs} and {rhs}")]
    OperandMismatch { lhs: Type, rhs: Type },
    #[error("no conversion from {from} to {to}")]
    InvalidCast { from: Type, to: Type },
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function() {
        let mut f = Function::new("add", &[("a", Type::I32), ("b", Type::I64)], Type::I64);
        let slot = f.alloca(&Type::I32);
        let a = f.param(0).clone();
        f.store(&a, &slot).unwrap();
        let a = f.load(&Type::I32, &slot).unwrap();
        let a = f.cast(&a, &Type::I64).unwrap();
        let b = f.param(1).clone();
        let sum = f.binary(BinOp::Add, &a, &b).unwrap();
        f.ret(&sum).unwrap();
        f.verify().unwrap();

        let expected = indoc! {"
            define i64 @add(i32 %p.a, i64 %p.b) {
            entry:
              %t1 = alloca i32
              store i32 %p.a, ptr %t1
              %t2 = load i32, ptr %t1
              %t3 = sext i32 %t2 to i64
              %t4 = add i64 %t3, %p.b
              ret i64 %t4
            }
        "};
        assert_eq!(f.to_string(), expected);
    }

    #[test]
    fn test_blocks_and_terminators() {
        let mut f = Function::new("g", &[], Type::I32);
        let then = f.new_block("if.then");
        let end = f.new_block("if.end");
        f.cond_br(&Value::bool(true), then, end).unwrap();
        assert!(f.is_terminated());
        assert_eq!(
            f.ret(&Value::int(Type::I32, 0)),
            Err(Error::Terminated("entry".into()))
        );

        f.position_at_end(then);
        f.br(end).unwrap();
        f.position_at_end(end);
        assert_eq!(f.verify(), Err(Error::Unterminated("if.end2".into())));
        f.ret(&Value::int(Type::I32, 0)).unwrap();
        f.verify().unwrap();

        let expected = indoc! {"
            define i32 @g() {
            entry:
              br i1 true, label %if.then1, label %if.end2

            if.then1:
              br label %if.end2

            if.end2:
              ret i32 0
            }
        "};
        assert_eq!(f.to_string(), expected);
    }

    #[test]
    fn test_casts() {
        let mut f = Function::new("c", &[], Type::I1);
        let cases = [
            (Value::int(Type::I64, 1), Type::I32, "trunc i64 1 to i32"),
            (Value::int(Type::I8, 1), Type::I16, "sext i8 1 to i16"),
            (Value::bool(true), Type::I32, "zext i1 true to i32"),
            (Value::int(Type::I32, 1), Type::Double, "sitofp i32 1 to double"),
            (
                Value::float(Type::Double, 1.0),
                Type::I64,
                "fptosi double 0x3FF0000000000000 to i64",
            ),
            (
                Value::float(Type::Float, 0.5),
                Type::Double,
                "fpext float 0x3FE0000000000000 to double",
            ),
            (
                Value::float(Type::Double, 0.5),
                Type::Float,
                "fptrunc double 0x3FE0000000000000 to float",
            ),
            (Value::int(Type::I64, 3), Type::I1, "icmp ne i64 3, 0"),
        ];
        for (i, (value, to, expected)) in cases.into_iter().enumerate() {
            let reg = f.cast(&value, &to).unwrap();
            assert_eq!(reg.ty(), &to);
            assert_eq!(f.blocks[0].insts[i], format!("{reg} = {expected}"));
        }

        let same = Value::int(Type::I32, 7);
        assert_eq!(f.cast(&same, &Type::I32).unwrap(), same);
        assert_eq!(
            f.cast(&same, &Type::Ptr),
            Err(Error::InvalidCast {
                from: Type::I32,
                to: Type::Ptr
            })
        );
    }

    #[test]
    fn test_float_constants() {
        assert_eq!(Value::float(Type::Double, 14.5).to_string(), "0x402D000000000000");
        // 0.1 isn't representable as a float, so it's rounded first.
        assert_eq!(Value::float(Type::Float, 0.1).to_string(), "0x3FB99999A0000000");
        assert_eq!(Value::zero(&Type::Double).to_string(), "0x0000000000000000");
    }

    #[test]
    fn test_operand_mismatch() {
        let mut f = Function::new("m", &[], Type::I32);
        let error = f
            .binary(BinOp::Add, &Value::int(Type::I32, 1), &Value::int(Type::I64, 2))
            .unwrap_err();
        assert_eq!(
            error,
            Error::OperandMismatch {
                lhs: Type::I32,
                rhs: Type::I64
            }
        );
    }

    #[test]
    fn test_module() {
        let mut module = Module::new("ben");
        let mut f = Function::new("main", &[], Type::I64);
        let values = [Value::int(Type::I64, 1)];
        let result = f.call(&Type::I64, "one", &values).unwrap();
        f.ret(&result).unwrap();
        module.push(f);
        let expected = indoc! {"
            ; ModuleID = 'ben'

            define i64 @main() {
            entry:
              %t1 = call i64 @one(i64 1)
              ret i64 %t1
            }
        "};
        assert_eq!(module.render_text(), expected);
    }
}
