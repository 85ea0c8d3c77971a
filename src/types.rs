use std::fmt;

use crate::ir;

/// Scalar element of the type lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    /// Machine-width signed integer. Interchangeable with [`BasicKind::I64`].
    Int,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,

    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        use BasicKind::*;
        match self {
            Bool => "bool",
            Int => "int",
            I8 => "i8",
            I16 => "i16",
            I32 => "i32",
            I64 => "i64",
            U8 => "u8",
            U16 => "u16",
            U32 => "u32",
            U64 => "u64",
            F32 => "f32",
            F64 => "f64",
            String => "string",
            UntypedBool => "untyped bool",
            UntypedInt => "untyped int",
            UntypedFloat => "untyped float",
            UntypedString => "untyped string",
        }
    }

    /// The concrete kind an untyped literal takes when nothing else
    /// constrains it.
    pub fn defaulted(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedFloat => BasicKind::F64,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }

    /// Collapses kinds which share a representation (`int` and `i64`).
    fn canonical(self) -> BasicKind {
        match self.defaulted() {
            BasicKind::Int => BasicKind::I64,
            other => other,
        }
    }

    /// Position in the integer promotion order: i8 < i16 < i32 < i64 = int.
    pub fn int_rank(self) -> Option<u8> {
        use BasicKind::*;
        match self.defaulted() {
            I8 | U8 => Some(1),
            I16 | U16 => Some(2),
            I32 | U32 => Some(3),
            I64 | U64 | Int => Some(4),
            _ => None,
        }
    }

    pub fn float_rank(self) -> Option<u8> {
        match self.defaulted() {
            BasicKind::F32 => Some(1),
            BasicKind::F64 => Some(2),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        self.int_rank().is_some()
    }

    pub fn is_float(self) -> bool {
        self.float_rank().is_some()
    }

    pub fn is_untyped(self) -> bool {
        self != self.defaulted()
    }

    pub fn lower(self) -> ir::Type {
        use BasicKind::*;
        match self.canonical() {
            Bool => ir::Type::I1,
            I8 | U8 => ir::Type::I8,
            I16 | U16 => ir::Type::I16,
            I32 | U32 => ir::Type::I32,
            I64 | U64 => ir::Type::I64,
            F32 => ir::Type::Float,
            F64 => ir::Type::Double,
            String => ir::Type::Ptr,
            Int | UntypedBool | UntypedInt | UntypedFloat | UntypedString => {
                unreachable!("canonical kinds are concrete")
            }
        }
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(BasicKind),
    Array(Box<Type>, u64),
    Pointer(Box<Type>),
}

impl Type {
    pub const BOOL: Type = Type::Basic(BasicKind::Bool);
    pub const INT: Type = Type::Basic(BasicKind::Int);
    pub const F64: Type = Type::Basic(BasicKind::F64);

    /// Itself for basic types, the element or pointee for compound ones.
    pub fn base(&self) -> &Type {
        match self {
            Type::Basic(_) => self,
            Type::Array(elem, _) | Type::Pointer(elem) => elem,
        }
    }

    pub fn lower(&self) -> ir::Type {
        match self {
            Type::Basic(kind) => kind.lower(),
            Type::Array(elem, len) => ir::Type::Array(*len, Box::new(elem.lower())),
            Type::Pointer(_) => ir::Type::Ptr,
        }
    }

    pub fn basic(&self) -> Option<BasicKind> {
        match self {
            Type::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.basic().is_some_and(BasicKind::is_integer)
    }

    pub fn is_float(&self) -> bool {
        self.basic().is_some_and(BasicKind::is_float)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_bool(&self) -> bool {
        self.basic()
            .is_some_and(|kind| kind.defaulted() == BasicKind::Bool)
    }

    /// Type equality up to representation: `int` and `i64` are the same
    /// type, untyped kinds equal their defaults.
    pub fn identical(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Basic(a), Type::Basic(b)) => a.canonical() == b.canonical(),
            (Type::Array(a, n), Type::Array(b, m)) => n == m && a.identical(b),
            (Type::Pointer(a), Type::Pointer(b)) => a.identical(b),
            _ => false,
        }
    }

    /// Resolves the common type of two arithmetic operands.
    ///
    /// Any floating-point operand wins over an integer one; otherwise the
    /// operand with the greater rank wins (the left one on ties). Returns
    /// `None` if either operand is not numeric.
    pub fn promote(lhs: &Type, rhs: &Type) -> Option<Type> {
        let (a, b) = (lhs.basic()?.defaulted(), rhs.basic()?.defaulted());
        let winner = match (a.float_rank(), b.float_rank()) {
            (Some(x), Some(y)) => {
                if y > x {
                    b
                } else {
                    a
                }
            }
            (Some(_), None) if b.is_integer() => a,
            (None, Some(_)) if a.is_integer() => b,
            (None, None) => {
                let (x, y) = (a.int_rank()?, b.int_rank()?);
                if y > x {
                    b
                } else {
                    a
                }
            }
            _ => return None,
        };
        Some(Type::Basic(winner))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(kind) => write!(f, "{kind}"),
            Type::Array(elem, len) => write!(f, "[{len}]{elem}"),
            Type::Pointer(pointee) => write!(f, "*{pointee}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(kind: BasicKind) -> Type {
        Type::Basic(kind)
    }

    #[test]
    fn test_promote() {
        use BasicKind::*;
        let cases = [
            (Int, F64, Some(F64)),
            (F32, I64, Some(F32)),
            (F32, F64, Some(F64)),
            (I8, I16, Some(I16)),
            (I32, Int, Some(Int)),
            (I64, Int, Some(I64)),
            (UntypedInt, I32, Some(Int)),
            (UntypedFloat, UntypedInt, Some(F64)),
            (Bool, Int, None),
            (String, F32, None),
        ];
        for (lhs, rhs, expected) in cases {
            assert_eq!(Type::promote(&t(lhs), &t(rhs)), expected.map(t), "{lhs} + {rhs}");
        }
    }

    #[test]
    fn test_identical() {
        assert!(Type::INT.identical(&t(BasicKind::I64)));
        assert!(t(BasicKind::UntypedInt).identical(&Type::INT));
        assert!(!t(BasicKind::I32).identical(&Type::INT));
        let arr = |n| Type::Array(Box::new(Type::INT), n);
        assert!(arr(3).identical(&Type::Array(Box::new(t(BasicKind::I64)), 3)));
        assert!(!arr(3).identical(&arr(4)));
    }

    #[test]
    fn test_base_and_lower() {
        let arr = Type::Array(Box::new(t(BasicKind::I32)), 4);
        let ptr = Type::Pointer(Box::new(t(BasicKind::F32)));
        assert_eq!(arr.base(), &t(BasicKind::I32));
        assert_eq!(ptr.base(), &t(BasicKind::F32));
        assert_eq!(Type::BOOL.base(), &Type::BOOL);

        assert_eq!(arr.lower().to_string(), "[4 x i32]");
        assert_eq!(ptr.lower().to_string(), "ptr");
        assert_eq!(Type::INT.lower().to_string(), "i64");
        assert_eq!(Type::BOOL.lower().to_string(), "i1");
        assert_eq!(t(BasicKind::UntypedFloat).lower().to_string(), "double");
        assert_eq!(t(BasicKind::U16).lower().to_string(), "i16");
    }

    #[test]
    fn test_display() {
        let arr = Type::Array(Box::new(Type::Pointer(Box::new(t(BasicKind::I8)))), 2);
        assert_eq!(arr.to_string(), "[2]*i8");
    }
}
