use std::{fmt, ops::Range};

use crate::types::BasicKind;

#[derive(Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
    pub pos: Position,
    /// Set for statement terminators inserted by the lexer at a line feed.
    pub synthetic: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, pos: Position) -> Token {
        Token {
            kind,
            lo: span.lo,
            len: span.len,
            pos,
            synthetic: false,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {}, {})", self.kind, self.span(), self.pos)?;
        if self.synthetic {
            f.write_str(" (inserted)")?;
        }
        Ok(())
    }
}

/// Line and column are 1-based; the width is measured in characters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub col: u32,
    pub width: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}", self.line, self.col, self.width)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap())
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span which starts at `self` and ends at `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new_of_bounds(self.lo..other.hi().max(self.lo))
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

/// A value paired with the source range it was produced from.
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}: ", self.span)?;
        }
        write!(f, "{}", self.inner)
    }
}

impl<T> std::error::Error for Spanned<T>
where
    T: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Ident(Box<str>),
    String(Box<str>),
    True,
    False,

    Return,
    If,
    Else,
    For,
    Range,
    Break,
    Continue,
    /// One of the type keywords (`int`, `i8`, ..., `bool`, `string`).
    Type(BasicKind),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,

    Plus,
    Minus,
    Star,
    Slash,
    /// `//`
    SlashSlash,
    Percent,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    EqEq,
    NotEq,
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `::`
    ColonColon,
    /// `->`
    Arrow,
    PlusPlus,
    MinusMinus,
    PlusAssign,
    MinusAssign,

    Eof,
}

impl TokenKind {
    /// Whether a line feed right after this token ends the statement.
    pub fn ends_statement(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Int(_)
                | Float(_)
                | Ident(_)
                | String(_)
                | True
                | False
                | RParen
                | RBracket
                | RBrace
                | Return
                | Break
                | Continue
                | PlusPlus
                | MinusMinus
        )
    }

    /// Compares the kinds while ignoring any payload.
    pub fn same_kind(&self, other: &TokenKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let s = match self {
            Int(_) => "integer literal",
            Float(_) => "float literal",
            Ident(_) => "identifier",
            String(_) => "string literal",
            True => "'true'",
            False => "'false'",
            Return => "'return'",
            If => "'if'",
            Else => "'else'",
            For => "'for'",
            Range => "'range'",
            Break => "'break'",
            Continue => "'continue'",
            Type(kind) => return write!(f, "type '{kind}'"),
            LParen => "'('",
            RParen => "')'",
            LBrace => "'{'",
            RBrace => "'}'",
            LBracket => "'['",
            RBracket => "']'",
            Comma => "','",
            Colon => "':'",
            Semicolon => "';'",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            SlashSlash => "'//'",
            Percent => "'%'",
            Less => "'<'",
            Greater => "'>'",
            LessEq => "'<='",
            GreaterEq => "'>='",
            EqEq => "'=='",
            NotEq => "'!='",
            Assign => "'='",
            Define => "':='",
            ColonColon => "'::'",
            Arrow => "'->'",
            PlusPlus => "'++'",
            MinusMinus => "'--'",
            PlusAssign => "'+='",
            MinusAssign => "'-='",
            Eof => "end of file",
        };
        f.write_str(s)
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "return" => TokenKind::Return,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "for" => TokenKind::For,
    "range" => TokenKind::Range,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "int" => TokenKind::Type(BasicKind::Int),
    "i8" => TokenKind::Type(BasicKind::I8),
    "i16" => TokenKind::Type(BasicKind::I16),
    "i32" => TokenKind::Type(BasicKind::I32),
    "i64" => TokenKind::Type(BasicKind::I64),
    "f32" => TokenKind::Type(BasicKind::F32),
    "f64" => TokenKind::Type(BasicKind::F64),
    "bool" => TokenKind::Type(BasicKind::Bool),
    "string" => TokenKind::Type(BasicKind::String),
};
