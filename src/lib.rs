/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The analyzer takes an untyped AST, infers the type of every expression,
/// inserts the implicit conversions, and maps it into a typed AST.
pub mod analyzer;

/// The emitter lowers a typed AST into an IR module.
pub mod emitter;

/// Runs the stages in order and collects what they produce.
pub mod compiler;

pub mod ast;
pub mod ir;
pub mod scope;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}
