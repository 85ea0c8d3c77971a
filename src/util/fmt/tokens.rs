use std::io::Write;

use crate::token::Token;

pub fn print_tokens_string(tokens: &[Token]) -> String {
    let mut buf = Vec::with_capacity(tokens.len() * 24);
    print_tokens(&mut buf, tokens).expect("writing to a Vec can't fail");
    String::from_utf8(buf).expect("token output is UTF-8")
}

/// Writes one token per line: position, kind, and a marker for the
/// terminators the lexer inserted.
pub fn print_tokens(w: &mut impl Write, tokens: &[Token]) -> std::io::Result<()> {
    for token in tokens {
        let pos = token.pos.to_string();
        write!(w, "{pos:<10} {:?}", token.kind)?;
        if token.synthetic {
            write!(w, " (inserted)")?;
        }
        writeln!(w)?;
    }
    Ok(())
}
