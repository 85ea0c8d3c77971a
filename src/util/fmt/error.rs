use std::fmt;

use crate::{
    analyzer, compiler, emitter, lexer, parser,
    token::{Span, Spanned},
    util::fmt::{Context, Show},
};

/// Where a span starts, as seen by a reader of the source.
struct Snippet<'src> {
    line: usize,
    col: usize,
    width: usize,
    text: &'src str,
}

impl<'src> Snippet<'src> {
    fn of(span: Span, src: &'src str) -> Snippet<'src> {
        let lo = span.lo.min(src.len());
        let line_start = src[..lo].rfind('\n').map_or(0, |i| i + 1);
        let line_end = src[lo..].find('\n').map_or(src.len(), |i| lo + i);
        let hi = span.hi().clamp(lo, line_end);
        Snippet {
            line: src[..lo].matches('\n').count() + 1,
            col: src[line_start..lo].chars().count() + 1,
            width: src[lo..hi].chars().count().max(1),
            text: src[line_start..line_end].trim_end_matches('\r'),
        }
    }
}

/// Writes a diagnostic for `message` at `span`.
///
/// The plain form is a single `file:line:col: message` line. The alternate
/// form (`{:#}`) adds the offending source line with a caret run under the
/// span, followed by the grammar rules that were active, if any.
pub fn render(
    f: &mut fmt::Formatter<'_>,
    ctx: &Context<'_>,
    span: Span,
    message: &dyn fmt::Display,
    contexts: &[&'static str],
) -> fmt::Result {
    let snippet = Snippet::of(span, ctx.src);
    let Snippet {
        line,
        col,
        width,
        text,
    } = snippet;
    let path = ctx.path;

    if !f.alternate() {
        return write!(f, "{path}:{line}:{col}: {message}");
    }

    let gutter = line.to_string().len();
    let pad = " ".repeat(col - 1);
    let carets = "^".repeat(width);
    writeln!(f, "error: {message}")?;
    writeln!(f, "{:gutter$}--> {path}:{line}:{col}", "")?;
    writeln!(f, "{:gutter$} |", "")?;
    writeln!(f, "{line} | {text}")?;
    write!(f, "{:gutter$} | {pad}{carets}", "")?;
    for rule in contexts {
        write!(f, "\n{:gutter$} = while parsing {rule}", "")?;
    }
    Ok(())
}

impl Show for Spanned<lexer::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        render(f, ctx, self.span, &self.inner, &[])
    }
}

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        render(f, ctx, self.span, &self.inner, &self.inner.contexts)
    }
}

impl Show for Spanned<analyzer::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        render(f, ctx, self.span, &self.inner, &[])
    }
}

impl Show for Spanned<emitter::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        render(f, ctx, self.span, &self.inner, &[])
    }
}

impl Show for compiler::Error {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        use compiler::Error::*;
        match self {
            Lex(error) => error.show(f, ctx),
            Parse(error) => error.show(f, ctx),
            Analyze(error) => error.show(f, ctx),
            Emit(error) => error.show(f, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn spanned(lo: usize, hi: usize) -> Spanned<analyzer::Error> {
        Span::new_of_bounds(lo..hi).wrap(analyzer::Error::UndefinedName("y".into()))
    }

    #[test]
    fn test_render_plain() {
        let src = "f :: -> int {\n    return y\n}\n";
        let ctx = Context { path: "f.fur", src };
        let error = spanned(25, 26);
        assert_eq!(
            format!("{}", error.display(&ctx)),
            "f.fur:2:12: undefined: y"
        );
    }

    #[test]
    fn test_render_snippet() {
        let src = "f :: -> int {\n    return y + zz\n}\n";
        let ctx = Context { path: "f.fur", src };
        let error = spanned(29, 31);
        let expected = indoc! {"
            error: undefined: y
             --> f.fur:2:16
              |
            2 |     return y + zz
              |                ^^"};
        assert_eq!(format!("{:#}", error.display(&ctx)), expected);
    }

    #[test]
    fn test_render_with_rules() {
        let src = "f :: -> int { return ) }";
        let ctx = Context { path: "f.fur", src };
        let error = parser::Error {
            kind: parser::ErrorKind::UnexpectedTokenInExpr {
                token: crate::token::TokenKind::RParen,
            },
            contexts: vec!["return statement", "function definition"],
        };
        let error = Span::new_of_bounds(21..22).wrap(error);
        let expected = indoc! {"
            error: unexpected ')' in expression
             --> f.fur:1:22
              |
            1 | f :: -> int { return ) }
              |                      ^
              = while parsing return statement
              = while parsing function definition"};
        assert_eq!(format!("{:#}", error.display(&ctx)), expected);
    }
}
