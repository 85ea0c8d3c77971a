pub mod error;
pub mod tokens;
pub mod tree;

/// What a diagnostic needs to point back into the source.
pub struct Context<'src> {
    /// Shown in diagnostic headers.
    pub path: &'src str,
    pub src: &'src str,
}

/// Analogous to [`std::fmt::Display`], but also contains the program context,
/// such as the source text errors point into.
pub trait Show {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context<'_>) -> std::fmt::Result;

    /// Returns a type which can be displayed.
    fn display<'a>(&'a self, ctx: &'a Context<'_>) -> impl std::fmt::Display + 'a
    where
        Self: Sized,
    {
        Display(self, ctx)
    }
}

struct Display<'this, 'ctx, 'src, T: Show>(pub &'this T, pub &'ctx Context<'src>);

impl<T> std::fmt::Display for Display<'_, '_, '_, T>
where
    T: Show,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Display(this, ctx) = self;
        this.show(f, ctx)
    }
}
