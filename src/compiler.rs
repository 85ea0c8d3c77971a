use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    analyzer, emitter, lexer, parser,
    token::Spanned,
    util::fmt::{tokens::print_tokens_string, tree},
};

/// Name of the emitted module, after the file it is written to.
pub const MODULE_NAME: &str = "ben";
pub const IR_FILE: &str = "ben.ll";
pub const TOKENS_FILE: &str = "tokens.txt";
pub const AST_FILE: &str = "ast.txt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Also produce the token dump.
    pub tokens: bool,
    /// Also produce the analyzed tree dump.
    pub ast: bool,
    pub out_dir: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            tokens: false,
            ast: false,
            out_dir: PathBuf::from("build"),
        }
    }
}

/// Everything a successful compilation produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    pub ir: String,
    pub tokens: Option<String>,
    pub ast: Option<String>,
}

impl Output {
    /// Writes each artifact into `dir`, creating it if needed, and returns
    /// the written paths.
    pub fn write_to(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let artifacts = [
            (IR_FILE, Some(&self.ir)),
            (TOKENS_FILE, self.tokens.as_ref()),
            (AST_FILE, self.ast.as_ref()),
        ];
        let mut written = Vec::new();
        for (name, contents) in artifacts {
            let Some(contents) = contents else { continue };
            let path = dir.join(name);
            fs::write(&path, contents)?;
            tracing::debug!(path = %path.display(), "wrote artifact");
            written.push(path);
        }
        Ok(written)
    }
}

/// Runs every stage over `src`, stopping at the first error.
pub fn compile(src: &str, options: &Options) -> Result<Output, Error> {
    let tokens = lexer::lex_in_new(src)?;
    let program = parser::parse_program(&tokens)?;
    let program = analyzer::check(program)?;
    let ir = emitter::emit(&program, MODULE_NAME)?;
    Ok(Output {
        ir,
        tokens: options.tokens.then(|| print_tokens_string(&tokens)),
        ast: options.ast.then(|| tree::print_program_string(&program)),
    })
}

/// Compiles `src` down to the text of its IR module.
pub fn compile_to_ir(src: &str) -> Result<String, Error> {
    compile(src, &Options::default()).map(|output| output.ir)
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] Spanned<lexer::Error>),
    #[error(transparent)]
    Parse(#[from] Spanned<parser::Error>),
    #[error(transparent)]
    Analyze(#[from] Spanned<analyzer::Error>),
    #[error(transparent)]
    Emit(#[from] Spanned<emitter::Error>),
}
