use std::{ffi::OsString, fs, path::PathBuf};

use anyhow::{bail, Context as _};
use fur::{
    compiler::{self, Options},
    lexer,
    util::fmt::{Context, Show},
};
use structopt::StructOpt;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    if let Err(ref e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let opt = Opt::from_iter(normalize_args(std::env::args_os()));

    if let Ok(filter) = std::env::var("FUR_TRACE") {
        fmt::Subscriber::builder()
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::new(filter))
            .init();
    }

    if opt.file.extension().map_or(true, |ext| ext != "fur") {
        bail!("{}: expected a .fur file", opt.file.display());
    }
    let bytes =
        fs::read(&opt.file).with_context(|| format!("failed to read {}", opt.file.display()))?;
    let path = opt.file.display().to_string();

    let options = Options {
        tokens: opt.tokens,
        ast: opt.ast,
        out_dir: opt.out_dir,
    };
    // Raw bytes are decoded here so that invalid UTF-8 gets a positioned
    // diagnostic like any other scanner error.
    let src = match lexer::decode(&bytes) {
        Ok(src) => src,
        Err(error) => {
            let valid = std::str::from_utf8(&bytes[..error.span.lo]).unwrap_or_default();
            let ctx = Context { path: &path, src: valid };
            bail!("{:#}", error.display(&ctx));
        }
    };
    let output = match compiler::compile(src, &options) {
        Ok(output) => output,
        Err(error) => {
            let ctx = Context { path: &path, src };
            bail!("{:#}", error.display(&ctx));
        }
    };

    let written = output
        .write_to(&options.out_dir)
        .with_context(|| format!("failed to write to {}", options.out_dir.display()))?;
    tracing::info!(files = written.len(), "done");
    Ok(())
}

/// Accepts the single-dash spelling of long flags (`-tokens`).
fn normalize_args(args: impl Iterator<Item = OsString>) -> impl Iterator<Item = OsString> {
    args.map(|arg| match arg.to_str() {
        Some(flag @ ("-tokens" | "-ast")) => OsString::from(format!("-{flag}")),
        _ => arg,
    })
}

#[derive(Debug, StructOpt)]
#[structopt(name = "furc", about = "Compiles a .fur program to textual IR")]
struct Opt {
    /// The file to compile
    #[structopt(parse(from_os_str))]
    file: PathBuf,
    /// Also write the token dump
    #[structopt(long)]
    tokens: bool,
    /// Also write the analyzed tree dump
    #[structopt(long)]
    ast: bool,
    /// The directory the outputs are written to
    #[structopt(short = "o", long = "out-dir", parse(from_os_str), default_value = "build")]
    out_dir: PathBuf,
}
