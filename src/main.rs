use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use colored::Colorize;
use snafu::ResultExt;

use rwacc::error::IoSnafu;
use rwacc::{CompileError, CompileResult};

#[derive(ClapParser)]
#[command(name = "rwacc", about = "Compile WACC programs to ARM assembly")]
struct Cli {
  /// WACC source file
  file: PathBuf,
  /// Write assembly to this file instead of stdout
  #[arg(short = 'o', long)]
  output: Option<PathBuf>,
  /// Stop after semantic analysis
  #[arg(long)]
  check: bool,
  /// Print diagnostics without colour
  #[arg(long)]
  no_color: bool,
}

fn run(cli: &Cli) -> CompileResult<()> {
  let source = fs::read_to_string(&cli.file).context(IoSnafu { path: &cli.file })?;

  if cli.check {
    rwacc::check(&source)?;
    return Ok(());
  }

  let asm = rwacc::generate_assembly(&source)?;
  match &cli.output {
    Some(path) => fs::write(path, asm).context(IoSnafu { path }),
    None => {
      print!("{asm}");
      Ok(())
    }
  }
}

fn report(err: &CompileError) {
  let heading = match err {
    CompileError::WithLocation { .. } => "syntax error",
    CompileError::Semantic { diagnostics } if diagnostics.has_syntactic() => "syntax error",
    CompileError::Semantic { .. } => "semantic error",
    CompileError::Codegen { .. } | CompileError::Io { .. } => "error",
  };
  eprintln!("{}", format!("{heading}:").red().bold());
  for line in err.to_string().lines() {
    eprintln!("  {line}");
  }
}

fn main() {
  let cli = Cli::parse();
  if cli.no_color {
    colored::control::set_override(false);
  }

  if let Err(err) = run(&cli) {
    report(&err);
    process::exit(err.exit_code());
  }
}
