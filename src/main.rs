use clap::Parser;
use color_print::cprintln;
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Debug, clap::Parser)]
#[clap(
  name = "tinytc",
  version,
  about = "Compile TC source files to x86-64 NASM assembly"
)]
struct Args {
  /// Input TC source file
  input: PathBuf,

  /// Output assembly file (defaults to the input with a .asm extension)
  #[clap(short, long)]
  output: Option<PathBuf>,

  /// Print the token stream instead of compiling
  #[clap(long)]
  dump_tokens: bool,

  /// Print the parsed program instead of compiling
  #[clap(long)]
  dump_ast: bool,
}

fn main() {
  let args = Args::parse();
  if let Err(message) = drive(&args) {
    cprintln!("<red,bold>error</>: {}", message);
    process::exit(1);
  }
}

fn drive(args: &Args) -> Result<(), String> {
  let source = fs::read_to_string(&args.input)
    .map_err(|err| format!("cannot read {}: {err}", args.input.display()))?;

  if args.dump_tokens {
    let tokens = tinytc::tokenize(&source).map_err(|err| err.to_string())?;
    for token in &tokens {
      println!("{}:{}: {:?}", token.line, token.column, token.kind);
    }
    return Ok(());
  }

  if args.dump_ast {
    let tokens = tinytc::tokenize(&source).map_err(|err| err.to_string())?;
    let program = tinytc::parse(tokens).map_err(|err| err.to_string())?;
    println!("{program:#?}");
    return Ok(());
  }

  let asm = tinytc::compile(&source).map_err(|err| err.to_string())?;
  let asm_path = args
    .output
    .clone()
    .unwrap_or_else(|| args.input.with_extension("asm"));
  fs::write(&asm_path, &asm)
    .map_err(|err| format!("cannot write {}: {err}", asm_path.display()))?;
  println!("wrote {}", asm_path.display());

  Ok(())
}
