// File: src/main.rs
//
// CLI entry point: `dukkha <file>`. Compiles the file and runs it on the
// VM, following the sysexits convention the original shell used.

mod bytecode;
mod compiler;
mod disassembler;
mod errors;
mod lexer;
mod value;
mod vm;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

const EX_USAGE: u8 = 64;
const EX_NOINPUT: u8 = 66;
const EX_SOFTWARE: u8 = 70;

#[derive(Parser)]
#[command(name = "dukkha", about = "A small statically-scoped scripting language", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the script to run
    file: PathBuf,

    /// Print the compiled bytecode listing to stderr before running it
    #[arg(short, long)]
    disassemble: bool,
}

fn main() -> ExitCode {
    // Intercepted ahead of clap so a wrong argument count exits 64 (EX_USAGE)
    // rather than clap's own default exit code.
    let args: Vec<String> = std::env::args().collect();
    let positional_count = args.iter().skip(1).filter(|a| !a.starts_with('-')).count();
    if positional_count != 1 {
        eprintln!("{}", "usage: dukkha [--disassemble] <file>".red());
        return ExitCode::from(EX_USAGE);
    }
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}", format!("cannot open '{}': {err}", cli.file.display()).red());
            return ExitCode::from(EX_NOINPUT);
        }
    };

    let bytecode = match compiler::compile(&source) {
        Ok(bytecode) => bytecode,
        Err(errors) => {
            for error in &errors {
                eprintln!("{}", error.to_string().red());
            }
            return ExitCode::from(EX_SOFTWARE);
        }
    };

    if cli.disassemble {
        eprintln!("{}", disassembler::disassemble(&bytecode));
    }

    let mut vm = vm::VM::new(&bytecode);
    let stdout = std::io::stdout();
    if let Err(error) = vm.execute(&mut stdout.lock()) {
        eprintln!("{}", error.to_string().red());
        return ExitCode::from(EX_SOFTWARE);
    }

    ExitCode::SUCCESS
}
