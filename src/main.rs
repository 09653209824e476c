use anyhow::Result;
use clap::{Parser, Subcommand};

use chip8lisp::{
    compiler::{compile, CompileArgs},
    disassembler::{disassemble, DisassemblyArgs},
    instrumentation,
};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[clap(long)]
    #[clap(help = "Enable chrome tracing")]
    #[clap(long_help = "Enable chrome tracing which on program exit will generate
a json file to be opened with a chrome tracing compatible
viewer.")]
    trace: bool,
    #[clap(short, long, action = clap::ArgAction::Count)]
    #[clap(help = "Increase log verbosity, may be repeated")]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[clap(about = "Compile a program")]
    #[clap(aliases = &["c"])]
    Compile(CompileArgs),
    #[clap(about = "Print a listing of a compiled image")]
    #[clap(aliases = &["d", "dis"])]
    Disassemble(DisassemblyArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _trace_guard = instrumentation::init(cli.verbose, cli.trace);

    match &cli.command {
        Command::Compile(args) => compile(args),
        Command::Disassemble(args) => disassemble(args),
    }
}
