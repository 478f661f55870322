use std::path::PathBuf;

use clap::Parser;

/// Compiles a lisp program into GCC assembly.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The program to compile.
    pub file: Option<PathBuf>,

    /// Writes the listing to a file instead of the standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Starts a repl session.
    #[arg(short, long)]
    pub repl: bool,

    /// Enables debug logging.
    #[arg(short, long)]
    pub debug: bool,
}
