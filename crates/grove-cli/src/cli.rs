//! CLI definitions for grove.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "grove",
    version,
    about = "Parse and incrementally reparse files with the bundled grammars",
    after_help = "Examples:\n  grove parse demo.sexp\n  grove parse main.tpy --format tree\n  grove edit demo.sexp --at 8 --insert ' d' --verify\n  grove languages"
)]
pub struct Cli {
    /// Show debug logs.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// Configuration file (defaults to ./grove.toml when present).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a file and print its syntax tree and syntax errors.
    Parse {
        /// File to parse.
        file: PathBuf,
        /// Language name; inferred from the file extension when omitted.
        #[arg(long, short)]
        language: Option<String>,
        /// How to print the tree.
        #[arg(long, value_enum, default_value_t = Format::Sexp)]
        format: Format,
        /// Only report syntax errors.
        #[arg(long, short)]
        quiet: bool,
    },
    /// Apply one edit to a file and reparse it incrementally.
    Edit {
        /// File to edit. It is read, never written.
        file: PathBuf,
        /// Language name; inferred from the file extension when omitted.
        #[arg(long, short)]
        language: Option<String>,
        /// Byte offset of the edit.
        #[arg(long, value_name = "BYTE")]
        at: u32,
        /// Bytes to delete at the offset.
        #[arg(long, default_value_t = 0, value_name = "N")]
        delete: u32,
        /// Text to insert at the offset.
        #[arg(long, default_value = "", value_name = "TEXT")]
        insert: String,
        /// Compare the result with a full parse of the edited text.
        #[arg(long)]
        verify: bool,
        /// Also print the reparsed tree.
        #[arg(long, value_enum)]
        format: Option<Format>,
    },
    /// List the bundled languages.
    Languages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One S-expression of named nodes.
    Sexp,
    /// Every node on its own line with its range.
    Tree,
}
