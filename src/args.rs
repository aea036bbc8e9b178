use clap::{ArgAction, Args, Parser, Subcommand};
use pex_anon::pex::GameVariant;
use pex_anon::types::*;

/// Scrub user and machine names from compiled Papyrus scripts
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Arg {
    #[arg(short, long, global = true)]
    /// Use configuration file. Defaults to pex_anon.cfg if it exists
    pub config: Option<String>,
    #[arg(short, long, value_enum, global = true)]
    /// Text encoding of strings in pex files
    pub encoding: Option<TextEncoding>,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    /// Verbose output. Use twice for trace output
    pub verbose: u8,
    #[arg(global = true, action = ArgAction::SetTrue, long)]
    /// Print backtrace on error
    pub backtrace: bool,
    #[command(subcommand)]
    /// Command
    pub command: Command,
}

#[derive(Subcommand, Debug)]
/// Commands
pub enum Command {
    /// Mask user and machine names in pex files
    Anonymize(AnonymizeArgs),
    /// Print the header and strings of pex files
    Info {
        /// Pex files
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(long, action = ArgAction::SetTrue)]
        /// Print one JSON object per file
        json: bool,
    },
    /// Write a new pex file with the given strings and payload
    Create(CreateArgs),
}

#[derive(Args, Debug, Default)]
pub struct AnonymizeArgs {
    /// Source folders or files. Defaults to the current folder
    pub source: Vec<String>,
    #[arg(short, long, action = ArgAction::SetTrue)]
    /// Recursively process all subfolders
    pub recursive: bool,
    #[arg(short, long, action = ArgAction::SetTrue)]
    /// Create backup files before modifying anything
    pub backup: bool,
    #[arg(short, long)]
    /// Character to mask user and machine names with. Defaults to *
    pub mask: Option<char>,
    #[arg(long)]
    /// Backup file extension. Defaults to bak
    pub backup_extension: Option<String>,
    #[arg(long)]
    /// Temp file extension. Defaults to tmp
    pub temp_extension: Option<String>,
    #[arg(long = "valid-extension")]
    /// File extensions to search folders for. Defaults to pex
    pub valid_extensions: Vec<String>,
    #[arg(short, long)]
    /// Number of files to process at once. 0 uses one worker per CPU
    pub jobs: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(short, long, value_enum)]
    /// Game the file is compiled for
    pub game: GameVariant,
    /// Output file. Never overwritten
    pub output: String,
    #[arg(long, default_value = "")]
    pub source_name: String,
    #[arg(long, default_value = "")]
    pub user_name: String,
    #[arg(long, default_value = "")]
    pub machine_name: String,
    #[arg(short, long)]
    /// File holding the payload. `-` reads standard input
    pub payload: Option<String>,
}

pub fn parse_args() -> Arg {
    Arg::parse()
}
