use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "luz",
    version,
    about = "A terminal scripture reader with continuous chapter scrolling.",
    long_about = None
)]
pub struct Cli {
    /// Use a specific configuration file
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dataset location (file path or http(s) URL), overrides the configuration
    #[clap(long, value_name = "LOC")]
    pub dataset: Option<String>,

    /// Read as this user (favorites, notes and streak are per user)
    #[clap(short, long, value_name = "ID")]
    pub user: Option<String>,

    /// Open the reader at a chapter, e.g. `gn-0` or `sl-22`
    #[clap(short, long, value_name = "KEY")]
    pub goto: Option<String>,

    /// Print the current reading streak and exit
    #[clap(long)]
    pub streak: bool,

    /// Print a chapter (`abbrev-chapterIndex`) as plain text and exit
    #[clap(short, long, value_name = "KEY")]
    pub dump: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug output
    #[clap(long)]
    pub debug: bool,
}
