//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::core::issue::Rank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(
    name = "panther",
    author,
    version,
    about = "A static security scanner for JavaScript source",
    long_about = None
)]
pub struct Arguments {
    /// Files or directories to scan
    pub targets: Vec<PathBuf>,

    /// Scan directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Raise the severity floor (-l LOW, -ll MEDIUM, -lll HIGH)
    #[arg(short = 'l', action = ArgAction::Count)]
    pub severity: u8,

    /// Raise the confidence floor (-i LOW, -ii MEDIUM, -iii HIGH)
    #[arg(short = 'i', action = ArgAction::Count)]
    pub confidence: u8,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Path to a baseline report; only new findings are shown
    #[arg(short = 'b', long = "baseline")]
    pub baseline: Option<PathBuf>,

    /// Do not skip lines with the nosec marker
    #[arg(long)]
    pub ignore_nosec: bool,

    /// Optional YAML config file
    #[arg(short = 'c', long = "configfile")]
    pub config: Option<PathBuf>,

    /// Test profile to use from the config file
    #[arg(short = 'p', long = "profile")]
    pub profile: Option<String>,

    /// Comma-separated path substrings to exclude
    #[arg(short = 'x', long = "exclude", value_delimiter = ',')]
    pub excluded_paths: Vec<String>,

    /// Trace route entry points through the call graph instead of the
    /// flat scan
    #[arg(long)]
    pub trace: bool,

    /// Maximum call-graph depth for --trace
    #[arg(long, default_value_t = 1)]
    pub depth: usize,

    /// Merge npm dependency advisories into the results
    #[arg(long)]
    pub audit: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Map a repeated rank flag onto its floor. No flag filters at LOW, the
/// same as one: UNDEFINED findings only appear once a profile asks for them.
pub fn rank_floor(count: u8) -> Rank {
    match count {
        0 | 1 => Rank::Low,
        2 => Rank::Medium,
        _ => Rank::High,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Arguments::command().debug_assert();
    }

    #[test]
    fn test_rank_floor_mapping() {
        assert_eq!(rank_floor(0), Rank::Low);
        assert_eq!(rank_floor(1), Rank::Low);
        assert_eq!(rank_floor(2), Rank::Medium);
        assert_eq!(rank_floor(3), Rank::High);
        assert_eq!(rank_floor(9), Rank::High);
    }

    #[test]
    fn test_parse_flags() {
        let args =
            Arguments::parse_from(["panther", "src", "-r", "-ll", "-i", "-f", "json", "-x", "a,b"]);
        assert_eq!(args.targets, vec![PathBuf::from("src")]);
        assert!(args.recursive);
        assert_eq!(args.severity, 2);
        assert_eq!(args.confidence, 1);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.excluded_paths, vec!["a", "b"]);
        assert_eq!(args.depth, 1);
    }
}
