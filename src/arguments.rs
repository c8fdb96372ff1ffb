use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

use crate::release::ReleaseType;

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|timestamp| timestamp.with_timezone(&Utc))
}

#[derive(Debug, Parser)]
#[command(author, version, about, bin_name = "bumpup")]
pub struct Arguments {
    /// Version component to increment [default: patch]
    #[arg(value_enum, ignore_case = true)]
    pub release: Option<ReleaseType>,
    /// JSON file to bump; may be repeated and replaces the configured file list
    #[arg(long = "file", short = 'f')]
    pub files: Vec<PathBuf>,
    /// Config file to read instead of ./bumpup.toml
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    /// strftime pattern for `date` fields
    #[arg(long, short)]
    pub date_format: Option<String>,
    /// Increment every file's version on its own instead of sharing the first result
    #[arg(long)]
    pub no_normalize: bool,
    /// RFC 3339 instant to write instead of the current time
    #[arg(long, value_parser = parse_timestamp)]
    pub timestamp: Option<DateTime<Utc>>,
    #[arg(long, short)]
    pub verbose: bool,
}
