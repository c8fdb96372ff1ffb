use anyhow::Result;
use bumpup::{arguments::Arguments, bumper::bump, config::ResolvedConfig};
use clap::Parser;
use log::LevelFilter;

fn main() -> Result<()> {
    let args = Arguments::parse();
    pretty_env_logger::env_logger::builder()
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .format_timestamp(None)
        .init();

    let ResolvedConfig { files, options } = ResolvedConfig::resolve(&args)?;
    bump(&files, options)?;

    Ok(())
}
