use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use recsplit::core::model::default_workers;
use recsplit::SplitConfig;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub config: SplitConfig,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn build_cli() -> Command {
    Command::new("recsplit")
        .about("Split a file of fixed-width records into N parts")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("filename")
                .long("filename")
                .help("File name to split")
                .default_value("input.txt")
                .num_args(1),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .help("Split the file into this many files")
                .num_args(1),
        )
        .arg(
            Arg::new("buffer")
                .long("buffer")
                .help("Copy buffer size in MB")
                .default_value("1")
                .num_args(1),
        )
        .arg(
            Arg::new("linelength")
                .long("linelength")
                .help("Length of each record in bytes, terminator included")
                .default_value("17")
                .num_args(1),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .help("Copy chunks concurrently, one source handle per chunk")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .alias("goroutine")
                .help("Max concurrent chunk copies in parallel mode [default: CPU count]")
                .num_args(1),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .help("Output path prefix (default: input path without extension)")
                .num_args(1),
        )
        .arg(
            Arg::new("cleanup_on_failure")
                .long("cleanup-on-failure")
                .help("Remove outputs written by this run if the split fails")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("No progress bar")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Debug logging on stderr")
                .action(ArgAction::SetTrue),
        )
}

fn parse_arg<T>(m: &ArgMatches, id: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    m.get_one::<String>(id)
        .map(|raw| raw.parse::<T>().with_context(|| format!("invalid --{id} value {raw:?}")))
        .transpose()
}

pub fn options_from_matches(m: &ArgMatches) -> anyhow::Result<CliOptions> {
    let count: usize = parse_arg(m, "count")?.unwrap_or(0);
    if count == 0 {
        anyhow::bail!("count is required");
    }

    let filename: PathBuf = m.get_one::<String>("filename").context("missing --filename")?.into();
    let buffer_mb: usize = parse_arg(m, "buffer")?.context("missing --buffer")?;
    let record_width: u64 = parse_arg(m, "linelength")?.context("missing --linelength")?;
    let workers: usize = parse_arg(m, "workers")?.unwrap_or_else(default_workers);

    let mut config = SplitConfig::new(filename, count)
        .with_buffer_size(buffer_mb.saturating_mul(1024 * 1024))
        .with_record_width(record_width)
        .with_parallel(m.get_flag("parallel"))
        .with_workers(workers)
        .with_cleanup_on_failure(m.get_flag("cleanup_on_failure"));
    if let Some(prefix) = m.get_one::<String>("prefix") {
        config = config.with_output_prefix(prefix);
    }

    Ok(CliOptions { config, quiet: m.get_flag("quiet"), verbose: m.get_flag("verbose") })
}
