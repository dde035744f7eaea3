//! rltail - Adaptive Log Tail
//!
//! Prints a log file (plain or gzip) and optionally follows it across appends and
//! rotations.

use anyhow::{Context, Result};
use bstr::ByteSlice;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rltail::{Config, LocalFileHandle, OpenMode, RltailError, SizeChange, SourceLoader};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Parsed command-line arguments
#[derive(Debug)]
struct CliArgs {
    file: PathBuf,
    follow: bool,
    from_start: bool,
    interval_ms: Option<u64>,
    probe_size: Option<usize>,
    probe_only: bool,
    config: Option<PathBuf>,
}

impl CliArgs {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            file: matches
                .get_one::<PathBuf>("file")
                .cloned()
                .unwrap_or_default(),
            follow: matches.get_flag("follow"),
            from_start: matches.get_flag("from-start"),
            interval_ms: matches.get_one::<u64>("interval").copied(),
            probe_size: matches.get_one::<usize>("probe-size").copied(),
            probe_only: matches.get_flag("probe"),
            config: matches.get_one::<PathBuf>("config").cloned(),
        }
    }
}

fn build_cli() -> Command {
    Command::new("rltail")
        .version(rltail::VERSION)
        .about("Print and follow log files, plain or gzip compressed")
        .long_about(
            "rltail prints a log file and can follow it as it grows. Gzip content is \
             detected from its header and decompressed transparently. When the file \
             shrinks (rotation or truncation) following restarts from the beginning.",
        )
        .arg(
            Arg::new("file")
                .help("Path to the log file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("follow")
                .short('f')
                .long("follow")
                .help("Keep reading as the file grows, starting at its current end")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("from-start")
                .long("from-start")
                .help("With --follow, print the existing content first")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("MS")
                .help("Poll interval in milliseconds while following")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("probe-size")
                .long("probe-size")
                .value_name("BYTES")
                .help("Upper bound on the decoded probe sample")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("probe")
                .long("probe")
                .help("Print a summary of the probe sample and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Configuration file (requires the `config` feature)")
                .value_parser(value_parser!(PathBuf)),
        )
}

#[cfg(feature = "config")]
fn base_config(args: &CliArgs) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

#[cfg(not(feature = "config"))]
fn base_config(args: &CliArgs) -> Result<Config> {
    if args.config.is_some() {
        anyhow::bail!("--config requires rltail to be built with the `config` feature");
    }
    Ok(Config::default())
}

/// Merge command-line overrides into the configured defaults
fn resolve_config(args: &CliArgs, mut config: Config) -> Result<Config> {
    if args.from_start && !args.follow {
        return Err(RltailError::invalid_argument("--from-start requires --follow").into());
    }
    if args.follow {
        config.loader.tailing = true;
        config.loader.open_mode = if args.from_start {
            OpenMode::FromStart
        } else {
            OpenMode::FromEnd
        };
    }
    if let Some(interval_ms) = args.interval_ms {
        config.poll_interval_ms = interval_ms;
    }
    if let Some(probe_size) = args.probe_size {
        config.loader.probe_size = probe_size;
    }
    config.validate()?;
    Ok(config)
}

/// Copy readable content from the loader to `out`, at most `limit` bytes
async fn drain<W: AsyncWrite + Unpin>(
    loader: &mut SourceLoader,
    out: &mut W,
    limit: Option<u64>,
) -> Result<u64> {
    let location = loader.location().to_string();
    let mut reader = loader.content_stream().take(limit.unwrap_or(u64::MAX));
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;

    loop {
        let n = reader
            .read(&mut buffer)
            .await
            .with_context(|| format!("Failed to read {}", location))?;
        if n == 0 {
            break;
        }
        out.write_all(&buffer[..n]).await?;
        copied += n as u64;
    }
    out.flush().await?;
    Ok(copied)
}

/// Raw bytes the live stream may deliver before the next reconcile
///
/// Plain streams are live views, so bytes appended after the last size check
/// would be read now and again by the stream that growth swaps in. Reads stop at
/// the last known size instead. `positioned` is false while a `FromEnd` stream
/// still counts from its seek point, where nothing is known to be readable yet.
/// Decoded gzip output has no raw-byte bound and is read to the end.
fn read_budget(loader: &SourceLoader, positioned: bool) -> Option<u64> {
    if loader.is_compressed() {
        None
    } else if positioned {
        Some(loader.last_known_size().saturating_sub(loader.bytes_read()))
    } else {
        Some(0)
    }
}

/// One follow pass: reconcile, then print what the reconciled size allows
async fn follow_step<W: AsyncWrite + Unpin>(
    loader: &mut SourceLoader,
    out: &mut W,
    positioned: &mut bool,
) -> Result<()> {
    match loader.reload_if_changed().await {
        Ok(SizeChange::Grown { .. }) => *positioned = true,
        Ok(SizeChange::Shrunk { from, to }) => {
            *positioned = true;
            eprintln!(
                "rltail: {}: file truncated ({} -> {} bytes)",
                loader.location(),
                from,
                to
            );
        }
        Ok(SizeChange::Unchanged) => {}
        Err(e) => {
            // Retried on the next pass; the last known size is unchanged.
            log::warn!("Reconcile failed: {}", e);
            return Ok(());
        }
    }
    let budget = read_budget(loader, *positioned);
    drain(loader, out, budget).await?;
    Ok(())
}

async fn follow<W: AsyncWrite + Unpin>(
    loader: &mut SourceLoader,
    out: &mut W,
    interval: Duration,
    mut positioned: bool,
) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping follow of {}", loader.location());
                break;
            }
            _ = ticker.tick() => {
                follow_step(loader, out, &mut positioned).await?;
            }
        }
    }
    Ok(())
}

fn print_probe_summary(loader: &SourceLoader) {
    let probe = loader.probe_sample();
    println!("location:    {}", loader.location());
    println!("compression: {}", loader.compression().name());
    println!("size:        {} bytes", loader.last_known_size());
    println!("probe:       {} bytes, {} lines", probe.len(), probe.lines().count());
    if let Some(first) = probe.lines().next() {
        println!("first line:  {}", first.as_bstr());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging, controlled by RUST_LOG
    env_logger::init();

    let matches = build_cli().get_matches();
    let args = CliArgs::from_matches(&matches);
    let config = resolve_config(&args, base_config(&args)?)?;

    let handle = LocalFileHandle::new(&args.file);
    let mut loader = SourceLoader::open_with(handle, &config.loader)
        .await
        .with_context(|| format!("Failed to open {}", args.file.display()))?;

    if args.probe_only {
        print_probe_summary(&loader);
        return Ok(());
    }

    let mut stdout = tokio::io::stdout();
    let positioned = config.loader.open_mode == OpenMode::FromStart || loader.is_compressed();
    let budget = read_budget(&loader, positioned);
    drain(&mut loader, &mut stdout, budget).await?;

    if loader.is_tailing() {
        follow(&mut loader, &mut stdout, config.poll_interval(), positioned).await?;
    }

    loader.close();
    Ok(())
}
