use clap::{ArgAction, Parser};
use media_verify::category::CheckCategory;
use media_verify::config::{self, ConfigError, EmptyFilePolicy, VerifyConfig};
use media_verify::{dispatch, output};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        return env!("CARGO_PKG_VERSION");
    }
    let dirty = if env!("GIT_DIRTY") == "true" {
        "-dirty"
    } else {
        ""
    };
    // Leaked once at startup
    Box::leak(format!("{} ({hash}{dirty})", env!("CARGO_PKG_VERSION")).into_boxed_str())
}

#[derive(Parser)]
#[command(name = "media-verify")]
#[command(about = "Detect corrupt images and movies in a directory tree")]
#[command(long_about = "\
Detect corrupt images and movies in a directory tree

Every file whose extension matches an enabled category is handed to that
format's decoder. Files that fail to decode are counted and logged; the scan
never stops for a single bad file.

Categories:
  --raster   png jpg jpeg tif tiff webp gif bmp   (image crate)
  --hdr      exr                                  (exr crate, headers only)
  --movies   mp4 mov m4v mkv avi webm mpg mpeg mxf (ffmpeg decode to null)

Outcome labels:
  OK, RASTER_ERROR, HDR_ERROR, MOVIE_ERROR, NOT_FOUND, TIMEOUT, OTHER_ERROR, EMPTY

Exit codes:
  0  scan completed (even with failures)
  1  setup error (missing root, bad config, log file)
  3  nothing to do: no category enabled
  4  HDR checks unavailable in this build
  5  movie checks unavailable in this build
  6  movie tool not installed
  7  movie tool present but not working

Settings are read from <ROOT>/.media-verify.toml, then --config, then flags.
Run 'media-verify --print-config' for a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Directory to scan
    #[arg(required_unless_present = "print_config")]
    root: Option<PathBuf>,

    /// Verify raster images
    #[arg(short, long)]
    raster: bool,

    /// Verify OpenEXR images
    #[arg(short = 'e', long)]
    hdr: bool,

    /// Verify movie containers with the external tool
    #[arg(short, long)]
    movies: bool,

    /// More log output (-v opened/ok files, -vv skipped files, -vvv everything)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Append log records to FILE instead of standard output
    /// (standard error when --json is given)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Extra config file layered over <ROOT>/.media-verify.toml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Worker threads (1 = sequential, 0 = all cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Seconds of silence from the movie tool before a file is abandoned (0 = never)
    #[arg(long, value_name = "SECS")]
    movie_timeout: Option<u64>,

    /// Movie inspection binary
    #[arg(long, value_name = "PATH")]
    movie_tool: Option<String>,

    /// What to do with zero-byte files
    #[arg(long, value_enum)]
    empty_files: Option<EmptyFilePolicy>,

    /// Follow symbolic links while walking
    #[arg(long)]
    follow_links: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print a stock config file with all options documented, then exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", config::stock_config_toml());
        return ExitCode::SUCCESS;
    }

    if let Err(e) = init_logging(&cli) {
        eprintln!("Error: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let Some(root) = cli.root.as_deref() else {
        eprintln!("Error: no directory to scan");
        return ExitCode::FAILURE;
    };

    let config = match resolve_settings(&cli, root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match dispatch::run(root, &config) {
        Ok(summary) => {
            if cli.json {
                if let Err(e) = output::print_json(&summary) {
                    eprintln!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            } else {
                output::print_report(&summary);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(cli: &Cli) -> std::io::Result<()> {
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = if cli.quiet { "error" } else { filter };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // Keep stdout clean for the JSON report.
        None if cli.json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(std::io::stdout().is_terminal())
                .init();
        }
    }
    Ok(())
}

/// Config files first, then flags on top.
fn resolve_settings(cli: &Cli, root: &Path) -> Result<VerifyConfig, ConfigError> {
    let mut config = config::load_config(root, cli.config.as_deref())?;

    for (enabled, category) in [
        (cli.raster, CheckCategory::Raster),
        (cli.hdr, CheckCategory::Hdr),
        (cli.movies, CheckCategory::Movie),
    ] {
        if enabled {
            config.enable(category);
        }
    }
    if let Some(jobs) = cli.jobs {
        config.scan.jobs = jobs;
    }
    if let Some(policy) = cli.empty_files {
        config.scan.empty_files = policy;
    }
    if cli.follow_links {
        config.scan.follow_links = true;
    }
    if let Some(secs) = cli.movie_timeout {
        config.movie.timeout_secs = secs;
    }
    if let Some(tool) = &cli.movie_tool {
        config.movie.tool = tool.clone();
    }

    config.validate()?;
    Ok(config)
}
