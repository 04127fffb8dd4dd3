//! CLI tool for embedding files into executables.

mod commands;
mod exit_codes;
mod output;

use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use exit_codes::ExitCode;

/// Embed files at the tail of an executable
#[derive(Parser)]
#[command(name = "gar")]
#[command(author, version, about = "Embed files at the tail of an executable", long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["inspect", "archive", "restore", "extract"])))]
#[command(after_help = "Usage:
  gar -t <binary>
  gar -a <binary> <file>...
  gar -r <binary>
  gar -e <binary> [file]...")]
pub struct Cli {
    /// Inspect the embedded files
    #[arg(short = 't')]
    inspect: bool,

    /// Pack files into the binary
    #[arg(short = 'a')]
    archive: bool,

    /// Trim the binary to restore the original
    #[arg(short = 'r')]
    restore: bool,

    /// Extract embedded files (all when none are named)
    #[arg(short = 'e')]
    extract: bool,

    /// The executable to operate on
    binary: PathBuf,

    /// Files to pack or extract
    files: Vec<PathBuf>,

    /// Output directory for extraction
    #[arg(short = 'o', long, default_value = ".")]
    output: PathBuf,

    /// Compression method
    #[arg(short = 'm', long, value_enum, default_value = "deflate")]
    method: CompressionMethod,

    /// Compression level (0-9)
    #[arg(short = 'l', long)]
    level: Option<u32>,

    /// Only log errors and warnings
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    quiet: bool,

    /// Log every step
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CompressionMethod {
    Deflate,
    Store,
}

impl From<CompressionMethod> for gar::archiver::Method {
    fn from(method: CompressionMethod) -> Self {
        match method {
            CompressionMethod::Deflate => gar::archiver::Method::Deflate,
            CompressionMethod::Store => gar::archiver::Method::Store,
        }
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let default = if quiet {
        "gar=warn"
    } else if verbose {
        "gar=debug"
    } else {
        "gar=info"
    };
    let filter = EnvFilter::try_from_env("GAR_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let exit_code = run(&cli);
    std::process::exit(exit_code.code());
}

fn run(cli: &Cli) -> ExitCode {
    if cli.inspect || cli.restore {
        if !cli.files.is_empty() {
            log::error!("-t and -r take exactly one binary");
            return ExitCode::BadArgs;
        }
        return if cli.inspect {
            commands::inspect(&cli.binary)
        } else {
            commands::restore(&cli.binary)
        };
    }

    if cli.archive {
        if cli.files.is_empty() {
            log::error!("-a needs at least one file to pack");
            return ExitCode::BadArgs;
        }
        let options = gar::ArchiveOptions::new().method(cli.method.into());
        let options = match cli.level {
            Some(level) => match options.level(level) {
                Ok(options) => options,
                Err(e) => {
                    log::error!("{}", e);
                    return ExitCode::BadArgs;
                }
            },
            None => options,
        };
        return commands::archive(&cli.binary, &cli.files, options);
    }

    let names: Vec<String> = cli
        .files
        .iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    commands::extract(&cli.binary, &names, &cli.output)
}
