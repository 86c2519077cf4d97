//! vocp - copy files between the local filesystem and a remote node store
//!
//! `vocp cp` follows Unix `cp` semantics. Remote paths carry a scheme prefix
//! (`vos:project/data`); anything else is a local path.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use vocp_config::{Config, ConfigLoader, LoggingConfig};
use vocp_engine::EngineBuilder;
use vocp_storage::{DirectoryNodeStore, Storage};
use vocp_types::CopyOptions;

mod display;
mod prompt;

use prompt::ConsolePrompt;

/// vocp - Unix cp for remote node stores
#[derive(Parser, Debug)]
#[command(
    name = "vocp",
    version = env!("CARGO_PKG_VERSION"),
    about = "Copy files between the local filesystem and a remote node store",
    long_about = "vocp copies files and directory trees between the local filesystem and a\n\
                  remote node store with the semantics of Unix cp. Remote paths carry a\n\
                  scheme prefix such as vos:project/data."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - report every transfer
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy files and directories
    Cp(CpArgs),
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Args, Debug)]
struct CpArgs {
    /// Source patterns followed by the destination
    #[arg(value_name = "SOURCE... DESTINATION", required = true, num_args = 2..)]
    paths: Vec<String>,

    /// Skip files whose destination contains one of these comma-separated strings
    #[arg(long)]
    exclude: Option<String>,

    /// Copy only files whose destination contains one of these comma-separated strings
    #[arg(long)]
    include: Option<String>,

    /// Ask before overwriting existing files
    #[arg(short = 'i', long = "interrogate")]
    interrogate: bool,

    /// Follow symbolic links
    #[arg(short = 'L', long = "follow-links")]
    follow_links: bool,

    /// Keep going after persistent transfer errors
    #[arg(long)]
    ignore: bool,

    /// Copy only file headers (remote sources)
    #[arg(long)]
    head: bool,
}

impl CpArgs {
    /// Split the positional arguments into sources and destination
    fn split(&self) -> (&[String], &str) {
        match self.paths.split_last() {
            Some((destination, sources)) => (sources, destination.as_str()),
            None => (&[], ""),
        }
    }

    fn options(&self) -> CopyOptions {
        let mut options = CopyOptions::new()
            .follow_symlinks(self.follow_links)
            .interactive_overwrite(self.interrogate)
            .ignore_errors(self.ignore)
            .headers_only(self.head);
        if let Some(exclude) = &self.exclude {
            options = options.exclude(exclude);
        }
        if let Some(include) = &self.include {
            options = options.include(include);
        }
        options
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), error);
            1
        }
    };
    std::process::exit(exit_status(code));
}

/// Process exit status for an aggregate code; a failure never wraps to 0
fn exit_status(code: i32) -> i32 {
    if code == 0 {
        0
    } else {
        code.clamp(1, 255)
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.debug, cli.quiet, cli.verbose, &config.logging)?;

    info!("vocp v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Cp(args) => copy_command(&args, &config, cli.verbose || cli.debug).await,
        Commands::Config { default } => {
            config_command(&config, default)?;
            Ok(0)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::load_default()?,
    };
    Ok(config)
}

fn init_logging(debug: bool, quiet: bool, verbose: bool, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        logging.level.as_str()
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(logging.colored_output)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

/// Resolves when the user interrupts the process
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: never interrupt
        std::future::pending::<()>().await;
    }
}

async fn copy_command(args: &CpArgs, config: &Config, show_stats: bool) -> Result<i32> {
    let store_root = config.remote.store_root.as_ref().ok_or_else(|| {
        anyhow!("no remote store configured; set remote.store_root or VOCP__REMOTE__STORE_ROOT")
    })?;
    let client = DirectoryNodeStore::new(store_root, config.remote.schemes.iter().cloned())?;
    let storage = Storage::new(Arc::new(client), config.remote.schemes.iter().cloned());

    let engine = EngineBuilder::new(storage)
        .with_options(args.options())
        .with_retry_config(config.retry.clone())
        .with_prompt(Arc::new(ConsolePrompt))
        .build();

    let (sources, destination) = args.split();
    debug!("Copying {:?} -> {}", sources, destination);

    tokio::select! {
        outcome = engine.copy(sources, destination) => match outcome {
            Ok(result) => {
                if show_stats {
                    display::print_copy_stats(&result);
                }
                Ok(result.exit_code)
            }
            Err(error) => {
                display::print_copy_error(&error);
                Ok(error.exit_code())
            }
        },
        () = interrupted() => {
            info!("Received keyboard interrupt. Execution aborted...");
            Ok(1)
        }
    }
}

fn config_command(config: &Config, default: bool) -> Result<()> {
    let (title, shown) = if default {
        ("Default configuration:", Config::default())
    } else {
        ("Current configuration:", config.clone())
    };
    println!("{} {}", style("⚙").blue().bold(), title);
    print!("{}", serde_yaml::to_string(&shown)?);
    Ok(())
}
