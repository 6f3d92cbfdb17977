// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, Context};
use log::{warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use tuforge::app_config::{self, Config, DEFAULT_CONFIG_FILE};
use tuforge::app_controller::{Controller, Task};
use tuforge::segment::BoundaryMode;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for BoundaryMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliBoundary {
    Sentence,
    Paragraph,
}

impl From<CliBoundary> for BoundaryMode {
    fn from(cli_boundary: CliBoundary) -> Self {
        match cli_boundary {
            CliBoundary::Sentence => BoundaryMode::Sentence,
            CliBoundary::Paragraph => BoundaryMode::Paragraph,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract translation units, skeleton and format table from documents
    Import(ImportArgs),

    /// Rebuild documents from their translated artifacts
    Export(ExportArgs),

    /// Generate shell completions for tuforge
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ImportArgs {
    /// Input document or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Directory for the artifacts (default: next to each document)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'en-US', 'fra')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'de', 'ja')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Cut paragraphs into sentences or keep whole paragraphs
    #[arg(short, long, value_enum)]
    boundary: Option<CliBoundary>,

    /// Also write the pseudo-skeleton (.pskl)
    #[arg(long)]
    keep_intermediate: bool,

    /// Replace artifacts that already exist
    #[arg(short, long)]
    force_overwrite: bool,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Document, interchange file or directory to export
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Directory for the exported documents (default: next to the artifacts)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Language code used in the output file name
    #[arg(short, long)]
    target_language: Option<String>,
}

/// tuforge - document to translation interchange converter
///
/// Splits documents into translation units plus a skeleton that rebuilds
/// them, and merges translated units back into the original layout.
#[derive(Parser, Debug)]
#[command(name = "tuforge")]
#[command(version)]
#[command(about = "Document <-> translation interchange converter")]
#[command(long_about = "tuforge extracts translatable text from documents into an interchange file and rebuilds translated documents from it.

EXAMPLES:
    tuforge import page.html                     # Write page.tu.json, page.skl, page.fmt.json
    tuforge import -s en -t de -b paragraph docs/ # Import a whole directory
    tuforge import --keep-intermediate page.html # Also keep page.pskl
    tuforge export page.tu.json                  # Write page.fr.html
    tuforge export -o out/ -t de docs/           # Export every interchange file of a directory
    tuforge completions bash > tuforge.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in tuforge.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                color, now, record.level(), record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger with the most verbose level; the effective
    // level is set through log::set_max_level once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "tuforge", &mut std::io::stdout());
            Ok(())
        }
        Commands::Import(args) => {
            let mut config = load_config(&cli.config, cli.log_level.clone())?;
            if let Some(source_lang) = &args.source_language {
                config.source_language = source_lang.clone();
            }
            if let Some(target_lang) = &args.target_language {
                config.target_language = target_lang.clone();
            }
            if let Some(boundary) = &args.boundary {
                config.segmentation.boundary = boundary.clone().into();
            }
            let controller = start_controller(config, cli.log_level.is_none())?;
            let task = Task::Import {
                keep_intermediate: args.keep_intermediate,
                force_overwrite: args.force_overwrite,
            };
            controller.run(task, args.input_path, args.output_dir).await
        }
        Commands::Export(args) => {
            let config = load_config(&cli.config, cli.log_level.clone())?;
            let controller = start_controller(config, cli.log_level.is_none())?;
            let task = Task::Export {
                language: args.target_language,
            };
            controller.run(task, args.input_path, args.output_dir).await
        }
    }
}

/// Load the configuration file, writing a default one when it is missing
fn load_config(config_path: &str, log_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    // Update log level in config if specified via command line
    if let Some(log_level) = log_level {
        config.log_level = log_level.into();
    }

    Ok(config)
}

/// Validate the final configuration and build the controller
fn start_controller(config: Config, level_from_config: bool) -> Result<Controller> {
    if level_from_config {
        log::set_max_level(config.log_level.to_level_filter());
    }
    Controller::with_config(config)
}
