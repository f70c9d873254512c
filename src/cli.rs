use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "klass-cache")]
#[command(about = "Load JVM classes from jars through a shared two-tier parse cache")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Parse every request, bypassing the cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Also cache anonymous definitions
    #[arg(long, global = true)]
    pub cache_anonymous: bool,

    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Define every class of the given jars, each jar acting as its own loader
    Load {
        #[arg(value_name = "JAR", required = true)]
        jars: Vec<PathBuf>,

        /// Define classes through the boot loader instead of application loaders
        #[arg(long)]
        trusted: bool,

        #[arg(long, value_name = "N", default_value_t = 2)]
        rounds: usize,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Like `load`, over jars found under a directory
    Scan {
        #[arg(long, value_name = "DIR")]
        path: Option<PathBuf>,

        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        #[arg(long)]
        trusted: bool,

        #[arg(long, value_name = "N", default_value_t = 2)]
        rounds: usize,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the parsed header of one class
    Inspect {
        jar_path: PathBuf,

        class_name: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
