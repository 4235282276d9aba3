use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, RendererKind, CONFIG_PATH};
use crate::result_sink::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "footerscan")]
#[command(about = "Extract ICP registration numbers, tech-support credits and copyright lines from web page footers")]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/footerscan.toml
    #[arg(long)]
    pub init: bool,

    /// File with one URL per line (`#` comments allowed), or a JSON array of URLs
    #[arg(short, long, value_name = "FILE", default_value = "urls.txt")]
    pub file: PathBuf,

    /// Output file (overrides config)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of pages rendered in parallel (overrides config)
    #[arg(short = 'j', long, value_name = "N")]
    pub parallel_jobs: Option<usize>,

    /// Per-URL deadline in seconds (overrides config)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Rendering backend (overrides config)
    #[arg(long, value_enum)]
    pub renderer: Option<RendererKind>,

    /// Configuration file
    #[arg(long, value_name = "PATH", default_value = CONFIG_PATH)]
    pub config: PathBuf,

    /// Write a JSON run summary to this path
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose logging (use -v for INFO with one line per record, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug)]
pub struct Args {
    pub init: bool,
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub parallel_jobs: Option<usize>,
    pub timeout: Option<u64>,
    pub renderer: Option<RendererKind>,
    pub config: PathBuf,
    pub summary: Option<PathBuf>,
    pub no_progress: bool,
    pub verbose: u8,
}

impl From<&Cli> for Args {
    fn from(cli: &Cli) -> Self {
        Args {
            init: cli.init,
            file: cli.file.clone(),
            output: cli.output.clone(),
            format: cli.format,
            parallel_jobs: cli.parallel_jobs,
            timeout: cli.timeout,
            renderer: cli.renderer,
            config: cli.config.clone(),
            summary: cli.summary.clone(),
            no_progress: cli.no_progress,
            verbose: cli.verbose,
        }
    }
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        if self.file.as_os_str().is_empty() {
            return Err("Input file cannot be empty".to_string());
        }

        if let Some(output) = &self.output {
            if output.as_os_str().is_empty() {
                return Err("Output path cannot be empty".to_string());
            }
        }

        if let Some(jobs) = self.parallel_jobs {
            if jobs == 0 {
                return Err("Parallel jobs must be greater than 0".to_string());
            }
            if jobs > 100 {
                return Err("Parallel jobs cannot exceed 100 to avoid exhausting browser processes".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Layer command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(jobs) = self.parallel_jobs {
            config.extraction.concurrency = jobs;
        }
        if let Some(timeout) = self.timeout {
            config.extraction.page_timeout_secs = timeout;
        }
        if let Some(kind) = self.renderer {
            config.renderer.kind = kind;
        }
    }
}
