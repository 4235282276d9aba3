use std::io::{self, IsTerminal, Write};

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::batch::BatchSummary;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Summary = 1,   // Progress bar, warnings and the final summary (default)
    Detailed = 2,  // One line per extracted record
    Debug = 3,     // Render steps, rejected candidates, footer text sizes
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }

    /// Default tracing directive for this level, used when RUST_LOG is unset.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Summary => "footerscan=warn",
            VerbosityLevel::Detailed => "footerscan=info",
            VerbosityLevel::Debug => "footerscan=debug",
        }
    }
}

/// Install the global tracing subscriber. RUST_LOG takes precedence over `verbosity`.
pub fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    // try_init: a second call (tests, embedding) must not panic
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// Progress bar over the URL batch. A hidden instance does nothing.
#[derive(Clone)]
pub struct ExtractionProgress {
    bar: Option<ProgressBar>,
}

impl ExtractionProgress {
    /// Visible only on an interactive stderr at Summary verbosity.
    pub fn for_terminal(verbosity: VerbosityLevel, enabled: bool) -> Self {
        if enabled && verbosity == VerbosityLevel::Summary && io::stderr().is_terminal() {
            Self {
                bar: Some(ProgressBar::new(0)),
            }
        } else {
            Self::hidden()
        }
    }

    pub fn hidden() -> Self {
        Self { bar: None }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    pub fn start(&self, total: u64) {
        if let Some(pb) = &self.bar {
            pb.set_length(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            pb.set_message("Starting...");
        }
    }

    pub fn advance(&self, url: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(url.to_string());
            pb.inc(1);
        }
    }

    pub fn finish(&self, message: &str) {
        if let Some(pb) = &self.bar {
            pb.finish_with_message(message.to_string());
        }
    }
}

/// Print the end-of-run summary to stdout.
pub fn print_final_summary(summary: &BatchSummary, output: &str) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "\n=== EXTRACTION SUMMARY ===");
    let _ = writeln!(out, "Duration:          {:.2}s", summary.total_duration_secs);
    let _ = writeln!(out, "URLs processed:    {}", summary.total_urls);
    let _ = writeln!(out, "With ICP:          {}", summary.with_icp);
    let _ = writeln!(out, "With tech support: {}", summary.with_tech_support);
    let _ = writeln!(out, "With copyright:    {}", summary.with_copyright);
    let _ = writeln!(out, "Empty records:     {}", summary.empty_records);
    if summary.sink_failures > 0 {
        let _ = writeln!(out, "Write failures:    {}", summary.sink_failures);
    }
    let _ = writeln!(out, "Results exported:  {}", output);
    let _ = writeln!(out, "==========================\n");
}
