use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use footerscan::batch::{export_batch_summary, read_url_file};
use footerscan::browser_pool::LaunchSettings;
use footerscan::cli::{Args, Cli};
use footerscan::config::{AppConfig, RendererKind};
use footerscan::logger::{self, ExtractionProgress, VerbosityLevel};
use footerscan::result_sink::{create_sink, ResultSink};
use footerscan::{ChromeRenderer, DispatchOutcome, Dispatcher, PageWorker, Renderer, StaticHtmlRenderer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let args = Args::from(&cli);

    // Handle --init flag first (before any other processing)
    if args.init {
        match AppConfig::write_default_config(&args.config) {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run footerscan again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = args.validate() {
        eprintln!("❌ {}", e);
        std::process::exit(2);
    }

    let verbosity = VerbosityLevel::from_verbose_count(args.verbose);
    logger::init_tracing(verbosity);

    let mut config = match AppConfig::load_or_default(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }

    // Input and sink problems are fatal before any page is rendered
    let urls = read_url_file(&args.file)?;
    info!("Loaded {} URLs from {}", urls.len(), args.file.display());

    let sink = create_sink(config.output.format, &config.output.path)?;
    let progress = ExtractionProgress::for_terminal(verbosity, !args.no_progress);

    let outcome = match config.renderer.kind {
        RendererKind::Chrome => {
            let settings = LaunchSettings {
                chrome_path: config.renderer.chrome_path.clone(),
                sandbox: config.renderer.sandbox,
            };
            let renderer = ChromeRenderer::new(config.renderer.max_browser_instances, settings)
                .with_user_agent(config.renderer.user_agent.clone());
            run_batch(renderer, &config, urls, sink, progress).await?
        }
        RendererKind::Static => {
            let renderer = StaticHtmlRenderer::new(config.renderer.user_agent.clone());
            run_batch(renderer, &config, urls, sink, progress).await?
        }
    };

    let DispatchOutcome { mut sink, summary } = outcome;
    if let Err(e) = sink.finalize() {
        error!("Failed to flush {}: {:#}", config.output.path.display(), e);
    }

    if let Some(path) = &args.summary {
        match export_batch_summary(&summary, path) {
            Ok(()) => info!("Run summary written to {}", path.display()),
            Err(e) => error!("{:#}", e),
        }
    }

    logger::print_final_summary(&summary, &config.output.path.display().to_string());
    Ok(())
}

async fn run_batch<R: Renderer>(
    renderer: R,
    config: &AppConfig,
    urls: Vec<String>,
    sink: Box<dyn ResultSink>,
    progress: ExtractionProgress,
) -> Result<DispatchOutcome<Box<dyn ResultSink>>> {
    let worker = PageWorker::new(
        Arc::new(renderer),
        config.extraction.page_timeout(),
        config.extraction.wait_selector.as_str(),
    );
    Dispatcher::new(worker, config.extraction.concurrency)
        .with_progress(progress)
        .run(urls, sink)
        .await
        .context("Extraction run failed")
}
