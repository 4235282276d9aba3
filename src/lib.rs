pub mod batch;
pub mod browser_pool;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod extractor;
pub mod locator;
pub mod logger;
pub mod record;
pub mod render;
pub mod result_sink;
pub mod worker;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use extractor::{extract_fields, FooterFields};
pub use record::ExtractionResult;
pub use render::{ChromeRenderer, PageScript, PageSession, RenderError, Renderer, StaticHtmlRenderer};
pub use result_sink::{create_sink, OutputFormat, ResultSink};
pub use worker::PageWorker;
