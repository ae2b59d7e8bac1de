//! # edgequake-pdfview
//!
//! The core of a PDF page viewer: a layout engine that fits one page or a
//! two-page spread into a viewport, and a single-flight dispatcher that
//! sends the text of the pages in view to an LLM for translation,
//! summarisation and similar actions.
//!
//! ## Overview
//!
//! ```text
//! ViewerSession
//!  │
//!  ├─ ViewerState     current page, zoom, fit mode, two-page mode
//!  ├─ layout          DisplayPlan: pages in view, zoom, spacing
//!  ├─ compose         rasterise via pdfium, placeholders, side-by-side
//!  └─ Dispatcher      at most one text action in flight
//!        └─ TextService  edgequake-llm provider (gemini by default)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfview::{
//!     resolve_service, Action, PdfDocument, Settings, TaskEvent, ViewerConfig, ViewerSession,
//!     ViewportSize,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewerConfig::default();
//!     let settings = Settings::load(&edgequake_pdfview::settings::settings_path())?;
//!
//!     let mut session = ViewerSession::new(config.clone(), tokio::runtime::Handle::current());
//!     session.set_service(Some(resolve_service(&config, &settings)?));
//!     session.open(PdfDocument::open(Path::new("paper.pdf"), None)?);
//!
//!     let view = session.render(ViewportSize::new(1280, 800))?;
//!     view.image.save("page.png")?;
//!
//!     session.request(&Action::Summarize)?;
//!     while let Some(event) = session.next_event().await {
//!         if let TaskEvent::Finished(report) = event {
//!             println!("{}: {:?}", report.result_label, report.outcome);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfview` binary (clap + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod actions;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod settings;
pub mod viewer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use actions::Action;
pub use config::{FitMode, ViewerConfig, ViewerConfigBuilder};
pub use dispatch::{
    CancelStage, CancellationToken, Dispatcher, DispatcherState, TaskEvent, TaskOutcome,
    TaskReport, TaskRequest, TaskStage,
};
pub use error::{TaskError, ViewerError};
pub use layout::{plan_display, DisplayPlan, PageGeometry, PageSpan, ViewportSize};
pub use pipeline::llm::{
    resolve_service, Completion, LlmTextService, ServiceError, TextService, AVAILABLE_MODELS,
    DEFAULT_MODEL,
};
pub use pipeline::render::{DocumentInfo, DocumentSource, PdfDocument};
pub use session::{RenderedView, ViewerSession};
pub use settings::{CustomPrompt, Settings};
pub use viewer::ViewerState;
