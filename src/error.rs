//! Error types for the edgequake-pdfview library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ViewerError`] — returned as `Err(ViewerError)` from library calls:
//!   the requested operation could not happen at all (bad input file, no
//!   document open, text service not configured, a task already running).
//!
//! * [`TaskError`] — a text action was accepted and ran, but the remote call
//!   did not produce usable text. It travels inside
//!   [`crate::dispatch::TaskOutcome`] through the dispatcher's event channel
//!   and never escapes as a panic or an `Err` on the interactive side.
//!
//! Nothing in either type is fatal to the process; the viewer keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the viewer, layout, settings and dispatch APIs.
#[derive(Debug, Error)]
pub enum ViewerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The PDF parsed but contains no pages.
    #[error("PDF '{path}' contains no pages")]
    EmptyDocument { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// A page index outside the open document was requested (1-indexed `page`).
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page (1-indexed).
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Viewer errors ─────────────────────────────────────────────────────
    /// An operation needs an open document and there is none.
    #[error("No PDF document is open")]
    NoDocument,

    /// The pages in view yielded no extractable text.
    #[error("Could not extract any text from page {pages}")]
    NoText { pages: String },

    /// The action name does not match a built-in or saved custom prompt.
    #[error("Unknown action '{name}'")]
    UnknownAction { name: String },

    // ── Text service errors ───────────────────────────────────────────────
    /// The text service is not configured (missing API key etc.).
    #[error("Text service '{provider}' is not configured.\n{hint}")]
    ServiceNotConfigured { provider: String, hint: String },

    /// A text action is already in flight; the new one was not started.
    #[error("{action} is in progress. Wait for it to finish.")]
    Busy { action: String },

    // ── Settings errors ───────────────────────────────────────────────────
    /// The settings file exists but could not be read.
    #[error("Failed to read settings file '{path}': {source}")]
    SettingsReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file could not be written.
    #[error("Failed to write settings file '{path}': {source}")]
    SettingsWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`crate::settings::Settings`].
    #[error("Settings file '{path}' is malformed: {detail}")]
    SettingsParseFailed { path: PathBuf, detail: String },

    /// Could not write a rendered view to disk.
    #[error("Failed to write image '{path}': {detail}")]
    ImageWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium in the per-user cache directory or next to the binary.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of one text action.
///
/// Delivered through [`crate::dispatch::TaskOutcome::Failed`]. Cancellation is
/// not a `TaskError`; it has its own outcome variant so the interactive side
/// never presents it as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum TaskError {
    /// The service answered, but with no usable text.
    #[error("Received an invalid response from the text service: {detail}")]
    InvalidResponse { detail: String },

    /// The remote call itself failed.
    #[error("Failed to get a response from the text service: {detail}")]
    Api { detail: String },

    /// The worker ended without reporting an outcome (it panicked).
    #[error("The background task ended without reporting a result")]
    WorkerLost,
}
