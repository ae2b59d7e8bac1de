//! Locate and bind the pdfium shared library once per process.
//!
//! Resolution order (first library that binds wins):
//!
//! 1. `PDFIUM_LIB_PATH` — explicit path to `libpdfium.{so,dylib}` / `pdfium.dll`
//! 2. the per-user cache directory, e.g. `~/.cache/pdfview/libpdfium.so`
//! 3. the current working directory
//! 4. the system library search path
//!
//! The binding is stored in a process-wide `OnceLock`, so documents can
//! borrow it for `'static` and a failed bind is reported the same way on
//! every later attempt instead of re-probing the file system.

use crate::error::ViewerError;
use pdfium_render::prelude::Pdfium;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, info};

static PDFIUM: OnceLock<Result<Pdfium, String>> = OnceLock::new();

/// Per-user directory searched for the pdfium library.
///
/// - **Linux**: `~/.cache/pdfview/`
/// - **macOS**: `~/Library/Caches/pdfview/`
/// - **Windows**: `%LOCALAPPDATA%\pdfview\`
pub fn pdfium_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("pdfview")
}

/// Return the process-wide pdfium binding, binding it on first use.
pub fn pdfium() -> Result<&'static Pdfium, ViewerError> {
    PDFIUM
        .get_or_init(|| bind().map(Pdfium::new))
        .as_ref()
        .map_err(|reason| ViewerError::PdfiumBindingFailed(reason.clone()))
}

fn candidate_libraries() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        if !p.is_empty() {
            candidates.push(PathBuf::from(p));
        }
    }
    candidates.push(Pdfium::pdfium_platform_library_name_at_path(&pdfium_cache_dir()));
    candidates.push(Pdfium::pdfium_platform_library_name_at_path("./"));
    candidates
}

fn bind() -> Result<Box<dyn pdfium_render::prelude::PdfiumLibraryBindings>, String> {
    let mut failures = Vec::new();

    for path in candidate_libraries() {
        if !path.exists() {
            continue;
        }
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => {
                info!("Bound pdfium from {}", path.display());
                return Ok(bindings);
            }
            Err(e) => {
                debug!("pdfium bind failed for {}: {}", path.display(), e);
                failures.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    Pdfium::bind_to_system_library()
        .inspect(|_| info!("Bound system pdfium library"))
        .map_err(|e| {
            failures.push(format!("system library: {e}"));
            failures.join("; ")
        })
}
