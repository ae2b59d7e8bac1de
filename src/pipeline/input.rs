//! Input validation: make sure a user-supplied path is a readable PDF.
//!
//! pdfium reports a missing file, a permission problem and a non-PDF file
//! all as the same opaque load error. Checking the path and the `%PDF`
//! magic bytes first lets the viewer tell the user which one happened.

use crate::error::ViewerError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable and starts with `%PDF`.
///
/// Returns the path unchanged on success so it can be handed to pdfium.
pub fn validate_pdf_path(path: &Path) -> Result<PathBuf, ViewerError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(ViewerError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic != b"%PDF" => {
                    return Err(ViewerError::NotAPdf { path, magic });
                }
                Ok(()) => {}
                // Shorter than four bytes cannot be a PDF either.
                Err(_) => return Err(ViewerError::NotAPdf { path, magic }),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ViewerError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ViewerError::FileNotFound { path });
        }
    }

    debug!("Validated PDF input: {}", path.display());
    Ok(path)
}
