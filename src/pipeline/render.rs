//! The rendering collaborator: page geometry, rasterisation and text via pdfium.
//!
//! [`DocumentSource`] is the seam between the viewer and the PDF library.
//! The layout engine, compositor and session only ever talk to the trait,
//! so they are tested against in-memory documents while [`PdfDocument`]
//! provides the real pdfium-backed implementation.
//!
//! pdfium calls are synchronous and fast enough for interactive use at
//! screen resolutions, so unlike the text service they run on the caller's
//! thread.

use crate::error::ViewerError;
use crate::layout::PageGeometry;
use crate::pipeline::{engine, input};
use image::RgbImage;
use pdfium_render::prelude::{PdfDocumentMetadataTagType, PdfRenderConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What the viewer needs from an open document.
pub trait DocumentSource {
    /// Number of pages; always ≥ 1 for an open document.
    fn page_count(&self) -> usize;

    /// Unscaled size of page `index` in points.
    fn page_geometry(&self, index: usize) -> Result<PageGeometry, ViewerError>;

    /// Rasterise page `index` at `zoom` (1.0 = one pixel per point).
    fn rasterize(&self, index: usize, zoom: f32) -> Result<RgbImage, ViewerError>;

    /// Plain text of page `index`. Best effort: empty on failure.
    fn extract_text(&self, index: usize) -> String;
}

/// Document metadata shown by `pdfview inspect`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub pages: Vec<PageGeometry>,
}

/// A PDF opened through pdfium.
///
/// The lifetime ties the document to the password it was opened with;
/// pdfium keeps that borrow for as long as the document is loaded.
pub struct PdfDocument<'a> {
    path: PathBuf,
    document: pdfium_render::prelude::PdfDocument<'a>,
    page_count: usize,
}

impl<'a> PdfDocument<'a> {
    /// Open and validate a PDF file.
    ///
    /// # Errors
    /// - [`ViewerError::FileNotFound`] / [`ViewerError::PermissionDenied`] / [`ViewerError::NotAPdf`]
    /// - [`ViewerError::PasswordRequired`] / [`ViewerError::WrongPassword`] for encrypted files
    /// - [`ViewerError::CorruptPdf`] for anything else pdfium rejects
    /// - [`ViewerError::EmptyDocument`] when the file has no pages
    pub fn open(path: &Path, password: Option<&'a str>) -> Result<Self, ViewerError> {
        let path = input::validate_pdf_path(path)?;
        let pdfium = engine::pdfium()?;

        let document = pdfium.load_pdf_from_file(&path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    ViewerError::WrongPassword { path: path.clone() }
                } else {
                    ViewerError::PasswordRequired { path: path.clone() }
                }
            } else {
                ViewerError::CorruptPdf {
                    path: path.clone(),
                    detail: err_str,
                }
            }
        })?;

        let page_count = document.pages().len() as usize;
        if page_count == 0 {
            return Err(ViewerError::EmptyDocument { path });
        }

        info!("Opened {} ({} pages)", path.display(), page_count);
        Ok(Self {
            path,
            document,
            page_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for window titles, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Metadata and per-page geometry without rendering anything.
    pub fn info(&self) -> Result<DocumentInfo, ViewerError> {
        let metadata = self.document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        let pages = (0..self.page_count)
            .map(|i| self.page_geometry(i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentInfo {
            path: self.path.clone(),
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: self.page_count,
            pdf_version: format!("{:?}", self.document.version()),
            pages,
        })
    }

    fn page(&self, index: usize) -> Result<pdfium_render::prelude::PdfPage<'_>, ViewerError> {
        if index >= self.page_count {
            return Err(ViewerError::PageOutOfRange {
                page: index + 1,
                total: self.page_count,
            });
        }
        self.document
            .pages()
            .get(index as u16)
            .map_err(|e| ViewerError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })
    }
}

impl DocumentSource for PdfDocument<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_geometry(&self, index: usize) -> Result<PageGeometry, ViewerError> {
        let page = self.page(index)?;
        Ok(PageGeometry::new(page.width().value, page.height().value))
    }

    fn rasterize(&self, index: usize, zoom: f32) -> Result<RgbImage, ViewerError> {
        let page = self.page(index)?;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ViewerError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} at {:.3} → {}x{} px",
            index + 1,
            zoom,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn extract_text(&self, index: usize) -> String {
        let page = match self.page(index) {
            Ok(p) => p,
            Err(e) => {
                warn!("Text extraction skipped: {}", e);
                return String::new();
            }
        };
        let text = match page.text() {
            Ok(text) => text.all(),
            Err(e) => {
                warn!("Text extraction failed for page {}: {:?}", index + 1, e);
                String::new()
            }
        };
        text
    }
}

impl Drop for PdfDocument<'_> {
    fn drop(&mut self) {
        debug!("Closed {}", self.path.display());
    }
}
