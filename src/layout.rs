//! Page layout and fit-to-viewport computation.
//!
//! Given the open document's page geometry, the viewer state and the
//! viewport size, [`plan_display`] decides which page(s) are shown, the zoom
//! factor they are rasterised at, and the pixel gap between a pair. The
//! result is a [`DisplayPlan`], recomputed on every navigation, zoom,
//! fit-mode or resize event and never stored.
//!
//! ```text
//! ViewerState + ViewportSize
//!        │
//!        ├─ 1. pages_in_view   page 0 alone, then (1,2), (3,4), …
//!        ├─ 2. geometry        unscaled page sizes from the DocumentSource
//!        ├─ 3. resolve_zoom    fit width / fit height / manual, then clamp
//!        └─ 4. spacing         gap scaled by the resolved zoom
//! ```
//!
//! Everything here is synchronous and cheap: the only collaborator call is
//! [`DocumentSource::page_geometry`], which reads the page box.

use crate::config::{FitMode, ViewerConfig};
use crate::error::ViewerError;
use crate::pipeline::render::DocumentSource;
use crate::viewer::ViewerState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Unscaled page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Display area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The page or page pair shown by one render pass (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSpan {
    Single(usize),
    Pair(usize, usize),
}

impl PageSpan {
    /// Page indices in display order (left to right).
    pub fn indices(&self) -> Vec<usize> {
        match *self {
            PageSpan::Single(i) => vec![i],
            PageSpan::Pair(l, r) => vec![l, r],
        }
    }

    pub fn first(&self) -> usize {
        match *self {
            PageSpan::Single(i) | PageSpan::Pair(i, _) => i,
        }
    }

    pub fn is_paired(&self) -> bool {
        matches!(self, PageSpan::Pair(..))
    }
}

impl fmt::Display for PageSpan {
    /// 1-indexed page numbers, e.g. `3` or `2-3`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PageSpan::Single(i) => write!(f, "{}", i + 1),
            PageSpan::Pair(l, r) => write!(f, "{}-{}", l + 1, r + 1),
        }
    }
}

/// Resolved zoom, page set and spacing for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPlan {
    /// Zoom factor every page in the span is rasterised at.
    pub zoom: f32,
    /// Pages to rasterise.
    pub pages: PageSpan,
    /// Gap between the two pages of a pair in pixels (0 when single).
    pub spacing_px: u32,
}

impl DisplayPlan {
    pub fn is_paired(&self) -> bool {
        self.pages.is_paired()
    }

    /// Toolbar-style page label, e.g. `"2-3 / 5"`.
    pub fn label(&self, page_count: usize) -> String {
        format!("{} / {}", self.pages, page_count)
    }
}

/// Pages shown for `current` under the pairing rule.
///
/// Pairs `(current, current + 1)` only in two-page mode, only when
/// `current > 0` and only when the right-hand page exists. Page 0 is always
/// shown alone, so the conceptual sequence is 0, (1,2), (3,4), …
pub fn pages_in_view(current: usize, page_count: usize, two_page: bool) -> PageSpan {
    if two_page && current > 0 && current + 1 < page_count {
        PageSpan::Pair(current, current + 1)
    } else {
        PageSpan::Single(current)
    }
}

/// Resolve the zoom factor for a set of page geometries.
///
/// `spacing` is the unzoomed inter-page gap (0 for a single page). The
/// result is always within `[config.min_zoom, config.max_zoom]`.
pub fn resolve_zoom(
    geometries: &[PageGeometry],
    spacing: f32,
    fit_mode: FitMode,
    manual_zoom: f32,
    viewport: ViewportSize,
    config: &ViewerConfig,
) -> f32 {
    let total_width: f32 = geometries.iter().map(|g| g.width).sum::<f32>() + spacing;
    let max_height = geometries.iter().map(|g| g.height).fold(0.0_f32, f32::max);

    let zoom = match fit_mode {
        FitMode::FitWidth => {
            let available = viewport.width.saturating_sub(config.fit_padding).max(1) as f32;
            if total_width > 0.0 {
                available / total_width
            } else {
                1.0
            }
        }
        FitMode::FitHeight => {
            let available = viewport.height.saturating_sub(config.fit_padding).max(1) as f32;
            if max_height > 0.0 {
                available / max_height
            } else {
                1.0
            }
        }
        FitMode::None => manual_zoom,
    };

    config.clamp_zoom(zoom)
}

/// Compute the [`DisplayPlan`] for the current state and viewport.
///
/// # Errors
/// - [`ViewerError::PageOutOfRange`] when the state's page is not in the document
/// - whatever the document returns from `page_geometry`
pub fn plan_display<D: DocumentSource + ?Sized>(
    doc: &D,
    state: &ViewerState,
    viewport: ViewportSize,
    config: &ViewerConfig,
) -> Result<DisplayPlan, ViewerError> {
    let page_count = doc.page_count();
    if state.current_page >= page_count {
        return Err(ViewerError::PageOutOfRange {
            page: state.current_page + 1,
            total: page_count,
        });
    }

    let pages = pages_in_view(state.current_page, page_count, state.two_page);
    let geometries = pages
        .indices()
        .into_iter()
        .map(|i| doc.page_geometry(i))
        .collect::<Result<Vec<_>, _>>()?;

    let spacing = if pages.is_paired() {
        config.page_spacing
    } else {
        0.0
    };

    let zoom = resolve_zoom(
        &geometries,
        spacing,
        state.fit_mode,
        state.zoom_factor,
        viewport,
        config,
    );
    let spacing_px = (spacing * zoom) as u32;

    debug!(
        "Plan for page {} in {} ({}): zoom {:.3}, spacing {}px",
        pages, viewport, state.fit_mode, zoom, spacing_px
    );

    Ok(DisplayPlan {
        zoom,
        pages,
        spacing_px,
    })
}
