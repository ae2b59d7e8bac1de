//! Turn a [`DisplayPlan`] into one image: rasterise, substitute, compose.
//!
//! A page that fails to rasterise, or comes back with a zero dimension, is
//! replaced by a small solid placeholder so the rest of the view still
//! shows. Paired pages are laid side by side on a background-filled canvas,
//! each vertically centred against the taller one, `spacing_px` apart.

use crate::config::ViewerConfig;
use crate::layout::DisplayPlan;
use crate::pipeline::render::DocumentSource;
use image::{imageops, Rgb, RgbImage};
use tracing::warn;

/// The solid placeholder drawn in place of an unrenderable page.
pub fn placeholder(config: &ViewerConfig) -> RgbImage {
    let size = config.placeholder_size.max(1);
    RgbImage::from_pixel(size, size, Rgb(config.placeholder_colour))
}

/// Rasterise one page, falling back to [`placeholder`] on any failure.
pub fn rasterize_or_placeholder<D: DocumentSource + ?Sized>(
    doc: &D,
    index: usize,
    zoom: f32,
    config: &ViewerConfig,
) -> RgbImage {
    match doc.rasterize(index, zoom) {
        Ok(img) if img.width() > 0 && img.height() > 0 => img,
        Ok(img) => {
            warn!(
                "Page {} rendered as {}x{}; showing placeholder",
                index + 1,
                img.width(),
                img.height()
            );
            placeholder(config)
        }
        Err(e) => {
            warn!("{}; showing placeholder", e);
            placeholder(config)
        }
    }
}

/// Compose page images left to right with `spacing_px` between them.
///
/// A single image is returned as is.
pub fn compose_side_by_side(mut pages: Vec<RgbImage>, spacing_px: u32, background: [u8; 3]) -> RgbImage {
    if pages.len() == 1 {
        if let Some(only) = pages.pop() {
            return only;
        }
    }

    let gaps = pages.len().saturating_sub(1) as u32;
    let width: u32 = pages.iter().map(|p| p.width()).sum::<u32>() + spacing_px * gaps;
    let height = pages.iter().map(|p| p.height()).max().unwrap_or(0);

    let mut canvas = RgbImage::from_pixel(width.max(1), height.max(1), Rgb(background));
    let mut x = 0u32;
    for page in &pages {
        let y = (height - page.height()) / 2;
        imageops::replace(&mut canvas, page, x as i64, y as i64);
        x += page.width() + spacing_px;
    }
    canvas
}

/// Rasterise and compose everything a plan shows.
pub fn render_plan<D: DocumentSource + ?Sized>(
    doc: &D,
    plan: &DisplayPlan,
    config: &ViewerConfig,
) -> RgbImage {
    let pages = plan
        .pages
        .indices()
        .into_iter()
        .map(|i| rasterize_or_placeholder(doc, i, plan.zoom, config))
        .collect();
    compose_side_by_side(pages, plan.spacing_px, config.background)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use crate::layout::{PageGeometry, PageSpan};

    /// Renders page `i` as a solid `(i+1)*10 x (i+1)*20` block; page 9 fails
    /// and page 8 comes back empty.
    struct Blocks;

    impl DocumentSource for Blocks {
        fn page_count(&self) -> usize {
            10
        }
        fn page_geometry(&self, index: usize) -> Result<PageGeometry, ViewerError> {
            Ok(PageGeometry::new((index + 1) as f32 * 10.0, (index + 1) as f32 * 20.0))
        }
        fn rasterize(&self, index: usize, _zoom: f32) -> Result<RgbImage, ViewerError> {
            match index {
                9 => Err(ViewerError::RasterisationFailed {
                    page: 10,
                    detail: "boom".into(),
                }),
                8 => Ok(RgbImage::new(0, 0)),
                i => {
                    let n = (i + 1) as u32;
                    Ok(RgbImage::from_pixel(n * 10, n * 20, Rgb([255, 255, 255])))
                }
            }
        }
        fn extract_text(&self, _index: usize) -> String {
            String::new()
        }
    }

    #[test]
    fn failed_page_becomes_placeholder() {
        let config = ViewerConfig::default();
        let img = rasterize_or_placeholder(&Blocks, 9, 1.0, &config);
        assert_eq!(img.dimensions(), (10, 10));
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn empty_raster_becomes_placeholder() {
        let config = ViewerConfig::default();
        let img = rasterize_or_placeholder(&Blocks, 8, 1.0, &config);
        assert_eq!(img.dimensions(), (10, 10));
    }

    #[test]
    fn pair_is_centred_with_spacing() {
        let config = ViewerConfig::default();
        let plan = DisplayPlan {
            zoom: 1.0,
            pages: PageSpan::Pair(0, 1),
            spacing_px: 10,
        };
        let img = render_plan(&Blocks, &plan, &config);
        // 10x20 and 20x40 with 10px between.
        assert_eq!(img.dimensions(), (40, 40));

        let bg = Rgb(config.background);
        let white = Rgb([255, 255, 255]);
        // Shorter page sits 10px down.
        assert_eq!(img.get_pixel(0, 0), &bg);
        assert_eq!(img.get_pixel(0, 10), &white);
        assert_eq!(img.get_pixel(0, 29), &white);
        assert_eq!(img.get_pixel(0, 30), &bg);
        // Gap.
        assert_eq!(img.get_pixel(15, 20), &bg);
        // Taller page fills its column.
        assert_eq!(img.get_pixel(20, 0), &white);
        assert_eq!(img.get_pixel(39, 39), &white);
    }

    #[test]
    fn pair_with_failed_page_still_composes() {
        let config = ViewerConfig::default();
        let plan = DisplayPlan {
            zoom: 1.0,
            pages: PageSpan::Pair(0, 9),
            spacing_px: 4,
        };
        let img = render_plan(&Blocks, &plan, &config);
        assert_eq!(img.dimensions(), (10 + 4 + 10, 20));
        assert_eq!(img.get_pixel(14, 5), &Rgb([255, 0, 0]));
    }

    #[test]
    fn single_page_is_returned_unchanged() {
        let config = ViewerConfig::default();
        let plan = DisplayPlan {
            zoom: 1.0,
            pages: PageSpan::Single(2),
            spacing_px: 0,
        };
        assert_eq!(render_plan(&Blocks, &plan, &config).dimensions(), (30, 60));
    }
}
