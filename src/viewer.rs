//! Viewer state and the navigation/zoom operations that mutate it.
//!
//! [`ViewerState`] is the single value that describes what the user is
//! looking at. It is owned by the interactive side; every operation here
//! takes the document's page count (and the config for zoom limits) as an
//! argument, so the state never holds a reference to the document itself.
//!
//! ## Two-page navigation
//!
//! In two-page mode the views are page 0 alone, then pairs starting at odd
//! indices: (1,2), (3,4), … When the last pair start has no right-hand page
//! (an even page count), or when stepping forward from the final pair, the
//! last page is shown alone. `next_page` and `prev_page` walk exactly that
//! sequence; toggling two-page mode snaps an even current page back to the
//! pair start that contains it.

use crate::config::{FitMode, ViewerConfig};
use crate::error::ViewerError;
use crate::layout::{pages_in_view, PageSpan};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the viewer currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewerState {
    /// Current page (the left page in two-page mode), 0-indexed.
    pub current_page: usize,
    /// Manual zoom, used when `fit_mode` is [`FitMode::None`].
    pub zoom_factor: f32,
    pub fit_mode: FitMode,
    pub two_page: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            current_page: 0,
            zoom_factor: 1.0,
            fit_mode: FitMode::None,
            two_page: false,
        }
    }
}

impl ViewerState {
    /// State for a freshly opened document: first page, fit to height,
    /// single-page view.
    pub fn for_new_document() -> Self {
        Self {
            fit_mode: FitMode::FitHeight,
            ..Self::default()
        }
    }

    /// Pages in view for a document of `page_count` pages.
    pub fn view(&self, page_count: usize) -> PageSpan {
        pages_in_view(self.current_page, page_count, self.two_page)
    }

    /// Advance one view. Returns `true` when the page changed.
    pub fn next_page(&mut self, page_count: usize) -> bool {
        if page_count == 0 || self.current_page + 1 >= page_count {
            return false;
        }
        let delta = if self.two_page && self.current_page > 0 && self.current_page + 2 < page_count
        {
            2
        } else {
            1
        };
        self.current_page += delta;
        debug!("next page → {}", self.current_page);
        true
    }

    /// Go back one view. Returns `true` when the page changed.
    pub fn prev_page(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.current_page = if !self.two_page || self.current_page == 1 {
            self.current_page - 1
        } else if self.current_page % 2 == 1 {
            self.current_page - 2
        } else {
            self.current_page - 1
        };
        debug!("prev page → {}", self.current_page);
        true
    }

    /// Jump to `index` (0-indexed). In two-page mode the index snaps to the
    /// start of the pair containing it.
    pub fn go_to(&mut self, index: usize, page_count: usize) -> Result<bool, ViewerError> {
        if index >= page_count {
            return Err(ViewerError::PageOutOfRange {
                page: index + 1,
                total: page_count,
            });
        }
        let target = if self.two_page {
            pair_start(index)
        } else {
            index
        };
        let changed = target != self.current_page;
        self.current_page = target;
        Ok(changed)
    }

    /// Multiply the manual zoom by the configured increment and switch to
    /// manual zoom.
    pub fn zoom_in(&mut self, config: &ViewerConfig) {
        self.fit_mode = FitMode::None;
        self.zoom_factor = config.clamp_zoom(self.zoom_factor * config.zoom_increment);
    }

    /// Divide the manual zoom by the configured increment and switch to
    /// manual zoom.
    pub fn zoom_out(&mut self, config: &ViewerConfig) {
        self.fit_mode = FitMode::None;
        self.zoom_factor = config.clamp_zoom(self.zoom_factor / config.zoom_increment);
    }

    /// Set an explicit manual zoom (clamped).
    pub fn set_zoom(&mut self, zoom: f32, config: &ViewerConfig) {
        self.fit_mode = FitMode::None;
        self.zoom_factor = config.clamp_zoom(zoom);
    }

    pub fn set_fit_mode(&mut self, mode: FitMode) {
        self.fit_mode = mode;
    }

    /// Enable or disable two-page mode, keeping the current page aligned to
    /// a pair start.
    pub fn set_two_page(&mut self, enabled: bool) {
        self.two_page = enabled;
        if enabled {
            self.current_page = pair_start(self.current_page);
        }
    }
}

/// Start of the two-page view containing `index`: 0 stays 0, odd indices
/// start their own pair, even indices belong to the pair on their left.
fn pair_start(index: usize) -> usize {
    if index == 0 || index % 2 == 1 {
        index
    } else {
        index - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_page_state() -> ViewerState {
        let mut s = ViewerState::default();
        s.set_two_page(true);
        s
    }

    #[test]
    fn five_page_two_page_walkthrough() {
        let mut s = two_page_state();
        assert_eq!(s.view(5), PageSpan::Single(0));

        assert!(s.next_page(5));
        assert_eq!(s.current_page, 1);
        assert_eq!(s.view(5), PageSpan::Pair(1, 2));

        assert!(s.next_page(5));
        assert_eq!(s.current_page, 3);
        assert_eq!(s.view(5), PageSpan::Pair(3, 4));

        assert!(s.next_page(5));
        assert_eq!(s.current_page, 4);
        assert_eq!(s.view(5), PageSpan::Single(4));

        assert!(!s.next_page(5));
        assert_eq!(s.current_page, 4);
    }

    #[test]
    fn prev_page_walks_back_through_pairs() {
        let mut s = two_page_state();
        s.current_page = 4;
        assert!(s.prev_page());
        assert_eq!(s.current_page, 3);
        assert!(s.prev_page());
        assert_eq!(s.current_page, 1);
        assert!(s.prev_page());
        assert_eq!(s.current_page, 0);
        assert!(!s.prev_page());
    }

    #[test]
    fn single_page_navigation_steps_by_one() {
        let mut s = ViewerState::default();
        assert!(s.next_page(3));
        assert!(s.next_page(3));
        assert!(!s.next_page(3));
        assert_eq!(s.current_page, 2);
        assert!(s.prev_page());
        assert_eq!(s.current_page, 1);
    }

    #[test]
    fn next_page_on_empty_document_is_noop() {
        let mut s = ViewerState::default();
        assert!(!s.next_page(0));
    }

    #[test]
    fn toggling_two_page_snaps_to_pair_start() {
        let mut s = ViewerState {
            current_page: 2,
            ..ViewerState::default()
        };
        s.set_two_page(true);
        assert_eq!(s.current_page, 1);
        assert_eq!(s.view(5), PageSpan::Pair(1, 2));

        let mut s = ViewerState {
            current_page: 3,
            ..ViewerState::default()
        };
        s.set_two_page(true);
        assert_eq!(s.current_page, 3);

        s.set_two_page(false);
        assert_eq!(s.current_page, 3);
        assert_eq!(s.view(5), PageSpan::Single(3));
    }

    #[test]
    fn go_to_validates_and_aligns() {
        let mut s = two_page_state();
        assert!(s.go_to(4, 6).unwrap());
        assert_eq!(s.current_page, 3);
        assert!(matches!(
            s.go_to(6, 6),
            Err(ViewerError::PageOutOfRange { page: 7, total: 6 })
        ));
    }

    #[test]
    fn zoom_in_then_out_round_trips() {
        let config = ViewerConfig::default();
        for start in [0.5f32, 1.0, 2.0, 3.3] {
            let mut s = ViewerState {
                zoom_factor: start,
                fit_mode: FitMode::FitWidth,
                ..ViewerState::default()
            };
            s.zoom_in(&config);
            assert_eq!(s.fit_mode, FitMode::None);
            s.zoom_out(&config);
            assert!((s.zoom_factor - start).abs() < 1e-5, "start={start}");
        }
    }

    #[test]
    fn zoom_stays_within_limits() {
        let config = ViewerConfig::default();
        let mut s = ViewerState::default();
        for _ in 0..100 {
            s.zoom_in(&config);
        }
        assert_eq!(s.zoom_factor, config.max_zoom);
        for _ in 0..200 {
            s.zoom_out(&config);
        }
        assert_eq!(s.zoom_factor, config.min_zoom);
    }

    #[test]
    fn new_document_fits_height() {
        let s = ViewerState::for_new_document();
        assert_eq!(s.fit_mode, FitMode::FitHeight);
        assert_eq!(s.current_page, 0);
        assert!(!s.two_page);
        assert_eq!(s.zoom_factor, 1.0);
    }
}
