//! The interactive side: one open document, its view state and the
//! dispatcher for text actions.
//!
//! [`ViewerSession`] is what a front end drives. Navigation and zoom
//! operations mutate [`ViewerState`]; [`ViewerSession::render`] turns the
//! state into an image for the current viewport; [`ViewerSession::request`]
//! starts a text action on the pages in view and
//! [`ViewerSession::poll_event`] collects its progress and result.

use crate::actions::Action;
use crate::config::{FitMode, ViewerConfig};
use crate::dispatch::{Dispatcher, DispatcherState, TaskEvent};
use crate::error::ViewerError;
use crate::layout::{plan_display, DisplayPlan, ViewportSize};
use crate::pipeline::compose::render_plan;
use crate::pipeline::llm::TextService;
use crate::pipeline::render::DocumentSource;
use crate::pipeline::text::gather_page_text;
use crate::viewer::ViewerState;
use image::RgbImage;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// One rendered view, ready to display.
#[derive(Debug, Clone)]
pub struct RenderedView {
    pub plan: DisplayPlan,
    pub image: RgbImage,
    /// Page label such as `"2-3 / 5"`.
    pub label: String,
}

pub struct ViewerSession<D> {
    config: ViewerConfig,
    document: Option<D>,
    state: ViewerState,
    last_viewport: Option<ViewportSize>,
    dispatcher: Dispatcher,
}

impl<D: DocumentSource> ViewerSession<D> {
    /// An empty session; text actions run on `handle`.
    pub fn new(config: ViewerConfig, handle: Handle) -> Self {
        Self {
            config,
            document: None,
            state: ViewerState::default(),
            last_viewport: None,
            dispatcher: Dispatcher::new(handle),
        }
    }

    pub fn set_service(&mut self, service: Option<Arc<dyn TextService>>) {
        self.dispatcher.set_service(service);
    }

    /// Show `document`, replacing any open one. The view resets to the
    /// first page, fitted to height, single-page.
    pub fn open(&mut self, document: D) -> Option<D> {
        info!("Showing document with {} pages", document.page_count());
        self.state = ViewerState::for_new_document();
        self.document.replace(document)
    }

    pub fn close(&mut self) -> Option<D> {
        self.state = ViewerState::default();
        self.document.take()
    }

    pub fn document(&self) -> Option<&D> {
        self.document.as_ref()
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.page_count())
    }

    // ── Navigation ───────────────────────────────────────────────────────

    pub fn next_page(&mut self) -> bool {
        let count = self.page_count();
        self.state.next_page(count)
    }

    pub fn prev_page(&mut self) -> bool {
        self.document.is_some() && self.state.prev_page()
    }

    /// Jump to a 0-indexed page.
    pub fn go_to(&mut self, index: usize) -> Result<bool, ViewerError> {
        if self.document.is_none() {
            return Err(ViewerError::NoDocument);
        }
        let count = self.page_count();
        self.state.go_to(index, count)
    }

    // ── Zoom and layout ──────────────────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.state.zoom_in(&self.config);
    }

    pub fn zoom_out(&mut self) {
        self.state.zoom_out(&self.config);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.state.set_zoom(zoom, &self.config);
    }

    pub fn set_fit_width(&mut self) {
        self.state.set_fit_mode(FitMode::FitWidth);
    }

    pub fn set_fit_height(&mut self) {
        self.state.set_fit_mode(FitMode::FitHeight);
    }

    pub fn set_fit_mode(&mut self, mode: FitMode) {
        self.state.set_fit_mode(mode);
    }

    pub fn set_two_page(&mut self, enabled: bool) {
        self.state.set_two_page(enabled);
    }

    /// Flip two-page mode; returns the new setting.
    pub fn toggle_two_page(&mut self) -> bool {
        let enabled = !self.state.two_page;
        self.state.set_two_page(enabled);
        enabled
    }

    // ── Rendering ────────────────────────────────────────────────────────

    pub fn plan(&self, viewport: ViewportSize) -> Result<DisplayPlan, ViewerError> {
        let doc = self.document.as_ref().ok_or(ViewerError::NoDocument)?;
        plan_display(doc, &self.state, viewport, &self.config)
    }

    /// Plan, rasterise and compose the current view.
    ///
    /// Pages that fail to rasterise are drawn as placeholders; only a
    /// failure to plan (no document, bad geometry) is returned as an error.
    pub fn render(&mut self, viewport: ViewportSize) -> Result<RenderedView, ViewerError> {
        let doc = self.document.as_ref().ok_or(ViewerError::NoDocument)?;
        let plan = plan_display(doc, &self.state, viewport, &self.config)?;
        let image = render_plan(doc, &plan, &self.config);
        self.last_viewport = Some(viewport);
        Ok(RenderedView {
            label: plan.label(doc.page_count()),
            plan,
            image,
        })
    }

    /// Page label for the toolbar, `"- / -"` when nothing is open.
    pub fn page_label(&self) -> String {
        match &self.document {
            Some(doc) => {
                let count = doc.page_count();
                format!("{} / {}", self.state.view(count), count)
            }
            None => "- / -".to_string(),
        }
    }

    /// Record a viewport resize. Returns `true` when the view must be laid
    /// out again: a fit mode is active and the size actually changed.
    pub fn on_resize(&mut self, viewport: ViewportSize) -> bool {
        let changed = self.last_viewport != Some(viewport);
        self.last_viewport = Some(viewport);
        let relayout = changed && self.document.is_some() && self.state.fit_mode != FitMode::None;
        if relayout {
            debug!("Viewport now {}; relayout for {}", viewport, self.state.fit_mode);
        }
        relayout
    }

    // ── Text actions ─────────────────────────────────────────────────────

    /// Start `action` on the pages in view.
    ///
    /// # Errors
    /// Checked in this order: [`ViewerError::NoDocument`],
    /// [`ViewerError::ServiceNotConfigured`], [`ViewerError::Busy`],
    /// [`ViewerError::NoText`].
    pub fn request(&mut self, action: &Action) -> Result<(), ViewerError> {
        let doc = self.document.as_ref().ok_or(ViewerError::NoDocument)?;
        if !self.dispatcher.has_service() {
            return Err(ViewerError::ServiceNotConfigured {
                provider: self.config.provider_name.clone(),
                hint: "Check the API key and model in settings.".to_string(),
            });
        }
        if let DispatcherState::Running { action } = self.dispatcher.state() {
            return Err(ViewerError::Busy { action });
        }

        let span = self.state.view(doc.page_count());
        let text = gather_page_text(doc, span);
        if text.is_empty() {
            return Err(ViewerError::NoText {
                pages: span.to_string(),
            });
        }

        let request = action.to_request(&text, &self.config);
        self.dispatcher.submit(request)
    }

    pub fn cancel(&self) -> bool {
        self.dispatcher.cancel()
    }

    pub fn task_state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    pub fn poll_event(&mut self) -> Option<TaskEvent> {
        self.dispatcher.try_event()
    }

    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        self.dispatcher.next_event().await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
