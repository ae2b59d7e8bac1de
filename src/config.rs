//! Configuration types for the viewer, layout engine and text actions.
//!
//! All tunable behaviour lives in [`ViewerConfig`], built via its
//! [`ViewerConfigBuilder`]. The layout engine, compositor, session and
//! text service all read from the same struct, so one config value fully
//! describes how a page pair is laid out and how actions are sent.
//!
//! Persisted user choices (API key, selected model, custom prompts) live in
//! [`crate::settings::Settings`] instead; this struct is per-process.

use crate::error::ViewerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest zoom factor the layout engine will ever produce.
pub const MIN_ZOOM: f32 = 0.1;
/// Largest zoom factor the layout engine will ever produce.
pub const MAX_ZOOM: f32 = 10.0;
/// Factor applied by one zoom-in / zoom-out step.
pub const ZOOM_INCREMENT: f32 = 1.2;
/// Pixels kept free around the page when fitting to the viewport.
pub const FIT_PADDING: u32 = 15;
/// Unzoomed gap (points) between the two pages of a pair.
pub const TWO_PAGE_SPACING: f32 = 10.0;

/// Configuration for a viewer session.
///
/// Built via [`ViewerConfig::builder()`] or using [`ViewerConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfview::ViewerConfig;
///
/// let config = ViewerConfig::builder()
///     .zoom_limits(0.25, 8.0)
///     .fit_padding(20)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_zoom, 8.0);
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Lower zoom clamp. Default: 0.1.
    pub min_zoom: f32,

    /// Upper zoom clamp. Default: 10.0.
    pub max_zoom: f32,

    /// Multiplier for one zoom step. Default: 1.2.
    pub zoom_increment: f32,

    /// Pixels subtracted from the viewport before fitting. Default: 15.
    ///
    /// Leaves room for the scroll area frame so a fitted page never
    /// triggers a scroll bar by a single pixel.
    pub fit_padding: u32,

    /// Unzoomed spacing between paired pages, in points. Default: 10.
    pub page_spacing: f32,

    /// Edge length of the square placeholder drawn for a page that failed to
    /// rasterise. Default: 10.
    pub placeholder_size: u32,

    /// Background fill for the composed two-page image. Default: dark grey.
    pub background: [u8; 3],

    /// Fill colour of the placeholder image. Default: red.
    pub placeholder_colour: [u8; 3],

    /// Text-service provider name understood by `edgequake_llm::ProviderFactory`.
    /// Default: "gemini".
    pub provider_name: String,

    /// Model override. If None, the model saved in settings is used.
    pub model: Option<String>,

    /// Sampling temperature sent with every action. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may produce per action. Default: 8192.
    pub max_tokens: usize,

    /// Language the built-in prompts ask the model to answer in. Default: "Japanese".
    pub output_language: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            zoom_increment: ZOOM_INCREMENT,
            fit_padding: FIT_PADDING,
            page_spacing: TWO_PAGE_SPACING,
            placeholder_size: 10,
            background: [53, 53, 53],
            placeholder_colour: [255, 0, 0],
            provider_name: "gemini".to_string(),
            model: None,
            temperature: 0.7,
            max_tokens: 8192,
            output_language: "Japanese".to_string(),
            password: None,
        }
    }
}

impl fmt::Debug for ViewerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerConfig")
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("zoom_increment", &self.zoom_increment)
            .field("fit_padding", &self.fit_padding)
            .field("page_spacing", &self.page_spacing)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("output_language", &self.output_language)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ViewerConfig {
    /// Create a new builder for `ViewerConfig`.
    pub fn builder() -> ViewerConfigBuilder {
        ViewerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Clamp a zoom factor into `[min_zoom, max_zoom]`.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_nan() {
            return self.min_zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

/// Builder for [`ViewerConfig`].
#[derive(Debug)]
pub struct ViewerConfigBuilder {
    config: ViewerConfig,
}

impl ViewerConfigBuilder {
    pub fn zoom_limits(mut self, min: f32, max: f32) -> Self {
        self.config.min_zoom = min;
        self.config.max_zoom = max;
        self
    }

    pub fn zoom_increment(mut self, factor: f32) -> Self {
        self.config.zoom_increment = factor;
        self
    }

    pub fn fit_padding(mut self, px: u32) -> Self {
        self.config.fit_padding = px;
        self
    }

    pub fn page_spacing(mut self, points: f32) -> Self {
        self.config.page_spacing = points.max(0.0);
        self
    }

    pub fn placeholder_size(mut self, px: u32) -> Self {
        self.config.placeholder_size = px.max(1);
        self
    }

    pub fn background(mut self, rgb: [u8; 3]) -> Self {
        self.config.background = rgb;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn output_language(mut self, language: impl Into<String>) -> Self {
        self.config.output_language = language.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ViewerConfig, ViewerError> {
        let c = &self.config;
        if !(c.min_zoom > 0.0 && c.min_zoom <= c.max_zoom && c.max_zoom.is_finite()) {
            return Err(ViewerError::InvalidConfig(format!(
                "zoom limits must satisfy 0 < min ≤ max, got {}..{}",
                c.min_zoom, c.max_zoom
            )));
        }
        if !(c.zoom_increment > 1.0 && c.zoom_increment.is_finite()) {
            return Err(ViewerError::InvalidConfig(format!(
                "zoom increment must be > 1, got {}",
                c.zoom_increment
            )));
        }
        if c.provider_name.trim().is_empty() {
            return Err(ViewerError::InvalidConfig(
                "provider name must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ViewerError::InvalidConfig("max tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the zoom factor is chosen for each render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitMode {
    /// The manually set zoom factor applies.
    #[default]
    None,
    /// Zoom so the page (or pair) fills the viewport width.
    FitWidth,
    /// Zoom so the taller page fills the viewport height.
    FitHeight,
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitMode::None => f.write_str("manual"),
            FitMode::FitWidth => f.write_str("fit-width"),
            FitMode::FitHeight => f.write_str("fit-height"),
        }
    }
}
