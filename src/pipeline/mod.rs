//! Collaborator-facing stages: everything that touches pdfium or the
//! remote text service lives under here.
//!
//! ## Data Flow
//!
//! ```text
//!             ┌──▶ render ──▶ compose ──▶ RgbImage for the viewport
//! input ──▶ engine
//! (path)   (pdfium)
//!             └──▶ render ──▶ text ──▶ llm ──▶ completion
//! ```
//!
//! 1. [`input`]   — check the path exists and starts with `%PDF`
//! 2. [`engine`]  — bind the pdfium library once per process
//! 3. [`render`]  — [`render::DocumentSource`] and its pdfium implementation
//! 4. [`compose`] — rasterise a display plan, substitute placeholders, lay pairs side by side
//! 5. [`text`]    — clean extracted text and label it per page
//! 6. [`llm`]     — [`llm::TextService`] over an `edgequake_llm` provider

pub mod compose;
pub mod engine;
pub mod input;
pub mod llm;
pub mod render;
pub mod text;
