//! Text extraction cleanup and assembly of the text sent with an action.
//!
//! pdfium returns page text with whatever line endings and padding the
//! producer wrote. A few cheap, deterministic rules normalise it before it
//! becomes part of a prompt:
//!
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 3. Trim trailing whitespace per line
//! 4. Collapse runs of 3+ blank lines down to one blank line
//!
//! [`gather_page_text`] then joins the pages in view, each headed by a
//! `[Page N]` marker so the model can tell a pair apart.

use crate::layout::PageSpan;
use crate::pipeline::render::DocumentSource;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Apply every cleanup rule to raw extracted text.
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    collapse_blank_lines(&s)
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

/// Text of every page in `span`, each prefixed with `[Page N]`.
///
/// Pages with no text after cleanup contribute nothing. The result is
/// trimmed, so an empty string means the whole view had no text.
pub fn gather_page_text<D: DocumentSource + ?Sized>(doc: &D, span: PageSpan) -> String {
    let mut out = String::new();
    for index in span.indices() {
        let text = clean_text(&doc.extract_text(index));
        let text = text.trim();
        if text.is_empty() {
            debug!("Page {} has no extractable text", index + 1);
            continue;
        }
        out.push_str(&format!("[Page {}]\n{}\n\n", index + 1, text));
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use crate::layout::PageGeometry;
    use image::RgbImage;

    struct Texts(Vec<&'static str>);

    impl DocumentSource for Texts {
        fn page_count(&self) -> usize {
            self.0.len()
        }
        fn page_geometry(&self, _index: usize) -> Result<PageGeometry, ViewerError> {
            Ok(PageGeometry::new(100.0, 100.0))
        }
        fn rasterize(&self, _index: usize, _zoom: f32) -> Result<RgbImage, ViewerError> {
            Ok(RgbImage::new(1, 1))
        }
        fn extract_text(&self, index: usize) -> String {
            self.0[index].to_string()
        }
    }

    #[test]
    fn crlf_is_normalised() {
        assert_eq!(clean_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        assert_eq!(clean_text("one   \ntwo\t"), "one\ntwo");
    }

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(clean_text("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn invisible_characters_are_removed() {
        assert_eq!(clean_text("\u{FEFF}co\u{00AD}op\u{200B}"), "coop");
    }

    #[test]
    fn pair_text_is_labelled_per_page() {
        let doc = Texts(vec!["cover", "left side  ", "right side"]);
        let text = gather_page_text(&doc, PageSpan::Pair(1, 2));
        assert_eq!(text, "[Page 2]\nleft side\n\n[Page 3]\nright side");
    }

    #[test]
    fn blank_pages_are_skipped() {
        let doc = Texts(vec!["", "  \n ", "body"]);
        assert_eq!(gather_page_text(&doc, PageSpan::Pair(0, 1)), "");
        assert_eq!(gather_page_text(&doc, PageSpan::Pair(1, 2)), "[Page 3]\nbody");
    }
}
