//! Prompt templates for the built-in text actions.
//!
//! Every template takes two placeholders:
//!
//! - `{text}`: the page text, already labelled with `[Page N]` markers
//! - `{language}`: the answer language from
//!   [`crate::config::ViewerConfig::output_language`]
//!
//! The page text is fenced with `---` lines so the model can tell the
//! instruction from the material it works on.

pub const TRANSLATE_PROMPT: &str =
    "Translate the following text into {language}:\n\n---\n{text}\n---";

pub const SUMMARIZE_PROMPT: &str =
    "Summarise the following text concisely in {language}:\n\n---\n{text}\n---";

pub const EXAMPLE_PROMPT: &str = "Give concrete examples that illustrate the content of the \
following text. Write the answer in {language}:\n\n---\n{text}\n---";

pub const EXPLAIN_TERMS_PROMPT: &str = "Pick out the technical terms and key concepts in the \
following text and explain each one so that a beginner can follow. Write the answer in \
{language}:\n\n---\n{text}\n---";

pub const PARAPHRASE_PROMPT: &str = "Rewrite the following text in plain, simple {language} \
while keeping its meaning:\n\n---\n{text}\n---";

pub const RECONSTRUCT_PROMPT: &str = "Reorganise the following text into a clear structure \
with headings and bullet points. Write the answer in {language}:\n\n---\n{text}\n---";

pub const INTERPRET_INTENT_PROMPT: &str = "Explain what the author of the following text is \
trying to convey and why. Write the answer in {language}:\n\n---\n{text}\n---";

/// Fill a template's `{text}` and `{language}` placeholders.
///
/// The text is substituted last so braces inside page text are left alone.
pub fn fill_template(template: &str, text: &str, language: &str) -> String {
    template
        .replace("{language}", language)
        .replace("{text}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[&str] = &[
        TRANSLATE_PROMPT,
        SUMMARIZE_PROMPT,
        EXAMPLE_PROMPT,
        EXPLAIN_TERMS_PROMPT,
        PARAPHRASE_PROMPT,
        RECONSTRUCT_PROMPT,
        INTERPRET_INTENT_PROMPT,
    ];

    #[test]
    fn every_template_has_both_placeholders() {
        for t in ALL {
            assert!(t.contains("{text}"), "{t}");
            assert!(t.contains("{language}"), "{t}");
        }
    }

    #[test]
    fn fill_replaces_placeholders() {
        let p = fill_template(TRANSLATE_PROMPT, "[Page 1]\nHello", "French");
        assert!(p.starts_with("Translate the following text into French"));
        assert!(p.contains("---\n[Page 1]\nHello\n---"));
    }

    #[test]
    fn braces_in_page_text_survive() {
        let p = fill_template("{text}", "fn f() { {language} }", "German");
        assert_eq!(p, "fn f() { {language} }");
    }
}
