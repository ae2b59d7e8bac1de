//! Text actions offered on the pages in view.
//!
//! Each action pairs a prompt template with the names the interactive side
//! shows: the action name (progress and busy messages), the result label
//! (result dialog title) and a default key binding.

use crate::config::ViewerConfig;
use crate::dispatch::TaskRequest;
use crate::error::ViewerError;
use crate::prompts;
use crate::settings::{CustomPrompt, Settings};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Translate,
    Summarize,
    Example,
    ExplainTerms,
    Paraphrase,
    Reconstruct,
    InterpretIntent,
    Custom(CustomPrompt),
}

impl Action {
    /// Every built-in action, in menu order.
    pub fn builtins() -> [Action; 7] {
        [
            Action::Translate,
            Action::Summarize,
            Action::Example,
            Action::ExplainTerms,
            Action::Paraphrase,
            Action::Reconstruct,
            Action::InterpretIntent,
        ]
    }

    /// Resolve a name typed by the user: a built-in key (`translate`,
    /// `explain-terms`, …) or the name of a saved custom prompt.
    pub fn parse(name: &str, settings: &Settings) -> Result<Action, ViewerError> {
        let key = name.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        let builtin = match key.as_str() {
            "translate" | "t" => Some(Action::Translate),
            "summarize" | "summarise" | "s" => Some(Action::Summarize),
            "example" | "examples" | "e" => Some(Action::Example),
            "explain-terms" | "explain" | "terms" | "x" => Some(Action::ExplainTerms),
            "paraphrase" => Some(Action::Paraphrase),
            "reconstruct" => Some(Action::Reconstruct),
            "interpret-intent" | "intent" => Some(Action::InterpretIntent),
            _ => None,
        };
        if let Some(action) = builtin {
            return Ok(action);
        }
        settings
            .find_prompt(name.trim())
            .cloned()
            .map(Action::Custom)
            .ok_or_else(|| ViewerError::UnknownAction {
                name: name.to_string(),
            })
    }

    /// Command-line key, e.g. `explain-terms`.
    pub fn key(&self) -> &str {
        match self {
            Action::Translate => "translate",
            Action::Summarize => "summarize",
            Action::Example => "example",
            Action::ExplainTerms => "explain-terms",
            Action::Paraphrase => "paraphrase",
            Action::Reconstruct => "reconstruct",
            Action::InterpretIntent => "interpret-intent",
            Action::Custom(p) => &p.name,
        }
    }

    pub fn action_name(&self) -> &str {
        match self {
            Action::Translate => "Translation",
            Action::Summarize => "Summary",
            Action::Example => "Example generation",
            Action::ExplainTerms => "Term explanation",
            Action::Paraphrase => "Paraphrase",
            Action::Reconstruct => "Reconstruction",
            Action::InterpretIntent => "Intent interpretation",
            Action::Custom(p) => &p.name,
        }
    }

    pub fn result_label(&self) -> String {
        match self {
            Action::Translate => "Translation result".into(),
            Action::Summarize => "Summary result".into(),
            Action::Example => "Examples".into(),
            Action::ExplainTerms => "Term explanations".into(),
            Action::Paraphrase => "Paraphrase result".into(),
            Action::Reconstruct => "Reconstructed text".into(),
            Action::InterpretIntent => "Author's intent".into(),
            Action::Custom(p) => format!("{} result", p.name),
        }
    }

    pub fn template(&self) -> &str {
        match self {
            Action::Translate => prompts::TRANSLATE_PROMPT,
            Action::Summarize => prompts::SUMMARIZE_PROMPT,
            Action::Example => prompts::EXAMPLE_PROMPT,
            Action::ExplainTerms => prompts::EXPLAIN_TERMS_PROMPT,
            Action::Paraphrase => prompts::PARAPHRASE_PROMPT,
            Action::Reconstruct => prompts::RECONSTRUCT_PROMPT,
            Action::InterpretIntent => prompts::INTERPRET_INTENT_PROMPT,
            Action::Custom(p) => &p.template,
        }
    }

    pub fn default_shortcut(&self) -> Option<&str> {
        match self {
            Action::Translate => Some("Tab"),
            Action::Summarize => Some("Ctrl+S"),
            Action::Example => Some("Ctrl+E"),
            Action::ExplainTerms => Some("Ctrl+X"),
            Action::Paraphrase | Action::Reconstruct | Action::InterpretIntent => None,
            Action::Custom(p) => p.shortcut.as_deref(),
        }
    }

    /// Build the dispatcher request for `page_text`.
    pub fn to_request(&self, page_text: &str, config: &ViewerConfig) -> TaskRequest {
        TaskRequest {
            prompt: prompts::fill_template(self.template(), page_text, &config.output_language),
            result_label: self.result_label(),
            action_name: self.action_name().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_name())
    }
}
