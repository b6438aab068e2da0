//! Loads the three LLM system prompts from `/root/crate/prompts/` at
//! startup, in the style of a teacher that keeps prompt text out of Rust
//! string literals. Each template uses `{placeholder}` substitution.

use std::path::{Path, PathBuf};

use crate::error::{AnalyzerError, Result};

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    new_ongoing: String,
    continue_ongoing: String,
    complete_event: String,
    reflection: String,
}

impl PromptLibrary {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            new_ongoing: read_prompt(dir, "new_ongoing.md")?,
            continue_ongoing: read_prompt(dir, "continue_ongoing.md")?,
            complete_event: read_prompt(dir, "complete_event.md")?,
            reflection: read_prompt(dir, "reflection.md")?,
        })
    }

    pub fn new_ongoing(&self, transcript: &str) -> String {
        render(&self.new_ongoing, &[("transcript", transcript)])
    }

    pub fn continue_ongoing(&self, previous_title: &str, previous_summary: &str, previous_story: &str, new_transcript: &str) -> String {
        render(
            &self.continue_ongoing,
            &[
                ("previous_title", previous_title),
                ("previous_summary", previous_summary),
                ("previous_story", previous_story),
                ("new_transcript", new_transcript),
            ],
        )
    }

    pub fn complete_event(&self, previous_title: &str, previous_summary: &str, previous_story: &str, new_transcript: &str) -> String {
        render(
            &self.complete_event,
            &[
                ("previous_title", previous_title),
                ("previous_summary", previous_summary),
                ("previous_story", previous_story),
                ("new_transcript", new_transcript),
            ],
        )
    }

    pub fn reflection(&self, events_summary: &str) -> String {
        render(&self.reflection, &[("events_summary", events_summary)])
    }
}

fn read_prompt(dir: &Path, file: &str) -> Result<String> {
    let path: PathBuf = dir.join(file);
    std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AnalyzerError::MissingPrompt(path.display().to_string())
        } else {
            AnalyzerError::PromptIo(e)
        }
    })
}

fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
