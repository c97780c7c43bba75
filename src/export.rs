//! # Export rendering
//!
//! Renders a fully-resolved note for the export collaborator. The store
//! is the gatekeeper: it only hands this module unlocked (or verified)
//! notes. PDF output stays with the presentation layer.

use crate::error::Result;
use crate::model::{ContentBlock, Note};

/// Target format for a single-note export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
    PlainText,
}

impl ExportFormat {
    /// Detect format from a target filename extension. Unknown extensions
    /// fall back to plain text.
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.ends_with(".md") || lower.ends_with(".markdown") {
            ExportFormat::Markdown
        } else if lower.ends_with(".json") {
            ExportFormat::Json
        } else {
            ExportFormat::PlainText
        }
    }
}

/// Render `note` in the requested format.
pub fn render(note: &Note, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Markdown => Ok(markdown(note)),
        ExportFormat::Json => json(note),
        ExportFormat::PlainText => Ok(plain_text(note)),
    }
}

fn markdown(note: &Note) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", note.title));

    if !note.tags.is_empty() {
        out.push('\n');
        let tags: Vec<String> = note.tags.iter().map(|t| format!("#{}", t)).collect();
        out.push_str(&tags.join(" "));
        out.push('\n');
    }

    let mut numbered = 0usize;
    for block in &note.content.blocks {
        out.push('\n');
        if !matches!(block, ContentBlock::NumberedItem { .. }) {
            numbered = 0;
        }
        match block {
            ContentBlock::Paragraph { text } => {
                out.push_str(text);
                out.push('\n');
            }
            ContentBlock::Heading { level, text } => {
                // Clamp to markdown's six heading levels
                let level = (*level).clamp(1, 6) as usize;
                out.push_str(&format!("{} {}\n", "#".repeat(level), text));
            }
            ContentBlock::BulletItem { text } => {
                out.push_str(&format!("- {}\n", text));
            }
            ContentBlock::NumberedItem { text } => {
                numbered += 1;
                out.push_str(&format!("{}. {}\n", numbered, text));
            }
            ContentBlock::Quote { text } => {
                out.push_str(&format!("> {}\n", text));
            }
            ContentBlock::Code { language, text } => {
                out.push_str(&format!(
                    "```{}\n{}\n```\n",
                    language.as_deref().unwrap_or(""),
                    text
                ));
            }
            ContentBlock::Divider => {
                out.push_str("---\n");
            }
        }
    }
    out
}

fn json(note: &Note) -> Result<String> {
    // Strip the passcode hash from the handoff; the collaborator has no
    // business with credential material.
    let mut sanitized = note.clone();
    sanitized.passcode_hash = None;
    Ok(serde_json::to_string_pretty(&sanitized)?)
}

fn plain_text(note: &Note) -> String {
    let body = note.content.plain_text();
    if body.is_empty() {
        note.title.clone()
    } else {
        format!("{}\n\n{}", note.title, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockDocument, Note};

    fn note() -> Note {
        let mut n = Note::new(
            "Groceries".to_string(),
            BlockDocument::new(vec![
                ContentBlock::Heading {
                    level: 2,
                    text: "This week".into(),
                },
                ContentBlock::BulletItem { text: "Milk".into() },
                ContentBlock::BulletItem { text: "Eggs".into() },
                ContentBlock::NumberedItem { text: "First".into() },
                ContentBlock::NumberedItem { text: "Second".into() },
                ContentBlock::Divider,
                ContentBlock::Code {
                    language: Some("sh".into()),
                    text: "echo hi".into(),
                },
            ]),
        );
        n.add_tag("food").unwrap();
        n
    }

    #[test]
    fn markdown_renders_blocks() {
        let md = render(&note(), ExportFormat::Markdown).unwrap();
        assert!(md.starts_with("# Groceries\n"));
        assert!(md.contains("#food"));
        assert!(md.contains("## This week"));
        assert!(md.contains("- Milk"));
        assert!(md.contains("1. First"));
        assert!(md.contains("2. Second"));
        assert!(md.contains("---"));
        assert!(md.contains("```sh\necho hi\n```"));
    }

    #[test]
    fn numbered_lists_restart_after_interruption() {
        let n = Note::new(
            "n".into(),
            BlockDocument::new(vec![
                ContentBlock::NumberedItem { text: "a".into() },
                ContentBlock::Paragraph { text: "break".into() },
                ContentBlock::NumberedItem { text: "b".into() },
            ]),
        );
        let md = render(&n, ExportFormat::Markdown).unwrap();
        assert!(md.contains("1. a"));
        assert!(md.contains("1. b"));
        assert!(!md.contains("2. b"));
    }

    #[test]
    fn plain_text_is_title_and_body() {
        let text = render(&note(), ExportFormat::PlainText).unwrap();
        assert!(text.starts_with("Groceries\n\n"));
        assert!(text.contains("Milk"));
    }

    #[test]
    fn json_omits_passcode_hash() {
        let mut n = note();
        n.is_locked = true;
        n.passcode_hash = Some("$argon2id$secret".to_string());

        let json = render(&n, ExportFormat::Json).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("Groceries"));
    }

    #[test]
    fn format_detection_from_filename() {
        assert_eq!(ExportFormat::from_filename("out.md"), ExportFormat::Markdown);
        assert_eq!(
            ExportFormat::from_filename("OUT.MARKDOWN"),
            ExportFormat::Markdown
        );
        assert_eq!(ExportFormat::from_filename("out.json"), ExportFormat::Json);
        assert_eq!(
            ExportFormat::from_filename("out.txt"),
            ExportFormat::PlainText
        );
    }
}
