//! The model's answer, parsed.
//!
//! The prompt asks for bare JSON but models often wrap it in a markdown
//! fence or add a sentence around it, so the object is cut out first. If it
//! still does not parse, the raw text becomes the executive summary and the
//! report is rendered anyway.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    #[serde(alias = "med")]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub priority: Priority,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commands: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Narrative {
    pub executive_summary: String,
    pub package_analysis: String,
    pub update_analysis: String,
    pub orphan_analysis: String,
    pub cache_analysis: String,
    pub dependency_analysis: String,
    pub recommendations: Vec<Recommendation>,
    pub conclusion: String,
}

impl Narrative {
    pub fn from_model_text(text: &str) -> Self {
        let candidate = extract_json(text);
        match serde_json::from_str::<Narrative>(candidate) {
            Ok(mut narrative) => {
                narrative.prioritize();
                narrative
            }
            Err(e) => {
                warn!(error = %e, "model output is not the expected JSON, using it as plain text");
                Narrative {
                    executive_summary: text.trim().to_string(),
                    ..Narrative::default()
                }
            }
        }
    }

    /// High before medium before low; order within a priority is kept.
    fn prioritize(&mut self) {
        self.recommendations.sort_by_key(|r| r.priority);
    }
}

/// Strips a markdown fence and anything outside the outermost braces.
fn extract_json(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(start) = body.find("```json") {
        let rest = &body[start + "```json".len()..];
        body = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
    } else if let Some(start) = body.find("```") {
        let rest = &body[start + 3..];
        body = rest.rfind("```").map(|end| &rest[..end]).unwrap_or(rest);
    }

    match (body.find('{'), body.rfind('}')) {
        (Some(first), Some(last)) if first < last => &body[first..=last],
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "executive_summary": "All good.",
        "update_analysis": "Update soon.",
        "recommendations": [
            {"priority": "low", "title": "Clean cache", "description": "Frees space", "commands": ["sudo dnf clean all"]},
            {"priority": "high", "title": "Apply security updates", "description": "openssl", "commands": null},
            {"priority": "low", "title": "Remove orphans"},
            {"priority": "medium", "title": "Review duplicates"}
        ],
        "conclusion": "Done."
    }"#;

    #[test]
    fn parses_and_prioritizes() {
        let n = Narrative::from_model_text(JSON);
        assert_eq!(n.executive_summary, "All good.");
        assert_eq!(n.package_analysis, "");
        let titles: Vec<_> = n.recommendations.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Apply security updates", "Review duplicates", "Clean cache", "Remove orphans"]);
        assert_eq!(n.recommendations[2].commands.as_deref(), Some(&["sudo dnf clean all".to_string()][..]));
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let fenced = format!("Here is the analysis:\n```json\n{JSON}\n```\nHope it helps.");
        assert_eq!(Narrative::from_model_text(&fenced).conclusion, "Done.");

        let plain_fence = format!("```\n{JSON}\n```");
        assert_eq!(Narrative::from_model_text(&plain_fence).conclusion, "Done.");
    }

    #[test]
    fn unparseable_text_becomes_summary() {
        let n = Narrative::from_model_text("  The system looks healthy.  ");
        assert_eq!(n.executive_summary, "The system looks healthy.");
        assert!(n.recommendations.is_empty());
    }
}
