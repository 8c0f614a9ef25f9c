//! Report types - plans, sections, snippets, and the assembled document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output of the planner: what to research and how to lay it out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// Report title
    pub title: String,

    /// Raw outline markdown as written by the planner
    pub outline: String,

    /// Section titles in outline order
    pub sections: Vec<String>,

    /// Search keywords
    pub keywords: Vec<String>,
}

impl ResearchPlan {
    /// Create a plan from section titles and keywords.
    pub fn new(
        title: impl Into<String>,
        sections: Vec<String>,
        keywords: Vec<String>,
    ) -> Self {
        let outline = sections
            .iter()
            .map(|s| format!("## {}", s))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            title: title.into(),
            outline,
            sections,
            keywords,
        }
    }
}

/// One generated heading of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub body_markdown: String,
}

impl Section {
    pub fn new(title: impl Into<String>, body_markdown: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body_markdown: body_markdown.into(),
        }
    }
}

/// A retrieved excerpt handed to the section writer.
///
/// `number` is local to one prompt (`[1]..[k]`) and unrelated to the
/// bibliography numbering of the final document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// 1-based prompt-local number
    pub number: usize,

    /// Position of the source text in the vector index
    pub position: usize,

    /// Cosine similarity to the section title
    pub score: f32,

    /// Shortened text
    pub text: String,
}

/// One bibliography entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// 1-based citation number
    pub number: usize,
    pub title: String,
    pub url: String,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} — {}", self.number, self.title, self.url)
    }
}

/// The finished report: title, sections, and references.
///
/// Immutable once assembled. The rendered markdown is computed once at
/// assembly time so verification scans exactly what callers receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    title: String,
    sections: Vec<Section>,
    references: Vec<Reference>,
    markdown: String,
}

impl ReportDocument {
    pub(crate) fn from_parts(
        title: String,
        sections: Vec<Section>,
        references: Vec<Reference>,
        markdown: String,
    ) -> Self {
        Self {
            title,
            sections,
            references,
            markdown,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// The full document as markdown.
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn into_markdown(self) -> String {
        self.markdown
    }
}

impl fmt::Display for ReportDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_outline_from_sections() {
        let plan = ResearchPlan::new(
            "Solar",
            vec!["Intro".to_string(), "Costs".to_string()],
            vec!["solar".to_string()],
        );
        assert_eq!(plan.outline, "## Intro\n## Costs");
    }

    #[test]
    fn test_reference_display() {
        let reference = Reference {
            number: 2,
            title: "Grid storage".to_string(),
            url: "https://example.com/grid".to_string(),
        };
        assert_eq!(
            reference.to_string(),
            "[2] Grid storage — https://example.com/grid"
        );
    }
}
