//! Prompt templates for planning and section writing, and plan parsing.
//!
//! These are plain text with `{placeholder}` markers. The reference
//! language-model client uses them; other implementations may bring their
//! own.

use indexmap::IndexSet;
use regex::Regex;
use std::sync::LazyLock;

use crate::types::report::{ResearchPlan, Snippet};

/// Outline used when the planner returns no `##` headings.
pub const DEFAULT_OUTLINE: &[&str] = &["Introduction", "Main Analysis", "Key Findings", "Conclusion"];

/// System prompt for the research planner.
pub const PLANNER_SYSTEM_PROMPT: &str = "You are an expert research planner who creates comprehensive, well-structured outlines for in-depth research reports.";

/// Planner prompt. Placeholder: {question}
pub const PLANNER_PROMPT: &str = r#"Topic: {question}

Create a research plan with:

1. A Markdown outline with 5-8 H2 sections that cover the topic thoroughly
2. Each section should be substantial enough for 300-500 words
3. Diverse angles: overview, features, comparisons, case studies, challenges, outlook
4. 12-16 targeted search keywords

Format:
# [Report Title]

## Section Title
One line on what this section covers

[continue for all sections]

<keywords>
<k>primary keyword</k>
<k>secondary keyword</k>
[continue for all keywords]
</keywords>
"#;

/// System prompt for section writing.
pub const SECTION_SYSTEM_PROMPT: &str = "You are an expert research writer. Using ONLY the provided numbered snippets, write a well-flowing section of 300-500 words. Vary the structure between paragraphs, lists, and subheadings as appropriate. Always cite sources using [number] format, where the number is the snippet number.";

/// Section prompt. Placeholders: {title}, {snippets}
pub const SECTION_PROMPT: &str = r#"SECTION: {title}

Available Information:
{snippets}

Write an informative, naturally-flowing section about this topic."#;

static RE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<k>(.*?)</k>").unwrap());

/// Format the planner prompt.
pub fn format_planner_prompt(question: &str) -> String {
    PLANNER_PROMPT.replace("{question}", question)
}

/// Number snippets one per line as `[n] text`.
pub fn format_snippets(snippets: &[Snippet]) -> String {
    snippets
        .iter()
        .map(|s| format!("[{}] {}", s.number, s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the section prompt.
pub fn format_section_prompt(title: &str, snippets: &[Snippet]) -> String {
    SECTION_PROMPT
        .replace("{title}", title)
        .replace("{snippets}", &format_snippets(snippets))
}

/// Parse a planner response into a [`ResearchPlan`].
///
/// - Title: the first `# ` line, else the question.
/// - Sections: every `## ` line, else [`DEFAULT_OUTLINE`].
/// - Keywords: `<k>` entries of the `<keywords>` block, de-duplicated in
///   order, else the question itself.
pub fn parse_plan(question: &str, response: &str) -> ResearchPlan {
    let (outline_part, keyword_part) = match response.find("<keywords") {
        Some(at) => response.split_at(at),
        None => (response, ""),
    };
    let outline_part = outline_part.trim();

    let title = outline_part
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| question.trim().to_string());

    let sections: Vec<String> = outline_part
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("## "))
        .map(|t| t.trim().trim_end_matches('#').trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let keywords: IndexSet<String> = RE_KEYWORD
        .captures_iter(keyword_part)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    let keywords: Vec<String> = if keywords.is_empty() {
        vec![question.trim().to_string()]
    } else {
        keywords.into_iter().collect()
    };

    if sections.is_empty() {
        let defaults = DEFAULT_OUTLINE.iter().map(|s| s.to_string()).collect();
        return ResearchPlan::new(title, defaults, keywords);
    }

    ResearchPlan {
        title,
        outline: outline_part.to_string(),
        sections,
        keywords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"# Grid-Scale Storage

## Overview
What it is

## Lithium vs Sodium
Comparison

## Outlook ##
Where it goes

<keywords>
<k>grid battery storage</k>
<k> sodium-ion grid </k>
<k>grid battery storage</k>
<k></k>
</keywords>"#;

    #[test]
    fn test_parse_plan() {
        let plan = parse_plan("How will grids store energy?", RESPONSE);
        assert_eq!(plan.title, "Grid-Scale Storage");
        assert_eq!(plan.sections, vec!["Overview", "Lithium vs Sodium", "Outlook"]);
        assert_eq!(plan.keywords, vec!["grid battery storage", "sodium-ion grid"]);
        assert!(plan.outline.starts_with("# Grid-Scale Storage"));
        assert!(!plan.outline.contains("<keywords"));
    }

    #[test]
    fn test_missing_keywords_uses_question() {
        let plan = parse_plan("tidal power", "# Tidal\n\n## Basics\n");
        assert_eq!(plan.keywords, vec!["tidal power"]);
        assert_eq!(plan.sections, vec!["Basics"]);
    }

    #[test]
    fn test_missing_sections_uses_default_outline() {
        let plan = parse_plan("tidal power", "Just prose, no headings.");
        assert_eq!(plan.title, "tidal power");
        assert_eq!(
            plan.sections,
            vec!["Introduction", "Main Analysis", "Key Findings", "Conclusion"]
        );
        assert!(plan.outline.contains("## Key Findings"));
    }

    #[test]
    fn test_section_prompt_numbers_snippets() {
        let snippets = vec![
            Snippet {
                number: 1,
                position: 4,
                score: 0.9,
                text: "alpha".to_string(),
            },
            Snippet {
                number: 2,
                position: 0,
                score: 0.5,
                text: "beta".to_string(),
            },
        ];
        let prompt = format_section_prompt("Costs", &snippets);
        assert!(prompt.starts_with("SECTION: Costs"));
        assert!(prompt.contains("[1] alpha\n[2] beta"));
    }

    #[test]
    fn test_planner_prompt() {
        assert!(format_planner_prompt("heat pumps").starts_with("Topic: heat pumps"));
    }
}
