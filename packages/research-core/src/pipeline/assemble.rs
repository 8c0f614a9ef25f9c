//! Document assembly: title, sections in outline order, then references.

use crate::types::page::Page;
use crate::types::report::{Reference, ReportDocument, Section};

/// Number pages `1..=n` in the order given.
pub fn build_references(pages: &[Page]) -> Vec<Reference> {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| Reference {
            number: i + 1,
            title: page.title.clone(),
            url: page.url.clone(),
        })
        .collect()
}

/// Render and freeze the final document.
///
/// The bibliography numbering follows `pages` exactly; it is unrelated to
/// the per-prompt snippet numbers.
pub fn assemble_document(title: &str, sections: Vec<Section>, pages: &[Page]) -> ReportDocument {
    let references = build_references(pages);

    let mut markdown = format!("# {}\n\n", title.trim());
    for section in &sections {
        markdown.push_str(&format!(
            "## {}\n\n{}\n\n",
            section.title.trim(),
            section.body_markdown.trim()
        ));
    }
    markdown.push_str("## References\n\n");
    for reference in &references {
        markdown.push_str(&reference.to_string());
        markdown.push('\n');
    }

    ReportDocument::from_parts(title.trim().to_string(), sections, references, markdown)
}
