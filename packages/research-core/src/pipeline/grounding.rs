//! Citation verification.
//!
//! Every `[n]` in the assembled document must point at a bibliography entry.
//! Numbers outside `1..=page_count` are dangling. Dangling citations are
//! reported, never fatal.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use crate::types::report::ReportDocument;

static RE_CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// Citation numbers with no matching bibliography entry, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingCitations(BTreeSet<usize>);

impl DanglingCitations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, number: usize) -> bool {
        self.0.contains(&number)
    }

    pub fn numbers(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn as_set(&self) -> &BTreeSet<usize> {
        &self.0
    }
}

impl fmt::Display for DanglingCitations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers: Vec<String> = self.0.iter().map(|n| format!("[{}]", n)).collect();
        f.write_str(&numbers.join(", "))
    }
}

/// Distinct citation numbers appearing as `[n]` in `text`.
///
/// Numbers too large for `usize` are ignored.
pub fn extract_citations(text: &str) -> BTreeSet<usize> {
    RE_CITATION
        .captures_iter(text)
        .filter_map(|cap| cap.get(1)?.as_str().parse().ok())
        .collect()
}

/// Citations in `text` minus `{1..=page_count}`.
pub fn find_dangling(text: &str, page_count: usize) -> DanglingCitations {
    DanglingCitations(
        extract_citations(text)
            .into_iter()
            .filter(|&n| n == 0 || n > page_count)
            .collect(),
    )
}

/// Check an assembled document against its bibliography.
pub fn verify_citations(document: &ReportDocument) -> DanglingCitations {
    find_dangling(document.markdown(), document.references().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_dangling_example() {
        let dangling = find_dangling("See [1], [2] and [7].", 3);
        assert_eq!(dangling.as_set(), &BTreeSet::from([7]));
        assert_eq!(dangling.to_string(), "[7]");
    }

    #[test]
    fn test_zero_is_dangling() {
        assert!(find_dangling("[0]", 3).contains(0));
    }

    #[test]
    fn test_no_citations() {
        assert!(find_dangling("no brackets here [a] [ 1 ]", 0).is_empty());
    }

    #[test]
    fn test_overflowing_number_ignored() {
        let text = "[99999999999999999999999999] and [4]";
        let dangling = find_dangling(text, 2);
        assert_eq!(dangling.as_set(), &BTreeSet::from([4]));
    }

    #[test]
    fn test_duplicates_collapsed() {
        let dangling = find_dangling("[5][5] [5]", 1);
        assert_eq!(dangling.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_dangling_is_set_difference(
            cited in proptest::collection::vec(0usize..40, 0..20),
            page_count in 0usize..30,
        ) {
            let text: String = cited.iter().map(|n| format!("claim [{}]. ", n)).collect();
            let dangling = find_dangling(&text, page_count);

            let expected: BTreeSet<usize> = cited
                .iter()
                .copied()
                .filter(|n| !(1..=page_count).contains(n))
                .collect();
            prop_assert_eq!(dangling.as_set(), &expected);
        }
    }
}
