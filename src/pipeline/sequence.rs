//! Report sequencing: the ordered, cross-referenced projection the external
//! document compiler consumes.
//!
//! Pure read-only over organized documents. Categories come out in
//! case-insensitive alphabetical order, documents by final counter within
//! each, and the global index runs across the whole sequence so every
//! document gets a unique cross-reference identifier.

use serde::Serialize;

use super::organize::OrganizedDocument;

/// One document in its final report position.
#[derive(Debug, Clone, Serialize)]
pub struct SequencedDocument {
    pub category: String,
    /// 1-based index across the whole report, never reset per category.
    pub global_index: usize,
    pub counter: u32,
    pub title: String,
    pub year: String,
    pub path: std::path::PathBuf,
    /// Cross-reference anchor the templating step links against.
    pub label: String,
}

/// Per-category metadata for the report's introductory text.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub item_count: usize,
    /// Selects singular or plural phrasing in the category intro.
    pub plural: bool,
    /// Global index of the category's first document — the intro's forward
    /// link target.
    pub first_index: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSequence {
    pub entries: Vec<SequencedDocument>,
    pub categories: Vec<CategorySummary>,
}

/// Order the organized documents for one person and compute cross-reference
/// indices. Categories with no documents do not appear.
pub fn sequence_report(organized: &[OrganizedDocument]) -> ReportSequence {
    // Unique category names, first-seen spelling kept, alphabetical
    // case-insensitive.
    let mut names: Vec<String> = Vec::new();
    for doc in organized {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(&doc.category)) {
            names.push(doc.category.clone());
        }
    }
    names.sort_by_key(|n| n.to_lowercase());

    let mut sequence = ReportSequence::default();
    let mut global_index = 0usize;

    for name in names {
        let mut docs: Vec<&OrganizedDocument> = organized
            .iter()
            .filter(|d| d.category.eq_ignore_ascii_case(&name))
            .collect();
        docs.sort_by_key(|d| d.counter);

        let first_index = global_index + 1;
        let item_count = docs.len();

        for doc in docs {
            global_index += 1;
            sequence.entries.push(SequencedDocument {
                category: name.clone(),
                global_index,
                counter: doc.counter,
                title: doc.title.clone(),
                year: doc.year.clone(),
                path: doc.path.clone(),
                label: format!("doc-{global_index}"),
            });
        }

        sequence.categories.push(CategorySummary {
            name,
            item_count,
            plural: item_count != 1,
            first_index,
        });
    }

    sequence
}
