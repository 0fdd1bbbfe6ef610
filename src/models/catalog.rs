//! Per-person catalog state: categories, sections, and counter assignment.
//!
//! A `PersonCatalog` is the session object for one person — built fresh on
//! every reload, so per-category max counters never leak across people or
//! across repeated scans.

use serde::Serialize;

use super::document::Document;

/// One configured category. `ordinal` is its position in the
/// case-insensitive alphabetical order of the category list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub ordinal: usize,
}

/// The documents and bookkeeping for one category within one person's
/// catalog. Owns the running maximum counter used to hand out fresh slots.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySection {
    pub category: Category,
    pub documents: Vec<Document>,
    max_counter: u32,
}

impl CategorySection {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            documents: Vec::new(),
            max_counter: 0,
        }
    }

    pub fn max_counter(&self) -> u32 {
        self.max_counter
    }

    /// Record a counter seen on disk during a scan. Only scans feed this;
    /// fresh manual selections do not.
    pub fn observe_counter(&mut self, counter: u32) {
        if counter > self.max_counter {
            self.max_counter = counter;
        }
    }

    /// Hand out the next free slot after the highest counter seen so far.
    pub fn next_counter(&mut self) -> u32 {
        self.max_counter += 1;
        self.max_counter
    }

    /// Resolve the final ordering counter for `documents[doc_index]` and
    /// store it as the document's current counter value.
    ///
    /// Priority: manual counter (verbatim) > detected counter (reused
    /// unchanged, so re-saves never move a document) > next free slot.
    pub fn assign_counter(&mut self, doc_index: usize) -> u32 {
        let (manual, detected) = {
            let doc = &self.documents[doc_index];
            (doc.manual_counter, doc.detected_counter)
        };

        let counter = match manual {
            Some(m) if m > 0 => m,
            _ if detected > 0 => detected,
            _ => self.next_counter(),
        };

        self.documents[doc_index].current_counter_value = counter;
        counter
    }
}

/// All of one person's sections. Built fresh whenever the person's data is
/// reloaded, which resets every per-category max counter.
#[derive(Debug, Clone, Serialize)]
pub struct PersonCatalog {
    pub person: String,
    pub sections: Vec<CategorySection>,
}

impl PersonCatalog {
    pub fn new(person: impl Into<String>, categories: &[Category]) -> Self {
        Self {
            person: person.into(),
            sections: categories
                .iter()
                .cloned()
                .map(CategorySection::new)
                .collect(),
        }
    }

    pub fn document_count(&self) -> usize {
        self.sections.iter().map(|s| s.documents.len()).sum()
    }

    /// The aggregate readiness check: true once every in-flight extraction
    /// has reported back. Checked after each individual completion.
    pub fn all_ready(&self) -> bool {
        self.sections
            .iter()
            .all(|s| s.documents.iter().all(|d| d.ready))
    }

    pub fn section_mut(&mut self, ordinal: usize) -> Option<&mut CategorySection> {
        self.sections.get_mut(ordinal)
    }

    /// Drop a document from its section, releasing its in-memory data.
    /// The caller decides what happens to the file on disk.
    pub fn remove_document(&mut self, ordinal: usize, doc_index: usize) -> Option<Document> {
        let section = self.sections.get_mut(ordinal)?;
        if doc_index < section.documents.len() {
            Some(section.documents.remove(doc_index))
        } else {
            None
        }
    }
}
