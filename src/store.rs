//! In-memory publication table with its selection set.
//!
//! One table exists per publication kind. Every mutation keeps the selection
//! a subset of the current record ids.

use std::collections::{HashMap, HashSet};

use crate::copyright::determine_copyright_status;
use crate::lookup::{LookupResult, SearchReport, SearchRequestItem};
use crate::models::{seed_records, FieldValues, Publication, PublicationKind};

/// What a search was started with: the ids at each position and the payload
/// sent for them. Results come back keyed by position and are matched to
/// records through these ids.
#[derive(Debug, Clone)]
pub struct SearchSnapshot {
    pub kind: PublicationKind,
    pub ids: Vec<String>,
    pub items: Vec<SearchRequestItem>,
}

impl SearchSnapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Counts reported after merging a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Results whose record no longer exists.
    pub discarded: usize,
}

#[derive(Debug, Clone)]
pub struct PublicationTable {
    kind: PublicationKind,
    records: Vec<Publication>,
    selected: HashSet<String>,
}

impl PublicationTable {
    pub fn new(kind: PublicationKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            selected: HashSet::new(),
        }
    }

    /// A table holding the example rows for `kind`.
    pub fn with_seed(kind: PublicationKind) -> Self {
        Self {
            kind,
            records: seed_records(kind),
            selected: HashSet::new(),
        }
    }

    pub fn kind(&self) -> PublicationKind {
        self.kind
    }

    pub fn records(&self) -> &[Publication] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Publication> {
        self.records.get(index)
    }

    /// Append one record built from form values. Returns its id.
    pub fn add_one(&mut self, values: &FieldValues) -> String {
        let record = Publication::from_fields(self.kind, values);
        let id = record.id.clone();
        tracing::debug!(kind = %self.kind, id = %id, "added record");
        self.records.push(record);
        id
    }

    /// Append imported rows in order. Returns how many were added.
    pub fn import_rows(&mut self, rows: &[FieldValues]) -> usize {
        let kind = self.kind;
        self.records
            .extend(rows.iter().map(|values| Publication::from_fields(kind, values)));
        tracing::info!(kind = %kind, rows = rows.len(), "imported records");
        rows.len()
    }

    /// Capture the current rows for a table-wide search.
    pub fn search_snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            kind: self.kind,
            ids: self.records.iter().map(|record| record.id.clone()).collect(),
            items: self.records.iter().map(SearchRequestItem::from).collect(),
        }
    }

    /// Merge a finished search into the table.
    ///
    /// Each outcome is matched to its record through the id captured in
    /// `snapshot` at the same position. Successes copy the looked-up metadata
    /// and recompute the copyright flag against `reference_year`; failures
    /// clear the copyright and unknown-holder flags and leave everything else
    /// alone. The whole collection is replaced at once.
    pub fn apply_search(
        &mut self,
        snapshot: &SearchSnapshot,
        report: &SearchReport,
        reference_year: i32,
    ) -> MergeSummary {
        let positions: HashMap<&str, usize> = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id.as_str(), position))
            .collect();
        let locate = |index: usize| {
            snapshot
                .ids
                .get(index)
                .and_then(|id| positions.get(id.as_str()).copied())
        };

        let mut merged = self.records.clone();
        let mut summary = MergeSummary::default();

        for (index, result) in &report.successes {
            match locate(*index) {
                Some(position) => {
                    apply_result(&mut merged[position], result, reference_year);
                    summary.succeeded += 1;
                }
                None => summary.discarded += 1,
            }
        }

        for failure in &report.failures {
            match locate(failure.index) {
                Some(position) => {
                    let record = &mut merged[position];
                    record.has_copyright = None;
                    record.is_author_unknown = None;
                    summary.failed += 1;
                }
                None => summary.discarded += 1,
            }
        }

        self.records = merged;
        tracing::info!(
            kind = %self.kind,
            succeeded = summary.succeeded,
            failed = summary.failed,
            discarded = summary.discarded,
            "merged search results"
        );
        summary
    }

    /// Delete every selected record and clear the selection.
    pub fn remove_selected(&mut self) -> usize {
        let before = self.records.len();
        let selected = std::mem::take(&mut self.selected);
        self.records.retain(|record| !selected.contains(&record.id));
        before - self.records.len()
    }

    /// Back to the example rows, nothing selected.
    pub fn reset(&mut self) {
        self.records = seed_records(self.kind);
        self.selected.clear();
    }

    /// Flip the selection of one record. Unknown ids are ignored.
    pub fn toggle_select(&mut self, id: &str) {
        if !self.records.iter().any(|record| record.id == id) {
            return;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Select every record, or clear the selection when all are selected.
    pub fn toggle_select_all(&mut self) {
        if self.all_selected() {
            self.selected.clear();
        } else {
            self.selected = self.records.iter().map(|record| record.id.clone()).collect();
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// `true` only for a non-empty table with every row selected.
    pub fn all_selected(&self) -> bool {
        !self.records.is_empty() && self.selected.len() == self.records.len()
    }

    /// Selected records in table order.
    pub fn selected_records(&self) -> Vec<Publication> {
        self.records
            .iter()
            .filter(|record| self.selected.contains(&record.id))
            .cloned()
            .collect()
    }
}

fn apply_result(record: &mut Publication, result: &LookupResult, reference_year: i32) {
    record.author_type = result.author_type.clone();
    record.birth_year = result.birth_year.clone();
    record.death_year = result.death_year.clone();
    record.control_number = result.control_number.clone();
    record.isni = result.isni.clone();
    record.last_affiliation = result.last_affiliation.clone();
    record.remark = result.remark.clone();
    record.web_search_utilized = result.web_search_utilized;
    record.is_author_unknown = result.is_author_unknown;
    record.copyright_reason = result
        .copyright_info
        .as_ref()
        .and_then(|info| info.reason.as_deref())
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string);
    record.has_copyright = determine_copyright_status(
        record.author_type.as_deref(),
        record.death_year.as_deref(),
        Some(&record.publish_year),
        reference_year,
    );
}
