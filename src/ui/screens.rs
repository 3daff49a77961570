use crate::models::{Column, Publication, PublicationKind};
use crate::store::PublicationTable;

/// A publication table plus the cursor and horizontal scroll of its page.
pub(crate) struct TablePage {
    pub(crate) table: PublicationTable,
    pub(crate) cursor: usize,
    pub(crate) column_offset: usize,
    columns: Vec<Column>,
}

impl TablePage {
    pub(crate) fn new(table: PublicationTable) -> Self {
        let columns = table.kind().table_columns();
        Self {
            table,
            cursor: 0,
            column_offset: 0,
            columns,
        }
    }

    pub(crate) fn kind(&self) -> PublicationKind {
        self.table.kind()
    }

    pub(crate) fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns from the horizontal scroll position onwards.
    pub(crate) fn visible_columns(&self) -> &[Column] {
        &self.columns[self.column_offset.min(self.columns.len())..]
    }

    pub(crate) fn current_record(&self) -> Option<&Publication> {
        self.table.get(self.cursor)
    }

    pub(crate) fn move_cursor(&mut self, offset: isize) {
        if self.table.is_empty() {
            self.cursor = 0;
            return;
        }
        let last = self.table.len() as isize - 1;
        self.cursor = (self.cursor as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.cursor = self.table.len().saturating_sub(1);
    }

    /// Keep the cursor on a row after rows were removed.
    pub(crate) fn ensure_in_bounds(&mut self) {
        if self.cursor >= self.table.len() {
            self.select_last();
        }
    }

    pub(crate) fn scroll_columns(&mut self, offset: isize) {
        let last = self.columns.len().saturating_sub(1) as isize;
        self.column_offset = (self.column_offset as isize + offset).clamp(0, last) as usize;
    }
}

/// Per-table counts shown on the dashboard.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TableStats {
    pub(crate) records: usize,
    pub(crate) selected: usize,
    pub(crate) looked_up: usize,
    pub(crate) protected: usize,
    pub(crate) public_domain: usize,
    pub(crate) undetermined: usize,
}

impl TableStats {
    pub(crate) fn of(table: &PublicationTable) -> Self {
        let mut stats = TableStats {
            records: table.len(),
            selected: table.selected_count(),
            ..TableStats::default()
        };
        for record in table.records() {
            if record.author_type.is_some() || record.control_number.is_some() {
                stats.looked_up += 1;
            }
            match record.has_copyright {
                Some(true) => stats.protected += 1,
                Some(false) => stats.public_domain += 1,
                None => stats.undetermined += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldKey, FieldValues};

    fn page_with(rows: usize) -> TablePage {
        let mut table = PublicationTable::new(PublicationKind::Monograph);
        for n in 0..rows {
            let values: FieldValues = [(FieldKey::BookTitle, format!("Book {n}"))]
                .into_iter()
                .collect();
            table.add_one(&values);
        }
        TablePage::new(table)
    }

    #[test]
    fn cursor_is_clamped() {
        let mut page = page_with(3);
        page.move_cursor(-1);
        assert_eq!(page.cursor, 0);
        page.move_cursor(10);
        assert_eq!(page.cursor, 2);
        page.select_first();
        assert_eq!(page.current_record().and_then(|r| r.book_title.as_deref()), Some("Book 0"));

        let mut empty = page_with(0);
        empty.move_cursor(1);
        assert_eq!(empty.cursor, 0);
        assert!(empty.current_record().is_none());
    }

    #[test]
    fn cursor_follows_removed_rows() {
        let mut page = page_with(3);
        page.select_last();
        let last_id = page.table.records()[2].id.clone();
        page.table.toggle_select(&last_id);
        page.table.remove_selected();
        page.ensure_in_bounds();
        assert_eq!(page.cursor, 1);
    }

    #[test]
    fn column_scroll_keeps_one_column_visible() {
        let mut page = page_with(1);
        let total = page.columns().len();
        page.scroll_columns(-3);
        assert_eq!(page.visible_columns().len(), total);
        page.scroll_columns(100);
        assert_eq!(page.visible_columns().len(), 1);
    }

    #[test]
    fn stats_count_copyright_states() {
        let mut page = page_with(3);
        let ids: Vec<String> = page.table.records().iter().map(|r| r.id.clone()).collect();
        page.table.toggle_select(&ids[0]);
        let stats = TableStats::of(&page.table);
        assert_eq!(stats.records, 3);
        assert_eq!(stats.selected, 1);
        assert_eq!(stats.undetermined, 3);
        assert_eq!(stats.looked_up, 0);
    }
}
