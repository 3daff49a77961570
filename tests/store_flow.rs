use chrono::NaiveDate;
use copyright_desk::lookup::{ItemFailure, LookupResult, SearchReport};
use copyright_desk::models::{FieldKey, FieldValues, PublicationKind};
use copyright_desk::spreadsheet::{export_to_dir, read_preview_file};
use copyright_desk::store::PublicationTable;

fn serial(article: &str, author: &str, year: &str) -> FieldValues {
    [
        (FieldKey::ArticleTitle, article.to_string()),
        (FieldKey::BookTitle, "Quarterly Review".to_string()),
        (FieldKey::Author, author.to_string()),
        (FieldKey::Publisher, "Review Press".to_string()),
        (FieldKey::PublishYear, year.to_string()),
    ]
    .into_iter()
    .collect()
}

fn keys(kind: PublicationKind) -> Vec<FieldKey> {
    kind.basic_columns().iter().map(|column| column.key).collect()
}

#[test]
fn exported_selection_imports_back_as_fresh_rows() {
    let kind = PublicationKind::Serial;
    let mut table = PublicationTable::new(kind);
    let first = table.add_one(&serial("On Winter", "Lee", "1931"));
    table.add_one(&serial("Unselected", "Park", "1960"));
    let third = table.add_one(&serial("Letters", "Choi", "20080401"));
    table.toggle_select(&first);
    table.toggle_select(&third);

    let snapshot = table.search_snapshot();
    let report = SearchReport {
        successes: vec![(
            0,
            LookupResult {
                author_type: Some("개인".to_string()),
                death_year: Some("1940".to_string()),
                ..LookupResult::default()
            },
        )],
        failures: vec![ItemFailure {
            index: 2,
            reason: "HTTP 500".to_string(),
        }],
        ..SearchReport::default()
    };
    table.apply_search(&snapshot, &report, 2024);
    assert_eq!(table.records()[0].has_copyright, Some(false));

    let dir = tempfile::tempdir().expect("tempdir");
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("date");
    let selected = table.selected_records();
    let path = export_to_dir(
        dir.path(),
        kind.export_prefix(),
        date,
        &kind.table_columns(),
        &selected,
    )
    .expect("export");
    assert_eq!(
        path.file_name().and_then(|name| name.to_str()),
        Some("serial_search_results_2024-03-09.xlsx")
    );

    let rows = read_preview_file(&path, &keys(kind)).expect("read back");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][&FieldKey::ArticleTitle], "On Winter");
    assert_eq!(rows[0][&FieldKey::Author], "Lee");
    assert_eq!(rows[1][&FieldKey::PublishYear], "20080401");
    assert_eq!(rows[1][&FieldKey::AdditionalInfo], "");

    let mut imported = PublicationTable::new(kind);
    assert_eq!(imported.import_rows(&rows), 2);
    let record = &imported.records()[0];
    assert_eq!(record.article_title.as_deref(), Some("On Winter"));
    assert_eq!(record.book_title.as_deref(), Some("Quarterly Review"));
    assert_eq!(record.author_type, None);
    assert_eq!(record.has_copyright, None);
    assert_ne!(record.id, table.records()[0].id);
}

#[test]
fn results_for_rows_removed_mid_search_are_discarded() {
    let kind = PublicationKind::Monograph;
    let mut table = PublicationTable::new(kind);
    let values = |title: &str| -> FieldValues {
        [
            (FieldKey::BookTitle, title.to_string()),
            (FieldKey::Author, "Han".to_string()),
            (FieldKey::Publisher, "Press".to_string()),
            (FieldKey::PublishYear, "1990".to_string()),
        ]
        .into_iter()
        .collect()
    };
    let gone = table.add_one(&values("Gone"));
    table.add_one(&values("Kept"));

    let snapshot = table.search_snapshot();
    table.toggle_select(&gone);
    assert_eq!(table.remove_selected(), 1);

    let organization = LookupResult {
        author_type: Some("단체".to_string()),
        ..LookupResult::default()
    };
    let report = SearchReport {
        successes: vec![(0, organization.clone()), (1, organization)],
        ..SearchReport::default()
    };
    let summary = table.apply_search(&snapshot, &report, 2024);

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.discarded, 1);
    assert_eq!(table.len(), 1);
    let kept = &table.records()[0];
    assert_eq!(kept.book_title.as_deref(), Some("Kept"));
    assert_eq!(kept.author_type.as_deref(), Some("단체"));
    assert_eq!(kept.has_copyright, Some(true));
}
