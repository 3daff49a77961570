//! Domain models shared by the table store, the lookup client, the
//! spreadsheet codec and the terminal UI. Records stay plain data holders; the
//! ordered [`Column`] lists below decide which fields show up where, so the
//! table renderer, the add form, import and export all agree on one layout per
//! publication kind.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// The two publication families the lookup service understands. Each has its
/// own endpoint, seed data and basic column set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicationKind {
    Serial,
    Monograph,
}

impl PublicationKind {
    /// Path segment used by the lookup service for this kind.
    pub fn endpoint_segment(self) -> &'static str {
        match self {
            PublicationKind::Serial => "serial",
            PublicationKind::Monograph => "monograph",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PublicationKind::Serial => "Serials",
            PublicationKind::Monograph => "Monographs",
        }
    }

    /// File name prefix for exported search results.
    pub fn export_prefix(self) -> &'static str {
        match self {
            PublicationKind::Serial => "serial_search_results",
            PublicationKind::Monograph => "monograph_search_results",
        }
    }

    /// Columns the user fills in by hand or through spreadsheet import.
    pub fn basic_columns(self) -> &'static [Column] {
        match self {
            PublicationKind::Serial => SERIAL_BASIC_COLUMNS,
            PublicationKind::Monograph => MONOGRAPH_BASIC_COLUMNS,
        }
    }

    /// Every column in display order: basic, lookup metadata, copyright.
    pub fn table_columns(self) -> Vec<Column> {
        let mut columns = self.basic_columns().to_vec();
        columns.extend_from_slice(META_COLUMNS);
        columns.extend_from_slice(COPYRIGHT_COLUMNS);
        columns
    }

    /// Fields offered by the add form, in order, with their required flag.
    pub fn form_fields(self) -> &'static [FormField] {
        match self {
            PublicationKind::Serial => SERIAL_FORM_FIELDS,
            PublicationKind::Monograph => MONOGRAPH_FORM_FIELDS,
        }
    }
}

impl fmt::Display for PublicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rights-holder classification returned by the lookup service. The service
/// answers with Korean labels; the English spellings are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorType {
    Individual,
    Organization,
}

impl AuthorType {
    /// Recognize a classification label after trimming. Unknown or empty
    /// labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "individual" | "개인" => Some(AuthorType::Individual),
            "organization" | "단체" => Some(AuthorType::Organization),
            _ => None,
        }
    }
}

/// Backend the lookup service should use for AI-assisted searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiMode {
    #[default]
    OpenAi,
    Gemini,
    Local,
}

impl AiMode {
    pub const ALL: [AiMode; 3] = [AiMode::OpenAi, AiMode::Gemini, AiMode::Local];

    /// Wire value sent as the `mode` query parameter and kept in session
    /// storage.
    pub fn value(self) -> &'static str {
        match self {
            AiMode::OpenAi => "openai",
            AiMode::Gemini => "gemini",
            AiMode::Local => "local",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AiMode::OpenAi => "OpenAI",
            AiMode::Gemini => "Gemini",
            AiMode::Local => "Local",
        }
    }

    pub fn next(self) -> Self {
        match self {
            AiMode::OpenAi => AiMode::Gemini,
            AiMode::Gemini => AiMode::Local,
            AiMode::Local => AiMode::OpenAi,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            AiMode::OpenAi => AiMode::Local,
            AiMode::Gemini => AiMode::OpenAi,
            AiMode::Local => AiMode::Gemini,
        }
    }
}

impl FromStr for AiMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AiMode::ALL
            .into_iter()
            .find(|mode| mode.value() == value.trim())
            .ok_or_else(|| format!("unknown AI mode '{value}'"))
    }
}

impl fmt::Display for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every addressable field of a [`Publication`]. Column descriptors, form
/// fields, import rows and export rows all refer to fields through this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    Author,
    BookTitle,
    ArticleTitle,
    Publisher,
    PublishYear,
    AdditionalInfo,
    AuthorType,
    BirthYear,
    DeathYear,
    ControlNumber,
    Isni,
    LastAffiliation,
    Remark,
    WebSearchUtilized,
    IsAuthorUnknown,
    HasCopyright,
    CopyrightReason,
}

/// Ordered table column: which field, its header label and its width in
/// terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: FieldKey,
    pub label: &'static str,
    pub width: u16,
}

const fn column(key: FieldKey, label: &'static str, width: u16) -> Column {
    Column { key, label, width }
}

/// One input of the add-record form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    pub key: FieldKey,
    pub label: &'static str,
    pub required: bool,
}

const fn form_field(key: FieldKey, label: &'static str, required: bool) -> FormField {
    FormField {
        key,
        label,
        required,
    }
}

const SERIAL_BASIC_COLUMNS: &[Column] = &[
    column(FieldKey::ArticleTitle, "Article Title", 26),
    column(FieldKey::BookTitle, "Serial Title", 22),
    column(FieldKey::Author, "Author", 14),
    column(FieldKey::Publisher, "Publisher", 18),
    column(FieldKey::PublishYear, "Published", 10),
    column(FieldKey::AdditionalInfo, "Note", 20),
];

const MONOGRAPH_BASIC_COLUMNS: &[Column] = &[
    column(FieldKey::BookTitle, "Title", 24),
    column(FieldKey::Author, "Author", 14),
    column(FieldKey::Publisher, "Publisher", 18),
    column(FieldKey::PublishYear, "Published", 10),
    column(FieldKey::AdditionalInfo, "Note", 20),
];

/// Fields filled in by a successful lookup.
pub const META_COLUMNS: &[Column] = &[
    column(FieldKey::AuthorType, "Author Type", 12),
    column(FieldKey::BirthYear, "Born", 6),
    column(FieldKey::DeathYear, "Died", 6),
    column(FieldKey::ControlNumber, "Control No.", 14),
    column(FieldKey::Isni, "ISNI", 20),
    column(FieldKey::LastAffiliation, "Residence / Affiliation", 24),
    column(FieldKey::Remark, "Remark", 40),
    column(FieldKey::WebSearchUtilized, "Web Search", 10),
];

/// Derived rights columns.
pub const COPYRIGHT_COLUMNS: &[Column] = &[
    column(FieldKey::IsAuthorUnknown, "Holder Unknown", 14),
    column(FieldKey::HasCopyright, "Copyright", 10),
];

const SERIAL_FORM_FIELDS: &[FormField] = &[
    form_field(FieldKey::ArticleTitle, "Article Title", true),
    form_field(FieldKey::BookTitle, "Serial Title", false),
    form_field(FieldKey::Author, "Author", true),
    form_field(FieldKey::Publisher, "Publisher", true),
    form_field(FieldKey::PublishYear, "Published", true),
    form_field(FieldKey::AdditionalInfo, "Note", false),
];

const MONOGRAPH_FORM_FIELDS: &[FormField] = &[
    form_field(FieldKey::BookTitle, "Title", true),
    form_field(FieldKey::Author, "Author", true),
    form_field(FieldKey::Publisher, "Publisher", true),
    form_field(FieldKey::PublishYear, "Published", true),
    form_field(FieldKey::AdditionalInfo, "Note", false),
];

/// Flat key/value view of user-entered fields, as produced by the add form and
/// by spreadsheet import.
pub type FieldValues = BTreeMap<FieldKey, String>;

/// Borrowed value of one record field, used by the table renderer and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue<'a> {
    Text(&'a str),
    Flag(bool),
    Empty,
}

impl<'a> CellValue<'a> {
    fn from_text(value: &'a Option<String>) -> Self {
        value.as_deref().map(CellValue::Text).unwrap_or(CellValue::Empty)
    }

    fn from_flag(value: Option<bool>) -> Self {
        value.map(CellValue::Flag).unwrap_or(CellValue::Empty)
    }

    /// Spreadsheet text: booleans become `TRUE` / `FALSE`, absent values an
    /// empty cell.
    pub fn export_text(self) -> String {
        match self {
            CellValue::Text(text) => text.to_string(),
            CellValue::Flag(true) => "TRUE".to_string(),
            CellValue::Flag(false) => "FALSE".to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Short text shown inside table cells.
    pub fn display_text(self) -> String {
        match self {
            CellValue::Text(text) => text.to_string(),
            CellValue::Flag(true) => "Yes".to_string(),
            CellValue::Flag(false) => "No".to_string(),
            CellValue::Empty => "-".to_string(),
        }
    }
}

/// A publication row. Basic fields come from the user; every `Option` below
/// the basic block stays `None` until a lookup for the row succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Opaque identifier used for selection tracking.
    pub id: String,
    pub kind: PublicationKind,
    pub author: String,
    pub book_title: Option<String>,
    /// Only serials carry an article title.
    pub article_title: Option<String>,
    pub publisher: String,
    /// Raw publication date text, e.g. `"2008"` or `"20080401"`.
    pub publish_year: String,
    pub additional_info: Option<String>,

    pub author_type: Option<String>,
    pub birth_year: Option<String>,
    pub death_year: Option<String>,
    pub control_number: Option<String>,
    pub isni: Option<String>,
    pub last_affiliation: Option<String>,
    pub remark: Option<String>,
    pub web_search_utilized: Option<bool>,

    pub is_author_unknown: Option<bool>,
    pub has_copyright: Option<bool>,
    pub copyright_reason: Option<String>,
}

impl Publication {
    /// Build a fresh record from user-entered values. Missing values become
    /// empty strings for required text and `None` for optional text; all
    /// lookup metadata starts out empty.
    pub fn from_fields(kind: PublicationKind, values: &FieldValues) -> Self {
        let text = |key: FieldKey| {
            values
                .get(&key)
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        let optional = |key: FieldKey| {
            let value = text(key);
            if value.is_empty() {
                None
            } else {
                Some(value)
            }
        };

        let article_title = match kind {
            PublicationKind::Serial => Some(text(FieldKey::ArticleTitle)),
            PublicationKind::Monograph => None,
        };

        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            author: text(FieldKey::Author),
            book_title: optional(FieldKey::BookTitle),
            article_title,
            publisher: text(FieldKey::Publisher),
            publish_year: text(FieldKey::PublishYear),
            additional_info: optional(FieldKey::AdditionalInfo),
            author_type: None,
            birth_year: None,
            death_year: None,
            control_number: None,
            isni: None,
            last_affiliation: None,
            remark: None,
            web_search_utilized: None,
            is_author_unknown: None,
            has_copyright: None,
            copyright_reason: None,
        }
    }

    /// Read a field for rendering or export.
    pub fn cell(&self, key: FieldKey) -> CellValue<'_> {
        match key {
            FieldKey::Author => CellValue::Text(&self.author),
            FieldKey::BookTitle => CellValue::from_text(&self.book_title),
            FieldKey::ArticleTitle => CellValue::from_text(&self.article_title),
            FieldKey::Publisher => CellValue::Text(&self.publisher),
            FieldKey::PublishYear => CellValue::Text(&self.publish_year),
            FieldKey::AdditionalInfo => CellValue::from_text(&self.additional_info),
            FieldKey::AuthorType => CellValue::from_text(&self.author_type),
            FieldKey::BirthYear => CellValue::from_text(&self.birth_year),
            FieldKey::DeathYear => CellValue::from_text(&self.death_year),
            FieldKey::ControlNumber => CellValue::from_text(&self.control_number),
            FieldKey::Isni => CellValue::from_text(&self.isni),
            FieldKey::LastAffiliation => CellValue::from_text(&self.last_affiliation),
            FieldKey::Remark => CellValue::from_text(&self.remark),
            FieldKey::WebSearchUtilized => CellValue::from_flag(self.web_search_utilized),
            FieldKey::IsAuthorUnknown => CellValue::from_flag(self.is_author_unknown),
            FieldKey::HasCopyright => CellValue::from_flag(self.has_copyright),
            FieldKey::CopyrightReason => CellValue::from_text(&self.copyright_reason),
        }
    }

    /// Title shown in confirmations and status messages.
    pub fn display_title(&self) -> String {
        let title = self
            .article_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.book_title.as_deref())
            .unwrap_or("(untitled)");
        if self.author.trim().is_empty() {
            title.to_string()
        } else {
            format!("{} - {}", title, self.author)
        }
    }
}

/// Example rows a table starts with and returns to on reset.
pub fn seed_records(kind: PublicationKind) -> Vec<Publication> {
    let values: FieldValues = match kind {
        PublicationKind::Serial => [
            (FieldKey::ArticleTitle, "진달래꽃"),
            (FieldKey::BookTitle, "개벽"),
            (FieldKey::Author, "김소월"),
            (FieldKey::Publisher, "개벽사"),
            (FieldKey::PublishYear, "19220701"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect(),
        PublicationKind::Monograph => [
            (FieldKey::BookTitle, "광양만권 사람들"),
            (FieldKey::Author, "박목월"),
            (FieldKey::Publisher, "광양만권 사람들"),
            (FieldKey::PublishYear, "20080401"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect(),
    };
    vec![Publication::from_fields(kind, &values)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(FieldKey, &str)]) -> FieldValues {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn from_fields_leaves_metadata_empty() {
        let record = Publication::from_fields(
            PublicationKind::Monograph,
            &values(&[
                (FieldKey::BookTitle, " Walden "),
                (FieldKey::Author, "Thoreau"),
                (FieldKey::AdditionalInfo, "   "),
            ]),
        );
        assert_eq!(record.book_title.as_deref(), Some("Walden"));
        assert_eq!(record.additional_info, None);
        assert_eq!(record.article_title, None);
        assert_eq!(record.publisher, "");
        assert_eq!(record.has_copyright, None);
        assert_eq!(record.author_type, None);
        assert!(!record.id.is_empty());
    }

    #[test]
    fn serial_records_keep_article_title() {
        let record = Publication::from_fields(
            PublicationKind::Serial,
            &values(&[(FieldKey::ArticleTitle, "On Lakes")]),
        );
        assert_eq!(record.cell(FieldKey::ArticleTitle), CellValue::Text("On Lakes"));
        assert_eq!(record.cell(FieldKey::BookTitle), CellValue::Empty);
    }

    #[test]
    fn ids_are_unique() {
        let a = Publication::from_fields(PublicationKind::Serial, &FieldValues::new());
        let b = Publication::from_fields(PublicationKind::Serial, &FieldValues::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn flags_render_for_export() {
        assert_eq!(CellValue::Flag(true).export_text(), "TRUE");
        assert_eq!(CellValue::Flag(false).export_text(), "FALSE");
        assert_eq!(CellValue::Empty.export_text(), "");
        assert_eq!(CellValue::Text("x").export_text(), "x");
    }

    #[test]
    fn ai_mode_round_trips_wire_values() {
        for mode in AiMode::ALL {
            assert_eq!(mode.value().parse::<AiMode>(), Ok(mode));
            assert_eq!(mode.next().previous(), mode);
        }
        assert!("claude".parse::<AiMode>().is_err());
    }

    #[test]
    fn table_columns_put_basic_fields_first() {
        let columns = PublicationKind::Serial.table_columns();
        assert_eq!(columns[0].key, FieldKey::ArticleTitle);
        assert_eq!(columns.last().map(|c| c.key), Some(FieldKey::HasCopyright));
        assert_eq!(
            columns.len(),
            PublicationKind::Serial.basic_columns().len()
                + META_COLUMNS.len()
                + COPYRIGHT_COLUMNS.len()
        );
    }

    #[test]
    fn seeds_exist_for_both_kinds() {
        let serial = seed_records(PublicationKind::Serial);
        let monograph = seed_records(PublicationKind::Monograph);
        assert_eq!(serial.len(), 1);
        assert_eq!(monograph[0].publish_year, "20080401");
        assert_eq!(monograph[0].kind, PublicationKind::Monograph);
    }
}
