//! Copyright-term evaluation. The lookup service tells us who the rights
//! holder is and, for people, when they died; this module turns that into a
//! protected / not protected / unknown answer using the fixed 70-year term.
//!
//! Everything here is pure. The reference year is always passed in so the
//! table store and the tests agree on "now".

use chrono::{Datelike, Local};

use crate::models::AuthorType;

/// Number of years after the triggering event during which a work stays
/// protected. The boundary year itself still counts as protected.
pub const PROTECTION_TERM_YEARS: i32 = 70;

/// Parse a strict four-digit year such as `"1999"`.
///
/// Surrounding whitespace is ignored. Anything that is not exactly four ASCII
/// digits after trimming (including `None`) yields `None`.
pub fn parse_four_digit_year(value: Option<&str>) -> Option<i32> {
    let trimmed = value?.trim();
    if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = trimmed.parse().ok()?;
    (0..=9999).contains(&year).then_some(year)
}

/// Read the year from the first four characters of a publication date.
///
/// Works for `"2008"`, `"20080401"` and `"2008-04-01"` alike. Inputs shorter
/// than four characters, or whose first four characters are not all digits,
/// yield `None`. `"0000"` is accepted as year zero.
pub fn extract_leading_year(value: Option<&str>) -> Option<i32> {
    let trimmed = value?.trim();
    let leading: String = trimmed.chars().take(4).collect();
    if leading.chars().count() < 4 || !leading.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    leading.parse().ok()
}

/// Decide whether a work is still under copyright.
///
/// * individual authors: protected while `reference_year - death_year <= 70`
/// * organizations: protected while `reference_year - publish_year <= 70`,
///   reading only the leading year of the publication date
/// * anything else, or a year that cannot be parsed: `None`
///
/// Future years produce a negative elapsed time and are evaluated by the same
/// comparison.
pub fn determine_copyright_status(
    author_type: Option<&str>,
    death_year: Option<&str>,
    publish_year: Option<&str>,
    reference_year: i32,
) -> Option<bool> {
    let event_year = match AuthorType::from_label(author_type.unwrap_or(""))? {
        AuthorType::Individual => parse_four_digit_year(death_year)?,
        AuthorType::Organization => extract_leading_year(publish_year)?,
    };
    Some(reference_year - event_year <= PROTECTION_TERM_YEARS)
}

/// Current calendar year from the local clock.
pub fn current_year() -> i32 {
    Local::now().year()
}
