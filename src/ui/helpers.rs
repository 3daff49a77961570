use std::path::PathBuf;

use anyhow::Error;
use directories::BaseDirs;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::models::CellValue;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Cut `text` down to `width` terminal cells, marking the cut with an
/// ellipsis. Wide characters count as two cells.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if text.width() <= width {
        return text.to_string();
    }
    let budget = width - 1;
    let mut used = 0;
    let mut cut = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > budget {
            break;
        }
        used += ch_width;
        cut.push(ch);
    }
    cut.push('…');
    cut
}

/// Hide a secret while keeping its length visible.
pub(crate) fn mask(secret: &str) -> String {
    "•".repeat(secret.chars().count())
}

/// Resolve a leading `~/` against the home directory.
pub(crate) fn expand_home(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    match (trimmed.strip_prefix("~/"), BaseDirs::new()) {
        (Some(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => PathBuf::from(trimmed),
    }
}

/// Table cell colouring: copyright-protected works stand out, public domain
/// reads green.
pub(crate) fn cell_style(value: CellValue<'_>, is_copyright_column: bool) -> Style {
    match (value, is_copyright_column) {
        (CellValue::Empty, _) => Style::default().fg(Color::DarkGray),
        (CellValue::Flag(true), true) => Style::default().fg(Color::Yellow),
        (CellValue::Flag(false), true) => Style::default().fg(Color::Green),
        _ => Style::default(),
    }
}
