use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{AiMode, FieldValues, FormField, PublicationKind};

use super::helpers::mask;

/// Style for a form value depending on focus and emptiness.
fn value_style(is_active: bool, is_empty: bool) -> Style {
    if is_active {
        Style::default().fg(Color::Yellow)
    } else if is_empty {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    }
}

/// Add-record form. The field list comes from the publication kind, so
/// serials and monographs share one implementation.
#[derive(Clone)]
pub(crate) struct RecordForm {
    pub(crate) kind: PublicationKind,
    values: Vec<String>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

impl RecordForm {
    pub(crate) fn new(kind: PublicationKind) -> Self {
        Self {
            kind,
            values: vec![String::new(); kind.form_fields().len()],
            active: 0,
            error: None,
        }
    }

    pub(crate) fn fields(&self) -> &'static [FormField] {
        self.kind.form_fields()
    }

    pub(crate) fn next_field(&mut self) {
        self.active = (self.active + 1) % self.values.len();
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = (self.active + self.values.len() - 1) % self.values.len();
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.values[self.active].push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.values[self.active].pop();
    }

    /// Check required fields and hand back the entered values.
    pub(crate) fn parse_inputs(&self) -> Result<FieldValues> {
        let mut values = FieldValues::new();
        for (field, value) in self.fields().iter().zip(&self.values) {
            let value = value.trim();
            if field.required && value.is_empty() {
                return Err(anyhow!("{} is required.", field.label));
            }
            values.insert(field.key, value.to_string());
        }
        Ok(values)
    }

    pub(crate) fn build_line(&self, index: usize) -> Line<'static> {
        let field = self.fields()[index];
        let value = &self.values[index];
        let is_active = self.active == index;

        let display = if value.is_empty() {
            let placeholder = if field.required { "<required>" } else { "<optional>" };
            placeholder.to_string()
        } else {
            value.clone()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label)),
            Span::styled(display, value_style(is_active, value.is_empty())),
        ])
    }

    /// Cursor column offset for the active field, relative to the line start.
    pub(crate) fn cursor_offset(&self) -> usize {
        let field = self.fields()[self.active];
        field.label.chars().count() + 2 + self.values[self.active].chars().count()
    }
}

/// Settings dialog: API key and AI mode.
#[derive(Clone)]
pub(crate) struct SettingsForm {
    pub(crate) api_key: String,
    pub(crate) ai_mode: AiMode,
}

impl SettingsForm {
    pub(crate) fn new(api_key: Option<String>, ai_mode: AiMode) -> Self {
        Self {
            api_key: api_key.unwrap_or_default(),
            ai_mode,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() || ch.is_whitespace() {
            return false;
        }
        self.api_key.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.api_key.pop();
    }

    pub(crate) fn next_mode(&mut self) {
        self.ai_mode = self.ai_mode.next();
    }

    pub(crate) fn previous_mode(&mut self) {
        self.ai_mode = self.ai_mode.previous();
    }

    /// The key to store, or `None` when the input is blank.
    pub(crate) fn key_to_save(&self) -> Option<&str> {
        Some(self.api_key.trim()).filter(|key| !key.is_empty())
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        let key_display = if self.api_key.is_empty() {
            "<not set>".to_string()
        } else {
            mask(&self.api_key)
        };
        let modes: Vec<Span<'static>> = AiMode::ALL
            .iter()
            .flat_map(|mode| {
                let style = if *mode == self.ai_mode {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                [Span::styled(format!("[{}]", mode.label()), style), Span::raw(" ")]
            })
            .collect();

        let mut mode_line = vec![Span::raw("AI mode: ")];
        mode_line.extend(modes);

        vec![
            Line::from(vec![
                Span::raw("API key: "),
                Span::styled(key_display, value_style(true, self.api_key.is_empty())),
            ]),
            Line::from(mode_line),
        ]
    }

    pub(crate) fn cursor_offset(&self) -> usize {
        "API key: ".len() + self.api_key.chars().count()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum SignInField {
    #[default]
    UserName,
    Password,
}

/// Credentials collected by the sign-in dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignIn {
    pub(crate) user_name: String,
    pub(crate) auth_header: String,
}

#[derive(Default, Clone)]
pub(crate) struct SignInForm {
    pub(crate) user_name: String,
    pub(crate) password: String,
    pub(crate) active: SignInField,
    pub(crate) error: Option<String>,
}

impl SignInForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            SignInField::UserName => SignInField::Password,
            SignInField::Password => SignInField::UserName,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            SignInField::UserName => self.user_name.push(ch),
            SignInField::Password => self.password.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            SignInField::UserName => {
                self.user_name.pop();
            }
            SignInField::Password => {
                self.password.pop();
            }
        }
    }

    /// Build a `Basic` authorization header from the entered credentials.
    pub(crate) fn parse_inputs(&self) -> Result<SignIn> {
        let user_name = self.user_name.trim();
        if user_name.is_empty() {
            return Err(anyhow!("User name is required."));
        }
        if user_name.contains(':') {
            return Err(anyhow!("User name must not contain ':'."));
        }
        if self.password.is_empty() {
            return Err(anyhow!("Password is required."));
        }
        let token = STANDARD.encode(format!("{user_name}:{}", self.password));
        Ok(SignIn {
            user_name: user_name.to_string(),
            auth_header: format!("Basic {token}"),
        })
    }

    pub(crate) fn build_line(&self, field: SignInField) -> Line<'static> {
        let (label, value, display) = match field {
            SignInField::UserName => ("User", &self.user_name, self.user_name.clone()),
            SignInField::Password => ("Password", &self.password, mask(&self.password)),
        };
        let display = if value.is_empty() {
            "<required>".to_string()
        } else {
            display
        };
        Line::from(vec![
            Span::raw(format!("{label}: ")),
            Span::styled(display, value_style(self.active == field, value.is_empty())),
        ])
    }

    pub(crate) fn cursor_offset(&self) -> (usize, u16) {
        match self.active {
            SignInField::UserName => ("User: ".len() + self.user_name.chars().count(), 0),
            SignInField::Password => ("Password: ".len() + self.password.chars().count(), 1),
        }
    }
}

/// Spreadsheet import: a path input followed by a preview of the parsed rows.
#[derive(Clone)]
pub(crate) struct ImportDialog {
    pub(crate) kind: PublicationKind,
    pub(crate) path: String,
    pub(crate) preview: Option<Vec<FieldValues>>,
    pub(crate) error: Option<String>,
}

impl ImportDialog {
    pub(crate) fn new(kind: PublicationKind) -> Self {
        Self {
            kind,
            path: String::new(),
            preview: None,
            error: None,
        }
    }

    /// Editing the path discards any preview loaded for the previous one.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.path.push(ch);
        self.preview = None;
        self.error = None;
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.path.pop();
        self.preview = None;
        self.error = None;
    }

    pub(crate) fn has_preview(&self) -> bool {
        self.preview.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldKey;

    fn type_text(form: &mut RecordForm, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn record_form_reports_first_missing_required_field() {
        let mut form = RecordForm::new(PublicationKind::Monograph);
        type_text(&mut form, "Walden");
        let err = form.parse_inputs().unwrap_err();
        assert_eq!(err.to_string(), "Author is required.");
    }

    #[test]
    fn record_form_collects_values_by_key() {
        let mut form = RecordForm::new(PublicationKind::Monograph);
        for value in ["Walden", "Thoreau", "Ticknor", "1854"] {
            type_text(&mut form, value);
            form.next_field();
        }
        let values = form.parse_inputs().expect("valid");
        assert_eq!(values[&FieldKey::BookTitle], "Walden");
        assert_eq!(values[&FieldKey::PublishYear], "1854");
        assert_eq!(values[&FieldKey::AdditionalInfo], "");
    }

    #[test]
    fn record_form_focus_wraps_both_ways() {
        let mut form = RecordForm::new(PublicationKind::Serial);
        form.previous_field();
        assert_eq!(form.active, form.fields().len() - 1);
        form.next_field();
        assert_eq!(form.active, 0);
        form.backspace();
        assert!(!form.push_char('\n'));
    }

    #[test]
    fn sign_in_builds_basic_header() {
        let mut form = SignInForm::default();
        for ch in "kim".chars() {
            form.push_char(ch);
        }
        form.toggle_field();
        for ch in "pw".chars() {
            form.push_char(ch);
        }
        let sign_in = form.parse_inputs().expect("valid");
        assert_eq!(sign_in.user_name, "kim");
        assert_eq!(sign_in.auth_header, "Basic a2ltOnB3");
    }

    #[test]
    fn sign_in_requires_both_fields() {
        let mut form = SignInForm::default();
        assert!(form.parse_inputs().is_err());
        form.user_name = "kim".into();
        assert_eq!(form.parse_inputs().unwrap_err().to_string(), "Password is required.");
    }

    #[test]
    fn settings_skip_blank_keys() {
        let mut form = SettingsForm::new(None, AiMode::OpenAi);
        assert_eq!(form.key_to_save(), None);
        assert!(!form.push_char(' '));
        form.push_char('k');
        assert_eq!(form.key_to_save(), Some("k"));

        form.previous_mode();
        assert_eq!(form.ai_mode, AiMode::Local);
        form.next_mode();
        form.next_mode();
        assert_eq!(form.ai_mode, AiMode::Gemini);
    }

    #[test]
    fn editing_import_path_drops_preview() {
        let mut dialog = ImportDialog::new(PublicationKind::Serial);
        dialog.preview = Some(vec![FieldValues::new()]);
        dialog.push_char('x');
        assert!(!dialog.has_preview());
    }
}
