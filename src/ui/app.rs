use std::iter;
use std::mem;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Gauge, List, ListItem, Paragraph, Row, Table, TableState, Wrap,
};
use ratatui::Frame;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::copyright::{current_year, PROTECTION_TERM_YEARS};
use crate::error::{ErrorKind, LookupError};
use crate::lookup::{AuthScheme, LookupClient, SearchReport, SearchStrategy};
use crate::models::{FieldKey, FieldValues, PublicationKind};
use crate::session::SessionCredentials;
use crate::spreadsheet;
use crate::store::{MergeSummary, PublicationTable, SearchSnapshot};

use super::events::BackgroundEvent;
use super::forms::{ImportDialog, RecordForm, SettingsForm, SignInField, SignInForm};
use super::helpers::{cell_style, centered_rect, expand_home, surface_error, truncate};
use super::screens::{TablePage, TableStats};

const HEADER_HEIGHT: u16 = 1;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
const SIDEBAR_WIDTH: u16 = 20;
const DETAIL_HEIGHT: u16 = 7;
const CHECKBOX_WIDTH: u16 = 3;
const PAGE_STEP: isize = 10;
/// Rows shown in the import preview before summarising the rest.
const PREVIEW_ROWS: usize = 8;

/// Top-level pages reachable from the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Table(PublicationKind),
}

impl Screen {
    const ORDER: [Screen; 3] = [
        Screen::Dashboard,
        Screen::Table(PublicationKind::Serial),
        Screen::Table(PublicationKind::Monograph),
    ];

    fn label(self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::Table(kind) => kind.label(),
        }
    }

    fn cycle(self, offset: isize) -> Self {
        let position = Self::ORDER
            .iter()
            .position(|screen| *screen == self)
            .unwrap_or(0) as isize;
        let len = Self::ORDER.len() as isize;
        Self::ORDER[(position + offset).rem_euclid(len) as usize]
    }
}

/// Fine-grained modes layered over the current screen.
enum Mode {
    Normal,
    AddingRecord(RecordForm),
    Importing(ImportDialog),
    Settings(SettingsForm),
    SigningIn(SignInForm),
    ConfirmRemove { kind: PublicationKind, count: usize },
    ConfirmReset(PublicationKind),
    Searching(SearchProgress),
}

struct SearchProgress {
    kind: PublicationKind,
    completed: usize,
    total: usize,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Settings that shape the app but are fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub search_strategy: SearchStrategy,
    pub export_dir: PathBuf,
}

/// Central application state shared across the TUI.
pub struct App {
    credentials: SessionCredentials,
    client: LookupClient,
    runtime: Handle,
    options: AppOptions,
    events_tx: UnboundedSender<BackgroundEvent>,
    events_rx: UnboundedReceiver<BackgroundEvent>,
    serials: TablePage,
    monographs: TablePage,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
    last_export: Option<PathBuf>,
}

impl App {
    /// `runtime` runs the lookups; it must outlive the app.
    pub fn new(
        credentials: SessionCredentials,
        client: LookupClient,
        runtime: Handle,
        options: AppOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            credentials,
            client,
            runtime,
            options,
            events_tx,
            events_rx,
            serials: TablePage::new(PublicationTable::with_seed(PublicationKind::Serial)),
            monographs: TablePage::new(PublicationTable::with_seed(PublicationKind::Monograph)),
            screen: Screen::Dashboard,
            mode: Mode::Normal,
            status: None,
            last_export: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn table(&self, kind: PublicationKind) -> &PublicationTable {
        &self.page(kind).table
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.mode, Mode::Searching(_))
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.text.as_str())
    }

    pub fn last_export(&self) -> Option<&Path> {
        self.last_export.as_deref()
    }

    fn page(&self, kind: PublicationKind) -> &TablePage {
        match kind {
            PublicationKind::Serial => &self.serials,
            PublicationKind::Monograph => &self.monographs,
        }
    }

    fn page_mut(&mut self, kind: PublicationKind) -> &mut TablePage {
        match kind {
            PublicationKind::Serial => &mut self.serials,
            PublicationKind::Monograph => &mut self.monographs,
        }
    }

    /// Dispatch a key press. Returns `true` when the app should exit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingRecord(form) => self.handle_add_record(code, form)?,
            Mode::Importing(dialog) => self.handle_import(code, dialog)?,
            Mode::Settings(form) => self.handle_settings(code, form)?,
            Mode::SigningIn(form) => self.handle_sign_in(code, form)?,
            Mode::ConfirmRemove { kind, count } => self.handle_confirm_remove(code, kind, count)?,
            Mode::ConfirmReset(kind) => self.handle_confirm_reset(code, kind)?,
            Mode::Searching(progress) => {
                if code == KeyCode::Char('q') {
                    exit = true;
                }
                Mode::Searching(progress)
            }
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
                return Ok(Mode::Normal);
            }
            KeyCode::Tab => self.screen = self.screen.cycle(1),
            KeyCode::BackTab => self.screen = self.screen.cycle(-1),
            KeyCode::Char('1') => self.screen = Screen::Dashboard,
            KeyCode::Char('2') => self.screen = Screen::Table(PublicationKind::Serial),
            KeyCode::Char('3') => self.screen = Screen::Table(PublicationKind::Monograph),
            KeyCode::Char(',') => return Ok(self.open_settings()),
            KeyCode::Char('l') => return Ok(self.toggle_sign_in()),
            _ => {
                if let Screen::Table(kind) = self.screen {
                    return self.handle_table_key(kind, code);
                }
                if code == KeyCode::Enter {
                    self.screen = Screen::Table(PublicationKind::Serial);
                }
            }
        }
        Ok(Mode::Normal)
    }

    fn handle_table_key(&mut self, kind: PublicationKind, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Up => self.page_mut(kind).move_cursor(-1),
            KeyCode::Down => self.page_mut(kind).move_cursor(1),
            KeyCode::PageUp => self.page_mut(kind).move_cursor(-PAGE_STEP),
            KeyCode::PageDown => self.page_mut(kind).move_cursor(PAGE_STEP),
            KeyCode::Home => self.page_mut(kind).select_first(),
            KeyCode::End => self.page_mut(kind).select_last(),
            KeyCode::Left => self.page_mut(kind).scroll_columns(-1),
            KeyCode::Right => self.page_mut(kind).scroll_columns(1),
            KeyCode::Char(' ') => {
                let page = self.page_mut(kind);
                if let Some(id) = page.current_record().map(|record| record.id.clone()) {
                    page.table.toggle_select(&id);
                }
            }
            KeyCode::Char('a') => self.page_mut(kind).table.toggle_select_all(),
            KeyCode::Char('+') => return Ok(Mode::AddingRecord(RecordForm::new(kind))),
            KeyCode::Char('i') => return Ok(Mode::Importing(ImportDialog::new(kind))),
            KeyCode::Char('s') => return Ok(self.start_search(kind)),
            KeyCode::Char('x') => {
                if let Err(err) = self.export_selected(kind) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
            }
            KeyCode::Char('o') => {
                if let Err(err) = self.open_last_export() {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
            }
            KeyCode::Char('-') => {
                let count = self.page(kind).table.selected_count();
                if count == 0 {
                    self.set_status("Select rows with Space before removing.", StatusKind::Error);
                } else {
                    return Ok(Mode::ConfirmRemove { kind, count });
                }
            }
            KeyCode::Char('r') => return Ok(Mode::ConfirmReset(kind)),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_add_record(&mut self, code: KeyCode, mut form: RecordForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Add record cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok(values) => {
                    self.save_new_record(form.kind, &values);
                    return Ok(Mode::Normal);
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::AddingRecord(form))
    }

    fn handle_import(&mut self, code: KeyCode, mut dialog: ImportDialog) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Import cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Backspace => dialog.backspace(),
            KeyCode::Enter => {
                if let Some(rows) = dialog.preview.take() {
                    let page = self.page_mut(dialog.kind);
                    let added = page.table.import_rows(&rows);
                    page.select_last();
                    self.set_status(
                        format!("Imported {added} rows into {}.", dialog.kind),
                        StatusKind::Info,
                    );
                    return Ok(Mode::Normal);
                }
                match load_preview(&dialog) {
                    Ok(rows) if rows.is_empty() => {
                        dialog.error = Some("The first sheet has no data rows.".to_string());
                    }
                    Ok(rows) => dialog.preview = Some(rows),
                    Err(err) => dialog.error = Some(surface_error(&err)),
                }
            }
            KeyCode::Char(ch) => {
                dialog.push_char(ch);
            }
            _ => {}
        }
        Ok(Mode::Importing(dialog))
    }

    fn handle_settings(&mut self, code: KeyCode, mut form: SettingsForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Settings unchanged.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Left => form.previous_mode(),
            KeyCode::Right => form.next_mode(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Delete => {
                self.credentials.remove_api_key();
                self.credentials.remove_ai_mode();
                tracing::info!("settings reset");
                self.set_status("Settings reset.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => {
                if let Some(key) = form.key_to_save() {
                    self.credentials.set_api_key(key);
                }
                self.credentials.set_ai_mode(form.ai_mode);
                tracing::info!(ai_mode = form.ai_mode.value(), "settings saved");
                self.set_status("Settings saved.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Char(ch) => {
                form.push_char(ch);
            }
            _ => {}
        }
        Ok(Mode::Settings(form))
    }

    fn handle_sign_in(&mut self, code: KeyCode, mut form: SignInForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Sign-in cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok(sign_in) => {
                    self.credentials.set_auth_header(&sign_in.auth_header);
                    self.credentials.set_user_name(&sign_in.user_name);
                    self.credentials.set_display_name(&sign_in.user_name);
                    tracing::info!(user = %sign_in.user_name, "signed in");
                    self.set_status(
                        format!("Signed in as {}.", sign_in.user_name),
                        StatusKind::Info,
                    );
                    return Ok(Mode::Normal);
                }
                Err(err) => form.error = Some(surface_error(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::SigningIn(form))
    }

    fn handle_confirm_remove(
        &mut self,
        code: KeyCode,
        kind: PublicationKind,
        count: usize,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Removal cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                let page = self.page_mut(kind);
                let removed = page.table.remove_selected();
                page.ensure_in_bounds();
                self.set_status(format!("Removed {removed} rows."), StatusKind::Info);
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmRemove { kind, count }),
        }
    }

    fn handle_confirm_reset(&mut self, code: KeyCode, kind: PublicationKind) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Reset cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                let page = self.page_mut(kind);
                page.table.reset();
                page.select_first();
                page.column_offset = 0;
                self.set_status(format!("{kind} reset to the example rows."), StatusKind::Info);
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmReset(kind)),
        }
    }

    fn open_settings(&self) -> Mode {
        Mode::Settings(SettingsForm::new(
            self.credentials.api_key(),
            self.credentials.ai_mode(),
        ))
    }

    fn toggle_sign_in(&mut self) -> Mode {
        if !self.credentials.is_signed_in() {
            return Mode::SigningIn(SignInForm::default());
        }
        self.credentials.sign_out();
        tracing::info!("signed out");
        self.set_status("Signed out.", StatusKind::Info);
        Mode::Normal
    }

    /// Point the user at whichever dialog supplies the missing credential.
    fn credential_prompt(&mut self, err: &LookupError) -> Mode {
        match self.client.auth_scheme() {
            AuthScheme::ApiKey => {
                self.set_status(
                    format!("{err}. Enter an API key to search."),
                    StatusKind::Error,
                );
                self.open_settings()
            }
            AuthScheme::Authorization => {
                self.set_status(format!("{err}. Sign in to search."), StatusKind::Error);
                Mode::SigningIn(SignInForm::default())
            }
        }
    }

    fn save_new_record(&mut self, kind: PublicationKind, values: &FieldValues) {
        let page = self.page_mut(kind);
        page.table.add_one(values);
        page.select_last();
        let title = page
            .current_record()
            .map(|record| record.display_title())
            .unwrap_or_default();
        self.set_status(format!("Added {title}."), StatusKind::Info);
    }

    /// Kick off a table-wide lookup on the runtime. Results arrive through
    /// [`App::pump_background`].
    fn start_search(&mut self, kind: PublicationKind) -> Mode {
        let snapshot = self.page(kind).table.search_snapshot();
        if snapshot.is_empty() {
            self.set_status("There are no rows to search.", StatusKind::Error);
            return Mode::Normal;
        }
        if let Err(err) = self.client.ensure_credentials() {
            return self.credential_prompt(&err);
        }

        let total = snapshot.len();
        let client = self.client.clone();
        let events = self.events_tx.clone();
        let strategy = self.options.search_strategy;
        self.runtime.spawn(async move {
            let progress = events.clone();
            let outcome = client
                .search(strategy, kind, &snapshot.items, |completed, total| {
                    let _ = progress.send(BackgroundEvent::Progress { completed, total });
                })
                .await;
            let _ = events.send(BackgroundEvent::SearchFinished { snapshot, outcome });
        });

        self.status = None;
        Mode::Searching(SearchProgress {
            kind,
            completed: 0,
            total,
        })
    }

    /// Drain events sent by background lookups. Called on every UI tick.
    pub fn pump_background(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                BackgroundEvent::Progress { completed, total } => {
                    if let Mode::Searching(progress) = &mut self.mode {
                        progress.completed = completed;
                        progress.total = total;
                    }
                }
                BackgroundEvent::SearchFinished { snapshot, outcome } => {
                    if self.is_searching() {
                        self.mode = Mode::Normal;
                    }
                    self.finish_search(snapshot, outcome);
                }
            }
        }
    }

    fn finish_search(
        &mut self,
        snapshot: SearchSnapshot,
        outcome: Result<SearchReport, LookupError>,
    ) {
        match outcome {
            Ok(report) => {
                let summary = self.page_mut(snapshot.kind).table.apply_search(
                    &snapshot,
                    &report,
                    current_year(),
                );
                let kind = if report.failures.is_empty() {
                    StatusKind::Info
                } else {
                    StatusKind::Error
                };
                self.set_status(describe_search(&report, summary), kind);
            }
            Err(err) if err.kind() == ErrorKind::CredentialMissing => {
                self.mode = self.credential_prompt(&err);
            }
            Err(err) => {
                tracing::error!(kind = %snapshot.kind, error = %err, "search failed");
                self.set_status(format!("Search failed: {err}"), StatusKind::Error);
            }
        }
    }

    fn export_selected(&mut self, kind: PublicationKind) -> Result<()> {
        let records = self.page(kind).table.selected_records();
        if records.is_empty() {
            return Err(anyhow!("Select at least one row to export."));
        }
        let path = spreadsheet::export_to_dir(
            &self.options.export_dir,
            kind.export_prefix(),
            Local::now().date_naive(),
            self.page(kind).columns(),
            &records,
        )
        .context("failed to export the selected rows")?;

        self.set_status(
            format!(
                "Exported {} rows to {}. Press o to open it.",
                records.len(),
                path.display()
            ),
            StatusKind::Info,
        );
        self.last_export = Some(path);
        Ok(())
    }

    fn open_last_export(&mut self) -> Result<()> {
        let path = self
            .last_export
            .clone()
            .ok_or_else(|| anyhow!("Nothing has been exported yet."))?;
        open_link(&path).with_context(|| format!("failed to open {}", path.display()))?;
        self.set_status(format!("Opened {}.", path.display()), StatusKind::Info);
        Ok(())
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(chunks[1]);
        self.draw_sidebar(frame, body[0]);
        match self.screen {
            Screen::Dashboard => self.draw_dashboard(frame, body[1]),
            Screen::Table(kind) => self.draw_table_page(frame, body[1], self.page(kind)),
        }

        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::AddingRecord(form) => self.draw_record_form(frame, area, form),
            Mode::Importing(dialog) => self.draw_import(frame, area, dialog),
            Mode::Settings(form) => self.draw_settings(frame, area, form),
            Mode::SigningIn(form) => self.draw_sign_in(frame, area, form),
            Mode::ConfirmRemove { kind, count } => self.draw_confirm(
                frame,
                area,
                "Confirm Removal",
                format!("Remove {count} selected rows from {kind}?"),
            ),
            Mode::ConfirmReset(kind) => self.draw_confirm(
                frame,
                area,
                "Confirm Reset",
                format!("Replace every row in {kind} with the example rows?"),
            ),
            Mode::Searching(progress) => self.draw_search_progress(frame, area, progress),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let user = self
            .credentials
            .display_name()
            .unwrap_or_else(|| "not signed in".to_string());
        let key_state = if self.credentials.has_api_key() {
            "set"
        } else {
            "missing"
        };
        let line = Line::from(vec![
            Span::styled(
                " Copyright Desk ",
                Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
            ),
            Span::raw(format!("  User: {user}")),
            Span::raw(format!("   AI mode: {}", self.credentials.ai_mode())),
            Span::raw(format!("   API key: {key_state}")),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_sidebar(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = Screen::ORDER
            .iter()
            .enumerate()
            .map(|(position, screen)| {
                let style = if *screen == self.screen {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(
                    format!(" {} {}", position + 1, screen.label()),
                    style,
                )))
            })
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Menu"));
        frame.render_widget(list, area);
    }

    fn draw_dashboard(&self, frame: &mut Frame, area: Rect) {
        let heading = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from("Look up copyright metadata for serial and monograph publications."),
            Line::from(""),
        ];

        for page in [&self.serials, &self.monographs] {
            let stats = TableStats::of(&page.table);
            lines.push(Line::from(Span::styled(page.kind().label(), heading)));
            lines.push(Line::from(format!(
                "  Rows: {}   Selected: {}   Looked up: {}",
                stats.records, stats.selected, stats.looked_up
            )));
            lines.push(Line::from(format!(
                "  Protected: {}   Public domain: {}   Undetermined: {}",
                stats.protected, stats.public_domain, stats.undetermined
            )));
            lines.push(Line::from(""));
        }

        let auth = match self.client.auth_scheme() {
            AuthScheme::ApiKey => "API key",
            AuthScheme::Authorization => "sign-in",
        };
        lines.push(Line::from(Span::styled("Session", heading)));
        lines.push(Line::from(format!("  Service: {}", self.client.base_url())));
        lines.push(Line::from(format!("  Credential: {auth}")));
        lines.push(Line::from(format!(
            "  Last export: {}",
            self.last_export
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "Individual authors are protected for {PROTECTION_TERM_YEARS} years after death, \
                 organizations for {PROTECTION_TERM_YEARS} years after publication."
            ),
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Dashboard"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_table_page(&self, frame: &mut Frame, area: Rect, page: &TablePage) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(DETAIL_HEIGHT)])
            .split(area);

        let columns = page.visible_columns();
        let header_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let header = Row::new(iter::once(Cell::from("")).chain(
            columns
                .iter()
                .map(|column| Cell::from(truncate(column.label, column.width as usize))),
        ))
        .style(header_style);

        let rows = page.table.records().iter().map(|record| {
            let mark = if page.table.is_selected(&record.id) {
                "[x]"
            } else {
                "[ ]"
            };
            Row::new(iter::once(Cell::from(mark)).chain(columns.iter().map(|column| {
                let value = record.cell(column.key);
                Cell::from(truncate(&value.display_text(), column.width as usize))
                    .style(cell_style(value, column.key == FieldKey::HasCopyright))
            })))
        });

        let widths = iter::once(Constraint::Length(CHECKBOX_WIDTH))
            .chain(columns.iter().map(|column| Constraint::Length(column.width)));

        let title = format!(
            "{} ({} rows, {} selected)",
            page.kind(),
            page.table.len(),
            page.table.selected_count()
        );
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .column_spacing(1);

        let mut state = TableState::default();
        if !page.table.is_empty() {
            state.select(Some(page.cursor));
        }
        frame.render_stateful_widget(table, chunks[0], &mut state);

        self.draw_detail(frame, chunks[1], page);
    }

    fn draw_detail(&self, frame: &mut Frame, area: Rect, page: &TablePage) {
        let dash = |value: Option<&str>| {
            value
                .filter(|text| !text.trim().is_empty())
                .unwrap_or("-")
                .to_string()
        };

        let lines = match page.current_record() {
            None => vec![Line::from(
                "No rows. Press + to add one or i to import a spreadsheet.",
            )],
            Some(record) => vec![
                Line::from(Span::styled(
                    record.display_title(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(format!(
                    "Published: {}   Publisher: {}",
                    dash(Some(record.publish_year.as_str())),
                    dash(Some(record.publisher.as_str()))
                )),
                Line::from(format!(
                    "Author type: {}   Born: {}   Died: {}   ISNI: {}",
                    dash(record.author_type.as_deref()),
                    dash(record.birth_year.as_deref()),
                    dash(record.death_year.as_deref()),
                    dash(record.isni.as_deref())
                )),
                Line::from(format!(
                    "Copyright: {}   {}",
                    copyright_label(record.has_copyright),
                    dash(record.copyright_reason.as_deref())
                )),
                Line::from(format!("Remark: {}", dash(record.remark.as_deref()))),
            ],
        };

        let title = if page.table.is_empty() {
            "Details".to_string()
        } else {
            format!("Row {} of {}", page.cursor + 1, page.table.len())
        };
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        match (&self.screen, &self.mode) {
            (_, Mode::Searching(_)) => key_hints(&[("[q]", "Quit")]),
            (_, Mode::AddingRecord(_)) => key_hints(&[
                ("[Tab]", "Next field"),
                ("[Enter]", "Save"),
                ("[Esc]", "Cancel"),
            ]),
            (_, Mode::Importing(dialog)) if dialog.has_preview() => {
                key_hints(&[("[Enter]", "Import rows"), ("[Esc]", "Cancel")])
            }
            (_, Mode::Importing(_)) => {
                key_hints(&[("[Enter]", "Load preview"), ("[Esc]", "Cancel")])
            }
            (_, Mode::Settings(_)) => key_hints(&[
                ("[←→]", "AI mode"),
                ("[Enter]", "Save"),
                ("[Del]", "Reset"),
                ("[Esc]", "Cancel"),
            ]),
            (_, Mode::SigningIn(_)) => key_hints(&[
                ("[Tab]", "Switch field"),
                ("[Enter]", "Sign in"),
                ("[Esc]", "Cancel"),
            ]),
            (_, Mode::ConfirmRemove { .. }) | (_, Mode::ConfirmReset(_)) => {
                key_hints(&[("[Y]", "Confirm"), ("[N]", "Cancel")])
            }
            (Screen::Dashboard, Mode::Normal) => key_hints(&[
                ("[Tab]", "Switch page"),
                ("[1-3]", "Jump"),
                ("[,]", "Settings"),
                ("[l]", "Sign in/out"),
                ("[q]", "Quit"),
            ]),
            (Screen::Table(_), Mode::Normal) => key_hints(&[
                ("[↑↓]", "Move"),
                ("[←→]", "Columns"),
                ("[Space]", "Select"),
                ("[a]", "All"),
                ("[+]", "Add"),
                ("[i]", "Import"),
                ("[s]", "Search"),
                ("[x]", "Export"),
                ("[o]", "Open export"),
                ("[-]", "Remove"),
                ("[r]", "Reset"),
                ("[,]", "Settings"),
                ("[q]", "Quit"),
            ]),
        }
    }

    fn draw_record_form(&self, frame: &mut Frame, area: Rect, form: &RecordForm) {
        let popup_area = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup_area);

        let title = format!("Add {} Record", form.kind);
        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = (0..form.fields().len())
            .map(|index| form.build_line(index))
            .collect();
        lines.push(Line::from(""));
        lines.push(form_hint(
            form.error.as_deref(),
            "Enter to save • Tab to switch • Esc to cancel",
        ));

        frame.render_widget(Paragraph::new(lines), inner);
        frame.set_cursor_position((
            inner.x + form.cursor_offset() as u16,
            inner.y + form.active as u16,
        ));
    }

    fn draw_import(&self, frame: &mut Frame, area: Rect, dialog: &ImportDialog) {
        let popup_area = centered_rect(80, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Import {} Spreadsheet", dialog.kind))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(inner);

        let status = match (&dialog.preview, &dialog.error) {
            (_, Some(error)) => {
                Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red)))
            }
            (Some(rows), None) => Line::from(Span::styled(
                format!("{} rows found. Enter to import • Esc to cancel", rows.len()),
                Style::default().fg(Color::Gray),
            )),
            (None, None) => Line::from(Span::styled(
                "Columns are read by position; the first row is treated as a header.",
                Style::default().fg(Color::Gray),
            )),
        };
        let lines = vec![
            Line::from(vec![
                Span::raw("File: "),
                Span::styled(dialog.path.clone(), Style::default().fg(Color::Yellow)),
            ]),
            Line::from(""),
            status,
        ];
        frame.render_widget(Paragraph::new(lines), chunks[0]);
        frame.set_cursor_position((
            chunks[0].x + "File: ".len() as u16 + dialog.path.chars().count() as u16,
            chunks[0].y,
        ));

        if let Some(rows) = &dialog.preview {
            self.draw_preview(frame, chunks[1], dialog.kind, rows);
        }
    }

    fn draw_preview(
        &self,
        frame: &mut Frame,
        area: Rect,
        kind: PublicationKind,
        rows: &[FieldValues],
    ) {
        let columns = kind.basic_columns();
        let header = Row::new(
            columns
                .iter()
                .map(|column| Cell::from(truncate(column.label, column.width as usize))),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));
        let body = rows.iter().take(PREVIEW_ROWS).map(|values| {
            Row::new(columns.iter().map(|column| {
                let text = values.get(&column.key).map(String::as_str).unwrap_or("");
                Cell::from(truncate(text, column.width as usize))
            }))
        });
        let title = if rows.len() > PREVIEW_ROWS {
            format!("Preview (first {PREVIEW_ROWS} of {})", rows.len())
        } else {
            "Preview".to_string()
        };
        let table = Table::new(body, columns.iter().map(|column| Constraint::Length(column.width)))
            .header(header)
            .block(Block::default().borders(Borders::TOP).title(title))
            .column_spacing(1);
        frame.render_widget(table, area);
    }

    fn draw_settings(&self, frame: &mut Frame, area: Rect, form: &SettingsForm) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Settings").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = form.lines();
        lines.push(Line::from(""));
        lines.push(form_hint(
            None,
            "Enter to save • ←/→ to change AI mode • Delete to reset • Esc to cancel",
        ));
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
        frame.set_cursor_position((inner.x + form.cursor_offset() as u16, inner.y));
    }

    fn draw_sign_in(&self, frame: &mut Frame, area: Rect, form: &SignInForm) {
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Sign In").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            form.build_line(SignInField::UserName),
            form.build_line(SignInField::Password),
            Line::from(""),
            form_hint(
                form.error.as_deref(),
                "Enter to sign in • Tab to switch • Esc to cancel",
            ),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let (offset, row) = form.cursor_offset();
        frame.set_cursor_position((inner.x + offset as u16, inner.y + row));
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, title: &str, message: String) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(message),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_progress(&self, frame: &mut Frame, area: Rect, progress: &SearchProgress) {
        let popup_area = centered_rect(50, 20, area);
        frame.render_widget(Clear, popup_area);

        let ratio = if progress.total == 0 {
            0.0
        } else {
            (progress.completed as f64 / progress.total as f64).clamp(0.0, 1.0)
        };
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Searching {}", progress.kind)),
            )
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(ratio)
            .label(format!("{}/{}", progress.completed, progress.total));
        frame.render_widget(gauge, popup_area);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }
}

fn load_preview(dialog: &ImportDialog) -> Result<Vec<FieldValues>> {
    if dialog.path.trim().is_empty() {
        return Err(anyhow!("Enter the path of an .xlsx or .xls file."));
    }
    let path = expand_home(&dialog.path);
    let keys: Vec<FieldKey> = dialog
        .kind
        .basic_columns()
        .iter()
        .map(|column| column.key)
        .collect();
    spreadsheet::read_preview_file(&path, &keys)
        .with_context(|| format!("failed to import {}", path.display()))
}

/// Failed positions are shown as 1-based row numbers, matching the
/// "Row N of M" caption in the detail pane.
fn describe_search(report: &SearchReport, summary: MergeSummary) -> String {
    let mut message = if report.failures.is_empty() {
        format!("Search finished: {} succeeded.", summary.succeeded)
    } else {
        let rows: Vec<String> = report
            .failures
            .iter()
            .map(|failure| (failure.index + 1).to_string())
            .collect();
        format!(
            "Search finished: {} succeeded, {} failed (rows {}).",
            summary.succeeded,
            summary.failed,
            rows.join(", ")
        )
    };
    if summary.discarded > 0 {
        message.push_str(&format!(" {} results no longer matched a row.", summary.discarded));
    }
    message
}

fn copyright_label(status: Option<bool>) -> &'static str {
    match status {
        Some(true) => "protected",
        Some(false) => "public domain",
        None => "undetermined",
    }
}

fn key_hints(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let spans: Vec<Span<'static>> = hints
        .iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(*key, key_style),
                Span::raw(format!(" {action}   ")),
            ]
        })
        .collect();
    Line::from(spans)
}

fn form_hint(error: Option<&str>, hint: &'static str) -> Line<'static> {
    match error {
        Some(error) => Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
    }
}
