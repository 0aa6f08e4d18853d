// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use filedeck_app::{
    CLEAN_LABEL, COLUMN_LABELS, FileRecord, FlatRow, NO_DATA_LABEL, RETRY_LABEL, RowStripe,
    SEARCH_LABEL, SEARCH_PLACEHOLDER, TABLE_TITLE, TableBody, TableView, ViewCommand, ViewEvent,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::{debug, warn};

const PAGE_ROWS: isize = 10;
const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
const CLOCK_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");
const COLUMN_WIDTHS: [Constraint; 4] = [
    Constraint::Percentage(20),
    Constraint::Percentage(30),
    Constraint::Percentage(15),
    Constraint::Percentage(35),
];

/// Source of file data for the UI. The `spawn_*` methods must not block the
/// caller for long; the defaults run the load inline, which is only suitable
/// for tests and other synchronous runtimes.
pub trait DataRuntime {
    fn load_files_data(&mut self, force: bool) -> Result<Vec<FileRecord>>;
    fn load_file_by_name(&mut self, name: &str) -> Result<Option<Vec<FileRecord>>>;

    fn spawn_files_data(&mut self, force: bool, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .load_files_data(force)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::FilesData(result))
            .map_err(|_| anyhow!("file data channel closed"))?;
        Ok(())
    }

    fn spawn_file_by_name(
        &mut self,
        request_id: u64,
        name: &str,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .load_file_by_name(name)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::FileByName { request_id, result })
            .map_err(|_| anyhow!("file search channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    FilesData(Result<Vec<FileRecord>, String>),
    FileByName {
        request_id: u64,
        result: Result<Option<Vec<FileRecord>>, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    status_line: Option<String>,
    status_token: u64,
    scroll: usize,
    tick: usize,
}

/// Runs the table UI until the user quits. A non-empty `view.input_value`
/// is committed as a search right after the initial load is requested.
pub fn run_app<R: DataRuntime>(view: &mut TableView, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let result = match Terminal::new(backend).context("create terminal") {
        Ok(mut terminal) => event_loop(&mut terminal, view, runtime, next_terminal_event),
        Err(error) => Err(error),
    };

    // Restore the terminal even when the loop failed.
    let restored = disable_raw_mode()
        .context("disable raw mode")
        .and_then(|()| {
            execute!(io::stdout(), terminal::LeaveAlternateScreen)
                .context("leave alternate screen")
        });
    result.and(restored)
}

fn next_terminal_event() -> Result<Option<Event>> {
    if event::poll(Duration::from_millis(120)).context("poll event")? {
        return event::read().context("read event").map(Some);
    }
    Ok(None)
}

fn event_loop<B, R, F>(
    terminal: &mut Terminal<B>,
    view: &mut TableView,
    runtime: &mut R,
    mut next_event: F,
) -> Result<()>
where
    B: Backend,
    R: DataRuntime,
    F: FnMut() -> Result<Option<Event>>,
{
    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    start(view, runtime, &mut view_data, &internal_tx);

    loop {
        process_internal_events(view, runtime, &mut view_data, &internal_tx, &internal_rx);

        terminal
            .draw(|frame| render(frame, view, &view_data))
            .context("draw frame")?;

        if let Some(Event::Key(key)) = next_event()?
            && handle_key_event(view, runtime, &mut view_data, &internal_tx, key)
        {
            return Ok(());
        }
        view_data.tick = view_data.tick.wrapping_add(1);
    }
}

fn start<R: DataRuntime>(
    view: &mut TableView,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = view.dispatch(ViewCommand::Mount);
    apply_view_events(view, runtime, view_data, internal_tx, events);
    if !view.input_value.trim().is_empty() {
        let events = view.dispatch(ViewCommand::CommitSearch);
        apply_view_events(view, runtime, view_data, internal_tx, events);
    }
}

fn process_internal_events<R: DataRuntime>(
    view: &mut TableView,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        let command = match event {
            InternalEvent::ClearStatus { token } => {
                if token == view_data.status_token {
                    view_data.status_line = None;
                }
                continue;
            }
            InternalEvent::FilesData(Ok(records)) => ViewCommand::FilesLoaded(records),
            InternalEvent::FilesData(Err(error)) => ViewCommand::FilesFailed(error),
            InternalEvent::FileByName {
                request_id,
                result: Ok(records),
            } => ViewCommand::FileByNameLoaded {
                request_id,
                records,
            },
            InternalEvent::FileByName {
                request_id,
                result: Err(error),
            } => ViewCommand::FileByNameFailed { request_id, error },
        };
        let events = view.dispatch(command);
        apply_view_events(view, runtime, view_data, tx, events);
    }
    clamp_scroll(view, view_data);
}

fn apply_view_events<R: DataRuntime>(
    view: &TableView,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<ViewEvent>,
) {
    for event in events {
        match event {
            ViewEvent::FilesRequested => request_files(runtime, tx, false),
            ViewEvent::RefetchRequested => request_files(runtime, tx, true),
            ViewEvent::SearchCommitted { request_id, name } => {
                debug!(request_id, %name, "search committed");
                view_data.scroll = 0;
                if let Err(error) = runtime.spawn_file_by_name(request_id, &name, tx.clone()) {
                    let _ = tx.send(InternalEvent::FileByName {
                        request_id,
                        result: Err(format!("{error:#}")),
                    });
                }
            }
            ViewEvent::SearchCleared => {
                view_data.scroll = 0;
                emit_status(view_data, tx, "search cleared");
            }
            ViewEvent::FilesLoaded { count } => {
                let at = clock_label(OffsetDateTime::now_utc());
                emit_status(view_data, tx, format!("loaded {count} files at {at} UTC"));
            }
            ViewEvent::FilesFailed(error) => {
                warn!(%error, "file table failed to load");
            }
            ViewEvent::FileLoaded { name, rows } => {
                emit_status(view_data, tx, format!("{name}: {rows} rows"));
            }
            ViewEvent::FileFailed { name, error } => {
                warn!(%name, %error, "file search failed");
            }
            ViewEvent::StaleResultDropped { request_id } => {
                debug!(request_id, current = view.search_request(), "dropped stale search result");
            }
            ViewEvent::InputChanged(_) => {}
        }
    }
}

fn request_files<R: DataRuntime>(runtime: &mut R, tx: &Sender<InternalEvent>, force: bool) {
    if let Err(error) = runtime.spawn_files_data(force, tx.clone()) {
        let _ = tx.send(InternalEvent::FilesData(Err(format!("{error:#}"))));
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn clock_label(at: OffsetDateTime) -> String {
    at.format(CLOCK_FORMAT).unwrap_or_default()
}

/// Returns `true` when the app should quit.
fn handle_key_event<R: DataRuntime>(
    view: &mut TableView,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let has_error = view.files.error.is_some();
    let command = if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('q' | 'c') => return true,
            KeyCode::Char('r') => Some(ViewCommand::Refresh),
            KeyCode::Char('l') if !has_error => Some(ViewCommand::Clean),
            _ => None,
        }
    } else if has_error {
        // Only the retry control exists while the error banner is up.
        match key.code {
            KeyCode::Enter | KeyCode::Char('r') => Some(ViewCommand::Retry),
            _ => None,
        }
    } else {
        match key.code {
            KeyCode::Char(ch) => Some(ViewCommand::InsertChar(ch)),
            KeyCode::Backspace => Some(ViewCommand::Backspace),
            KeyCode::Enter => Some(ViewCommand::CommitSearch),
            KeyCode::Esc => Some(ViewCommand::Clean),
            KeyCode::Up => scroll_by(view, view_data, -1),
            KeyCode::Down => scroll_by(view, view_data, 1),
            KeyCode::PageUp => scroll_by(view, view_data, -PAGE_ROWS),
            KeyCode::PageDown => scroll_by(view, view_data, PAGE_ROWS),
            KeyCode::Home => scroll_by(view, view_data, isize::MIN),
            KeyCode::End => scroll_by(view, view_data, isize::MAX),
            _ => None,
        }
    };

    if let Some(command) = command {
        let events = view.dispatch(command);
        apply_view_events(view, runtime, view_data, internal_tx, events);
    }
    false
}

fn scroll_by(view: &TableView, view_data: &mut ViewData, delta: isize) -> Option<ViewCommand> {
    let max = view.rows().len().saturating_sub(1);
    view_data.scroll = view_data.scroll.saturating_add_signed(delta).min(max);
    None
}

fn clamp_scroll(view: &TableView, view_data: &mut ViewData) {
    let max = view.rows().len().saturating_sub(1);
    view_data.scroll = view_data.scroll.min(max);
}

fn render(frame: &mut ratatui::Frame<'_>, view: &TableView, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());

    let body = view.body();
    if let TableBody::Error { message, detail } = &body {
        let error = Paragraph::new(error_text(message, detail))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Red))
            .block(Block::default().title(TABLE_TITLE).borders(Borders::ALL));
        frame.render_widget(error, layout[0]);
    } else {
        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(layout[0]);

        let search = Paragraph::new(search_bar_text(view))
            .block(Block::default().title(TABLE_TITLE).borders(Borders::ALL));
        frame.render_widget(search, main[0]);

        if let Some(notice) = view.search_error() {
            let notice = Paragraph::new(notice).style(Style::default().fg(Color::Yellow));
            frame.render_widget(notice, main[1]);
        }

        render_table(frame, main[2], view, view_data, body);
    }

    let status = Paragraph::new(status_text(view, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[1]);
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    view: &TableView,
    view_data: &ViewData,
    body: TableBody,
) {
    let block = Block::default()
        .title(table_title(view))
        .borders(Borders::ALL);
    let header = Row::new(COLUMN_LABELS).style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    match body {
        TableBody::Loading => {
            let loading = Paragraph::new(loading_text(view_data.tick))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(loading, area);
        }
        TableBody::Empty => {
            let inner = block.inner(area);
            let table = Table::new(Vec::<Row<'_>>::new(), COLUMN_WIDTHS)
                .header(header)
                .column_spacing(1)
                .block(block);
            frame.render_widget(table, area);
            if inner.height > 1 {
                let no_data_row = Rect {
                    y: inner.y + 1,
                    height: 1,
                    ..inner
                };
                let no_data = Paragraph::new(NO_DATA_LABEL).alignment(Alignment::Center);
                frame.render_widget(no_data, no_data_row);
            }
        }
        TableBody::Rows(rows) => {
            let table = Table::new(table_rows(&rows, view_data.scroll), COLUMN_WIDTHS)
                .header(header)
                .column_spacing(1)
                .block(block);
            frame.render_widget(table, area);
        }
        TableBody::Error { .. } => {}
    }
}

fn table_rows(rows: &[FlatRow], scroll: usize) -> Vec<Row<'_>> {
    rows.iter()
        .enumerate()
        .skip(scroll)
        .map(|(index, row)| {
            Row::new(row.cells().map(Cell::from)).style(stripe_style(RowStripe::for_index(index)))
        })
        .collect()
}

fn stripe_style(stripe: RowStripe) -> Style {
    match stripe {
        RowStripe::Secondary => Style::default().fg(Color::White).bg(Color::DarkGray),
        RowStripe::White => Style::default(),
    }
}

fn table_title(view: &TableView) -> String {
    if view.is_searching() && view.by_name.data.is_some() {
        return format!("file {:?}", view.search_name);
    }
    "all files".to_owned()
}

fn search_bar_text(view: &TableView) -> String {
    let input = if view.input_value.is_empty() {
        format!("{SEARCH_PLACEHOLDER}...")
    } else {
        format!("{}_", view.input_value)
    };
    let mut text = format!("> {input}   [enter] {SEARCH_LABEL}");
    if view.is_searching() {
        text.push_str(&format!("   [esc] {CLEAN_LABEL}"));
    }
    text
}

fn error_text(message: &str, detail: &str) -> String {
    format!("{message}\n{detail}\n\n[enter] {RETRY_LABEL}")
}

fn loading_text(tick: usize) -> String {
    format!("{} Loading...", SPINNER_FRAMES[tick % SPINNER_FRAMES.len()])
}

fn status_text(view: &TableView, view_data: &ViewData) -> String {
    let hints = if view.files.error.is_some() {
        "enter/r retry | ctrl+r refresh | ctrl+q quit"
    } else {
        "type a file name | enter search | esc clean | up/down pgup/pgdn scroll | ctrl+r refresh | ctrl+q quit"
    };

    let mut parts = Vec::new();
    let refreshing = (view.files.is_fetching && !view.files.is_loading)
        || (view.by_name.is_fetching && !view.by_name.is_loading);
    if refreshing {
        parts.push("refreshing".to_owned());
    }
    if let Some(status) = &view_data.status_line {
        parts.push(status.clone());
    }
    parts.push(hints.to_owned());
    parts.join(" | ")
}
