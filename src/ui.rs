use std::cell::Cell;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::data::CatalogService;
use crate::entry::{self, Entry};
use crate::filter::{self, FilterCriteria};
use crate::loader::{LoadRequest, LoadResponse, LoadState, Loader};
use crate::theme::{self, Palette, Theme};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const CARD_WIDTH: u16 = 28;
const CARD_HEIGHT: u16 = 4;
const SIDEBAR_WIDTH: u16 = 30;
const STAT_NAME_WIDTH: usize = 16;
const STAT_BAR_WIDTH: usize = 30;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Focus {
    Grid,
    Search,
    Sidebar,
}

struct PendingCategories {
    request_id: u64,
}

enum AsyncResponse {
    Categories {
        request_id: u64,
        result: Result<Vec<String>>,
    },
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub struct Options {
    pub loader: Loader,
    pub categories: Vec<String>,
    pub fetch_categories: bool,
    pub theme: Theme,
    pub status_message: String,
}

pub struct Model {
    loader: Loader,
    criteria: FilterCriteria,
    page: usize,
    has_next: bool,
    categories: Vec<String>,
    visible: Vec<usize>,
    selected: usize,
    grid_columns: Cell<usize>,
    grid_offset: Cell<usize>,
    popup_open: bool,
    sidebar_visible: bool,
    sidebar_index: usize,
    focus: Focus,
    theme: Theme,
    status_message: String,
    spinner: Spinner,
    needs_redraw: bool,
    load_tx: Sender<LoadResponse>,
    load_rx: Receiver<LoadResponse>,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    pending_categories: Option<PendingCategories>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (load_tx, load_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();
        let categories = normalize_categories(opts.categories);

        let mut model = Self {
            loader: opts.loader,
            criteria: FilterCriteria::default(),
            page: 0,
            has_next: false,
            categories,
            visible: Vec::new(),
            selected: 0,
            grid_columns: Cell::new(1),
            grid_offset: Cell::new(0),
            popup_open: false,
            sidebar_visible: false,
            sidebar_index: 0,
            focus: Focus::Grid,
            theme: opts.theme,
            status_message: opts.status_message,
            spinner: Spinner::new(),
            needs_redraw: true,
            load_tx,
            load_rx,
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_categories: None,
        };

        model.reload();
        if opts.fetch_categories {
            model.reload_categories();
        }
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                            }
                        }
                        self.mark_dirty();
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.loader.is_loading() || self.pending_categories.is_some()
    }

    pub fn load_state(&self) -> &LoadState {
        self.loader.state()
    }

    pub fn visible_entries(&self) -> Vec<&Entry> {
        let entries = self.loader.state().entries();
        self.visible
            .iter()
            .filter_map(|&idx| entries.get(idx))
            .collect()
    }

    fn selected_entry(&self) -> Option<&Entry> {
        let idx = *self.visible.get(self.selected)?;
        self.loader.state().entries().get(idx)
    }

    pub fn on_search_text_change(&mut self, text: &str) {
        self.criteria.search_text = text.to_string();
        self.refresh_visible();
    }

    pub fn on_category_select(&mut self, category: Option<String>) {
        let category = category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());
        self.criteria.category = category;
        self.page = 0;
        self.reload();
    }

    pub fn on_page_change(&mut self, delta: i64) {
        let target = if delta < 0 {
            self.page.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            if !self.has_next {
                self.status_message = "Already on the last page.".to_string();
                return;
            }
            self.page.saturating_add(delta as usize)
        };
        if target == self.page {
            self.status_message = "Already on the first page.".to_string();
            return;
        }
        self.page = target;
        self.reload();
    }

    fn current_request(&self) -> LoadRequest {
        LoadRequest::page(self.page, self.criteria.category.clone())
    }

    fn reload(&mut self) {
        let request = self.current_request();
        self.status_message = match request.category() {
            Some(category) => format!(
                "Loading {} entries (page {})…",
                entry::capitalize(category),
                self.page + 1
            ),
            None => format!("Loading page {}…", self.page + 1),
        };
        self.start_load(request);
    }

    fn run_search(&mut self) {
        let query = self.criteria.search_text.trim().to_string();
        if query.is_empty() {
            self.reload();
            return;
        }
        self.page = 0;
        self.has_next = false;
        self.status_message = format!("Searching the catalog for \"{query}\"…");
        self.start_load(LoadRequest::search(query));
    }

    fn start_load(&mut self, request: LoadRequest) {
        self.popup_open = false;
        self.spinner.reset();
        self.loader.spawn(request, self.load_tx.clone());
        self.refresh_visible();
        self.mark_dirty();
    }

    fn reload_categories(&mut self) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_categories = Some(PendingCategories { request_id });

        let tx = self.response_tx.clone();
        let service: Arc<dyn CatalogService> = self.loader.service();
        thread::spawn(move || {
            let result = service.fetch_categories();
            let _ = tx.send(AsyncResponse::Categories { request_id, result });
        });
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.load_rx.try_recv() {
            self.handle_load_response(response);
            changed = true;
        }
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_load_response(&mut self, response: LoadResponse) {
        let LoadResponse { ticket, result } = response;
        if !self.loader.complete(&ticket, result) {
            return;
        }
        match self.loader.state() {
            LoadState::Ready(page) => {
                self.has_next = page.has_next;
                self.status_message = match &page.request {
                    LoadRequest::Search { query } => {
                        format!("{} result(s) for \"{query}\".", page.entries.len())
                    }
                    LoadRequest::Page { page: index, category } => {
                        let scope = category
                            .as_deref()
                            .map(|c| format!(" · {}", entry::capitalize(c)))
                            .unwrap_or_default();
                        format!(
                            "Page {}{} · {} entries · {} in catalog",
                            index + 1,
                            scope,
                            page.entries.len(),
                            page.total_count
                        )
                    }
                };
            }
            LoadState::Failed(message) => {
                self.has_next = false;
                self.status_message = message.clone();
            }
            LoadState::Idle | LoadState::Loading => {}
        }
        self.selected = 0;
        self.grid_offset.set(0);
        self.refresh_visible();
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Categories { request_id, result } => {
                let Some(pending) = &self.pending_categories else {
                    return;
                };
                if pending.request_id != request_id {
                    return;
                }
                self.pending_categories = None;
                match result {
                    Ok(categories) => {
                        let categories = normalize_categories(categories);
                        if !categories.is_empty() {
                            self.categories = categories;
                            self.sidebar_index =
                                self.sidebar_index.min(self.categories.len());
                        }
                    }
                    Err(err) => {
                        tracing::warn!("keeping configured categories: {err:#}");
                    }
                }
            }
        }
    }

    fn refresh_visible(&mut self) {
        self.visible = filter::matching_indices(self.loader.state().entries(), &self.criteria);
        if self.visible.is_empty() {
            self.selected = 0;
            self.popup_open = false;
        } else if self.selected >= self.visible.len() {
            self.selected = self.visible.len() - 1;
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let max = self.visible.len() - 1;
        let next = if delta < 0 {
            self.selected.saturating_sub(delta.unsigned_abs())
        } else {
            self.selected.saturating_add(delta as usize).min(max)
        };
        self.selected = next;
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.popup_open {
            return self.handle_popup_key(code);
        }
        match self.focus {
            Focus::Search => self.handle_search_key(code),
            Focus::Sidebar => self.handle_sidebar_key(code),
            Focus::Grid => self.handle_grid_key(code),
        }
    }

    fn handle_popup_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Backspace => {
                self.popup_open = false;
            }
            KeyCode::Char('o') => self.open_selected_artwork()?,
            KeyCode::Char('t') => self.toggle_theme(),
            _ => {}
        }
        Ok(false)
    }

    fn handle_search_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Esc | KeyCode::Tab | KeyCode::Down => self.focus = Focus::Grid,
            KeyCode::Enter => {
                self.focus = Focus::Grid;
                self.run_search();
            }
            KeyCode::Backspace => {
                let mut text = self.criteria.search_text.clone();
                text.pop();
                self.on_search_text_change(&text);
            }
            KeyCode::Char(ch) => {
                let mut text = self.criteria.search_text.clone();
                text.push(ch);
                self.on_search_text_change(&text);
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_sidebar_key(&mut self, code: KeyCode) -> Result<bool> {
        // index 0 is the "All" row
        let rows = self.categories.len() + 1;
        match code {
            KeyCode::Esc | KeyCode::Char('m') | KeyCode::Tab => {
                self.sidebar_visible = false;
                self.focus = Focus::Grid;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.sidebar_index = (self.sidebar_index + 1).min(rows - 1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.sidebar_index = self.sidebar_index.saturating_sub(1);
            }
            KeyCode::Enter => {
                let category = self
                    .sidebar_index
                    .checked_sub(1)
                    .and_then(|idx| self.categories.get(idx).cloned());
                self.sidebar_visible = false;
                self.focus = Focus::Grid;
                self.on_category_select(category);
            }
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('q') => return Ok(true),
            _ => {}
        }
        Ok(false)
    }

    fn handle_grid_key(&mut self, code: KeyCode) -> Result<bool> {
        let columns = self.grid_columns.get().max(1) as isize;
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('/') => self.focus = Focus::Search,
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('m') => {
                self.sidebar_visible = true;
                self.focus = Focus::Sidebar;
                self.sidebar_index = self
                    .criteria
                    .active_category()
                    .and_then(|active| self.categories.iter().position(|c| c == active))
                    .map_or(0, |idx| idx + 1);
            }
            KeyCode::Char('h') | KeyCode::Left => self.move_selection(-1),
            KeyCode::Char('l') | KeyCode::Right => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-columns),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(columns),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.visible.len().saturating_sub(1),
            KeyCode::Enter => {
                if self.selected_entry().is_some() {
                    self.popup_open = true;
                }
            }
            KeyCode::Char('n') | KeyCode::PageDown => self.on_page_change(1),
            KeyCode::Char('p') | KeyCode::PageUp => self.on_page_change(-1),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('o') => self.open_selected_artwork()?,
            KeyCode::Char('c') => {
                self.on_search_text_change("");
                if self.criteria.category.is_some() {
                    self.on_category_select(None);
                }
            }
            KeyCode::Esc => self.on_search_text_change(""),
            _ => {}
        }
        Ok(false)
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.status_message = format!("Switched to {} mode.", self.theme.label());
    }

    fn open_selected_artwork(&mut self) -> Result<()> {
        let Some(entry) = self.selected_entry() else {
            return Ok(());
        };
        let name = entry.display_name();
        let url = entry
            .images
            .primary()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("{name} has no artwork"))?;
        webbrowser::open(&url).map_err(|err| anyhow!("open {url}: {err}"))?;
        self.status_message = format!("Opened artwork for {name}.");
        Ok(())
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let palette = self.theme.palette();
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(palette.bg)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        let status_style = if self.loader.state().error().is_some() {
            Style::default().fg(palette.error)
        } else {
            Style::default().fg(palette.text_primary)
        };
        frame.render_widget(
            Paragraph::new(status_text).style(
                status_style
                    .bg(palette.panel_focused_bg)
                    .add_modifier(Modifier::BOLD),
            ),
            layout[0],
        );

        self.draw_header(frame, layout[1], &palette);

        let body = if self.sidebar_visible {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(0), Constraint::Length(SIDEBAR_WIDTH)])
                .split(layout[2]);
            self.draw_sidebar(frame, chunks[1], &palette);
            chunks[0]
        } else {
            layout[2]
        };
        self.draw_grid(frame, body, &palette);
        self.draw_pager(frame, layout[3], &palette);

        frame.render_widget(
            Paragraph::new(self.footer_text())
                .style(
                    Style::default()
                        .fg(palette.text_secondary)
                        .bg(palette.panel_bg)
                        .add_modifier(Modifier::ITALIC),
                )
                .alignment(Alignment::Center),
            layout[4],
        );

        if self.popup_open {
            if let Some(entry) = self.selected_entry() {
                self.draw_popup(frame, full, entry, &palette);
            }
        }
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect, palette: &Palette) {
        let focused = self.focus == Focus::Search;
        let border = if focused {
            palette.border_focused
        } else {
            palette.border_idle
        };
        let mut spans = vec![Span::styled(
            " Search ",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )];
        if self.criteria.search_text.is_empty() && !focused {
            spans.push(Span::styled(
                "press / to search entries",
                Style::default().fg(palette.text_secondary),
            ));
        } else {
            spans.push(Span::styled(
                self.criteria.search_text.clone(),
                Style::default().fg(palette.text_primary),
            ));
            if focused {
                spans.push(Span::styled("▏", Style::default().fg(palette.accent)));
            }
        }
        let mut title = format!(" Dex · {} mode ", self.theme.label());
        if let Some(category) = self.criteria.active_category() {
            title.push_str(&format!("· type: {} ", entry::capitalize(category)));
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title)
            .style(Style::default().bg(palette.panel_bg));
        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }

    fn draw_grid(&self, frame: &mut Frame<'_>, area: Rect, palette: &Palette) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if self.focus == Focus::Grid {
                palette.border_focused
            } else {
                palette.border_idle
            }))
            .style(Style::default().bg(palette.panel_bg));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let message = match self.loader.state() {
            LoadState::Idle => Some(("Press r to load the catalog.".to_string(), palette.text_secondary)),
            LoadState::Loading => Some((
                format!("{} Loading entries…", self.spinner.frame()),
                palette.text_secondary,
            )),
            LoadState::Failed(message) => Some((
                format!("{message}\n\nPress r to retry."),
                palette.error,
            )),
            LoadState::Ready(_) if self.visible.is_empty() => Some((
                "No entries match the current filters. Press c to clear them.".to_string(),
                palette.text_secondary,
            )),
            LoadState::Ready(_) => None,
        };
        if let Some((text, color)) = message {
            let y = inner.y + inner.height / 2;
            let area = Rect::new(inner.x, y.saturating_sub(1), inner.width, 3.min(inner.height));
            frame.render_widget(
                Paragraph::new(text)
                    .style(Style::default().fg(color))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let columns = grid_columns(inner.width);
        self.grid_columns.set(columns);
        let rows_visible = usize::from((inner.height / CARD_HEIGHT).max(1));
        let selected_row = self.selected / columns;
        let offset = scroll_offset(selected_row, self.grid_offset.get(), rows_visible);
        self.grid_offset.set(offset);

        let entries = self.visible_entries();
        let card_width = inner.width / columns as u16;
        for (position, entry) in entries.iter().enumerate().skip(offset * columns) {
            let row = position / columns - offset;
            if row >= rows_visible {
                break;
            }
            let col = position % columns;
            let card = Rect::new(
                inner.x + col as u16 * card_width,
                inner.y + row as u16 * CARD_HEIGHT,
                card_width,
                CARD_HEIGHT.min(inner.height.saturating_sub(row as u16 * CARD_HEIGHT)),
            );
            self.draw_card(frame, card, entry, position == self.selected, palette);
        }
    }

    fn draw_card(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        entry: &Entry,
        selected: bool,
        palette: &Palette,
    ) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if selected {
                palette.border_focused
            } else {
                palette.border_idle
            }));
        if selected {
            block = block.style(Style::default().bg(palette.panel_selected_bg));
        }
        let inner_width = usize::from(area.width.saturating_sub(2));
        let label = entry.display_label();
        let name_width = inner_width.saturating_sub(label.width() + 1);
        let title = Line::from(vec![
            Span::styled(label, Style::default().fg(palette.text_secondary)),
            Span::raw(" "),
            Span::styled(
                truncate_to_width(&entry.display_name(), name_width),
                Style::default()
                    .fg(palette.text_primary)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        let text = Text::from(vec![title, category_badges(&entry.categories)]);
        frame.render_widget(Paragraph::new(text).block(block), area);
    }

    fn draw_sidebar(&self, frame: &mut Frame<'_>, area: Rect, palette: &Palette) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border_focused))
            .title(" Type ")
            .style(Style::default().bg(palette.panel_bg));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let active = self.criteria.active_category();
        let mut lines = Vec::with_capacity(self.categories.len() + 1);
        let all_row = std::iter::once(None).chain(self.categories.iter().map(Some));
        for (idx, category) in all_row.enumerate() {
            let is_active = match category {
                Some(category) => active == Some(category.as_str()),
                None => active.is_none(),
            };
            let marker = if is_active { "●" } else { "○" };
            let mut style = Style::default().fg(palette.text_primary);
            if idx == self.sidebar_index {
                style = style
                    .bg(palette.panel_selected_bg)
                    .add_modifier(Modifier::BOLD);
            }
            let mut spans = vec![Span::styled(format!(" {marker} "), style)];
            match category {
                Some(category) => spans.push(badge(category)),
                None => spans.push(Span::styled("All types", style)),
            }
            lines.push(Line::from(spans));
        }

        let height = usize::from(inner.height.max(1));
        let skip = self.sidebar_index.saturating_sub(height.saturating_sub(1));
        let lines: Vec<Line> = lines.into_iter().skip(skip).collect();
        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_pager(&self, frame: &mut Frame<'_>, area: Rect, palette: &Palette) {
        let enabled = Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD);
        let disabled = Style::default().fg(palette.border_idle);
        let searching = matches!(
            self.loader.state(),
            LoadState::Ready(page) if matches!(page.request, LoadRequest::Search { .. })
        );
        let label = if searching {
            "Search results".to_string()
        } else {
            format!("Page {}", self.page + 1)
        };
        let line = Line::from(vec![
            Span::styled(
                "◀ Previous (p)",
                if self.page > 0 { enabled } else { disabled },
            ),
            Span::raw("   "),
            Span::styled(label, Style::default().fg(palette.text_primary)),
            Span::raw("   "),
            Span::styled("Next (n) ▶", if self.has_next { enabled } else { disabled }),
        ]);
        frame.render_widget(
            Paragraph::new(line)
                .alignment(Alignment::Center)
                .style(Style::default().bg(palette.bg)),
            area,
        );
    }

    fn draw_popup(&self, frame: &mut Frame<'_>, area: Rect, entry: &Entry, palette: &Palette) {
        let popup = centered_rect(area, 70, 80);
        frame.render_widget(Clear, popup);

        let heading = Style::default()
            .fg(palette.highlight)
            .add_modifier(Modifier::BOLD);
        let secondary = Style::default().fg(palette.text_secondary);
        let primary = Style::default().fg(palette.text_primary);

        let mut lines = vec![
            Line::from(vec![
                Span::styled(entry.display_name(), heading),
                Span::raw("  "),
                Span::styled(entry.display_label(), Style::default().fg(palette.accent)),
            ]),
            category_badges(&entry.categories),
            Line::default(),
            Line::from(Span::styled("Images", heading)),
        ];
        for (label, url) in [
            ("artwork", entry.images.artwork.as_deref()),
            ("front", entry.images.front.as_deref()),
            ("back", entry.images.back.as_deref()),
        ] {
            lines.push(Line::from(vec![
                Span::styled(format!("  {label:<8}"), secondary),
                Span::styled(url.unwrap_or("—").to_string(), primary),
            ]));
        }

        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Stats", heading)));
        for stat in &entry.stats {
            let filled = stat_bar_cells(stat.base_value, STAT_BAR_WIDTH);
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<width$}", stat.display_name(), width = STAT_NAME_WIDTH),
                    secondary,
                ),
                Span::styled(format!("{:>4} ", stat.base_value), primary),
                Span::styled("█".repeat(filled), Style::default().fg(palette.bar)),
                Span::styled(
                    "░".repeat(STAT_BAR_WIDTH - filled),
                    Style::default().fg(palette.border_idle),
                ),
                Span::styled(format!(" {:>5.1}%", stat.bar_percent()), secondary),
            ]));
        }

        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Abilities", heading)));
        let abilities = entry.display_abilities();
        if abilities.is_empty() {
            lines.push(Line::from(Span::styled("  none listed", secondary)));
        } else {
            lines.push(Line::from(Span::styled(
                format!("  {}", abilities.join(" · ")),
                primary,
            )));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border_focused))
            .title(" Details · Esc close · o open artwork ")
            .style(Style::default().bg(palette.panel_bg));
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: false }),
            popup,
        );
    }

    fn footer_text(&self) -> String {
        if self.popup_open {
            return "Esc close · o open artwork in browser · t theme".to_string();
        }
        match self.focus {
            Focus::Search => {
                "Type to filter this page · Enter search the whole catalog · Esc back".to_string()
            }
            Focus::Sidebar => "j/k choose type · Enter apply · Esc/m close".to_string(),
            Focus::Grid => {
                let mut parts = vec![
                    "h/j/k/l move",
                    "Enter details",
                    "/ search",
                    "m types",
                    "n/p page",
                    "t theme",
                ];
                if !self.criteria.is_empty() {
                    parts.push("c clear filters");
                }
                parts.push("r reload");
                parts.push("q quit");
                parts.join(" · ")
            }
        }
    }
}

fn normalize_categories(categories: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(categories.len());
    for category in categories {
        let category = category.trim().to_lowercase();
        if !category.is_empty() && !normalized.contains(&category) {
            normalized.push(category);
        }
    }
    normalized
}

fn badge(category: &str) -> Span<'static> {
    Span::styled(
        format!(" {} ", entry::capitalize(category)),
        Style::default()
            .fg(theme::category_text_color(category))
            .bg(theme::category_color(category))
            .add_modifier(Modifier::BOLD),
    )
}

fn category_badges(categories: &[String]) -> Line<'static> {
    let mut spans = Vec::with_capacity(categories.len() * 2);
    for (idx, category) in categories.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(badge(category));
    }
    Line::from(spans)
}

fn grid_columns(width: u16) -> usize {
    usize::from((width / CARD_WIDTH).max(1))
}

/// Keeps `selected_row` inside a window of `visible_rows` starting at the
/// returned offset, moving the window as little as possible.
fn scroll_offset(selected_row: usize, offset: usize, visible_rows: usize) -> usize {
    let visible_rows = visible_rows.max(1);
    if selected_row < offset {
        selected_row
    } else if selected_row >= offset + visible_rows {
        selected_row + 1 - visible_rows
    } else {
        offset
    }
}

fn stat_bar_cells(base_value: u32, width: usize) -> usize {
    let cells = (entry::stat_bar_percent(base_value) / 100.0 * width as f64).round() as usize;
    cells.min(width)
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let width = area.width.saturating_mul(percent_x) / 100;
    let height = area.height.saturating_mul(percent_y) / 100;
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_entries, MockCatalogService};
    use crate::loader::LoaderSettings;

    fn model_with(settings: LoaderSettings) -> Model {
        let loader = Loader::new(Arc::new(MockCatalogService::default()), settings);
        let mut model = Model::new(Options {
            loader,
            categories: theme::KNOWN_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            fetch_categories: false,
            theme: Theme::Dark,
            status_message: String::new(),
        });
        settle(&mut model);
        model
    }

    fn settle(model: &mut Model) {
        while model.loader.is_loading() {
            let response = model
                .load_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("load response");
            model.handle_load_response(response);
        }
    }

    fn visible_names(model: &Model) -> Vec<String> {
        model
            .visible_entries()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    #[test]
    fn initial_load_fills_first_page() {
        let model = model_with(LoaderSettings {
            page_size: 4,
            category_window: 50,
        });
        assert_eq!(
            visible_names(&model),
            vec!["bulbasaur", "charmander", "charizard", "squirtle"]
        );
        assert!(model.has_next);
    }

    #[test]
    fn typing_in_search_filters_locally() {
        let mut model = model_with(LoaderSettings::default());
        model.handle_key(KeyCode::Char('/')).unwrap();
        for ch in "CHAR".chars() {
            model.handle_key(KeyCode::Char(ch)).unwrap();
        }
        assert_eq!(model.focus, Focus::Search);
        assert!(!model.loader.is_loading());
        assert_eq!(visible_names(&model), vec!["charmander", "charizard"]);

        model.handle_key(KeyCode::Backspace).unwrap();
        assert_eq!(model.criteria.search_text, "CHA");
        model.handle_key(KeyCode::Esc).unwrap();
        assert_eq!(model.focus, Focus::Grid);
    }

    #[test]
    fn enter_in_search_runs_catalog_search() {
        let mut model = model_with(LoaderSettings {
            page_size: 2,
            category_window: 50,
        });
        model.on_search_text_change("mew");
        assert!(visible_names(&model).is_empty());
        model.focus = Focus::Search;
        model.handle_key(KeyCode::Enter).unwrap();
        settle(&mut model);
        assert_eq!(visible_names(&model), vec!["mewtwo"]);
        assert!(!model.has_next);
    }

    #[test]
    fn search_from_later_page_resets_pager() {
        let mut model = model_with(LoaderSettings {
            page_size: 3,
            category_window: 50,
        });
        model.on_page_change(1);
        settle(&mut model);
        assert_eq!(model.page, 1);

        model.on_search_text_change("pika");
        model.focus = Focus::Search;
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.page, 0);
        assert!(!model.has_next);
        settle(&mut model);
        assert_eq!(visible_names(&model), vec!["pikachu"]);

        model.on_page_change(-1);
        assert!(!model.loader.is_loading());
        assert!(model.status_message.contains("first page"));
        model.on_page_change(1);
        assert!(!model.loader.is_loading());
        assert_eq!(model.page, 0);
    }

    #[test]
    fn category_selection_reloads_from_first_page() {
        let mut model = model_with(LoaderSettings {
            page_size: 3,
            category_window: 100,
        });
        model.on_page_change(1);
        settle(&mut model);
        assert_eq!(model.page, 1);

        model.on_category_select(Some("Electric".into()));
        assert_eq!(model.page, 0);
        assert!(model.loader.is_loading());
        settle(&mut model);
        assert_eq!(visible_names(&model), vec!["pikachu", "magnemite"]);
    }

    #[test]
    fn sidebar_enter_applies_highlighted_category() {
        let mut model = model_with(LoaderSettings::default());
        model.handle_key(KeyCode::Char('m')).unwrap();
        assert!(model.sidebar_visible);
        assert_eq!(model.sidebar_index, 0);
        // "bug" is the first category after the "All" row
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        settle(&mut model);
        assert_eq!(model.criteria.category.as_deref(), Some("bug"));
        assert_eq!(visible_names(&model), vec!["scyther", "shuckle"]);
        assert!(!model.sidebar_visible);
    }

    #[test]
    fn page_bounds_are_respected() {
        let mut model = model_with(LoaderSettings {
            page_size: 20,
            category_window: 200,
        });
        model.on_page_change(-1);
        assert_eq!(model.page, 0);
        assert!(!model.loader.is_loading());

        model.on_page_change(1);
        settle(&mut model);
        assert_eq!(model.page, 1);
        assert!(!model.has_next);
        model.on_page_change(1);
        assert_eq!(model.page, 1);
        assert!(!model.loader.is_loading());
    }

    #[test]
    fn clear_resets_search_and_category() {
        let mut model = model_with(LoaderSettings::default());
        model.on_category_select(Some("fire".into()));
        settle(&mut model);
        model.on_search_text_change("zard");
        assert_eq!(visible_names(&model), vec!["charizard"]);

        model.handle_key(KeyCode::Char('c')).unwrap();
        settle(&mut model);
        assert!(model.criteria.is_empty());
        assert_eq!(model.visible.len(), sample_entries().len().min(20));
    }

    #[test]
    fn popup_opens_on_selected_entry() {
        let mut model = model_with(LoaderSettings::default());
        model.grid_columns.set(3);
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Char('l')).unwrap();
        assert_eq!(model.selected, 4);
        model.handle_key(KeyCode::Enter).unwrap();
        assert!(model.popup_open);
        assert_eq!(model.selected_entry().map(|e| e.id), Some(25));
        model.handle_key(KeyCode::Esc).unwrap();
        assert!(!model.popup_open);
    }

    #[test]
    fn theme_toggle_flips_palette() {
        let mut model = model_with(LoaderSettings::default());
        model.handle_key(KeyCode::Char('t')).unwrap();
        assert_eq!(model.theme, Theme::Light);
        assert!(model.status_message.contains("light"));
    }

    #[test]
    fn stale_category_response_is_ignored() {
        let mut model = model_with(LoaderSettings::default());
        model.pending_categories = Some(PendingCategories { request_id: 7 });
        model.handle_async_response(AsyncResponse::Categories {
            request_id: 6,
            result: Ok(vec!["shadow".into()]),
        });
        assert!(model.pending_categories.is_some());
        model.handle_async_response(AsyncResponse::Categories {
            request_id: 7,
            result: Ok(vec!["Fire".into(), "water".into(), "fire".into()]),
        });
        assert!(model.pending_categories.is_none());
        assert_eq!(model.categories, vec!["fire", "water"]);
    }

    #[test]
    fn grid_math() {
        assert_eq!(grid_columns(10), 1);
        assert_eq!(grid_columns(CARD_WIDTH * 3 + 5), 3);
        assert_eq!(scroll_offset(0, 0, 4), 0);
        assert_eq!(scroll_offset(5, 0, 4), 2);
        assert_eq!(scroll_offset(1, 3, 4), 1);
        assert_eq!(scroll_offset(4, 2, 4), 2);
    }

    #[test]
    fn stat_bar_cells_scale_with_width() {
        assert_eq!(stat_bar_cells(128, 20), 10);
        assert_eq!(stat_bar_cells(255, 30), 30);
        assert_eq!(stat_bar_cells(999, 30), 30);
        assert_eq!(stat_bar_cells(0, 30), 0);
    }

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate_to_width("Pikachu", 10), "Pikachu");
        assert_eq!(truncate_to_width("Crabominable", 6), "Crabo…");
        assert_eq!(truncate_to_width("Crabominable", 0), "");
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(area, 70, 80);
        assert_eq!(popup, Rect::new(15, 4, 70, 32));
    }
}
