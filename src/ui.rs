use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;

use crate::promotion::{Promotion, PromotionState};
use crate::ranking::RankedList;
use crate::share::{share_text, MessageSender, SHARE_CMD_ENV};
use crate::store::Store;
use crate::watchlist::WatchList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    WatchList,
    Ranked,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::WatchList => Page::Ranked,
            Page::Ranked => Page::WatchList,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::WatchList => "Watch List",
            Page::Ranked => "Ranked Movies",
        }
    }
}

/// What keystrokes currently mean.
pub enum Mode {
    Browse,
    /// Typing a new watch-list title.
    AddingTitle { input: String },
    /// Detail dialog for one title, driving the promotion flow.
    Detail {
        promotion: Promotion,
        rank_pick: usize,
    },
    /// Editing the title of the ranked entry at `rank`.
    Relabel { rank: usize, input: String },
}

pub struct App {
    pub watch_list: WatchList,
    pub ranked: RankedList,
    pub store: Store,
    pub sender: Option<Box<dyn MessageSender>>,
    pub current_page: Page,
    pub mode: Mode,
    pub watch_state: ListState,
    pub ranked_state: ListState,
    pub status: String,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        store: Store,
        watch_list: WatchList,
        ranked: RankedList,
        sender: Option<Box<dyn MessageSender>>,
    ) -> Self {
        let mut watch_state = ListState::default();
        if !watch_list.is_empty() {
            watch_state.select(Some(0));
        }
        let mut ranked_state = ListState::default();
        if !ranked.is_empty() {
            ranked_state.select(Some(0));
        }

        Self {
            watch_list,
            ranked,
            store,
            sender,
            current_page: Page::WatchList,
            mode: Mode::Browse,
            watch_state,
            ranked_state,
            status: "Welcome back".to_string(),
            should_quit: false,
        }
    }

    fn page_len(&self) -> usize {
        match self.current_page {
            Page::WatchList => self.watch_list.len(),
            Page::Ranked => self.ranked.len(),
        }
    }

    fn page_state(&mut self) -> &mut ListState {
        match self.current_page {
            Page::WatchList => &mut self.watch_state,
            Page::Ranked => &mut self.ranked_state,
        }
    }

    pub fn select_next(&mut self) {
        let len = self.page_len();
        if len == 0 {
            return;
        }
        let state = self.page_state();
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        let len = self.page_len();
        if len == 0 {
            return;
        }
        let state = self.page_state();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    fn clamp_selections(&mut self) {
        Self::clamp(&mut self.watch_state, self.watch_list.len());
        Self::clamp(&mut self.ranked_state, self.ranked.len());
    }

    fn clamp(state: &mut ListState, len: usize) {
        if len == 0 {
            state.select(None);
        } else {
            match state.selected() {
                Some(i) if i >= len => state.select(Some(len - 1)),
                None => state.select(Some(0)),
                _ => {}
            }
        }
    }

    /// Write both collections through the store. A failed save keeps
    /// the session alive on in-memory state and tells the user.
    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.watch_list, &self.ranked) {
            tracing::warn!(error = %e, "save failed, in-memory state kept for this session");
            self.status = format!("Save failed: {e} (changes kept for this session)");
        }
    }

    fn share(&mut self) {
        let body = share_text(&self.ranked);
        match &self.sender {
            Some(sender) if sender.can_send() => match sender.send(&body) {
                Ok(()) => self.status = "Ranking shared".to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, "share failed");
                    self.status = format!("Share failed: {e}");
                }
            },
            _ => self.status = format!("Sharing not configured (set {SHARE_CMD_ENV})"),
        }
    }

    /// Single entry point for keystrokes; the event loop is a thin
    /// read-and-dispatch shell around this.
    pub fn handle_key(&mut self, code: KeyCode) {
        match &mut self.mode {
            Mode::Browse => self.handle_browse_key(code),
            Mode::AddingTitle { input } => match code {
                KeyCode::Char(c) => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Enter => {
                    let title = input.trim().to_string();
                    self.mode = Mode::Browse;
                    if title.is_empty() {
                        self.status = "Nothing added".to_string();
                    } else {
                        self.watch_list.push(title.clone());
                        self.watch_state.select(Some(self.watch_list.len() - 1));
                        self.persist();
                        self.status = format!("Added '{title}' to the watch list");
                    }
                }
                KeyCode::Esc => {
                    self.mode = Mode::Browse;
                    self.status = "Cancelled".to_string();
                }
                _ => {}
            },
            Mode::Detail {
                promotion,
                rank_pick,
            } => {
                let max_rank = self.ranked.len() + 1;
                match (promotion.state(), code) {
                    (_, KeyCode::Esc) => {
                        promotion.cancel();
                        self.mode = Mode::Browse;
                        self.status = "Cancelled".to_string();
                    }
                    (PromotionState::DetailOpen, KeyCode::Char('w')) => {
                        promotion.mark_watched();
                        self.status =
                            "Marked as watched, pick a rank".to_string();
                    }
                    (PromotionState::MarkedWatched, KeyCode::Up) => {
                        *rank_pick = rank_pick.saturating_sub(1).max(1);
                    }
                    (PromotionState::MarkedWatched, KeyCode::Down) => {
                        *rank_pick = (*rank_pick + 1).min(max_rank);
                    }
                    (PromotionState::MarkedWatched, KeyCode::Enter) => {
                        let pick = *rank_pick;
                        let mut promotion = promotion.clone();
                        let outcome = match promotion.assign_rank(pick, self.ranked.len()) {
                            Ok(()) => promotion.confirm(&mut self.watch_list, &mut self.ranked),
                            Err(e) => Err(e),
                        };
                        match outcome {
                            Ok(rank) => {
                                let title = promotion.title().to_string();
                                self.mode = Mode::Browse;
                                self.current_page = Page::Ranked;
                                self.ranked_state.select(Some(rank - 1));
                                self.clamp_selections();
                                self.persist();
                                self.status = format!("Promoted '{title}' to rank {rank}");
                            }
                            Err(e) => {
                                self.mode = Mode::Browse;
                                self.status = format!("Could not promote: {e}");
                            }
                        }
                    }
                    _ => {}
                }
            }
            Mode::Relabel { rank, input } => match code {
                KeyCode::Char(c) => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Enter => {
                    let rank = *rank;
                    let title = input.trim().to_string();
                    self.mode = Mode::Browse;
                    if title.is_empty() {
                        self.status = "Title unchanged".to_string();
                    } else {
                        match self.ranked.relabel(rank, title.clone()) {
                            Ok(()) => {
                                self.persist();
                                self.status = format!("Rank {rank} is now '{title}'");
                            }
                            Err(e) => self.status = format!("Edit failed: {e}"),
                        }
                    }
                }
                KeyCode::Esc => {
                    self.mode = Mode::Browse;
                    self.status = "Cancelled".to_string();
                }
                _ => {}
            },
        }
    }

    fn handle_browse_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => {
                self.current_page = self.current_page.next();
                self.clamp_selections();
            }
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            KeyCode::Home => {
                if self.page_len() > 0 {
                    self.page_state().select(Some(0));
                }
            }
            KeyCode::End => {
                let len = self.page_len();
                if len > 0 {
                    self.page_state().select(Some(len - 1));
                }
            }
            KeyCode::Char('a') if self.current_page == Page::WatchList => {
                self.mode = Mode::AddingTitle {
                    input: String::new(),
                };
                self.status = "Type a movie title, Enter to add, Esc to cancel".to_string();
            }
            KeyCode::Char('d') if self.current_page == Page::WatchList => {
                if let Some(i) = self.watch_state.selected() {
                    if let Some(title) = self.watch_list.remove_at(i) {
                        self.clamp_selections();
                        self.persist();
                        self.status = format!("Removed '{title}' from the watch list");
                    }
                }
            }
            KeyCode::Enter if self.current_page == Page::WatchList => {
                if let Some(i) = self.watch_state.selected() {
                    if let Some(title) = self.watch_list.titles().get(i) {
                        self.mode = Mode::Detail {
                            promotion: Promotion::open(title.clone()),
                            rank_pick: 1,
                        };
                        self.status = "w: mark watched  Esc: cancel".to_string();
                    }
                }
            }
            KeyCode::Char('e') if self.current_page == Page::Ranked => {
                if let Some(i) = self.ranked_state.selected() {
                    let rank = i + 1;
                    if let Some(title) = self.ranked.title_at(rank) {
                        self.mode = Mode::Relabel {
                            rank,
                            input: title.to_string(),
                        };
                        self.status = "Edit the title, Enter to save, Esc to cancel".to_string();
                    }
                }
            }
            KeyCode::Char('d') if self.current_page == Page::Ranked => {
                if let Some(i) = self.ranked_state.selected() {
                    match self.ranked.remove_at(i + 1) {
                        Ok(Some(title)) => {
                            self.clamp_selections();
                            self.persist();
                            self.status = format!("Removed '{title}', ranks closed up");
                        }
                        Ok(None) => {}
                        Err(e) => self.status = format!("Delete failed: {e}"),
                    }
                }
            }
            KeyCode::Char('s') if self.current_page == Page::Ranked => self.share(),
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            app.handle_key(key.code);
            if app.should_quit {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with page tabs
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::WatchList => render_watch_list(f, chunks[1], app),
        Page::Ranked => render_ranked(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);

    match &app.mode {
        Mode::AddingTitle { input } => render_input_dialog(f, "Add a Movie", input),
        Mode::Relabel { rank, input } => {
            render_input_dialog(f, &format!("Edit Rank {rank}"), input)
        }
        Mode::Detail {
            promotion,
            rank_pick,
        } => render_detail_dialog(f, app, promotion, *rank_pick),
        Mode::Browse => {}
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::WatchList, Page::Ranked];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("To watch: {}", app.watch_list.len()),
        Style::default().fg(Color::Cyan),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Ranked: {}", app.ranked.len()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_watch_list(f: &mut Frame, area: Rect, app: &mut App) {
    let width = (area.width as usize).saturating_sub(4);
    let items: Vec<ListItem> = app
        .watch_list
        .titles()
        .iter()
        .map(|title| ListItem::new(truncate(title, width)))
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Watch List"))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut app.watch_state);
}

fn render_ranked(f: &mut Frame, area: Rect, app: &mut App) {
    let width = (area.width as usize).saturating_sub(9);
    let items: Vec<ListItem> = app
        .ranked
        .entries()
        .iter()
        .map(|entry| {
            let line = Line::from(vec![
                Span::styled(
                    format!("{:>3}. ", entry.rank),
                    Style::default().fg(Color::Green),
                ),
                Span::raw(truncate(&entry.title, width)),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Ranked Movies"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut app.ranked_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let hints = match (&app.mode, app.current_page) {
        (Mode::Browse, Page::WatchList) => "a add · Enter detail · d delete · Tab page · q quit",
        (Mode::Browse, Page::Ranked) => "e edit · d delete · s share · Tab page · q quit",
        _ => "Enter confirm · Esc cancel",
    };

    let line = Line::from(vec![
        Span::styled(app.status.as_str(), Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);

    let bar = Paragraph::new(vec![line]).block(Block::default().borders(Borders::ALL));
    f.render_widget(bar, area);
}

fn render_input_dialog(f: &mut Frame, title: &str, input: &str) {
    let area = centered_rect(60, 20, f.size());
    f.render_widget(Clear, area);

    let body = Paragraph::new(format!("{input}_")).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(body, area);
}

fn render_detail_dialog(f: &mut Frame, app: &App, promotion: &Promotion, rank_pick: usize) {
    let area = centered_rect(60, 40, f.size());
    f.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            promotion.title().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    match promotion.state() {
        PromotionState::DetailOpen => {
            lines.push(Line::from("Not watched yet."));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "w: mark as watched    Esc: cancel",
                Style::default().fg(Color::DarkGray),
            )));
        }
        PromotionState::MarkedWatched => {
            lines.push(Line::from(format!(
                "Rank: {rank_pick}  (1..{})",
                app.ranked.len() + 1
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Up/Down: pick rank    Enter: promote    Esc: cancel",
                Style::default().fg(Color::DarkGray),
            )));
        }
        _ => {}
    }

    let dialog = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Movie Detail")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(dialog, area);
}

/// Centered sub-rectangle taking the given percentages of the frame.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::MissingRankPolicy;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn app_with(watch: &[&str], ranked: &[&str]) -> App {
        let store = Store::open_in_memory().unwrap();
        let watch_list = WatchList::from_titles(watch.iter().map(|s| s.to_string()).collect());
        let ranked = RankedList::from_titles(
            ranked.iter().map(|s| s.to_string()).collect(),
            MissingRankPolicy::Ignore,
        );
        App::new(store, watch_list, ranked, None)
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_add_title_flow_persists() {
        let mut app = app_with(&[], &[]);

        app.handle_key(KeyCode::Char('a'));
        type_str(&mut app, "Dune");
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.watch_list.titles(), &["Dune".to_string()]);
        let (watch, _) = app.store.load(MissingRankPolicy::Ignore).unwrap();
        assert_eq!(watch.titles(), &["Dune".to_string()]);
    }

    #[test]
    fn test_add_blank_title_is_rejected() {
        let mut app = app_with(&[], &[]);

        app.handle_key(KeyCode::Char('a'));
        type_str(&mut app, "   ");
        app.handle_key(KeyCode::Enter);

        assert!(app.watch_list.is_empty());
    }

    #[test]
    fn test_promotion_flow_moves_title_and_switches_page() {
        let mut app = app_with(&["A", "B"], &[]);

        app.handle_key(KeyCode::Enter); // open detail for "A"
        app.handle_key(KeyCode::Char('w')); // mark watched
        app.handle_key(KeyCode::Enter); // confirm at rank 1

        assert_eq!(app.watch_list.titles(), &["B".to_string()]);
        assert_eq!(app.ranked.title_at(1), Some("A"));
        assert_eq!(app.current_page, Page::Ranked);
        assert!(matches!(app.mode, Mode::Browse));

        let (watch, ranked) = app.store.load(MissingRankPolicy::Ignore).unwrap();
        assert_eq!(watch.titles(), &["B".to_string()]);
        assert_eq!(ranked.title_at(1), Some("A"));
    }

    #[test]
    fn test_promotion_rank_pick_is_clamped() {
        let mut app = app_with(&["New"], &["First", "Second"]);

        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Char('w'));
        for _ in 0..10 {
            app.handle_key(KeyCode::Down);
        }
        app.handle_key(KeyCode::Enter);

        // Clamped to N+1 = 3
        assert_eq!(app.ranked.title_at(3), Some("New"));
        assert!(app.watch_list.is_empty());
    }

    #[test]
    fn test_detail_cancel_leaves_collections_alone() {
        let mut app = app_with(&["A"], &[]);

        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Char('w'));
        app.handle_key(KeyCode::Esc);

        assert_eq!(app.watch_list.len(), 1);
        assert!(app.ranked.is_empty());
        assert!(matches!(app.mode, Mode::Browse));
    }

    #[test]
    fn test_delete_ranked_closes_ranks() {
        let mut app = app_with(&[], &["A", "B", "C"]);
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Down); // select rank 2

        app.handle_key(KeyCode::Char('d'));

        assert_eq!(app.ranked.title_at(1), Some("A"));
        assert_eq!(app.ranked.title_at(2), Some("C"));
        assert_eq!(app.ranked.len(), 2);
    }

    #[test]
    fn test_relabel_flow_keeps_rank() {
        let mut app = app_with(&[], &["A", "B"]);
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Down); // rank 2

        app.handle_key(KeyCode::Char('e'));
        if let Mode::Relabel { input, .. } = &mut app.mode {
            input.clear();
        }
        type_str(&mut app, "B2");
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.ranked.title_at(2), Some("B2"));
        assert_eq!(app.ranked.len(), 2);
    }

    #[test]
    fn test_share_without_sender_reports_not_configured() {
        let mut app = app_with(&[], &["A"]);
        app.handle_key(KeyCode::Tab);

        app.handle_key(KeyCode::Char('s'));

        assert!(app.status.contains("REELRANK_SHARE_CMD"));
    }

    struct RecordingSender {
        sent: Rc<RefCell<Vec<String>>>,
    }

    impl MessageSender for RecordingSender {
        fn can_send(&self) -> bool {
            true
        }

        fn send(&self, body: &str) -> Result<()> {
            self.sent.borrow_mut().push(body.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_share_hands_formatted_body_to_sender() {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let mut app = app_with(&[], &["Heat", "Ran"]);
        app.sender = Some(Box::new(RecordingSender { sent: sent.clone() }));
        app.handle_key(KeyCode::Tab);

        app.handle_key(KeyCode::Char('s'));

        assert_eq!(
            sent.borrow().as_slice(),
            &["My Movies Ranked:\n1. Heat\n2. Ran".to_string()]
        );
        assert_eq!(app.status, "Ranking shared");
    }

    #[test]
    fn test_delete_last_watch_item_clears_selection() {
        let mut app = app_with(&["A"], &[]);

        app.handle_key(KeyCode::Char('d'));

        assert!(app.watch_list.is_empty());
        assert_eq!(app.watch_state.selected(), None);
    }
}
