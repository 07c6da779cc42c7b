use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use pod_racer::{
    api::{
        Racer,
        Track,
    },
    lifecycle::LifecycleState,
    render::{
        LeaderboardRow,
        Region,
        Renderer,
        View,
    },
    selection::SelectionState,
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::{
    cell::{
        Ref,
        RefCell,
    },
    io::stdout,
    rc::Rc,
};
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

pub enum UserEvent {
    Quit,
    Redraw,
    SelectTrack(u32),
    SelectRacer(u32),
    StartRace,
    Accelerate,
    NewRace,
}

/// Everything the race views have put on screen.
#[derive(Debug, Default)]
pub struct Screen {
    tracks: Vec<Track>,
    racers: Vec<Racer>,
    race: Option<View>,
    leaderboard: Option<View>,
    accelerate: Option<View>,
    dirty: bool,
}

impl Screen {
    fn apply(&mut self, region: Region, view: View) {
        match (region, view) {
            (Region::Tracks, View::Tracks(tracks)) => self.tracks = tracks,
            (Region::Racers, View::Racers(racers)) => self.racers = racers,
            (Region::Race, view @ View::RaceStart { .. }) => {
                if let View::RaceStart { countdown, .. } = &view {
                    self.leaderboard = Some(View::Countdown(*countdown));
                }
                self.accelerate = None;
                self.race = Some(view);
            }
            (Region::Race, view) => self.race = Some(view),
            (Region::LeaderBoard, view) => self.leaderboard = Some(view),
            (Region::Accelerate, view) => self.accelerate = Some(view),
            (region, view) => {
                tracing::debug!(?region, ?view, "view does not fit region, ignoring");
                return;
            }
        }
        self.dirty = true;
    }

    pub fn clear_race(&mut self) {
        self.race = None;
        self.leaderboard = None;
        self.accelerate = None;
        self.dirty = true;
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

/// Screen handle shared between the race lifecycle and the draw loop.
#[derive(Clone, Debug, Default)]
pub struct SharedScreen(Rc<RefCell<Screen>>);

impl SharedScreen {
    pub fn borrow(&self) -> Ref<'_, Screen> {
        self.0.borrow()
    }

    pub fn clear_race(&self) {
        self.0.borrow_mut().clear_race();
    }

    pub fn take_dirty(&self) -> bool {
        self.0.borrow_mut().take_dirty()
    }
}

impl Renderer for SharedScreen {
    fn render_at(&self, region: Region, view: View) -> Result<()> {
        let mut screen = self
            .0
            .try_borrow_mut()
            .map_err(|_| eyre!("screen is being drawn"))?;
        screen.apply(region, view);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Focus {
    #[default]
    Tracks,
    Racers,
}

#[derive(Debug, Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    focus: Focus,
    track_idx: usize,
    racer_idx: usize,
    notice: Option<String>,
}

impl UiState {
    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<Event>;

/// Forwards terminal input from a blocking reader thread.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(ev) => {
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(?err, "terminal input read failed");
                    break;
                }
            }
        }
    });
    rx
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    events
        .recv()
        .await
        .ok_or_else(|| eyre!("terminal input stream closed"))
}

pub fn interpret_event(
    state: &mut UiState,
    screen: &Screen,
    event: Event,
) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) => k,
        Event::Resize(_, _) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    match k.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(UserEvent::Quit),
        KeyCode::Char(' ') => Some(UserEvent::Accelerate),
        KeyCode::Char('s') => Some(UserEvent::StartRace),
        KeyCode::Char('n') => Some(UserEvent::NewRace),
        _ if screen.race.is_some() => None,
        KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
            state.focus = match state.focus {
                Focus::Tracks => Focus::Racers,
                Focus::Racers => Focus::Tracks,
            };
            Some(UserEvent::Redraw)
        }
        KeyCode::Up | KeyCode::Char('k') => {
            let idx = focused_idx(state);
            *idx = idx.saturating_sub(1);
            Some(UserEvent::Redraw)
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let len = match state.focus {
                Focus::Tracks => screen.tracks.len(),
                Focus::Racers => screen.racers.len(),
            };
            let idx = focused_idx(state);
            if *idx + 1 < len {
                *idx += 1;
            }
            Some(UserEvent::Redraw)
        }
        KeyCode::Enter => match state.focus {
            Focus::Tracks => screen
                .tracks
                .get(state.track_idx)
                .map(|t| UserEvent::SelectTrack(t.id)),
            Focus::Racers => screen
                .racers
                .get(state.racer_idx)
                .map(|r| UserEvent::SelectRacer(r.id)),
        },
        _ => None,
    }
}

fn focused_idx(state: &mut UiState) -> &mut usize {
    match state.focus {
        Focus::Tracks => &mut state.track_idx,
        Focus::Racers => &mut state.racer_idx,
    }
}

pub fn draw(
    state: &mut UiState,
    screen: &Screen,
    lifecycle: &LifecycleState,
    selection: &SelectionState,
) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        let res = term
            .draw(|f| ui(f, state, screen, lifecycle, selection))
            .map(|_| ());
        state.terminal = Some(term);
        res?;
    }
    Ok(())
}

fn ui(
    f: &mut Frame,
    state: &UiState,
    screen: &Screen,
    lifecycle: &LifecycleState,
    selection: &SelectionState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(f.area());

    match &screen.race {
        None => match &screen.accelerate {
            Some(View::Error(message)) => {
                let parts = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(3), Constraint::Length(5)])
                    .split(chunks[0]);
                draw_selection(f, parts[0], state, screen, selection);
                f.render_widget(
                    error_prompt(message).block(Block::bordered().title("Race")),
                    parts[1],
                );
            }
            _ => draw_selection(f, chunks[0], state, screen, selection),
        },
        Some(View::RaceStart { track, .. }) => draw_race(f, chunks[0], track, screen),
        Some(View::Results(rows)) => draw_results(f, chunks[0], rows),
        Some(_) => {}
    }
    draw_bottom(f, chunks[1], state, lifecycle);
}

fn error_prompt(message: &str) -> Paragraph<'static> {
    Paragraph::new(vec![
        Line::from(message.to_string()).style(Style::default().fg(Color::Red)),
        Line::from(""),
        Line::from("Press n to start a new race"),
    ])
}

fn draw_selection(
    f: &mut Frame,
    area: Rect,
    state: &UiState,
    screen: &Screen,
    selection: &SelectionState,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let track_items: Vec<ListItem> = screen
        .tracks
        .iter()
        .map(|t| card_item(&t.name, selection.track_id() == Some(t.id)))
        .collect();
    draw_card_list(
        f,
        cols[0],
        "Tracks",
        "Loading Tracks...",
        track_items,
        state.focus == Focus::Tracks,
        state.track_idx,
    );

    let racer_items: Vec<ListItem> = screen
        .racers
        .iter()
        .map(|r| {
            let label = format!(
                "{}  speed {}  accel {}  handling {}",
                r.driver_name, r.top_speed, r.acceleration, r.handling
            );
            card_item(&label, selection.racer_id() == Some(r.id))
        })
        .collect();
    draw_card_list(
        f,
        cols[1],
        "Racers",
        "Loading Racers...",
        racer_items,
        state.focus == Focus::Racers,
        state.racer_idx,
    );
}

fn card_item(label: &str, selected: bool) -> ListItem<'static> {
    if selected {
        ListItem::new(format!("* {label}")).style(Style::default().fg(Color::Green))
    } else {
        ListItem::new(format!("  {label}"))
    }
}

fn draw_card_list(
    f: &mut Frame,
    area: Rect,
    title: &str,
    placeholder: &str,
    items: Vec<ListItem>,
    focused: bool,
    cursor: usize,
) {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::bordered().title(title.to_string()).border_style(border);
    if items.is_empty() {
        f.render_widget(Paragraph::new(placeholder.to_string()).block(block), area);
        return;
    }
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default();
    list_state.select(Some(cursor));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_race(f: &mut Frame, area: Rect, track: &Track, screen: &Screen) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);
    let header = Paragraph::new(format!("Race: {}", track.name))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::bordered());
    f.render_widget(header, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    match &screen.leaderboard {
        Some(View::Countdown(n)) => {
            let text = vec![
                Line::from("Race Starts In..."),
                Line::from(""),
                Line::from(n.to_string()).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            ];
            f.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .block(Block::bordered().title("Leaderboard")),
                cols[0],
            );
        }
        Some(View::Leaderboard(rows)) => draw_leaderboard(f, cols[0], "Leaderboard", rows),
        _ => f.render_widget(Block::bordered().title("Leaderboard"), cols[0]),
    }

    let accelerate = match &screen.accelerate {
        Some(View::Error(message)) => error_prompt(message),
        _ => Paragraph::new(vec![
            Line::from("Directions").style(Style::default().add_modifier(Modifier::BOLD)),
            Line::from(""),
            Line::from("Press SPACE as fast as you can to make your racer go faster!"),
        ]),
    };
    f.render_widget(
        accelerate
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title("Accelerate")),
        cols[1],
    );
}

fn draw_results(f: &mut Frame, area: Rect, rows: &[LeaderboardRow]) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    draw_leaderboard(f, parts[0], "Race Results", rows);
    f.render_widget(
        Paragraph::new("Press n to start a new race").alignment(Alignment::Center),
        parts[1],
    );
}

fn draw_leaderboard(f: &mut Frame, area: Rect, title: &str, rows: &[LeaderboardRow]) {
    let name_width = rows
        .iter()
        .map(|r| r.driver_name.width())
        .max()
        .unwrap_or(0)
        .max(6) as u16;
    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            let style = if r.is_player {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format!("{}", r.rank)),
                Cell::from(r.driver_name.clone()),
                Cell::from(format!("{:.0}", r.segment)),
            ])
            .style(style)
        })
        .collect();
    let table = Table::new(
        table_rows,
        [
            Constraint::Length(4),
            Constraint::Length(name_width),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["#", "Racer", "Segment"])
            .style(Style::default().add_modifier(Modifier::UNDERLINED)),
    )
    .block(Block::bordered().title(title.to_string()));
    f.render_widget(table, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, state: &UiState, lifecycle: &LifecycleState) {
    let help = "Tab switch list | Up/Down move | Enter select | s start | SPACE accelerate | n new race | q quit";
    let line = match &state.notice {
        Some(notice) => Line::from(vec![
            Span::styled(format!("[{}] ", lifecycle.label()), Style::default().fg(Color::Cyan)),
            Span::styled(notice.clone(), Style::default().fg(Color::Red)),
        ]),
        None => Line::from(vec![
            Span::styled(format!("[{}] ", lifecycle.label()), Style::default().fg(Color::Cyan)),
            Span::raw(help),
        ]),
    };
    f.render_widget(Paragraph::new(line).block(Block::bordered()), area);
}
