use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mxcw_bridge::{
    commands, BridgeConfig, LinkStatus, MxcwClient, Receiver, Seat, SeatChoice, StateReceiver,
    StateUpdate, ValueFormat,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;

struct App {
    client: MxcwClient,
    updates: StateReceiver,
    link: LinkStatus,
    receiver: Receiver,
    seats: Vec<(SeatChoice, Seat)>,
    selected_seat_index: usize,
    status_message: String,
    dirty: bool,
}

impl App {
    fn new(client: MxcwClient) -> Self {
        let updates = client.subscribe();
        Self {
            client,
            updates,
            link: LinkStatus::Connecting,
            receiver: Receiver::default(),
            seats: Vec::new(),
            selected_seat_index: 0,
            status_message: "Connecting...".to_string(),
            dirty: true,
        }
    }

    fn select_next(&mut self) {
        if !self.seats.is_empty() {
            self.selected_seat_index = (self.selected_seat_index + 1) % self.seats.len();
        }
    }

    fn select_previous(&mut self) {
        if !self.seats.is_empty() {
            if self.selected_seat_index == 0 {
                self.selected_seat_index = self.seats.len() - 1;
            } else {
                self.selected_seat_index -= 1;
            }
        }
    }

    /// Drain pending notifications; snapshots are refetched once per batch
    fn handle_state_updates(&mut self) {
        loop {
            match self.updates.try_recv() {
                Ok(Some(StateUpdate::Status(status))) => {
                    self.status_message = match &status {
                        LinkStatus::Connecting => "Connecting...".to_string(),
                        LinkStatus::Ok => "Connected. m mute, +/- volume, j/k select, q quit".to_string(),
                        LinkStatus::ConnectionFailure(e) => format!("Connection failed: {}", e),
                        LinkStatus::Disconnected(e) => format!("Disconnected: {}", e),
                    };
                    self.link = status;
                    self.dirty = true;
                }
                Ok(Some(_)) => self.dirty = true,
                Ok(None) => break,
                Err(e) => {
                    // Lagged; a full refresh catches up
                    tracing::debug!("Update stream: {}", e);
                    self.dirty = true;
                    break;
                }
            }
        }
    }

    async fn refresh(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        self.receiver = self.client.receiver().await?;

        let mut seats = Vec::new();
        for choice in self.client.seat_choices(false).await? {
            let seat = self.client.seat(choice.id).await?;
            seats.push((choice, seat));
        }
        self.seats = seats;
        if self.selected_seat_index >= self.seats.len() {
            self.selected_seat_index = 0;
        }
        Ok(())
    }

    fn toggle_mute(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mute = !self.receiver.global_mute.is("ON");
        self.client.send(&commands::global_mute(mute))?;
        self.status_message = format!("Global mute: {}", if mute { "ON" } else { "OFF" });
        Ok(())
    }

    fn adjust_volume(&mut self, delta: i32) -> Result<(), Box<dyn std::error::Error>> {
        let Some(current) = self.receiver.loudspeaker_volume.value() else {
            self.status_message = "Loudspeaker volume not reported yet".to_string();
            return Ok(());
        };
        let volume = (current as i32 + delta).clamp(-30, 6);
        match commands::loudspeaker_volume(volume) {
            Ok(directive) => {
                self.client.send(&directive)?;
                self.status_message = format!("Loudspeaker volume: {} dB", volume);
            }
            Err(e) => self.status_message = format!("Failed to set volume: {}", e),
        }
        Ok(())
    }

    fn toggle_seat_mute(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some((choice, seat)) = self.seats.get(self.selected_seat_index) else {
            return Ok(());
        };
        let on = !seat.mic_status.is("ON");
        self.client.send(&commands::mic_status(choice.id, on))?;
        self.status_message = format!("{}: mic {}", choice.label, if on { "ON" } else { "OFF" });
        Ok(())
    }
}

fn ui(f: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    let inner_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(outer_chunks[0]);

    render_receiver(f, app, inner_chunks[0]);
    render_seats(f, app, inner_chunks[1]);
    render_status(f, app, outer_chunks[1]);
}

fn on_off_style(on: bool) -> Style {
    if on {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Green)
    }
}

fn render_receiver(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Receiver (m mute, +/- volume, q quit) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let receiver = &app.receiver;
    let format = ValueFormat::Units;
    let row = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, Style::default().fg(Color::Yellow)),
            Span::raw(value),
        ])
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Device: ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(receiver.device_id.as_str().unwrap_or("Unknown").to_string()),
        ]),
        row("Model: ", receiver.model.readable()),
        row("Link: ", format!("{:?}", app.link)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Global Mute: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                receiver.global_mute.readable(),
                on_off_style(receiver.global_mute.is("ON")),
            ),
        ]),
        Line::from(vec![
            Span::styled("Loudspeaker: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                receiver.loudspeaker_volume.render(format),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ]),
        row("Operation Mode: ", receiver.operation_mode.readable()),
        row("Interrupt Mode: ", receiver.interrupt_mode.readable()),
        row("Max Speakers: ", receiver.max_total_speakers.render(format)),
        row("Max Requests: ", receiver.max_num_requests.render(format)),
        row("RF Power: ", receiver.rf_power.readable()),
        row("Audio Meter Rate: ", receiver.audio_meter_rate.render(format)),
        row("RF Meter Rate: ", receiver.rf_meter_rate.render(format)),
    ];

    let text = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(text, area);
}

fn render_seats(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Seats (j/k select, Space mic on/off) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    if app.seats.is_empty() {
        let text = Paragraph::new("No seats in the configured range")
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(text, area);
        return;
    }

    let format = ValueFormat::Units;
    let items: Vec<ListItem> = app
        .seats
        .iter()
        .map(|(choice, seat)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<24}", choice.label), Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{:<8}", seat.mic_status.readable()),
                    on_off_style(seat.mic_status.is("ON")),
                ),
                Span::raw(format!(
                    "{:<14} gain {:<8} batt {:<6} rssi {}",
                    seat.role.readable(),
                    seat.mic_gain.render(format),
                    seat.batt_charge.render(format),
                    seat.rssi.render(format),
                )),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.selected_seat_index));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, &mut state);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let text = Paragraph::new(app.status_message.clone())
        .block(block)
        .wrap(Wrap { trim: true });

    f.render_widget(text, area);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(host) = std::env::args().nth(1) else {
        eprintln!("Usage: monitor <receiver-host> [seat-range]");
        return Ok(());
    };
    let mut config = BridgeConfig::new(host);
    if let Some(range) = std::env::args().nth(2) {
        config.range = range.parse()?;
    }

    // Logs go to a file so they don't fight with the TUI
    if let Ok(path) = std::env::var("MXCW_LOG") {
        let file = std::fs::File::create(path)?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let client = MxcwClient::spawn(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client.clone());
    let res = run_app(&mut terminal, &mut app).await;

    client.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.handle_state_updates();
        app.refresh().await?;

        terminal.draw(|f| ui(f, app))?;

        // Handle input events (non-blocking)
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
                        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
                        KeyCode::Char('m') => app.toggle_mute()?,
                        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_volume(1)?,
                        KeyCode::Char('-') | KeyCode::Char('_') => app.adjust_volume(-1)?,
                        KeyCode::Char(' ') => app.toggle_seat_mute()?,
                        _ => {}
                    }
                }
            }
        }
    }
}
