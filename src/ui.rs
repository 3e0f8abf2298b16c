// src/ui.rs

pub mod chat;
pub mod footer;
pub mod quit_confirm;

use crate::app::{App, AppState};
use crate::config::Config;
use crate::constants::{INPUT_POLL_MS, RENDER_TICK_MS};
use crate::errors::ChatlineResult;
use crate::events::AppEvent;
use crate::key_handlers::handle_key;
use crate::socket::{SocketClient, SocketOptions, TransportEvent};
use crossterm::{
    event::{self, Event as CEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame, Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

/// Connects to the backend and runs the terminal UI until the user quits.
pub async fn run(config: Config) -> ChatlineResult<()> {
    let (app_tx, mut app_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (transport_tx, mut transport_rx) = mpsc::unbounded_channel::<TransportEvent>();

    let client = SocketClient::connect(SocketOptions::from_config(&config)?, transport_tx);
    let mut app = App::new(&config, Box::new(client.handle()), app_tx.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    spawn_input_reader(app_tx);
    let res = run_app(&mut terminal, &mut app, &mut app_rx, &mut transport_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Dropping the app cancels any running reveal before the socket goes away.
    drop(app);
    client.shutdown().await;
    info!("session ended");

    res
}

/// Reads terminal input on a blocking thread and emits render ticks.
/// Stops once the UI loop has gone away.
fn spawn_input_reader(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::task::spawn_blocking(move || {
        let tick_rate = Duration::from_millis(RENDER_TICK_MS);
        let mut last_tick = Instant::now();
        loop {
            match event::poll(Duration::from_millis(INPUT_POLL_MS)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.send(AppEvent::Input(ev)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        error!("failed to read terminal event: {}", e);
                        return;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    error!("failed to poll terminal: {}", e);
                    return;
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(AppEvent::Tick).is_err() {
                    return;
                }
                last_tick = Instant::now();
            }
        }
    });
}

/// Main loop of the application.
async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    app_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    transport_rx: &mut mpsc::UnboundedReceiver<TransportEvent>,
) -> ChatlineResult<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        tokio::select! {
            Some(event) = app_rx.recv() => match event {
                AppEvent::Input(CEvent::Key(key)) => handle_key(key, app),
                AppEvent::Input(_) => {}
                AppEvent::Tick => app.on_tick(),
                AppEvent::RevealTick(generation) => app.handle_reveal_tick(generation),
            },
            Some(event) = transport_rx.recv() => app.handle_transport_event(event),
            else => break,
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

/// Renders the whole screen.
pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(size);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(2, 3), Constraint::Ratio(1, 3)])
        .margin(1)
        .split(vertical[0]);

    chat::draw_chat(f, horizontal[0], app);
    draw_logs(f, horizontal[1], app);
    footer::draw_footer(f, vertical[1], app);

    if app.state == AppState::QuitConfirm {
        quit_confirm::draw_quit_confirm(f, centered_rect(50, 30, size));
    }
}

fn draw_logs(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::LEFT)
        .title(" Activity ")
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);
    app.logs.render(f, inner);
}

/// A rectangle of the given percentage size centered in `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
