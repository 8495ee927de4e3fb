use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};

use crate::app::{BatchCounters, ProgressEvent, ProgressSink};
use crate::error::KiraError;

const EVENTS_MAX: usize = 200;

#[derive(Debug)]
struct ViewState {
    status: String,
    processed: u64,
    total: u64,
    counters: BatchCounters,
    events: VecDeque<String>,
    started: Instant,
}

/// Live view of a running batch. The batch runs on a worker thread while
/// this thread redraws; `q` or Esc aborts the whole process without moving
/// the progress marker.
pub struct Tui {
    state: Arc<Mutex<ViewState>>,
    range_label: String,
}

struct TuiProgress {
    state: Arc<Mutex<ViewState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            state.processed = event.processed;
            state.total = event.total;
            state.counters = event.counters;
            state.status = event.message.clone();
            state.events.push_back(format!(
                "[{}] {}",
                Local::now().format("%H:%M:%S"),
                event.message
            ));
            while state.events.len() > EVENTS_MAX {
                state.events.pop_front();
            }
        }
    }
}

impl Tui {
    pub fn new(range_label: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewState {
                status: "starting".to_string(),
                processed: 0,
                total: 0,
                counters: BatchCounters::default(),
                events: VecDeque::new(),
                started: Instant::now(),
            })),
            range_label: range_label.into(),
        }
    }

    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, KiraError> + Send + 'static,
        R: Send + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let (tx, rx) = std::sync::mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || tx.send(f(&sink)));

        let mut tick = 0usize;
        loop {
            if let Ok(state) = self.state.lock() {
                terminal
                    .draw(|frame| draw_ui(frame, &self.range_label, &state, tick))
                    .into_diagnostic()?;
            }

            if let Ok(result) = rx.try_recv() {
                restore_terminal()?;
                handle.join().ok();
                return result.map_err(miette::Report::new);
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if key.kind == KeyEventKind::Press
                        && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                    {
                        break;
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }

        restore_terminal()?;
        Err(miette::Report::msg(
            "aborted before the batch finished; the next run starts from the saved progress marker",
        ))
    }
}

fn restore_terminal() -> miette::Result<()> {
    disable_raw_mode().into_diagnostic()?;
    io::stdout()
        .execute(LeaveAlternateScreen)
        .into_diagnostic()?;
    Ok(())
}

fn draw_ui(frame: &mut ratatui::Frame, range_label: &str, state: &ViewState, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let hb = if tick % 2 == 0 { "*" } else { " " };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "KIRA-PC",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw(format!("   Source: PubChem   Batch: {range_label}   ")),
        Span::styled(hb, Style::default().fg(Color::Green)),
    ]))
    .alignment(Alignment::Left)
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let ratio = if state.total == 0 {
        0.0
    } else {
        (state.processed as f64 / state.total as f64).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(format!("{}/{} CIDs", state.processed, state.total));
    frame.render_widget(gauge, chunks[1]);

    let elapsed = state.started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        state.processed as f64 / elapsed
    } else {
        0.0
    };
    let c = state.counters;
    let stats = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Rows: ", Style::default().fg(Color::Gray)),
            Span::styled(c.rows.to_string(), Style::default().fg(Color::Green)),
            Span::styled("   No molecular data: ", Style::default().fg(Color::Gray)),
            Span::styled(
                c.no_property_data.to_string(),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(vec![
            Span::styled("3D SDF: ", Style::default().fg(Color::Gray)),
            Span::raw(c.structures_3d.to_string()),
            Span::styled("   2D SDF: ", Style::default().fg(Color::Gray)),
            Span::raw(c.structures_2d.to_string()),
            Span::styled("   No structure: ", Style::default().fg(Color::Gray)),
            Span::styled(
                c.structures_missing.to_string(),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(vec![
            Span::styled("CID/s: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{rate:.1}")),
            Span::styled("   Status: ", Style::default().fg(Color::Gray)),
            Span::raw(state.status.clone()),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Counters"));
    frame.render_widget(stats, chunks[2]);

    let visible = chunks[3].height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .events
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|e| Line::from(e.clone()))
        .collect();
    let events = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Events"))
        .wrap(Wrap { trim: true });
    frame.render_widget(events, chunks[3]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "q/Esc: abort (marker is only written when the batch completes)",
        Style::default().fg(Color::Gray),
    )));
    frame.render_widget(footer, chunks[4]);
}
