use std::io::Write;
use std::time::Instant;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use futures::StreamExt;
use tracing::{debug, warn};
use wr_core::{Article, DoubleActivation, Result};
use wr_sources::{BatchReport, PrefetchBuffer};

use crate::browser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Next,
    Previous,
    Activate,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Redraw,
    Open(String),
    Quit,
}

pub fn action_for(key: &KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('n') => Some(Action::Next),
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('p') => Some(Action::Previous),
        KeyCode::Char(' ') | KeyCode::Enter => Some(Action::Activate),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

/// Viewer position over a prefetch buffer.
pub struct Carousel {
    buffer: PrefetchBuffer,
    index: usize,
    refill_batch: usize,
    taps: DoubleActivation,
    status: Option<String>,
}

impl Carousel {
    pub fn new(buffer: PrefetchBuffer, refill_batch: usize) -> Self {
        Self {
            buffer,
            index: 0,
            refill_batch,
            taps: DoubleActivation::default(),
            status: None,
        }
    }

    pub fn start(&mut self, initial_batch: usize) {
        self.buffer.request_more(initial_batch);
    }

    pub fn current(&self) -> Option<&Article> {
        self.buffer.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn buffer(&self) -> &PrefetchBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PrefetchBuffer {
        &mut self.buffer
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn handle(&mut self, action: Action, now: Instant) -> Effect {
        self.status = None;
        match action {
            Action::Next => {
                if self.index + 1 < self.buffer.len() {
                    self.index += 1;
                    self.taps.reset();
                }
                self.after_navigation();
                Effect::Redraw
            }
            Action::Previous => {
                if self.index > 0 {
                    self.index -= 1;
                    self.taps.reset();
                }
                self.after_navigation();
                Effect::Redraw
            }
            Action::Activate => match self.current() {
                Some(article) => {
                    let url = article.canonical_url();
                    if self.taps.activate(now) {
                        Effect::Open(url)
                    } else {
                        self.status = Some("Press again to open in the browser".to_string());
                        Effect::Redraw
                    }
                }
                None => Effect::Redraw,
            },
            Action::Quit => Effect::Quit,
        }
    }

    /// Keeps the cursor on the same article after slides were evicted.
    pub fn on_batch(&mut self, report: &BatchReport) {
        self.index = self.index.saturating_sub(report.evicted);
        if self.buffer.is_empty() {
            self.index = 0;
        } else {
            self.index = self.index.min(self.buffer.len() - 1);
        }
        if report.appended == 0 && !report.cancelled {
            self.status = Some("Nothing new came back, move to try again".to_string());
        }
    }

    fn after_navigation(&mut self) {
        let total = self.buffer.len();
        if self.buffer.near_end(self.index, total) && self.buffer.request_more(self.refill_batch) {
            debug!("📥 Near the end at {}/{}, prefetching", self.index, total);
        }
    }

    pub fn draw<W: Write>(&self, out: &mut W) -> Result<()> {
        queue!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        match self.current() {
            Some(article) => {
                let header =
                    format!("[{}/{}] {}", self.index + 1, self.buffer.len(), article.title);
                queue!(out, Print(header.bold()), cursor::MoveToNextLine(2))?;
                for line in article.summary.lines().filter(|l| !l.trim().is_empty()).take(6) {
                    queue!(out, Print(line), cursor::MoveToNextLine(1))?;
                }
                queue!(out, cursor::MoveToNextLine(1))?;
                if let Some(image) = &article.image_url {
                    queue!(
                        out,
                        Print(format!("Image: {}", image).dark_grey()),
                        cursor::MoveToNextLine(1)
                    )?;
                }
                queue!(
                    out,
                    Print(format!("Link:  {}", article.canonical_url()).dark_grey()),
                    cursor::MoveToNextLine(1)
                )?;
            }
            None if self.buffer.is_loading() => {
                queue!(out, Print("Loading articles..."), cursor::MoveToNextLine(1))?;
            }
            None => {
                queue!(
                    out,
                    Print("No articles yet. Press n to try again."),
                    cursor::MoveToNextLine(1)
                )?;
            }
        }
        queue!(out, cursor::MoveToNextLine(1))?;
        if self.buffer.is_loading() {
            queue!(out, Print("(fetching more...)".italic()), cursor::MoveToNextLine(1))?;
        }
        if let Some(status) = &self.status {
            queue!(out, Print(status.as_str().yellow()), cursor::MoveToNextLine(1))?;
        }
        queue!(
            out,
            Print("j/n next · k/p previous · space twice to open · q quit".dark_grey()),
            cursor::MoveToNextLine(1)
        )?;
        out.flush()?;
        Ok(())
    }
}

/// Restores the terminal however the loop exits.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(std::io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(std::io::stdout(), cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Runs the interactive carousel until the user quits. Key events and batch
/// completions are handled on this one loop.
pub async fn run(mut carousel: Carousel, initial_batch: usize) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut stdout = std::io::stdout();
    let mut events = EventStream::new();

    carousel.start(initial_batch);
    carousel.draw(&mut stdout)?;

    loop {
        let loading = carousel.buffer().is_loading();
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    let Some(action) = action_for(&key) else { continue };
                    match carousel.handle(action, Instant::now()) {
                        Effect::Quit => break,
                        Effect::Open(url) => {
                            if let Err(e) = browser::open(&url) {
                                carousel.set_status(e.to_string());
                            }
                        }
                        Effect::Redraw => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("⚠️ Terminal event error: {}", e);
                    break;
                }
                None => break,
            },
            Some(report) = carousel.buffer_mut().next_batch(), if loading => {
                carousel.on_batch(&report);
            }
        }
        carousel.draw(&mut stdout)?;
    }

    carousel.buffer().shutdown();
    Ok(())
}
