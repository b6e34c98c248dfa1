use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal resized, redraw
  Resize,
  /// Periodic tick for toasts, subscriptions and pending mutations
  Tick,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm polling blocks, keep it off the async workers
    tokio::task::spawn_blocking(move || loop {
      let Some(event) = poll_event(tick_rate, event::poll, event::read) else {
        continue;
      };
      if tx.send(event).is_err() {
        break;
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

/// Wait up to `tick_rate` for terminal input. `None` means the input was not
/// worth reporting. A failing terminal is retried once per tick.
fn poll_event(
  tick_rate: Duration,
  poll: impl FnOnce(Duration) -> io::Result<bool>,
  read: impl FnOnce() -> io::Result<CrosstermEvent>,
) -> Option<Event> {
  match poll(tick_rate) {
    Ok(true) => match read() {
      // Windows reports releases too
      Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
      Ok(CrosstermEvent::Resize(_, _)) => Some(Event::Resize),
      Ok(_) => None,
      Err(e) => {
        warn!(error = %e, "failed to read terminal event");
        std::thread::sleep(tick_rate);
        None
      }
    },
    Ok(false) => Some(Event::Tick),
    Err(e) => {
      warn!(error = %e, "terminal poll failed");
      std::thread::sleep(tick_rate);
      Some(Event::Tick)
    }
  }
}
