use crate::notify::{Level, Notification};
use crate::ui::renderfns::{level_color, truncate};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_TOASTS: usize = 3;
const TOAST_WIDTH: u16 = 40;

fn lifetime(level: Level) -> Duration {
  match level {
    Level::Success => Duration::from_secs(2),
    Level::Error => Duration::from_secs(4),
  }
}

#[derive(Debug, Clone)]
struct Toast {
  notification: Notification,
  expires_at: Instant,
}

/// Short-lived notifications stacked in the bottom-right corner, newest last
#[derive(Debug, Clone, Default)]
pub struct ToastStack {
  toasts: VecDeque<Toast>,
}

impl ToastStack {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.toasts.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.toasts.is_empty()
  }

  pub fn push(&mut self, notification: Notification) {
    self.push_at(notification, Instant::now());
  }

  fn push_at(&mut self, notification: Notification, now: Instant) {
    let expires_at = now + lifetime(notification.level);
    self.toasts.push_back(Toast {
      notification,
      expires_at,
    });
    while self.toasts.len() > MAX_TOASTS {
      self.toasts.pop_front();
    }
  }

  pub fn expire(&mut self) {
    self.expire_at(Instant::now());
  }

  fn expire_at(&mut self, now: Instant) {
    self.toasts.retain(|t| t.expires_at > now);
  }

  pub fn messages(&self) -> impl DoubleEndedIterator<Item = &Notification> {
    self.toasts.iter().map(|t| &t.notification)
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let mut bottom = area.y + area.height;

    for notification in self.messages().rev() {
      if bottom < area.y + 3 {
        break;
      }
      bottom -= 3;
      let rect = Rect::new(area.x + area.width - width, bottom, width, 3);
      let color = level_color(notification.level);

      frame.render_widget(Clear, rect);
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
      let text = truncate(&notification.message, usize::from(width.saturating_sub(2)));
      let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(color));
      frame.render_widget(paragraph, rect);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn note(level: Level, message: &str) -> Notification {
    Notification {
      level,
      message: message.to_string(),
    }
  }

  #[test]
  fn test_keeps_newest_three() {
    let mut toasts = ToastStack::new();
    for i in 0..5 {
      toasts.push(note(Level::Success, &format!("t{}", i)));
    }
    let messages: Vec<_> = toasts.messages().map(|n| n.message.as_str()).collect();
    assert_eq!(messages, vec!["t2", "t3", "t4"]);
  }

  #[test]
  fn test_errors_outlive_successes() {
    let mut toasts = ToastStack::new();
    let now = Instant::now();
    toasts.push_at(note(Level::Success, "Stack created"), now);
    toasts.push_at(note(Level::Error, "Delete failed"), now);

    toasts.expire_at(now + Duration::from_secs(3));
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts.messages().next().map(|n| n.level), Some(Level::Error));

    toasts.expire_at(now + Duration::from_secs(4));
    assert!(toasts.is_empty());
  }
}
