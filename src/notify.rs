//! Transient user-facing notifications (toasts).

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  pub message: String,
}

/// Sending half of the notification channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Notification>,
}

/// Create a notifier and the receiver the UI drains.
pub fn channel() -> (Notifier, mpsc::UnboundedReceiver<Notification>) {
  let (tx, rx) = mpsc::unbounded_channel();
  (Notifier { tx }, rx)
}

impl Notifier {
  pub fn success(&self, message: impl Into<String>) {
    self.send(Level::Success, message.into());
  }

  pub fn error(&self, message: impl Into<String>) {
    self.send(Level::Error, message.into());
  }

  fn send(&self, level: Level, message: String) {
    // Receiver gone means the UI is shutting down
    let _ = self.tx.send(Notification { level, message });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_notifications_arrive_in_order() {
    let (notifier, mut rx) = channel();
    notifier.success("saved");
    notifier.error("failed");

    assert_eq!(rx.try_recv().unwrap().level, Level::Success);
    let second = rx.try_recv().unwrap();
    assert_eq!(second.level, Level::Error);
    assert_eq!(second.message, "failed");
  }

  #[test]
  fn test_send_after_receiver_dropped() {
    let (notifier, rx) = channel();
    drop(rx);
    notifier.success("ignored");
  }
}
