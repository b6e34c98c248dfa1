use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::ui::renderfns::{centered_rect, truncate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameEvent {
  /// New name for the stack with this id, as typed
  Submitted { id: u64, name: String },
  Cancelled,
}

/// Modal that edits the name of one stack
#[derive(Debug, Clone, Default)]
pub struct RenameDialog {
  target: Option<(u64, String)>,
  input: TextInput,
  submitting: bool,
}

impl RenameDialog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.target.is_some()
  }

  /// Open prefilled with the current name
  pub fn show(&mut self, id: u64, current_name: &str) {
    self.target = Some((id, current_name.to_string()));
    self.input = TextInput::with_value(current_name);
    self.submitting = false;
  }

  pub fn hide(&mut self) {
    self.target = None;
    self.input.clear();
    self.submitting = false;
  }

  pub fn set_submitting(&mut self, submitting: bool) {
    self.submitting = submitting;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<RenameEvent> {
    let Some((id, _)) = self.target else {
      return KeyResult::NotHandled;
    };

    if self.submitting && key.code != KeyCode::Esc {
      return KeyResult::Handled;
    }

    match self.input.handle_key(key) {
      InputResult::Cancelled => {
        self.hide();
        KeyResult::Event(RenameEvent::Cancelled)
      }
      InputResult::Submitted(name) => KeyResult::Event(RenameEvent::Submitted { id, name }),
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((_, original)) = &self.target else {
      return;
    };

    let overlay_area = centered_rect(area, 56, 5);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" Rename {} ", truncate(original, 30)));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let status = if self.submitting {
      Line::styled("Saving...", Style::default().fg(Color::Yellow))
    } else {
      Line::styled("Enter: save  Esc: cancel", Style::default().fg(Color::DarkGray))
    };

    let lines = vec![
      Line::from(self.input.spans(!self.submitting)),
      Line::default(),
      status,
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_prefilled_edit_submits_with_id() {
    let mut dialog = RenameDialog::new();
    dialog.show(7, "Rust");
    dialog.handle_key(key(KeyCode::Char('!')));
    assert_eq!(
      dialog.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(RenameEvent::Submitted {
        id: 7,
        name: "Rust!".to_string()
      })
    );
    // Stays open until the update resolves
    assert!(dialog.is_active());
  }

  #[test]
  fn test_no_resubmit_while_saving() {
    let mut dialog = RenameDialog::new();
    dialog.show(7, "Rust");
    dialog.set_submitting(true);
    assert_eq!(dialog.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert_eq!(
      dialog.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(RenameEvent::Cancelled)
    );
    assert!(!dialog.is_active());
  }

  #[test]
  fn test_hidden_dialog_passes_keys() {
    let mut dialog = RenameDialog::new();
    assert_eq!(dialog.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }
}
