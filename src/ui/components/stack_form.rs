use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::ui::renderfns::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the create form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackFormEvent {
  /// Both fields as typed; the parent trims, encodes and validates
  Submitted { name: String, image_path: String },
  Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Field {
  #[default]
  Name,
  ImagePath,
}

/// Modal form for creating a stack from a name and a local image file
#[derive(Debug, Clone, Default)]
pub struct StackForm {
  active: bool,
  name: TextInput,
  image_path: TextInput,
  focus: Field,
  submitting: bool,
  error: Option<String>,
}

impl StackForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  #[cfg(test)]
  pub fn is_submitting(&self) -> bool {
    self.submitting
  }

  /// Open the form, keeping whatever was typed before
  pub fn show(&mut self) {
    self.active = true;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.submitting = false;
  }

  /// Clear both fields after a successful create
  pub fn reset(&mut self) {
    self.name.clear();
    self.image_path.clear();
    self.focus = Field::Name;
    self.submitting = false;
    self.error = None;
  }

  pub fn set_submitting(&mut self, submitting: bool) {
    self.submitting = submitting;
    if submitting {
      self.error = None;
    }
  }

  pub fn set_error(&mut self, error: impl Into<String>) {
    self.submitting = false;
    self.error = Some(error.into());
  }

  fn toggle_focus(&mut self) {
    self.focus = match self.focus {
      Field::Name => Field::ImagePath,
      Field::ImagePath => Field::Name,
    };
  }

  fn submitted(&self) -> StackFormEvent {
    StackFormEvent::Submitted {
      name: self.name.value().to_string(),
      image_path: self.image_path.value().to_string(),
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<StackFormEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    if key.code == KeyCode::Esc {
      self.hide();
      return KeyResult::Event(StackFormEvent::Cancelled);
    }

    // One request at a time
    if self.submitting {
      return KeyResult::Handled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
        self.toggle_focus();
        return KeyResult::Handled;
      }
      KeyCode::Enter => {
        if self.focus == Field::Name {
          self.focus = Field::ImagePath;
          return KeyResult::Handled;
        }
        return KeyResult::Event(self.submitted());
      }
      _ => {}
    }

    let input = match self.focus {
      Field::Name => &mut self.name,
      Field::ImagePath => &mut self.image_path,
    };
    if input.handle_key(key) == InputResult::Consumed {
      self.error = None;
    }
    KeyResult::Handled
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let overlay_area = centered_rect(area, 64, 7);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" New stack ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let label = |text: &'static str, field: Field| {
      let style = if self.focus == field {
        Style::default().fg(Color::Yellow)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      Span::styled(text, style)
    };

    let mut name_line = vec![label("Name:  ", Field::Name)];
    name_line.extend(self.name.spans(self.focus == Field::Name));
    let mut image_line = vec![label("Image: ", Field::ImagePath)];
    image_line.extend(self.image_path.spans(self.focus == Field::ImagePath));

    let status = if self.submitting {
      Line::styled("Creating...", Style::default().fg(Color::Yellow))
    } else if let Some(error) = &self.error {
      Line::styled(error.as_str(), Style::default().fg(Color::Red))
    } else {
      Line::styled(
        "Tab: switch field  Enter: create  Esc: close",
        Style::default().fg(Color::DarkGray),
      )
    };

    let lines = vec![
      Line::from(name_line),
      Line::from(image_line),
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

  fn type_str(form: &mut StackForm, s: &str) {
    for c in s.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_inactive_form_ignores_keys() {
    let mut form = StackForm::new();
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }

  #[test]
  fn test_enter_advances_then_submits() {
    let mut form = StackForm::new();
    form.show();
    type_str(&mut form, "Rust");
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    type_str(&mut form, "/tmp/rust.png");
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(StackFormEvent::Submitted {
        name: "Rust".to_string(),
        image_path: "/tmp/rust.png".to_string(),
      })
    );
  }

  #[test]
  fn test_submitting_blocks_edits() {
    let mut form = StackForm::new();
    form.show();
    type_str(&mut form, "Go");
    form.set_submitting(true);
    type_str(&mut form, "lang");
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);

    form.set_error("Something went wrong");
    assert!(!form.is_submitting());
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(StackFormEvent::Submitted {
        name: "Go".to_string(),
        image_path: String::new(),
      })
    );
  }

  #[test]
  fn test_reset_clears_fields() {
    let mut form = StackForm::new();
    form.show();
    type_str(&mut form, "Go");
    form.reset();
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(StackFormEvent::Submitted {
        name: String::new(),
        image_path: String::new(),
      })
    );
  }

  #[test]
  fn test_escape_closes_even_while_submitting() {
    let mut form = StackForm::new();
    form.show();
    form.set_submitting(true);
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(StackFormEvent::Cancelled)
    );
    assert!(!form.is_active());
  }
}
