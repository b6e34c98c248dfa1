use crate::notify::Level;
use ratatui::prelude::*;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Color used for a notification level
pub fn level_color(level: Level) -> Color {
  match level {
    Level::Success => Color::Green,
    Level::Error => Color::Red,
  }
}

/// Rect of the given size centered in `area`, clamped to fit
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

/// Input overlay anchored at the top-left of `area` with a one cell margin
pub fn top_left_overlay(area: Rect, height: u16) -> Rect {
  let width = ((u32::from(area.width) * 60 / 100) as u16)
    .clamp(30, 60)
    .min(area.width.saturating_sub(2));
  let height = height.min(area.height.saturating_sub(2));
  Rect::new(area.x + 1, area.y + 1, width, height)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_counts_characters() {
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("ñññññññ", 5), "ññ...");
  }

  #[test]
  fn test_level_color() {
    assert_eq!(level_color(Level::Success), Color::Green);
    assert_eq!(level_color(Level::Error), Color::Red);
  }

  #[test]
  fn test_centered_rect_clamps() {
    let area = Rect::new(0, 0, 20, 10);
    assert_eq!(centered_rect(area, 10, 4), Rect::new(5, 3, 10, 4));
    assert_eq!(centered_rect(area, 40, 40), area);
  }
}
