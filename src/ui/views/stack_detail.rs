use crate::api::cache::StacksQueryKey;
use crate::api::types::{ImageInfo, StackRecord};
use crate::app::AppContext;
use crate::cache::{QueryCache, Subscription};
use chrono::Local;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// One stack with the metadata of its image
pub struct StackDetailView {
  stack: StackRecord,
  image_url: String,
  image: Subscription<ImageInfo>,
  cache: QueryCache,
}

impl StackDetailView {
  pub fn new(stack: StackRecord, ctx: AppContext) -> Self {
    let image_url = ctx.stacks.client().image_url(&stack.image).to_string();
    let image = ctx.stacks.subscribe_image(&stack.image);
    Self {
      stack,
      image_url,
      image,
      cache: ctx.cache().clone(),
    }
  }

  /// Pick up a newer copy of this record from the cached collection
  fn sync_record(&mut self) {
    let stacks = self
      .cache
      .snapshot::<Vec<StackRecord>>(&StacksQueryKey::List);
    let latest = stacks
      .data()
      .and_then(|stacks| stacks.iter().find(|s| s.id == self.stack.id));
    if let Some(latest) = latest {
      if *latest != self.stack {
        self.stack = latest.clone();
      }
    }
  }

  fn fetched_line(&self) -> Option<Line<'_>> {
    let state = self.image.state();
    let fetched_at = state.fetched_at?;
    let note = if state.is_loading() {
      " (refreshing)"
    } else if state.is_success() && state.is_stale {
      " (stale)"
    } else {
      ""
    };
    Some(Line::from(vec![
      Span::styled("Fetched: ", Style::default().fg(Color::DarkGray)),
      Span::raw(format!(
        "{}{}",
        fetched_at.with_timezone(&Local).format("%H:%M:%S"),
        note
      )),
    ]))
  }

  fn image_lines(&self) -> Vec<Line<'_>> {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));

    if let Some(info) = self.image.data() {
      let mut lines = vec![
        Line::from(vec![
          label("Type:    "),
          Span::raw(info.content_type.as_deref().unwrap_or("unknown")),
        ]),
        Line::from(vec![label("Size:    "), Span::raw(format_size(info.size))]),
      ];
      lines.extend(self.fetched_line());
      return lines;
    }

    if let Some(error) = self.image.error() {
      return vec![Line::styled(
        format!("Image unavailable: {}. Press 'r' to retry.", error),
        Style::default().fg(Color::Red),
      )];
    }

    vec![Line::styled(
      "Loading image...",
      Style::default().fg(Color::DarkGray),
    )]
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.stack.name))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let mut lines = vec![
      Line::from(vec![label("ID:      "), Span::raw(self.stack.id.to_string())]),
      Line::from(vec![label("Name:    "), Span::raw(self.stack.name.as_str())]),
      Line::from(vec![
        label("Created: "),
        Span::raw(self.stack.created_at_display()),
      ]),
      Line::from(vec![
        label("Image:   "),
        Span::styled(self.stack.image.as_str(), Style::default().fg(Color::Magenta)),
      ]),
      Line::from(vec![
        label("URL:     "),
        Span::styled(self.image_url.as_str(), Style::default().fg(Color::Cyan)),
      ]),
      Line::default(),
    ];
    lines.extend(self.image_lines());

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
  }
}

/// Human readable byte count
fn format_size(bytes: usize) -> String {
  const KIB: f64 = 1024.0;
  let bytes_f = bytes as f64;
  if bytes_f < KIB {
    format!("{} B", bytes)
  } else if bytes_f < KIB * KIB {
    format!("{:.1} KiB", bytes_f / KIB)
  } else {
    format!("{:.1} MiB", bytes_f / (KIB * KIB))
  }
}

impl View for StackDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.image.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.stack.name.clone()
  }

  fn tick(&mut self) {
    self.image.poll();
    self.sync_record();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
