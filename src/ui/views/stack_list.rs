use crate::api::types::{StackPatch, StackRecord};
use crate::app::AppContext;
use crate::cache::Subscription;
use crate::error::{StackError, ValidationError};
use crate::mutation::{Pending, CREATE_BUSY, CREATE_INCOMPLETE, DELETE_BUSY, UPDATE_BUSY};
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, KeyResult, RenameDialog, RenameEvent, SearchInput, StackForm,
  StackFormEvent,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::StackDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::debug;

/// Root view: the stacks collection with create, rename and delete
pub struct StackListView {
  ctx: AppContext,
  stacks: Subscription<Vec<StackRecord>>,
  list_state: ListState,
  search: SearchInput,
  form: StackForm,
  rename: RenameDialog,
  confirm: ConfirmDialog,
  pending_create: Option<Pending<StackRecord>>,
  pending_update: Option<Pending<StackRecord>>,
  pending_delete: Option<Pending<()>>,
}

impl StackListView {
  pub fn new(ctx: AppContext) -> Self {
    let stacks = ctx.stacks.subscribe_list();
    Self {
      ctx,
      stacks,
      list_state: ListState::default(),
      search: SearchInput::new(),
      form: StackForm::new(),
      rename: RenameDialog::new(),
      confirm: ConfirmDialog::new(),
      pending_create: None,
      pending_update: None,
      pending_delete: None,
    }
  }

  /// Records passing the name filter, in server order
  fn visible(&self) -> Vec<&StackRecord> {
    self
      .stacks
      .data()
      .map(|stacks| {
        stacks
          .iter()
          .filter(|s| self.search.matches(&s.name))
          .collect()
      })
      .unwrap_or_default()
  }

  fn selected(&self) -> Option<StackRecord> {
    let idx = self.list_state.selected()?;
    self.visible().get(idx).map(|s| (*s).clone())
  }

  fn open_form(&mut self) {
    self.form.show();
  }

  fn submit_create(&mut self, name: String, image_path: String) {
    // The form was closed and reopened while the last create still runs
    if self.pending_create.is_some() {
      self.ctx.notifier.error(CREATE_BUSY);
      self.form.set_submitting(true);
      return;
    }

    self.form.set_submitting(true);
    self.pending_create = Some(self.ctx.mutations.spawn_create_from_file(
      name,
      image_path,
      self.ctx.max_image_bytes,
    ));
  }

  fn submit_rename(&mut self, id: u64, name: String) {
    if self.pending_update.is_some() {
      self.ctx.notifier.error(UPDATE_BUSY);
      self.rename.set_submitting(true);
      return;
    }
    self.rename.set_submitting(true);
    self.pending_update = Some(
      self
        .ctx
        .mutations
        .spawn_update(id, StackPatch { name: name.trim().to_string() }),
    );
  }

  fn submit_delete(&mut self, id: u64) {
    if self.pending_delete.is_some() {
      debug!(id, "delete requested while another is running");
      self.ctx.notifier.error(DELETE_BUSY);
      return;
    }
    self.pending_delete = Some(self.ctx.mutations.spawn_delete(id));
  }

  fn poll_mutations(&mut self) {
    if let Some(outcome) = self.pending_create.as_mut().and_then(Pending::poll) {
      self.pending_create = None;
      match outcome {
        Ok(_) => {
          self.form.reset();
          self.form.hide();
        }
        Err(StackError::Validation(
          ValidationError::MissingName | ValidationError::MissingImage,
        )) => self.form.set_error(CREATE_INCOMPLETE),
        Err(e) => self.form.set_error(e.to_string()),
      }
    }

    if let Some(outcome) = self.pending_update.as_mut().and_then(Pending::poll) {
      self.pending_update = None;
      match outcome {
        Ok(_) => self.rename.hide(),
        Err(_) => self.rename.set_submitting(false),
      }
    }

    if let Some(outcome) = self.pending_delete.as_mut().and_then(Pending::poll) {
      self.pending_delete = None;
      if let Err(e) = outcome {
        debug!(error = %e, "delete did not go through");
      }
    }
  }

  /// Route a key to whichever overlay is open. `None` means none took it.
  fn handle_overlay_key(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed(id)) => {
        self.submit_delete(id);
        return Some(ViewAction::None);
      }
      KeyResult::Event(ConfirmEvent::Cancelled) | KeyResult::Handled => {
        return Some(ViewAction::None)
      }
      KeyResult::NotHandled => {}
    }

    match self.rename.handle_key(key) {
      KeyResult::Event(RenameEvent::Submitted { id, name }) => {
        self.submit_rename(id, name);
        return Some(ViewAction::None);
      }
      KeyResult::Event(RenameEvent::Cancelled) | KeyResult::Handled => {
        return Some(ViewAction::None)
      }
      KeyResult::NotHandled => {}
    }

    match self.form.handle_key(key) {
      KeyResult::Event(StackFormEvent::Submitted { name, image_path }) => {
        self.submit_create(name, image_path);
        return Some(ViewAction::None);
      }
      KeyResult::Event(StackFormEvent::Cancelled) | KeyResult::Handled => {
        return Some(ViewAction::None)
      }
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(_) => {
        // Filter changed, start from the top
        self.list_state.select(Some(0));
        Some(ViewAction::None)
      }
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, len);

    let filter = self.search.query().trim();
    let filter_label = if filter.is_empty() {
      String::new()
    } else {
      format!(" /{}", filter)
    };
    let state = self.stacks.state();
    let title = if state.is_loading() && state.data().is_none() {
      " Stacks (loading...) ".to_string()
    } else if let Some(error) = state.error() {
      format!(" Stacks (error: {}) ", truncate(error, 40))
    } else if state.is_loading() {
      format!(" Stacks ({}{}) refreshing... ", len, filter_label)
    } else {
      format!(" Stacks ({}{}) ", len, filter_label)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = if self.stacks.is_loading() {
        "Loading stacks..."
      } else if self.stacks.is_error() {
        "Failed to load stacks. Press 'r' to retry."
      } else if !filter.is_empty() {
        "No stacks match the filter."
      } else {
        "No stacks yet. Press 'n' to create one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .visible()
      .into_iter()
      .map(|stack| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:>5}", stack.id), Style::default().fg(Color::Cyan)),
          Span::raw("  "),
          Span::raw(format!("{:<28}", truncate(&stack.name, 28))),
          Span::raw(" "),
          Span::styled(
            stack.created_at_display(),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw("  "),
          Span::styled(truncate(&stack.image, 30), Style::default().fg(Color::Magenta)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for StackListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(action) = self.handle_overlay_key(key) {
      return action;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.list_state.select_last(),
      KeyCode::Char('r') => self.stacks.refetch(),
      KeyCode::Char('n') => self.open_form(),
      KeyCode::Char('e') => {
        if let Some(stack) = self.selected() {
          self.rename.show(stack.id, &stack.name);
        }
      }
      KeyCode::Char('d') => {
        if let Some(stack) = self.selected() {
          self
            .confirm
            .show(stack.id, format!("Delete stack \"{}\"?", stack.name));
        }
      }
      KeyCode::Enter => {
        if let Some(stack) = self.selected() {
          return ViewAction::Push(Box::new(StackDetailView::new(stack, self.ctx.clone())));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
    self.form.render_overlay(frame, area);
    self.rename.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Stacks".to_string()
  }

  fn tick(&mut self) {
    if self.stacks.poll() {
      let len = self.visible().len();
      ensure_valid_selection(&mut self.list_state, len);
    }
    self.poll_mutations();
  }

  fn captures_input(&self) -> bool {
    self.search.is_active()
      || self.form.is_active()
      || self.rename.is_active()
      || self.confirm.is_active()
  }

  fn handle_command(&mut self, command: &str) -> bool {
    match command {
      "new" => {
        self.open_form();
        true
      }
      "refresh" => {
        self.stacks.refetch();
        true
      }
      _ => false,
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "filter").with_priority(20),
      ShortcutInfo::new("n", "new").with_priority(30),
      ShortcutInfo::new("e", "rename").with_priority(40),
      ShortcutInfo::new("d", "delete").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("enter", "open").with_priority(70),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
