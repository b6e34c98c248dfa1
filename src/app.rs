use crate::api::cache::StacksQueryKey;
use crate::api::cached_client::CachedStacksClient;
use crate::api::client::StacksClient;
use crate::cache::QueryCache;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::mutation::MutationCoordinator;
use crate::notify::{self, Notification, Notifier};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, ToastStack};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::StackListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);

pub const REFRESH_FAILED: &str = "Failed to refresh stacks";

/// Handles shared by every view
#[derive(Clone)]
pub struct AppContext {
  /// Cached reads
  pub stacks: CachedStacksClient,
  pub mutations: MutationCoordinator,
  pub notifier: Notifier,
  pub max_image_bytes: u64,
}

impl AppContext {
  /// Wire client, cache and notifications together. The receiver is the
  /// UI end of the notification channel.
  pub fn new(config: &Config) -> Result<(Self, mpsc::UnboundedReceiver<Notification>)> {
    let client = StacksClient::new(&config.api)?;
    let cache = QueryCache::new()
      .with_stale_time(config.cache.stale_time())
      .with_gc_time(config.cache.gc_time());
    let (notifier, rx) = notify::channel();

    let ctx = Self {
      stacks: CachedStacksClient::new(client.clone(), cache.clone()),
      mutations: MutationCoordinator::new(client, cache, notifier.clone()),
      notifier,
      max_image_bytes: config.upload.max_image_bytes,
    };
    Ok((ctx, rx))
  }

  pub fn cache(&self) -> &QueryCache {
    self.stacks.cache()
  }
}

/// Main application state
pub struct App {
  config: Config,
  ctx: AppContext,
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  command_input: CommandInput,
  toasts: ToastStack,
  notifications: mpsc::UnboundedReceiver<Notification>,
  should_quit: bool,
}

impl App {
  /// Must be called inside the tokio runtime; the root view starts loading
  /// immediately.
  pub fn new(config: Config) -> Result<Self> {
    let (ctx, notifications) = AppContext::new(&config)?;
    let root: Box<dyn View> = Box::new(StackListView::new(ctx.clone()));

    Ok(Self {
      config,
      ctx,
      view_stack: vec![root],
      command_input: CommandInput::new(),
      toasts: ToastStack::new(),
      notifications,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    info!(api = %self.config.api.url, "stackdeck started");
    let result = self.main_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
  ) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => {
          self.handle_key(key);
          self.tick();
        }
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  /// Poll subscriptions and mutations, surface notifications, drop idle cache entries
  fn tick(&mut self) {
    for view in self.view_stack.iter_mut() {
      view.tick();
    }

    while let Ok(notification) = self.notifications.try_recv() {
      self.toasts.push(notification);
    }
    self.toasts.expire();

    let cache = self.ctx.cache();
    let evicted = cache.evict_idle();
    if evicted > 0 {
      debug!(evicted, remaining = cache.len(), "evicted idle cache entries");
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let view_captures = self
      .current_view()
      .map(|v| v.captures_input())
      .unwrap_or(false);

    // `:` belongs to the view while it is taking text
    if self.command_input.is_active() || !view_captures {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => return,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(command = cmd, "executing command");
    match cmd {
      "stacks" => self.view_stack.truncate(1),
      "new" => {
        self.view_stack.truncate(1);
        if let Some(root) = self.view_stack.first_mut() {
          root.handle_command(cmd);
        }
      }
      "refresh" => {
        let handled = self
          .view_stack
          .last_mut()
          .map(|v| v.handle_command(cmd))
          .unwrap_or(false);
        if !handled {
          self.refresh_stacks();
        }
      }
      "quit" => self.should_quit = true,
      other => self.ctx.notifier.error(format!("Unknown command: {}", other)),
    }
  }

  /// Invalidate the stacks collection and read it again in the background.
  /// The read joins the refetch a live subscriber may have started.
  fn refresh_stacks(&self) {
    self.ctx.cache().invalidate(&StacksQueryKey::List);

    let stacks = self.ctx.stacks.clone();
    let notifier = self.ctx.notifier.clone();
    tokio::spawn(async move {
      match stacks.list().await {
        Ok(result) => debug!(
          count = result.data.len(),
          source = ?result.source,
          fetched_at = ?result.fetched_at,
          "stacks refreshed"
        ),
        Err(e) => {
          warn!(error = %e, "refresh failed");
          notifier.error(REFRESH_FAILED);
        }
      }
    });
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn current_shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .current_view()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn api_url(&self) -> &str {
    &self.config.api.url
  }

  pub fn title(&self) -> Option<&str> {
    self.config.title.as_deref()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn toasts(&self) -> &ToastStack {
    &self.toasts
  }
}
