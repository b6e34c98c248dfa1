mod api;
mod app;
mod cache;
mod commands;
mod config;
mod error;
mod event;
mod logging;
mod mutation;
mod notify;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stackdeck")]
#[command(about = "A terminal UI for managing image stacks")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/stackdeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the stacks API, overrides config and STACKDECK_API_URL
  #[arg(short, long)]
  api_url: Option<String>,

  /// Log file (default: $XDG_DATA_HOME/stackdeck/stackdeck.log)
  #[arg(long)]
  log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?.with_api_url(args.api_url);
  config.validate()?;

  let log_path = args.log_file.unwrap_or_else(logging::default_log_path);
  let _log_guard = logging::init(&log_path)?;

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
