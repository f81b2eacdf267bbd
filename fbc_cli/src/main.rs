use std::{
    env::current_dir,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use fbc_core::{
    calendar::Calendars,
    cli::CalendarArgs,
    config::{CalendarConfig, FeedConfig},
    feed_client,
};
use tokio::fs::write;
use tracing_subscriber::EnvFilter;

/// Write the team's matches to `calendar.ics` and `calendar-full.ics`.
#[derive(Debug, Parser)]
pub struct Arguments {
    #[command(flatten)]
    pub calendar: CalendarArgs,
    /// the directory the calendars are written to, defaults to the current directory
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Arguments::parse();
    if let Err(err) = run(&args).await {
        tracing::error!(error = ?err, "failed to generate the calendar");
        return Err(err);
    }
    Ok(())
}

async fn run(args: &Arguments) -> Result<()> {
    let calendars = feed_client::get(
        &FeedConfig::from(&args.calendar),
        &CalendarConfig::from(&args.calendar),
    )
    .await?;
    let directory = match &args.output_dir {
        Some(directory) => directory.clone(),
        None => current_dir()?,
    };
    write_calendars(&calendars, &directory).await
}

/// Write the plain and the full calendar into `directory`.
async fn write_calendars(calendars: &Calendars, directory: &Path) -> Result<()> {
    for (name, content) in [
        ("calendar.ics", &calendars.plain),
        ("calendar-full.ics", &calendars.full),
    ] {
        let path = directory.join(name);
        write(&path, content)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "calendar written");
    }
    Ok(())
}
