mod config;
mod lastfm;
mod observer;
mod reporter;
mod session;
mod text_cleanup;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use config::Config;
use lastfm::LastfmClient;
use observer::{PageSource, TrackExtractor};
use reporter::ActivityReporter;
use session::SessionStore;
use text_cleanup::TextCleaner;

#[derive(Parser)]
#[command(name = "poolsuite-scrobbler")]
#[command(about = "Scrobbles tracks from the Poolsuite web player to Last.fm")]
#[command(version)]
struct Cli {
    /// Path to the config TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authorize this scrobbler with a Last.fm account
    Login,
    /// Forget the stored Last.fm session
    Logout,
    /// Show login state
    Status,
    /// Watch the player page and scrobble what plays
    Run,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    let store = SessionStore::open(SessionStore::default_path()?)?;
    let mut client = LastfmClient::new(&config.lastfm, store);

    match cli.command {
        Command::Login => login(&mut client),
        Command::Logout => {
            client.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Status => {
            let status = client.login_status();
            match status.account {
                Some(account) => println!("Logged in as {account}"),
                None => println!("Not logged in. Run `poolsuite-scrobbler login` first."),
            }
            Ok(())
        }
        Command::Run => run(&config, client),
    }
}

/// Perform the complete Last.fm authorization flow interactively.
fn login(client: &mut LastfmClient) -> Result<()> {
    let start = client.start_login()?;
    log::debug!("Got request token {}", start.token);

    println!(
        "Authorize this scrobbler in your browser:\n\n  {}\n",
        start.auth_url
    );
    if let Err(error) = open::that(&start.auth_url) {
        log::debug!("Could not open browser: {error}");
        println!("(Could not open a browser automatically; open the URL above yourself.)");
    }

    print!("Press Enter once you have authorized the application... ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;

    let session = client.complete_login()?;
    println!("Logged in as {}.", session.account);
    Ok(())
}

/// Poll the player page and feed observations to the reporter until
/// interrupted, then flush the current track.
fn run(config: &Config, client: LastfmClient) -> Result<()> {
    let status = client.login_status();
    let account = status
        .account
        .context("Not logged in. Run `poolsuite-scrobbler login` first.")?;
    log::info!("Scrobbling to {} as {}", config.page_url, account);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("Failed to install shutdown handler")?;
    }

    let source = PageSource::new(config.page_url.clone());
    let cleaner = TextCleaner::new(&config.cleanup);
    let extractor = TrackExtractor::new(cleaner);
    let mut reporter = ActivityReporter::new(client, config.scrobble_threshold);

    while !shutdown.load(Ordering::SeqCst) {
        match source.fetch() {
            Ok(snapshot) => {
                if let Some(track) = extractor.extract(&snapshot) {
                    reporter.on_track(track);
                }
            }
            Err(error) => log::warn!("Page fetch failed: {error:#}"),
        }

        reporter.tick(Utc::now().timestamp());
        thread::sleep(Duration::from_secs(config.refresh_interval));
    }

    // The current track may have crossed the threshold during the last
    // sleep; give it its final scrobble check before exiting.
    log::info!("Shutting down");
    reporter.finish(Utc::now().timestamp());
    Ok(())
}
