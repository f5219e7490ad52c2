use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bibrowse::config::{self, Config};
use bibrowse::filter::FilterView;
use bibrowse::session::Session;
use bibrowse::{sync, ui};

const LOG_ENV: &str = "BIBROWSE_LOG";

#[derive(Parser, Debug)]
#[command(name = "bibrowse")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip the remote sync and use the cached library as-is
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print entries, optionally filtered by search terms and a keyword
    List(ListArgs),
    /// Print the keyword vocabulary as "<index>\t<keyword>"
    Keywords,
    /// Print the raw BibTeX of one entry
    Show(ShowArgs),
    /// Refresh the cached library from the remote
    Sync,
    /// Interactive session reading commands from stdin (default)
    Browse,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Search terms; an entry matches if any term occurs in any field
    query: Vec<String>,

    /// Keep only entries tagged with this keyword
    #[arg(long, short = 'k')]
    keyword: Option<String>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Citation key
    key: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = config::load(cli.config.as_deref())?;
    tracing::debug!(path = %config.config_path.display(), "loaded configuration");

    match cli.command.unwrap_or(Command::Browse) {
        Command::List(args) => handle_list(args, &config, cli.offline),
        Command::Keywords => handle_keywords(&config, cli.offline),
        Command::Show(args) => handle_show(args, &config, cli.offline),
        Command::Sync => handle_sync(&config),
        Command::Browse => {
            let stdin = io::stdin();
            let mut app = ui::app::App::new(&config, cli.offline, stdin.lock(), io::stdout());
            app.run()
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn load_session(config: &Config, offline: bool) -> Result<Session> {
    let session = Session::load(config, offline)?;
    if !session.editable() {
        eprintln!(
            "offline: using cached library at {}",
            config.library.display()
        );
    }
    Ok(session)
}

fn handle_list(args: ListArgs, config: &Config, offline: bool) -> Result<()> {
    let session = load_session(config, offline)?;
    let mut view: FilterView<'_> = session.view();

    if !args.query.is_empty() {
        view.apply_query(&args.query.join(" "));
    }
    if let Some(keyword) = args.keyword.as_deref() {
        view.apply_keyword(keyword);
    }

    let mut stdout = io::stdout().lock();
    ui::draw::entries(&mut stdout, &view)?;
    stdout.flush()?;
    Ok(())
}

fn handle_keywords(config: &Config, offline: bool) -> Result<()> {
    let session = load_session(config, offline)?;
    let mut stdout = io::stdout().lock();
    ui::draw::keywords(&mut stdout, session.library())?;
    stdout.flush()?;
    Ok(())
}

fn handle_show(args: ShowArgs, config: &Config, offline: bool) -> Result<()> {
    let session = load_session(config, offline)?;
    let mut stdout = io::stdout().lock();
    if !ui::draw::raw_entry(&mut stdout, &session, &args.key)? {
        bail!("no entry found for key `{}`", args.key);
    }
    stdout.flush()?;
    Ok(())
}

fn handle_sync(config: &Config) -> Result<()> {
    let Some(remote_config) = config.remote.as_ref() else {
        bail!("no [remote] section in {}", config.config_path.display());
    };
    let remote = sync::remote_from_config(remote_config)?;
    let connection = sync::sync_library(Some(remote.as_ref()), &config.library);
    if connection.is_connected() {
        println!(
            "Synced {} -> {}",
            remote.describe(),
            config.library.display()
        );
        Ok(())
    } else {
        bail!(
            "sync from {} failed; cached library at {} left unchanged",
            remote.describe(),
            config.library.display()
        )
    }
}
