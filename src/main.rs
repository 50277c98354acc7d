use luz::{
    cli::Cli,
    config::Config,
    error::ReaderError,
    logging::{self, LogLevel},
    navigation::NavigationIntent,
    scripture::{ScriptureService, source_for},
    session::Session,
    state::{ActivityStore, State},
    streak::{RECENT_ACTIVITY_LIMIT, compute_streak},
    ui::reader::Reader,
};

use chrono::Local;
use clap::Parser;
use eyre::Result;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(LogLevel::from_flags(cli.verbose, cli.debug));

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path.clone())?,
        None => Config::new()?,
    };

    // Signing in is remembered; the dataset override is not.
    if let Some(user) = &cli.user {
        config.settings.user_id = Some(user.trim().to_string());
        if let Err(err) = config.save() {
            log::warn!("could not remember user {}: {}", user, err);
        }
    }
    if let Some(dataset) = &cli.dataset {
        config.settings.dataset_source = Some(dataset.clone());
    }

    let session = Session::new(config.settings.user_id.clone());

    if let Some(key) = &cli.dump {
        dump_chapter(&config, key)
    } else if cli.streak {
        print_streak(&config, &session)
    } else {
        if let Some(key) = &cli.goto {
            let intent: NavigationIntent = key.parse()?;
            let state = State::new(&config.data_dir())?;
            state.set_pending_navigation(&intent)?;
        }
        run_tui(config, session)
    }
}

fn run_tui(config: Config, session: Session) -> Result<()> {
    let service = Arc::new(ScriptureService::new(source_for(&config.dataset_location())));
    let mut reader = Reader::new(config, session, service)?;
    reader.run()
}

fn dump_chapter(config: &Config, key: &str) -> Result<()> {
    let intent: NavigationIntent = key.parse()?;
    let service = ScriptureService::new(source_for(&config.dataset_location()));
    let bible = service.load()?;
    let target = intent.resolve(&bible)?;
    let chapter = bible
        .render(target.position)
        .ok_or_else(|| ReaderError::InvalidReference(key.to_string()))?;

    println!("{}", chapter.reference());
    for (index, verse) in chapter.verses.iter().enumerate() {
        println!("{:>3} {}", index + 1, verse);
    }
    Ok(())
}

fn print_streak(config: &Config, session: &Session) -> Result<()> {
    let user = session.require_user()?;
    let state = State::new(&config.data_dir())?;
    let days = state.fetch_recent_activity_days(user, RECENT_ACTIVITY_LIMIT)?;
    let streak = compute_streak(&days, Local::now().date_naive());
    println!(
        "{}: {} {}",
        user,
        streak,
        if streak == 1 { "day" } else { "days" }
    );
    Ok(())
}
