use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    process,
    time::Duration,
};
use tracing::{error, info, warn};

use yadarts::{
    app::App,
    app_dirs::AppDirs,
    config::{ConfigStore, FileConfigStore},
    highscore::HighscoreDb,
    logging,
    runtime::{TerminalInput, ViewerLoop},
    sound::{SoundBoard, SoundId},
    store::{self, StoreError, StoreLocation},
    theme::ThemeRegistry,
};

const TICK_RATE_MS: u64 = 100;

/// dart scoring shell with themes, sound effects and a local highscore list
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Browse the local dart highscore list. Highscores left behind by older releases in ./data/highscore.db are imported into ~/.yadarts on first start."
)]
pub struct Cli {
    /// home directory holding the .yadarts folder (default: $HOME)
    #[clap(long)]
    home: Option<PathBuf>,

    /// directory with one folder per theme
    #[clap(long, default_value = "themes")]
    themes_dir: PathBuf,

    /// directory with one folder per sound set
    #[clap(long, default_value = "sounds")]
    sounds_dir: PathBuf,

    /// theme to start with (default: last used)
    #[clap(short = 't', long)]
    theme: Option<String>,

    /// disable sound effects for this run
    #[clap(long)]
    mute: bool,

    /// only show highscores of this game mode
    #[clap(short = 'm', long)]
    mode: Option<String>,

    /// number of highscores to show
    #[clap(short = 'n', long)]
    limit: Option<usize>,

    /// print the highscores to stdout and exit
    #[clap(long)]
    print: bool,

    /// write the highscores as CSV to FILE and exit
    #[clap(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// print where the highscore file lives and exit
    #[clap(long)]
    store_info: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let Some(home) = cli.home.clone().or_else(AppDirs::home_dir) else {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::MissingRequiredArgument,
            "could not determine the home directory, pass --home",
        )
        .exit();
    };

    if let Err(e) = logging::init(&AppDirs::log_path(&home)) {
        warn!(error = %e, "log file unavailable, logging to stderr");
    }
    info!(home = %home.display(), "bootstrapping yadarts");

    let location = StoreLocation::resolve(&home);

    if cli.store_info {
        let (path, outcome) = store::prepare(&location).unwrap_or_else(|e| fatal(&e));
        println!("highscore file: {}", path.display());
        println!("legacy file:    {}", location.legacy_path().display());
        println!("status:         {outcome}");
        return Ok(());
    }

    // Nothing is drawn until the store is usable
    let db = HighscoreDb::open(&location).unwrap_or_else(|e| fatal(&e));

    let config_store = FileConfigStore::new(&home);
    let mut config = config_store.load();
    let limit = cli.limit.unwrap_or(config.highscore_limit);

    if let Some(path) = &cli.export {
        let written = db.export_csv(File::create(path)?, cli.mode.as_deref())?;
        println!("exported {written} highscores to {}", path.display());
        return Ok(());
    }

    if cli.print {
        print_highscores(&db, cli.mode.as_deref(), limit)?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut themes = ThemeRegistry::new();
    match themes.initialize(&cli.themes_dir) {
        Ok(_) => {
            themes.set_current(cli.theme.as_deref().unwrap_or(&config.theme));
        }
        Err(e) => warn!(error = %e, "themes unavailable"),
    }
    let sounds = SoundBoard::new(
        &cli.sounds_dir,
        &config.sound_set,
        config.sound_enabled && !cli.mute,
    );

    let mut app = App::new(
        themes,
        sounds,
        limit,
        cli.mode.clone(),
        location.canonical_path().to_path_buf(),
        db.migration_outcome(),
    );
    app.refresh(&db)?;
    app.play(SoundId::GameStart);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &db);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Some(name) = app.theme_name() {
        config.theme = name.to_string();
    }
    if !cli.mute {
        config.sound_enabled = app.sounds.is_enabled();
    }
    if let Err(e) = config_store.save(&config) {
        warn!(path = %config_store.path().display(), error = %e, "could not save config");
    }
    app.assets.clear();

    result
}

fn fatal(e: &StoreError) -> ! {
    error!(error = %e, "startup aborted");
    eprintln!("yadarts: {e}");
    process::exit(1);
}

fn print_highscores(db: &HighscoreDb, mode: Option<&str>, limit: usize) -> rusqlite::Result<()> {
    let entries = db.top(mode, limit)?;
    if entries.is_empty() {
        println!("no highscores yet");
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}  {:<24} {:<8} {:>6} {:>5}  {}",
            i + 1,
            entry.player,
            entry.game_mode,
            entry.score,
            entry.darts,
            entry.played_ago()
        );
    }
    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    db: &HighscoreDb,
) -> Result<(), Box<dyn Error>> {
    let mut viewer = ViewerLoop::new(TerminalInput, Duration::from_millis(TICK_RATE_MS));
    viewer.run(app, db, |app| {
        terminal.draw(|f| f.render_widget(app, f.area()))?;
        Ok(())
    })?;

    Ok(())
}
