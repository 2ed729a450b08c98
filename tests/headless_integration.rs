use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rusqlite::Connection;

use yadarts::app::{Action, App};
use yadarts::highscore::{Highscore, HighscoreDb};
use yadarts::runtime::{Input, ScriptedInput, Step, ViewerLoop};
use yadarts::sound::SoundBoard;
use yadarts::store::MigrationOutcome;
use yadarts::theme::ThemeRegistry;

fn seeded_db() -> HighscoreDb {
    let db = HighscoreDb::from_connection(Connection::open_in_memory().unwrap()).unwrap();
    for (player, mode, score) in [
        ("anna", "301", 301),
        ("ben", "501", 501),
        ("cleo", "501", 450),
    ] {
        db.record(&Highscore {
            player: player.to_string(),
            game_mode: mode.to_string(),
            score,
            darts: 18,
            played_at: Local::now(),
        })
        .unwrap();
    }
    db
}

fn app() -> App {
    App::new(
        ThemeRegistry::new(),
        SoundBoard::new("sounds", "default", false),
        10,
        None,
        PathBuf::from("highscore.db"),
        Some(MigrationOutcome::MigratedFromLegacy),
    )
}

fn key(code: KeyCode) -> Input {
    Input::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

// Drives the viewer through ViewerLoop/ScriptedInput without a TTY
#[test]
fn headless_browse_and_quit() {
    let db = seeded_db();
    let mut app = app();
    app.refresh(&db).unwrap();
    assert_eq!(app.entries.len(), 3);

    let input = ScriptedInput::new([
        key(KeyCode::Tab),
        key(KeyCode::Tab),
        key(KeyCode::Down),
        key(KeyCode::Char('q')),
    ]);
    let mut viewer = ViewerLoop::new(input, Duration::from_millis(5));

    let mut frames = 0u32;
    viewer
        .run(&mut app, &db, |_| {
            frames += 1;
            Ok(())
        })
        .unwrap();

    // Initial frame plus one per key before quitting
    assert_eq!(frames, 4);
    assert_eq!(app.mode.as_deref(), Some("501"));
    assert_eq!(app.entries.len(), 2);
    assert_eq!(app.entries[0].player, "ben");
    assert_eq!(app.scroll_offset, 1);
}

#[test]
fn headless_idles_without_input() {
    let db = seeded_db();
    let mut app = app();
    app.refresh(&db).unwrap();

    let mut viewer = ViewerLoop::new(ScriptedInput::default(), Duration::from_millis(1));
    for _ in 0..5u32 {
        assert_eq!(viewer.step(&mut app, &db).unwrap(), Step::Idle);
    }

    assert!(!app.is_playing());
    assert!(app.status.as_deref().unwrap().contains("older installation"));
}

#[test]
fn headless_input_arriving_later_is_handled() {
    let db = seeded_db();
    let mut app = app();
    app.refresh(&db).unwrap();
    let mut viewer = ViewerLoop::new(ScriptedInput::default(), Duration::from_millis(1));

    assert_eq!(viewer.step(&mut app, &db).unwrap(), Step::Idle);
    viewer.input_mut().push(Input::Resize);
    viewer.input_mut().push(key(KeyCode::Esc));
    assert_eq!(viewer.step(&mut app, &db).unwrap(), Step::Redraw);
    assert_eq!(viewer.step(&mut app, &db).unwrap(), Step::Quit);
}

#[test]
fn headless_refresh_picks_up_new_scores() {
    let db = seeded_db();
    let mut app = app();
    app.refresh(&db).unwrap();

    db.record(&Highscore {
        player: "dora".to_string(),
        game_mode: "701".to_string(),
        score: 701,
        darts: 21,
        played_at: Local::now(),
    })
    .unwrap();

    let refresh = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);
    assert_eq!(app.on_key(refresh, &db), Action::Continue);
    assert_eq!(app.entries.len(), 4);
    assert_eq!(app.entries[0].player, "dora");
    assert_eq!(app.modes, vec!["301", "501", "701"]);
}
