use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use tracing::trace;

use crate::app::{Action, App};
use crate::highscore::HighscoreDb;

/// Terminal input the viewer reacts to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Key(KeyEvent),
    Resize,
}

/// Where viewer input comes from
pub trait InputSource {
    /// Waits up to `timeout`; `None` means the wait ran out quietly.
    fn next_input(&mut self, timeout: Duration) -> io::Result<Option<Input>>;
}

/// Reads the real terminal through crossterm's poll/read
#[derive(Debug, Default)]
pub struct TerminalInput;

impl InputSource for TerminalInput {
    fn next_input(&mut self, timeout: Duration) -> io::Result<Option<Input>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            // Windows reports releases too
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(Input::Key(key)),
            Event::Resize(_, _) => Some(Input::Resize),
            _ => None,
        })
    }
}

/// Replays a fixed list of inputs, then reports quiet waits forever
#[derive(Debug, Default)]
pub struct ScriptedInput {
    pending: VecDeque<Input>,
}

impl ScriptedInput {
    pub fn new<I: IntoIterator<Item = Input>>(inputs: I) -> Self {
        Self {
            pending: inputs.into_iter().collect(),
        }
    }

    pub fn push(&mut self, input: Input) {
        self.pending.push_back(input);
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn next_input(&mut self, _timeout: Duration) -> io::Result<Option<Input>> {
        Ok(self.pending.pop_front())
    }
}

/// What the screen needs after one turn of the loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Idle,
    Redraw,
    Quit,
}

/// Drives an [`App`] from an input source. Quiet waits reap finished sound
/// playback, so a redraw is only asked for when something visible changed.
#[derive(Debug)]
pub struct ViewerLoop<S: InputSource> {
    input: S,
    tick: Duration,
}

impl<S: InputSource> ViewerLoop<S> {
    pub fn new(input: S, tick: Duration) -> Self {
        Self { input, tick }
    }

    pub fn input_mut(&mut self) -> &mut S {
        &mut self.input
    }

    pub fn step(&mut self, app: &mut App, db: &HighscoreDb) -> io::Result<Step> {
        let step = match self.input.next_input(self.tick)? {
            None => {
                let was_playing = app.is_playing();
                app.on_tick();
                if was_playing != app.is_playing() {
                    Step::Redraw
                } else {
                    Step::Idle
                }
            }
            Some(Input::Resize) => Step::Redraw,
            Some(Input::Key(key)) => match app.on_key(key, db) {
                Action::Quit => Step::Quit,
                Action::Continue => Step::Redraw,
            },
        };
        trace!(?step, "viewer step");
        Ok(step)
    }

    /// Draws once, then keeps stepping and redrawing until the viewer quits
    pub fn run<F>(&mut self, app: &mut App, db: &HighscoreDb, mut draw: F) -> io::Result<()>
    where
        F: FnMut(&App) -> io::Result<()>,
    {
        draw(&*app)?;
        loop {
            match self.step(app, db)? {
                Step::Quit => return Ok(()),
                Step::Redraw => draw(&*app)?,
                Step::Idle => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::SoundBoard;
    use crate::store::MigrationOutcome;
    use crate::theme::ThemeRegistry;
    use crossterm::event::{KeyCode, KeyModifiers};
    use rusqlite::Connection;
    use std::path::PathBuf;

    fn key(code: KeyCode) -> Input {
        Input::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn fixture() -> (App, HighscoreDb) {
        let db = HighscoreDb::from_connection(Connection::open_in_memory().unwrap()).unwrap();
        let app = App::new(
            ThemeRegistry::new(),
            SoundBoard::new("sounds", "default", false),
            10,
            None,
            PathBuf::from("highscore.db"),
            Some(MigrationOutcome::CanonicalAlreadyPresent),
        );
        (app, db)
    }

    #[test]
    fn quiet_wait_is_idle() {
        let (mut app, db) = fixture();
        let mut viewer = ViewerLoop::new(ScriptedInput::default(), Duration::ZERO);

        assert_eq!(viewer.step(&mut app, &db).unwrap(), Step::Idle);
    }

    #[test]
    fn keys_and_resizes_redraw() {
        let (mut app, db) = fixture();
        let input = ScriptedInput::new([Input::Resize, key(KeyCode::Down), key(KeyCode::Esc)]);
        let mut viewer = ViewerLoop::new(input, Duration::ZERO);

        assert_eq!(viewer.step(&mut app, &db).unwrap(), Step::Redraw);
        assert_eq!(viewer.step(&mut app, &db).unwrap(), Step::Redraw);
        assert_eq!(viewer.step(&mut app, &db).unwrap(), Step::Quit);
        assert!(viewer.input_mut().is_exhausted());
    }

    #[test]
    fn run_draws_initially_and_per_redraw() {
        let (mut app, db) = fixture();
        let input = ScriptedInput::new([key(KeyCode::Char('s')), key(KeyCode::Char('q'))]);
        let mut viewer = ViewerLoop::new(input, Duration::ZERO);

        let mut frames = Vec::new();
        viewer
            .run(&mut app, &db, |app| {
                frames.push(app.sounds.is_enabled());
                Ok(())
            })
            .unwrap();

        assert_eq!(frames, vec![false, true]);
    }

    #[test]
    fn draw_errors_stop_the_loop() {
        let (mut app, db) = fixture();
        let mut viewer = ViewerLoop::new(ScriptedInput::default(), Duration::ZERO);

        let err = viewer
            .run(&mut app, &db, |_| Err(io::Error::other("terminal gone")))
            .unwrap_err();
        assert_eq!(err.to_string(), "terminal gone");
    }
}
