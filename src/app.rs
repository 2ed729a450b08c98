use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

use crate::highscore::{Highscore, HighscoreDb};
use crate::sound::{OutputLine, Playback, SoundBoard, SoundId};
use crate::store::MigrationOutcome;
use crate::theme::{AssetCache, AssetId, ThemeRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// State of the highscore viewer
#[derive(Debug)]
pub struct App {
    pub entries: Vec<Highscore>,
    pub modes: Vec<String>,
    pub mode: Option<String>,
    pub limit: usize,
    pub scroll_offset: usize,
    pub themes: ThemeRegistry,
    pub assets: AssetCache,
    pub sounds: SoundBoard,
    pub store_path: PathBuf,
    pub outcome: Option<MigrationOutcome>,
    pub status: Option<String>,
    playing: Option<Playback>,
}

impl App {
    pub fn new(
        themes: ThemeRegistry,
        sounds: SoundBoard,
        limit: usize,
        mode: Option<String>,
        store_path: PathBuf,
        outcome: Option<MigrationOutcome>,
    ) -> Self {
        let status = match outcome {
            Some(MigrationOutcome::MigratedFromLegacy) => {
                Some("Imported highscores from an older installation".to_string())
            }
            Some(MigrationOutcome::NoLegacyFound) => Some("Started a new highscore list".to_string()),
            _ => None,
        };

        Self {
            entries: Vec::new(),
            modes: Vec::new(),
            mode,
            limit,
            scroll_offset: 0,
            themes,
            assets: AssetCache::new(),
            sounds,
            store_path,
            outcome,
            status,
            playing: None,
        }
    }

    /// Reload entries and modes from the store
    pub fn refresh(&mut self, db: &HighscoreDb) -> rusqlite::Result<()> {
        self.modes = db.game_modes()?;
        self.entries = db.top(self.mode.as_deref(), self.limit)?;
        self.scroll_offset = self.scroll_offset.min(self.entries.len().saturating_sub(1));
        Ok(())
    }

    /// All modes -> first mode -> ... -> last mode -> all modes
    pub fn cycle_mode(&mut self, db: &HighscoreDb) -> rusqlite::Result<()> {
        self.modes = db.game_modes()?;
        self.mode = match &self.mode {
            None => self.modes.first().cloned(),
            Some(current) => self
                .modes
                .iter()
                .position(|m| m == current)
                .and_then(|i| self.modes.get(i + 1))
                .cloned(),
        };
        self.scroll_offset = 0;
        self.refresh(db)
    }

    pub fn mode_label(&self) -> &str {
        self.mode.as_deref().unwrap_or("all modes")
    }

    pub fn theme_name(&self) -> Option<&str> {
        self.themes.current().map(|t| t.name())
    }

    /// Switch to the next theme; the old theme's images are released
    pub fn cycle_theme(&mut self) -> Option<String> {
        if !self.themes.is_initialized() {
            self.status = Some("No themes installed".to_string());
            return None;
        }
        self.assets.clear();
        let name = self.themes.select_next().map(|t| t.name().to_string());
        if let Some(name) = &name {
            self.status = Some(format!("Theme: {name}"));
        }
        name
    }

    /// Size of the current theme's board image, loading it on first use
    pub fn board_bytes(&self) -> Option<usize> {
        let theme = self.themes.current()?;
        match self.assets.get(theme, AssetId::BoardHi) {
            Ok(asset) => Some(asset.len()),
            Err(e) => {
                debug!(theme = %theme.name(), error = %e, "board image unavailable");
                None
            }
        }
    }

    pub fn toggle_sound(&mut self) -> bool {
        let enabled = !self.sounds.is_enabled();
        self.sounds.set_enabled(enabled);
        if !enabled {
            if let Some(playing) = self.playing.take() {
                playing.stop();
            }
        }
        self.status = Some(if enabled { "Sound on" } else { "Sound off" }.to_string());
        enabled
    }

    /// Start `id`, cutting off whatever was playing
    pub fn play(&mut self, id: SoundId) {
        if let Some(previous) = self.playing.take() {
            previous.stop();
        }
        self.playing = self.sounds.play(id, OutputLine::default());
    }

    pub fn is_playing(&self) -> bool {
        self.playing.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn on_tick(&mut self) {
        if self.playing.as_ref().is_some_and(Playback::is_finished) {
            if let Some(done) = self.playing.take() {
                if let Err(e) = done.wait() {
                    warn!(error = %e, "sound playback failed");
                }
            }
        }
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.entries.len().saturating_sub(1);
        self.scroll_offset = self.scroll_offset.saturating_add_signed(delta).min(max);
    }

    pub fn on_key(&mut self, key: KeyEvent, db: &HighscoreDb) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        let result = match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Action::Quit,
            KeyCode::Tab | KeyCode::Char('m') => self.cycle_mode(db),
            KeyCode::Char('r') => self.refresh(db),
            KeyCode::Char('t') => {
                self.cycle_theme();
                Ok(())
            }
            KeyCode::Char('s') => {
                if self.toggle_sound() {
                    self.play(SoundId::Hit);
                }
                Ok(())
            }
            KeyCode::Up => {
                self.scroll_by(-1);
                Ok(())
            }
            KeyCode::Down => {
                self.scroll_by(1);
                Ok(())
            }
            KeyCode::PageUp => {
                self.scroll_by(-10);
                Ok(())
            }
            KeyCode::PageDown => {
                self.scroll_by(10);
                Ok(())
            }
            KeyCode::Home => {
                self.scroll_offset = 0;
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            warn!(error = %e, "highscore query failed");
            self.status = Some(format!("Could not read highscores: {e}"));
        }
        Action::Continue
    }
}
