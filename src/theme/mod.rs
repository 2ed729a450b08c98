//! Visual themes: a directory of board and frame images per theme.
//!
//! Themes are discovered by an explicitly constructed [`ThemeRegistry`]
//! that the shell initializes once at startup and passes to whatever needs
//! a lookup. Image bytes are loaded lazily through [`AssetCache`].

pub mod cache;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

pub use cache::{Asset, AssetCache};

/// Theme that must always be present in the themes directory
pub const DEFAULT_THEME: &str = "plain";

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Themes directory '{}' does not exist", .0.display())]
    BaseDirMissing(PathBuf),

    #[error("Theme '{theme}' is missing '{}'", path.display())]
    MissingAsset { theme: String, path: PathBuf },

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Every image a theme provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum_macros::Display)]
pub enum AssetId {
    BoardHi,
    BoardMedium,
    BoardLow,
    Background,
    BackgroundAlt,
    CornerTopLeft,
    BorderLeft,
}

impl AssetId {
    pub const ALL: [AssetId; 7] = [
        AssetId::BoardHi,
        AssetId::BoardMedium,
        AssetId::BoardLow,
        AssetId::Background,
        AssetId::BackgroundAlt,
        AssetId::CornerTopLeft,
        AssetId::BorderLeft,
    ];

    /// Board renditions; a directory without all three is not a theme
    pub const BOARDS: [AssetId; 3] = [AssetId::BoardHi, AssetId::BoardMedium, AssetId::BoardLow];

    pub fn file_name(self) -> &'static str {
        match self {
            AssetId::BoardHi => "board-hi.jpg",
            AssetId::BoardMedium => "board-m.jpg",
            AssetId::BoardLow => "board-lo.jpg",
            AssetId::Background => "background.jpg",
            AssetId::BackgroundAlt => "background_alt.jpg",
            AssetId::CornerTopLeft => "corner_topleft.jpg",
            AssetId::BorderLeft => "border_left.jpg",
        }
    }
}

/// A theme directory with all of its files present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    name: String,
    base_dir: PathBuf,
}

impl Theme {
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, ThemeError> {
        let base_dir = dir.as_ref().to_path_buf();
        let name = base_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for id in AssetId::ALL {
            let path = base_dir.join(id.file_name());
            if !path.is_file() {
                return Err(ThemeError::MissingAsset { theme: name, path });
            }
        }

        Ok(Self { name, base_dir })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn asset_path(&self, id: AssetId) -> PathBuf {
        self.base_dir.join(id.file_name())
    }

    /// Path of the asset if it is still a regular file on disk
    pub fn existing_asset(&self, id: AssetId) -> Option<PathBuf> {
        let path = self.asset_path(id);
        path.is_file().then_some(path)
    }
}

/// Known themes plus the one currently selected
#[derive(Debug, Default)]
pub struct ThemeRegistry {
    themes: BTreeMap<String, Theme>,
    current: Option<String>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `base_dir`, replacing whatever was registered before.
    ///
    /// The default theme is required; other directories are registered when
    /// they hold all three board images and load cleanly, and skipped with a
    /// warning otherwise. Returns the number of registered themes.
    pub fn initialize<P: AsRef<Path>>(&mut self, base_dir: P) -> Result<usize, ThemeError> {
        let base_dir = base_dir.as_ref();
        if !base_dir.is_dir() {
            return Err(ThemeError::BaseDirMissing(base_dir.to_path_buf()));
        }

        let default = Theme::load(base_dir.join(DEFAULT_THEME))?;
        let mut themes = BTreeMap::new();
        themes.insert(default.name().to_string(), default);

        let entries = fs::read_dir(base_dir).map_err(|source| ThemeError::Io {
            path: base_dir.to_path_buf(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !path.is_dir() || name == DEFAULT_THEME {
                continue;
            }
            if !AssetId::BOARDS.iter().all(|id| path.join(id.file_name()).is_file()) {
                debug!(path = %path.display(), "not a theme directory");
                continue;
            }
            match Theme::load(&path) {
                Ok(theme) => {
                    themes.insert(name, theme);
                }
                Err(e) => warn!(theme = %name, error = %e, "could not load theme"),
            }
        }

        info!(count = themes.len(), dir = %base_dir.display(), "themes registered");
        self.themes = themes;
        self.current = Some(DEFAULT_THEME.to_string());
        Ok(self.themes.len())
    }

    pub fn is_initialized(&self) -> bool {
        !self.themes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }

    pub fn default_theme(&self) -> Option<&Theme> {
        self.themes.get(DEFAULT_THEME)
    }

    pub fn current(&self) -> Option<&Theme> {
        self.current.as_deref().and_then(|name| self.themes.get(name))
    }

    /// Selects `name`; unknown names keep the current theme and return false
    pub fn set_current(&mut self, name: &str) -> bool {
        if self.themes.contains_key(name) {
            self.current = Some(name.to_string());
            true
        } else {
            warn!(theme = %name, "no such theme available, keeping current");
            false
        }
    }

    /// Selects the theme after the current one in name order, wrapping around
    pub fn select_next(&mut self) -> Option<&Theme> {
        let next = match self.current.as_deref() {
            Some(current) => self
                .themes
                .range::<str, _>((
                    std::ops::Bound::Excluded(current),
                    std::ops::Bound::Unbounded,
                ))
                .next()
                .or_else(|| self.themes.iter().next()),
            None => self.themes.iter().next(),
        }
        .map(|(name, _)| name.clone());

        self.current = next;
        self.current()
    }

    pub fn names(&self) -> Vec<&str> {
        self.themes.keys().map(String::as_str).collect()
    }
}
