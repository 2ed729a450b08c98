use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::{AssetId, Theme, ThemeError};

/// Bytes of one theme image, read once
#[derive(Debug)]
pub struct Asset {
    pub id: AssetId,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Asset {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Memoizes theme images per `(theme, asset)`.
///
/// Owned by the window that draws with it; dropping the cache or calling
/// [`AssetCache::clear`] releases every loaded image.
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: Mutex<HashMap<(String, AssetId), Arc<Asset>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached asset, reading it from disk on first access
    pub fn get(&self, theme: &Theme, id: AssetId) -> Result<Arc<Asset>, ThemeError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (theme.name().to_string(), id);
        if let Some(asset) = entries.get(&key) {
            return Ok(Arc::clone(asset));
        }

        let path = theme.asset_path(id);
        let bytes = fs::read(&path).map_err(|source| ThemeError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(theme = %theme.name(), asset = %id, bytes = bytes.len(), "loaded theme asset");

        let asset = Arc::new(Asset { id, path, bytes });
        entries.insert(key, Arc::clone(&asset));
        Ok(asset)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every loaded asset, e.g. when the owning window closes
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::tests::write_theme;
    use tempfile::tempdir;

    #[test]
    fn loads_once_and_memoizes() {
        let base = tempdir().unwrap();
        let dir = write_theme(base.path(), "plain", &[]);
        let theme = Theme::load(&dir).unwrap();
        let cache = AssetCache::new();

        let first = cache.get(&theme, AssetId::BoardHi).unwrap();
        assert_eq!(first.bytes, b"plain:BoardHi");

        // Changing the file does not affect an already cached asset
        fs::write(dir.join("board-hi.jpg"), b"changed").unwrap();
        let second = cache.get(&theme, AssetId::BoardHi).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_include_theme_name() {
        let base = tempdir().unwrap();
        let plain = Theme::load(write_theme(base.path(), "plain", &[])).unwrap();
        let neon = Theme::load(write_theme(base.path(), "neon", &[])).unwrap();
        let cache = AssetCache::new();

        let a = cache.get(&plain, AssetId::Background).unwrap();
        let b = cache.get(&neon, AssetId::Background).unwrap();
        assert_ne!(a.bytes, b.bytes);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_forces_reload() {
        let base = tempdir().unwrap();
        let dir = write_theme(base.path(), "plain", &[]);
        let theme = Theme::load(&dir).unwrap();
        let cache = AssetCache::new();

        cache.get(&theme, AssetId::BoardLow).unwrap();
        fs::write(dir.join("board-lo.jpg"), b"new").unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&theme, AssetId::BoardLow).unwrap().bytes, b"new");
    }

    #[test]
    fn missing_file_is_an_error_and_not_cached() {
        let base = tempdir().unwrap();
        let dir = write_theme(base.path(), "plain", &[]);
        let theme = Theme::load(&dir).unwrap();
        fs::remove_file(dir.join("border_left.jpg")).unwrap();

        let cache = AssetCache::new();
        assert!(matches!(
            cache.get(&theme, AssetId::BorderLeft),
            Err(ThemeError::Io { .. })
        ));
        assert!(cache.is_empty());
    }
}
