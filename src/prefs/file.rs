//! TOML-file preferences.
//!
//! Each library gets its own directory under the cache root, named after a
//! hash of the library path to avoid filesystem issues. Every write rewrites
//! the whole file; it is a handful of keys.

use super::{PrefKey, PrefValue, PreferencesStore};
use crate::error::{ReaderError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const PREFERENCES_FILE: &str = "preferences.toml";

/// Cache directory for one library file.
pub fn library_cache_dir(cache_root: &Path, library_path: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(library_path.as_os_str().to_string_lossy().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    cache_root.join(hash)
}

/// Preferences persisted to `<dir>/preferences.toml`.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<PrefKey, PrefValue>>,
}

impl FilePreferences {
    /// Open (or start) the preferences file inside `dir`.
    ///
    /// Unknown keys are dropped; an unreadable file starts from empty so the
    /// reader can still launch.
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(PREFERENCES_FILE);
        let values = match tokio::fs::read_to_string(&path).await {
            Ok(data) => match toml::from_str::<BTreeMap<String, PrefValue>>(&data) {
                Ok(raw) => {
                    let values: BTreeMap<PrefKey, PrefValue> = raw
                        .into_iter()
                        .filter_map(|(name, value)| Some((PrefKey::from_name(&name)?, value)))
                        .collect();
                    info!(path = %path.display(), keys = values.len(), "Loaded preferences");
                    values
                }
                Err(err) => {
                    warn!(path = %path.display(), "Invalid preferences TOML: {err}");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences file yet");
                BTreeMap::new()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, values: &BTreeMap<PrefKey, PrefValue>) -> Result<()> {
        let raw: BTreeMap<&str, &PrefValue> =
            values.iter().map(|(key, value)| (key.as_str(), value)).collect();
        let contents = toml::to_string(&raw)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.write_error(err))?;
        }
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|err| self.write_error(err))?;
        Ok(())
    }

    fn write_error(&self, err: std::io::Error) -> ReaderError {
        ReaderError::Preferences(format!("cannot write {}: {err}", self.path.display()))
    }
}

#[async_trait]
impl PreferencesStore for FilePreferences {
    async fn get(&self, key: PrefKey) -> Result<Option<PrefValue>> {
        Ok(self.values.lock().await.get(&key).cloned())
    }

    async fn set(&self, key: PrefKey, value: PrefValue) -> Result<()> {
        let mut values = self.values.lock().await;
        values.insert(key, value);
        self.write(&values).await?;
        debug!(%key, "Saved preference");
        Ok(())
    }

    async fn remove(&self, key: PrefKey) -> Result<()> {
        let mut values = self.values.lock().await;
        if values.remove(&key).is_some() {
            self.write(&values).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "serial-reader-prefs-{tag}-{}-{nonce}",
            std::process::id()
        ))
    }

    #[test]
    fn cache_dir_is_stable_per_library() {
        let root = Path::new(".cache");
        let a = library_cache_dir(root, Path::new("/books/lotm.json"));
        let b = library_cache_dir(root, Path::new("/books/lotm.json"));
        let c = library_cache_dir(root, Path::new("/books/other.json"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with(root));
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = scratch_dir("reopen");
        let prefs = FilePreferences::open(&dir).await.unwrap();
        prefs.set(PrefKey::LastChapterId, PrefValue::Int(12)).await.unwrap();
        prefs.set(PrefKey::ScrollOffset, PrefValue::Float(3250.5)).await.unwrap();
        prefs
            .set(PrefKey::ReadingMode, PrefValue::Text("paginated".into()))
            .await
            .unwrap();
        prefs
            .set(PrefKey::GestureNavigationEnabled, PrefValue::Bool(false))
            .await
            .unwrap();
        drop(prefs);

        let reopened = FilePreferences::open(&dir).await.unwrap();
        assert_eq!(
            reopened.get(PrefKey::LastChapterId).await.unwrap(),
            Some(PrefValue::Int(12))
        );
        assert_eq!(
            reopened.get(PrefKey::ScrollOffset).await.unwrap(),
            Some(PrefValue::Float(3250.5))
        );
        assert_eq!(
            reopened.get(PrefKey::ReadingMode).await.unwrap(),
            Some(PrefValue::Text("paginated".into()))
        );
        assert_eq!(
            reopened.get(PrefKey::GestureNavigationEnabled).await.unwrap(),
            Some(PrefValue::Bool(false))
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unwritable_directory_reports_the_path() {
        let dir = scratch_dir("blocked");
        let prefs = FilePreferences::open(&dir).await.unwrap();
        // A plain file where the preferences directory should go.
        std::fs::write(&dir, "not a directory").unwrap();

        let err = prefs
            .set(PrefKey::PageNumber, PrefValue::Int(1))
            .await
            .unwrap_err();
        match err {
            ReaderError::Preferences(message) => {
                assert!(message.contains(PREFERENCES_FILE), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        let _ = std::fs::remove_file(&dir);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = scratch_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(PREFERENCES_FILE), "not = [valid").unwrap();
        let prefs = FilePreferences::open(&dir).await.unwrap();
        assert_eq!(prefs.get(PrefKey::PageNumber).await.unwrap(), None);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
