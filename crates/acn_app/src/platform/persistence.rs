use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use acn_core::{MemorySettingsStore, Settings, SettingsPatch, SettingsStore};
use acn_engine::{ensure_dir, AtomicFileWriter, PersistError};
use acn_logging::{acn_debug, acn_info, acn_warn};
use thiserror::Error;

pub const SETTINGS_FILENAME: &str = ".acn_settings.ron";

#[derive(Debug, Error)]
pub enum SettingsStoreError {
    #[error("settings directory unusable: {0}")]
    Directory(#[from] PersistError),
    #[error("cannot read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Settings record kept in a RON file, rewritten atomically on every change.
pub struct RonSettingsStore {
    writer: AtomicFileWriter,
    path: PathBuf,
    settings: Settings,
    listeners: Vec<mpsc::Sender<SettingsPatch>>,
    /// File text as last read or written; anything else on disk is an external edit.
    last_seen: Option<String>,
}

impl RonSettingsStore {
    pub fn open(dir: &Path) -> Result<Self, SettingsStoreError> {
        ensure_dir(dir)?;
        let path = dir.join(SETTINGS_FILENAME);
        let text = read_record(&path)?;
        let settings = match text.as_deref() {
            Some(text) => parse_record(&path, text)?,
            None => Settings::default(),
        };
        acn_info!("settings: loaded {:?}", path);
        Ok(Self {
            writer: AtomicFileWriter::new(dir.to_path_buf()),
            path,
            settings,
            listeners: Vec::new(),
            last_seen: text,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&mut self) {
        let content =
            match ron::ser::to_string_pretty(&self.settings, ron::ser::PrettyConfig::new()) {
                Ok(text) => text,
                Err(err) => {
                    acn_warn!("settings: cannot serialize: {}", err);
                    return;
                }
            };
        match self.writer.write(SETTINGS_FILENAME, &content) {
            Ok(_) => self.last_seen = Some(content),
            Err(err) => acn_warn!("settings: write to {:?} failed, kept in memory: {}", self.path, err),
        }
    }

    fn notify(&mut self, patch: SettingsPatch) {
        if patch.is_empty() {
            return;
        }
        self.listeners.retain(|tx| tx.send(patch).is_ok());
    }
}

impl SettingsStore for RonSettingsStore {
    fn get_settings(&self) -> Settings {
        self.settings
    }

    fn set_settings(&mut self, patch: &SettingsPatch) -> Settings {
        let before = self.settings;
        self.settings.apply(patch);
        let changed = before.diff(&self.settings);
        if !changed.is_empty() {
            self.save();
            self.notify(changed);
        }
        self.settings
    }

    fn on_settings_changed(&mut self) -> mpsc::Receiver<SettingsPatch> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    fn refresh(&mut self) {
        let text = match read_record(&self.path) {
            Ok(text) => text,
            Err(err) => {
                acn_debug!("settings: refresh skipped: {}", err);
                return;
            }
        };
        if text == self.last_seen {
            return;
        }
        let next = match text.as_deref() {
            Some(body) => match parse_record(&self.path, body) {
                Ok(settings) => settings,
                Err(err) => {
                    acn_warn!("settings: ignoring external edit: {}", err);
                    return;
                }
            },
            None => Settings::default(),
        };
        self.last_seen = text;
        let changed = self.settings.diff(&next);
        self.settings = next;
        if !changed.is_empty() {
            acn_info!("settings: external change {:?}", changed);
        }
        self.notify(changed);
    }
}

/// `Ok(None)` when the file does not exist yet.
fn read_record(path: &Path) -> Result<Option<String>, SettingsStoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SettingsStoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_record(path: &Path, text: &str) -> Result<Settings, SettingsStoreError> {
    ron::from_str(text).map_err(|err| SettingsStoreError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// The file store for `dir`, or a default-backed memory store when it cannot be used.
pub fn open_settings_store(dir: &Path) -> Box<dyn SettingsStore> {
    match RonSettingsStore::open(dir) {
        Ok(store) => Box::new(store),
        Err(err) => {
            acn_warn!("settings: {}; falling back to in-memory defaults", err);
            Box::new(MemorySettingsStore::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acn_core::{Language, SidebarPosition};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let store = RonSettingsStore::open(temp.path()).unwrap();
        assert_eq!(store.get_settings(), Settings::default());
        assert!(!store.path().exists());
    }

    #[test]
    fn writes_survive_reopen_and_notify() {
        let temp = TempDir::new().unwrap();
        let mut store = RonSettingsStore::open(temp.path()).unwrap();
        let rx = store.on_settings_changed();

        store.set_settings(&SettingsPatch {
            sidebar_position: Some(SidebarPosition::Left),
            sidebar_width: Some(280),
            ..SettingsPatch::default()
        });
        assert_eq!(
            rx.try_recv().unwrap(),
            SettingsPatch {
                sidebar_position: Some(SidebarPosition::Left),
                ..SettingsPatch::default()
            }
        );

        let reopened = RonSettingsStore::open(temp.path()).unwrap();
        assert_eq!(reopened.get_settings().sidebar_position, SidebarPosition::Left);
    }

    #[test]
    fn unchanged_write_is_silent() {
        let temp = TempDir::new().unwrap();
        let mut store = RonSettingsStore::open(temp.path()).unwrap();
        let rx = store.on_settings_changed();
        store.set_settings(&SettingsPatch::width(280));
        assert!(rx.try_recv().is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn partial_record_fills_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(SETTINGS_FILENAME), "(sidebar_width: 300)").unwrap();
        let store = RonSettingsStore::open(temp.path()).unwrap();
        let settings = store.get_settings();
        assert_eq!(settings.sidebar_width, 300);
        assert_eq!(settings.language, Language::Auto);
        assert!(!settings.show_timestamp);
    }

    #[test]
    fn corrupt_record_falls_back_to_memory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(SETTINGS_FILENAME), "(sidebar_width: ").unwrap();
        assert!(matches!(
            RonSettingsStore::open(temp.path()),
            Err(SettingsStoreError::Parse { .. })
        ));

        let mut store = open_settings_store(temp.path());
        assert_eq!(store.get_settings(), Settings::default());
        store.set_settings(&SettingsPatch::width(400));
        assert_eq!(store.get_settings().sidebar_width, 400);
    }

    #[test]
    fn external_edits_are_delivered_as_deltas() {
        let temp = TempDir::new().unwrap();
        let mut store = RonSettingsStore::open(temp.path()).unwrap();
        let rx = store.on_settings_changed();

        fs::write(
            store.path(),
            "(language: zh, show_timestamp: true, sidebar_width: 280)",
        )
        .unwrap();
        store.refresh();
        assert_eq!(
            rx.try_recv().unwrap(),
            SettingsPatch {
                language: Some(Language::Zh),
                show_timestamp: Some(true),
                ..SettingsPatch::default()
            }
        );

        store.refresh();
        assert!(rx.try_recv().is_err());
    }
}
