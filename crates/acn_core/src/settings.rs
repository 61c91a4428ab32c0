use std::fmt;
use std::str::FromStr;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

pub const MIN_SIDEBAR_WIDTH: u32 = 220;
pub const MAX_SIDEBAR_WIDTH: u32 = 520;
pub const DEFAULT_SIDEBAR_WIDTH: u32 = 280;

pub fn clamp_width(width: u32) -> u32 {
    width.clamp(MIN_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    En,
    Zh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarPosition {
    Left,
    #[default]
    Right,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown {field} value: {value}")]
pub struct ParseSettingError {
    pub field: &'static str,
    pub value: String,
}

impl FromStr for Language {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Language::Auto),
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            _ => Err(ParseSettingError {
                field: "language",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for SidebarPosition {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(SidebarPosition::Left),
            "right" => Ok(SidebarPosition::Right),
            _ => Err(ParseSettingError {
                field: "sidebar_position",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Auto => write!(f, "auto"),
            Language::En => write!(f, "en"),
            Language::Zh => write!(f, "zh"),
        }
    }
}

impl fmt::Display for SidebarPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SidebarPosition::Left => write!(f, "left"),
            SidebarPosition::Right => write!(f, "right"),
        }
    }
}

/// User preferences. Missing keys in a stored record take the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub show_timestamp: bool,
    pub sidebar_width: u32,
    pub language: Language,
    pub sidebar_position: SidebarPosition,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_timestamp: false,
            sidebar_width: DEFAULT_SIDEBAR_WIDTH,
            language: Language::Auto,
            sidebar_position: SidebarPosition::Right,
        }
    }
}

/// Partial settings update, also used as the change delta delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_timestamp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidebar_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidebar_position: Option<SidebarPosition>,
}

impl SettingsPatch {
    pub fn width(width: u32) -> Self {
        Self {
            sidebar_width: Some(width),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Settings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(value) = patch.show_timestamp {
            self.show_timestamp = value;
        }
        if let Some(value) = patch.sidebar_width {
            self.sidebar_width = value;
        }
        if let Some(value) = patch.language {
            self.language = value;
        }
        if let Some(value) = patch.sidebar_position {
            self.sidebar_position = value;
        }
    }

    /// Keys whose value in `next` differs from `self`.
    pub fn diff(&self, next: &Settings) -> SettingsPatch {
        SettingsPatch {
            show_timestamp: (self.show_timestamp != next.show_timestamp)
                .then_some(next.show_timestamp),
            sidebar_width: (self.sidebar_width != next.sidebar_width).then_some(next.sidebar_width),
            language: (self.language != next.language).then_some(next.language),
            sidebar_position: (self.sidebar_position != next.sidebar_position)
                .then_some(next.sidebar_position),
        }
    }
}

/// Key-value settings contract. Writes are fire-and-forget for callers: a store
/// that cannot persist keeps the value in memory and logs.
pub trait SettingsStore {
    fn get_settings(&self) -> Settings;
    fn set_settings(&mut self, patch: &SettingsPatch) -> Settings;
    /// Registers a listener that receives the changed keys of every update.
    fn on_settings_changed(&mut self) -> mpsc::Receiver<SettingsPatch>;
    /// Picks up edits made outside this process and notifies listeners.
    fn refresh(&mut self) {}
}

/// Default-backed store used when no persistent store is available.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Settings,
    listeners: Vec<mpsc::Sender<SettingsPatch>>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            listeners: Vec::new(),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get_settings(&self) -> Settings {
        self.settings
    }

    fn set_settings(&mut self, patch: &SettingsPatch) -> Settings {
        self.settings.apply(patch);
        if !patch.is_empty() {
            self.listeners.retain(|tx| tx.send(*patch).is_ok());
        }
        self.settings
    }

    fn on_settings_changed(&mut self) -> mpsc::Receiver<SettingsPatch> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }
}
