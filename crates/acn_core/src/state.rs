use crate::settings::{Settings, SettingsPatch};
use crate::view_model::SessionView;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    settings: Settings,
    visible: bool,
    loading: bool,
    scanner_active: bool,
    message_count: usize,
    url: String,
    dirty: bool,
}

impl AppState {
    pub fn new(settings: Settings, url: impl Into<String>) -> Self {
        Self {
            settings,
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            visible: self.visible,
            loading: self.loading,
            scanner_active: self.scanner_active,
            message_count: self.message_count,
            url: self.url.clone(),
            settings: self.settings,
            dirty: self.dirty,
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.mark_dirty();
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.mark_dirty();
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn scanner_active(&self) -> bool {
        self.scanner_active
    }

    pub(crate) fn set_scanner_active(&mut self, active: bool) {
        self.scanner_active = active;
        self.mark_dirty();
    }

    pub(crate) fn message_count(&self) -> usize {
        self.message_count
    }

    pub(crate) fn set_message_count(&mut self, count: usize) {
        self.message_count = count;
        self.mark_dirty();
    }

    /// Returns false when `url` equals the current one.
    pub(crate) fn navigate(&mut self, url: String) -> bool {
        if self.url == url {
            return false;
        }
        self.url = url;
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_settings(&mut self, patch: &SettingsPatch) {
        self.settings.apply(patch);
        self.mark_dirty();
    }
}
