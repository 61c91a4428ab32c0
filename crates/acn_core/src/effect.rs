use crate::settings::SettingsPatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowPanel(bool),
    SetLoading(bool),
    /// Forward the cached scan result to the navigator.
    PushMessages,
    ClearMessages,
    StartScanner { immediate: bool },
    StopScanner,
    /// Run a scan on the next idle turn of the loop.
    RequestScan,
    ApplySettings(SettingsPatch),
    PersistSettings(SettingsPatch),
    /// Recompute the active message from page geometry.
    RefreshActive,
    /// Answer to a visibility request from the host.
    Reply { visible: bool },
}
