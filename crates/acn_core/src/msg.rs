use crate::settings::SettingsPatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Scanner emitted a changed message sequence of this length.
    MessagesScanned { count: usize },
    /// Host asked to flip panel visibility.
    ToggleRequested,
    /// Host asked for an explicit visibility.
    VisibilityRequested(bool),
    /// Page URL changed (single-page navigation).
    RouteChanged(String),
    /// Settings store delivered changed keys.
    SettingsChanged(SettingsPatch),
    /// Navigator wants these keys persisted (resize drag ended).
    PersistRequested(SettingsPatch),
    /// Page scrolled; coalesced to one per frame by the runner.
    PageScrolled,
}
