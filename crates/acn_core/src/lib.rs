//! Navigator core: message model, virtualized list state and the session state machine.
mod active;
mod debounce;
mod effect;
mod i18n;
mod message;
mod msg;
mod navigator;
mod search;
mod settings;
mod state;
mod summary;
mod text;
mod update;
mod view_model;
mod virtual_list;

pub use active::{pick_active, PageGeometry, Rect};
pub use debounce::Debouncer;
pub use effect::Effect;
pub use i18n::{keys, Locale, Localizer};
pub use message::{Message, NodeId, Role};
pub use msg::Msg;
pub use navigator::{
    Navigator, NodeLiveness, PanelSurface, Viewport, DEFAULT_ITEM_HEIGHT, FLASH_DURATION,
    ROW_HEIGHT_EPSILON, SEARCH_DEBOUNCE,
};
pub use search::{semantic_search, SemanticSearchError};
pub use settings::{
    clamp_width, Language, MemorySettingsStore, ParseSettingError, Settings, SettingsPatch,
    SettingsStore, SidebarPosition, DEFAULT_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH, MIN_SIDEBAR_WIDTH,
};
pub use state::AppState;
pub use summary::create_summary;
pub use text::{collapse_whitespace, hash_string};
pub use update::update;
pub use view_model::{PanelCommand, PanelTexts, RowView, SessionView};
pub use virtual_list::{visible_range, VisibleRange, OVERSCAN_ROWS};
