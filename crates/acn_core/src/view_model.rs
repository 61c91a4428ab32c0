use std::time::Duration;

use crate::message::{NodeId, Role};
use crate::settings::{Settings, SidebarPosition};

/// One materialized row of the navigator list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: String,
    pub role: Role,
    pub summary: String,
    /// Present only when timestamps are enabled and the message has one.
    pub timestamp: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelTexts {
    pub title: String,
    pub search_placeholder: String,
    pub loading: String,
}

/// Instructions from the navigator to the surface that owns the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelCommand {
    Mount {
        width: u32,
        position: SidebarPosition,
        hidden: bool,
    },
    SetWidth(u32),
    SetPosition(SidebarPosition),
    SetHidden(bool),
    SetLoading(bool),
    SetResizing(bool),
    SetCount(usize),
    SetTexts(PanelTexts),
    /// Scroll the list viewport back to the first row.
    ResetScroll,
    RenderRows {
        top_spacer: f32,
        bottom_spacer: f32,
        rows: Vec<RowView>,
    },
    /// Scroll the page to `element` and flash `highlight` for `flash_for`.
    ScrollPageTo {
        element: NodeId,
        highlight: NodeId,
        flash_for: Duration,
    },
}

/// Snapshot of the session state machine for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub visible: bool,
    pub loading: bool,
    pub scanner_active: bool,
    pub message_count: usize,
    pub url: String,
    pub settings: Settings,
    pub dirty: bool,
}
