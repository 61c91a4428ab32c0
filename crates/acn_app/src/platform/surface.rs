use std::time::{Duration, Instant};

use acn_core::{NodeId, PanelCommand, PanelSurface, PanelTexts, Role, RowView, SidebarPosition, Viewport};

/// Pixel height of one text line in a row.
pub const ROW_LINE_HEIGHT: f32 = 24.0;
/// Vertical gap between rows.
pub const ROW_GAP: f32 = 8.0;
pub const LIST_VIEWPORT_HEIGHT: f32 = 480.0;

/// Page scroll requested by a row activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub element: NodeId,
    pub highlight: NodeId,
    pub flash_for: Duration,
}

/// Terminal rendition of the navigator panel.
///
/// Keeps the last applied state of every panel command and draws it as plain
/// lines on demand. Rows with a visible timestamp take two lines, which is
/// what [`PanelSurface::measure_row_height`] reports.
pub struct TextSurface {
    mounted: bool,
    hidden: bool,
    loading: bool,
    resizing: bool,
    width: u32,
    position: SidebarPosition,
    count: usize,
    texts: PanelTexts,
    rows: Vec<RowView>,
    top_spacer: f32,
    bottom_spacer: f32,
    viewport: Viewport,
    flash: Option<(NodeId, Instant)>,
    scroll_requests: Vec<ScrollRequest>,
    dirty: bool,
}

impl TextSurface {
    pub fn new(viewport_height: f32) -> Self {
        Self {
            mounted: false,
            hidden: true,
            loading: false,
            resizing: false,
            width: 0,
            position: SidebarPosition::default(),
            count: 0,
            texts: PanelTexts::default(),
            rows: Vec::new(),
            top_spacer: 0.0,
            bottom_spacer: 0.0,
            viewport: Viewport {
                height: viewport_height,
                scroll_top: 0.0,
            },
            flash: None,
            scroll_requests: Vec::new(),
            dirty: false,
        }
    }

    /// Scrolls the list itself. The caller forwards this to the navigator.
    pub fn scroll_list_to(&mut self, offset: f32) {
        self.viewport.scroll_top = offset.max(0.0);
    }

    pub fn take_scroll_requests(&mut self) -> Vec<ScrollRequest> {
        std::mem::take(&mut self.scroll_requests)
    }

    /// Returns whether anything visible changed since the last call.
    pub fn take_dirty(&mut self, now: Instant) -> bool {
        if let Some((_, until)) = self.flash {
            if now >= until {
                self.flash = None;
                self.dirty = true;
            }
        }
        std::mem::take(&mut self.dirty)
    }

    pub fn render_lines(&self) -> Vec<String> {
        if !self.mounted || self.hidden {
            return Vec::new();
        }
        let side = match self.position {
            SidebarPosition::Left => "left",
            SidebarPosition::Right => "right",
        };
        let mut lines = vec![format!(
            "== {} ({}) [{}px, {}{}] ==",
            self.texts.title,
            self.count,
            self.width,
            side,
            if self.resizing { ", resizing" } else { "" }
        )];
        if self.loading {
            lines.push(format!("   {}", self.texts.loading));
            return lines;
        }
        if self.top_spacer > 0.0 {
            lines.push(format!("   ... {:.0}px above", self.top_spacer));
        }
        for row in &self.rows {
            let marker = if row.active { '>' } else { ' ' };
            let icon = match row.role {
                Role::User => "you",
                Role::Ai => "ai ",
            };
            lines.push(format!(" {marker} [{icon}] {}  ({})", row.summary, row.id));
            if let Some(stamp) = &row.timestamp {
                lines.push(format!("         {stamp}"));
            }
        }
        if self.bottom_spacer > 0.0 {
            lines.push(format!("   ... {:.0}px below", self.bottom_spacer));
        }
        lines
    }
}

impl PanelSurface for TextSurface {
    fn panel_exists(&self) -> bool {
        self.mounted
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn apply(&mut self, command: PanelCommand) {
        match command {
            PanelCommand::Mount {
                width,
                position,
                hidden,
            } => {
                self.mounted = true;
                self.width = width;
                self.position = position;
                self.hidden = hidden;
            }
            PanelCommand::SetWidth(width) => self.width = width,
            PanelCommand::SetPosition(position) => self.position = position,
            PanelCommand::SetHidden(hidden) => self.hidden = hidden,
            PanelCommand::SetLoading(loading) => self.loading = loading,
            PanelCommand::SetResizing(resizing) => self.resizing = resizing,
            PanelCommand::SetCount(count) => self.count = count,
            PanelCommand::SetTexts(texts) => self.texts = texts,
            PanelCommand::ResetScroll => self.viewport.scroll_top = 0.0,
            PanelCommand::RenderRows {
                top_spacer,
                bottom_spacer,
                rows,
            } => {
                self.top_spacer = top_spacer;
                self.bottom_spacer = bottom_spacer;
                self.rows = rows;
            }
            PanelCommand::ScrollPageTo {
                element,
                highlight,
                flash_for,
            } => {
                self.flash = Some((highlight, Instant::now() + flash_for));
                self.scroll_requests.push(ScrollRequest {
                    element,
                    highlight,
                    flash_for,
                });
            }
        }
        self.dirty = true;
    }

    fn measure_row_height(&self) -> Option<f32> {
        let row = self.rows.first()?;
        let lines = if row.timestamp.is_some() { 2.0 } else { 1.0 };
        Some(lines * ROW_LINE_HEIGHT + ROW_GAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acn_core::{Localizer, Message, Navigator, Settings, SettingsPatch};
    use ego_tree::Tree;

    fn messages(count: usize) -> Vec<Message> {
        let mut tree = Tree::new(());
        (0..count)
            .map(|i| {
                let node = tree.root_mut().append(()).id();
                Message {
                    id: format!("m{i}"),
                    role: if i % 2 == 0 { Role::User } else { Role::Ai },
                    content: format!("Question number {i} about borrowing?"),
                    timestamp: "10:00".into(),
                    element: node,
                    highlight: node,
                }
            })
            .collect()
    }

    #[test]
    fn row_height_follows_timestamp_setting() {
        let mut nav = Navigator::new(
            TextSurface::new(LIST_VIEWPORT_HEIGHT),
            Settings::default(),
            Localizer::new(None),
            true,
        );
        nav.mount();
        nav.set_messages(messages(40));
        nav.on_frame();
        nav.on_frame();
        assert_eq!(nav.item_height(), ROW_LINE_HEIGHT + ROW_GAP);

        nav.update_settings(&SettingsPatch {
            show_timestamp: Some(true),
            ..SettingsPatch::default()
        });
        nav.on_frame();
        nav.on_frame();
        assert_eq!(nav.item_height(), 2.0 * ROW_LINE_HEIGHT + ROW_GAP);
    }

    #[test]
    fn hidden_panel_draws_nothing() {
        let mut surface = TextSurface::new(100.0);
        surface.apply(PanelCommand::Mount {
            width: 280,
            position: SidebarPosition::Right,
            hidden: true,
        });
        assert!(surface.render_lines().is_empty());
        surface.apply(PanelCommand::SetHidden(false));
        assert_eq!(surface.render_lines().len(), 1);
        assert!(surface.take_dirty(Instant::now()));
        assert!(!surface.take_dirty(Instant::now()));
    }
}
