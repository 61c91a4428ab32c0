use std::collections::HashMap;
use std::time::{Duration, Instant};

use acn_logging::{acn_debug, acn_trace};

use crate::debounce::Debouncer;
use crate::i18n::{keys, Localizer};
use crate::message::{Message, NodeId};
use crate::settings::{clamp_width, Settings, SettingsPatch, SidebarPosition};
use crate::summary::create_summary;
use crate::view_model::{PanelCommand, PanelTexts, RowView};
use crate::virtual_list::{visible_range, OVERSCAN_ROWS};

/// Row height estimate used until the first row has been measured.
pub const DEFAULT_ITEM_HEIGHT: f32 = 56.0;
/// Measured heights closer than this to the estimate are ignored.
pub const ROW_HEIGHT_EPSILON: f32 = 0.5;
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(150);
pub const FLASH_DURATION: Duration = Duration::from_millis(1400);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub height: f32,
    pub scroll_top: f32,
}

/// The panel the navigator draws into.
pub trait PanelSurface {
    /// True when a panel from an earlier mount is already attached.
    fn panel_exists(&self) -> bool;
    fn viewport(&self) -> Viewport;
    fn apply(&mut self, command: PanelCommand);
    /// Rendered height of one materialized row plus the inter-row gap.
    fn measure_row_height(&self) -> Option<f32>;
}

/// Tells whether a page node is still attached to the document.
pub trait NodeLiveness {
    fn is_connected(&self, node: NodeId) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct ResizeDrag {
    start_x: f32,
    start_width: u32,
}

/// Virtualized, filterable outline of the conversation.
///
/// Holds the full message list and a filtered view of it, renders only the
/// rows that intersect the list viewport, and coalesces render requests to at
/// most one per display frame. The host calls [`Navigator::on_frame`] whenever
/// [`Navigator::frame_pending`] is true.
pub struct Navigator<S> {
    surface: S,
    localizer: Localizer,
    settings: Settings,
    mounted: bool,
    visible: bool,
    loading: bool,
    needs_filter: bool,

    messages: Vec<Message>,
    index_by_id: HashMap<String, usize>,
    filtered: Vec<usize>,
    active_id: Option<String>,
    filter_text: String,

    search: Debouncer,
    pending_search: Option<String>,

    item_height: f32,
    render_scheduled: bool,
    force_render: bool,
    last_range: Option<(usize, usize)>,

    resize: Option<ResizeDrag>,
    persist_requests: Vec<SettingsPatch>,
}

impl<S: PanelSurface> Navigator<S> {
    pub fn new(surface: S, settings: Settings, localizer: Localizer, visible: bool) -> Self {
        let mut localizer = localizer;
        localizer.set_locale(settings.language);
        Self {
            surface,
            localizer,
            settings,
            mounted: false,
            visible,
            loading: false,
            needs_filter: false,
            messages: Vec::new(),
            index_by_id: HashMap::new(),
            filtered: Vec::new(),
            active_id: None,
            filter_text: String::new(),
            search: Debouncer::new(SEARCH_DEBOUNCE),
            pending_search: None,
            item_height: DEFAULT_ITEM_HEIGHT,
            render_scheduled: false,
            force_render: false,
            last_range: None,
            resize: None,
            persist_requests: Vec::new(),
        }
    }

    /// Attaches the panel. Idempotent; an already attached panel is reused.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        if self.surface.panel_exists() {
            acn_debug!("navigator: reusing existing panel");
            return;
        }

        self.settings.sidebar_width = clamp_width(self.settings.sidebar_width);
        self.surface.apply(PanelCommand::Mount {
            width: self.settings.sidebar_width,
            position: self.settings.sidebar_position,
            hidden: !self.visible,
        });
        self.surface.apply(PanelCommand::SetCount(self.messages.len()));
        self.update_texts();
        self.set_loading(false);
    }

    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.index_by_id = messages
            .iter()
            .enumerate()
            .map(|(idx, msg)| (msg.id.clone(), idx))
            .collect();
        self.messages = messages;
        if self.mounted {
            self.surface.apply(PanelCommand::SetCount(self.messages.len()));
        }

        if !self.visible {
            self.needs_filter = true;
            return;
        }
        self.apply_filter();
    }

    /// Swaps in fresh page handles for a sequence with the same ids, keeping
    /// the filter, active item and rendered rows. A different id sequence
    /// falls back to [`Navigator::set_messages`].
    pub fn rebind_messages(&mut self, messages: Vec<Message>) {
        let same_ids = messages.len() == self.messages.len()
            && messages
                .iter()
                .zip(&self.messages)
                .all(|(fresh, held)| fresh.id == held.id);
        if !same_ids {
            self.set_messages(messages);
            return;
        }
        for (held, fresh) in self.messages.iter_mut().zip(messages) {
            held.element = fresh.element;
            held.highlight = fresh.highlight;
        }
        acn_trace!("navigator: rebound {} messages", self.messages.len());
    }

    /// Replaces the filter text immediately.
    pub fn set_filter_text(&mut self, text: &str) {
        self.filter_text = text.to_lowercase();
        if !self.visible {
            self.needs_filter = true;
            return;
        }
        self.apply_filter();
    }

    /// Records search box input; applied after [`SEARCH_DEBOUNCE`] of quiet
    /// by [`Navigator::poll_timers`], together with a scroll reset.
    pub fn search_input(&mut self, text: &str, now: Instant) {
        self.pending_search = Some(text.to_string());
        self.search.trigger(now);
    }

    pub fn poll_timers(&mut self, now: Instant) {
        if self.search.fire(now) {
            if let Some(text) = self.pending_search.take() {
                if self.mounted {
                    self.surface.apply(PanelCommand::ResetScroll);
                }
                self.set_filter_text(&text);
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    /// Rebuilds `filtered_messages` from scratch and forces a render.
    pub fn apply_filter(&mut self) {
        self.filtered = if self.filter_text.is_empty() {
            (0..self.messages.len()).collect()
        } else {
            let needle = self.filter_text.as_str();
            self.messages
                .iter()
                .enumerate()
                .filter(|(_, msg)| msg.content.to_lowercase().contains(needle))
                .map(|(idx, _)| idx)
                .collect()
        };
        acn_debug!(
            "navigator: filter {:?} kept {} of {}",
            self.filter_text,
            self.filtered.len(),
            self.messages.len()
        );
        self.schedule_render(true);
    }

    pub fn set_active_message(&mut self, id: &str) {
        if self.active_id.as_deref() == Some(id) {
            return;
        }
        self.active_id = Some(id.to_string());
        self.schedule_render(true);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        if self.mounted {
            self.surface.apply(PanelCommand::SetLoading(loading));
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if self.mounted {
            self.surface.apply(PanelCommand::SetHidden(!visible));
        }
        if visible {
            if self.needs_filter {
                self.needs_filter = false;
                self.apply_filter();
            } else {
                self.schedule_render(true);
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn update_settings(&mut self, patch: &SettingsPatch) {
        self.settings.apply(patch);
        self.settings.sidebar_width = clamp_width(self.settings.sidebar_width);
        if patch.language.is_some() {
            self.localizer.set_locale(self.settings.language);
        }
        if self.mounted {
            self.surface
                .apply(PanelCommand::SetWidth(self.settings.sidebar_width));
            self.surface
                .apply(PanelCommand::SetPosition(self.settings.sidebar_position));
            self.surface.apply(PanelCommand::SetHidden(!self.visible));
        }
        self.update_texts();
        if self.visible {
            self.apply_filter();
        } else {
            self.needs_filter = true;
        }
    }

    /// Re-applies localized labels to the panel chrome.
    pub fn update_texts(&mut self) {
        if !self.mounted {
            return;
        }
        let texts = PanelTexts {
            title: self.localizer.t(keys::SIDEBAR_TITLE, "Navigator"),
            search_placeholder: self.localizer.t(keys::SEARCH_PLACEHOLDER, "Search messages..."),
            loading: self.localizer.t(keys::LOADING, "Loading..."),
        };
        self.surface.apply(PanelCommand::SetTexts(texts));
    }

    /// List viewport scrolled; re-render only if the visible range moved.
    pub fn on_scroll(&mut self) {
        self.schedule_render(false);
    }

    pub fn schedule_render(&mut self, force: bool) {
        if !self.visible {
            self.force_render = self.force_render || force;
            return;
        }
        if self.render_scheduled && !force {
            return;
        }
        self.force_render = self.force_render || force;
        self.render_scheduled = true;
    }

    pub fn frame_pending(&self) -> bool {
        self.render_scheduled
    }

    /// Display-refresh callback. Returns true when a scheduled render ran.
    pub fn on_frame(&mut self) -> bool {
        if !self.render_scheduled {
            return false;
        }
        self.render_scheduled = false;
        self.render();
        true
    }

    fn render(&mut self) {
        if !self.mounted || !self.visible {
            return;
        }

        let force = std::mem::take(&mut self.force_render);
        let total = self.filtered.len();
        let viewport = self.surface.viewport();
        let range = visible_range(
            total,
            viewport.scroll_top,
            viewport.height,
            self.item_height,
            OVERSCAN_ROWS,
        );

        if !force && self.last_range == Some((range.start, range.end)) {
            acn_trace!("navigator: range unchanged, skipping render");
            return;
        }
        self.last_range = Some((range.start, range.end));

        let rows: Vec<RowView> = self.filtered[range.start..range.end]
            .iter()
            .filter_map(|&idx| self.messages.get(idx))
            .map(|msg| self.row_view(msg))
            .collect();
        acn_debug!(
            "frame {}: rows {}..{} of {} (row height {:.1})",
            acn_logging::frame_tick(),
            range.start,
            range.end,
            total,
            self.item_height
        );
        let has_rows = !rows.is_empty();
        self.surface.apply(PanelCommand::RenderRows {
            top_spacer: range.top_spacer,
            bottom_spacer: range.bottom_spacer,
            rows,
        });
        if has_rows {
            self.update_item_metrics();
        }
    }

    fn row_view(&self, msg: &Message) -> RowView {
        let timestamp = (self.settings.show_timestamp && !msg.timestamp.is_empty())
            .then(|| msg.timestamp.clone());
        RowView {
            id: msg.id.clone(),
            role: msg.role,
            summary: create_summary(&msg.content),
            timestamp,
            active: self.active_id.as_deref() == Some(msg.id.as_str()),
        }
    }

    fn update_item_metrics(&mut self) {
        let Some(measured) = self.surface.measure_row_height() else {
            return;
        };
        let next = measured.max(1.0);
        if (next - self.item_height).abs() > ROW_HEIGHT_EPSILON {
            acn_debug!(
                "navigator: row height {:.1} -> {:.1}",
                self.item_height,
                next
            );
            self.item_height = next;
            self.schedule_render(true);
        }
    }

    /// Jumps the page to a message. Unknown ids and detached elements are ignored.
    pub fn scroll_to_message<L>(&mut self, id: &str, page: &L)
    where
        L: NodeLiveness + ?Sized,
    {
        let Some((element, highlight)) = self.message(id).map(|msg| (msg.element, msg.highlight))
        else {
            return;
        };
        if !page.is_connected(element) {
            acn_debug!("navigator: message {} is detached", id);
            return;
        }
        let highlight = if page.is_connected(highlight) {
            highlight
        } else {
            element
        };
        self.surface.apply(PanelCommand::ScrollPageTo {
            element,
            highlight,
            flash_for: FLASH_DURATION,
        });
        self.set_active_message(id);
    }

    pub fn begin_resize(&mut self, pointer_x: f32) {
        self.resize = Some(ResizeDrag {
            start_x: pointer_x,
            start_width: self.settings.sidebar_width,
        });
        if self.mounted {
            self.surface.apply(PanelCommand::SetResizing(true));
        }
    }

    /// Applies the live width while dragging; the panel grows away from its docked edge.
    pub fn drag_resize(&mut self, pointer_x: f32) {
        let Some(drag) = self.resize else {
            return;
        };
        let delta = match self.settings.sidebar_position {
            SidebarPosition::Right => drag.start_x - pointer_x,
            SidebarPosition::Left => pointer_x - drag.start_x,
        };
        let raw = (drag.start_width as f32 + delta).round().max(0.0) as u32;
        let width = clamp_width(raw);
        if width == self.settings.sidebar_width {
            return;
        }
        self.settings.sidebar_width = width;
        if self.mounted {
            self.surface.apply(PanelCommand::SetWidth(width));
        }
    }

    /// Ends the drag and queues the final width for persistence.
    pub fn end_resize(&mut self) {
        if self.resize.take().is_none() {
            return;
        }
        if self.mounted {
            self.surface.apply(PanelCommand::SetResizing(false));
        }
        self.persist_requests
            .push(SettingsPatch::width(self.settings.sidebar_width));
    }

    pub fn take_persist_requests(&mut self) -> Vec<SettingsPatch> {
        std::mem::take(&mut self.persist_requests)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.index_by_id.get(id).and_then(|&idx| self.messages.get(idx))
    }

    pub fn filtered_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.filtered.iter().filter_map(|&idx| self.messages.get(idx))
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn item_height(&self) -> f32 {
        self.item_height
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn needs_filter(&self) -> bool {
        self.needs_filter
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
