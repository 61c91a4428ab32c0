use std::sync::Arc;
use std::time::{Duration, Instant};

use acn_core::{update, AppState, Localizer, Msg, Navigator, SessionView, SettingsStore};
use acn_engine::{CompiledRules, HtmlTree, ScannerConfig};
use acn_logging::{acn_debug, acn_info, acn_warn};

use super::effects::EffectRunner;
use super::input::{Command, HELP};
use super::surface::{TextSurface, LIST_VIEWPORT_HEIGHT};

pub const URL_POLL_INTERVAL: Duration = Duration::from_millis(800);
/// Display refresh period used to pace navigator renders.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One page session: the orchestrator state, the navigator panel and the
/// effect runner that owns the page tree.
pub struct Session {
    state: AppState,
    nav: Navigator<TextSurface>,
    runner: EffectRunner,
    page_url: String,
    next_url_check: Instant,
    page_scrolled: bool,
    notes: Vec<String>,
}

impl Session {
    pub fn new(
        host: HtmlTree,
        rules: Arc<CompiledRules>,
        store: Box<dyn SettingsStore>,
        url: &str,
        system_locale: Option<String>,
        now: Instant,
    ) -> Self {
        let settings = store.get_settings();
        let mut nav = Navigator::new(
            TextSurface::new(LIST_VIEWPORT_HEIGHT),
            settings,
            Localizer::new(system_locale),
            false,
        );
        nav.mount();
        acn_info!("session: {} with {} rules", url, rules.name);
        Self {
            state: AppState::new(settings, url),
            nav,
            runner: EffectRunner::new(host, rules, ScannerConfig::default(), store, now),
            page_url: url.to_string(),
            next_url_check: now + URL_POLL_INTERVAL,
            page_scrolled: false,
            notes: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, msg: Msg, now: Instant) {
        acn_debug!("session: {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(effects, &mut self.nav, now);
    }

    /// Advances every timer-driven part of the session to `now`.
    pub fn tick(&mut self, now: Instant) {
        for msg in self.runner.poll(&mut self.nav, now) {
            self.dispatch(msg, now);
        }

        self.nav.poll_timers(now);
        for patch in self.nav.take_persist_requests() {
            self.dispatch(Msg::PersistRequested(patch), now);
        }

        if now >= self.next_url_check {
            self.next_url_check = now + URL_POLL_INTERVAL;
            if self.state.view().url != self.page_url {
                self.dispatch(Msg::RouteChanged(self.page_url.clone()), now);
            }
        }

        if self.nav.frame_pending() {
            acn_logging::advance_frame_tick();
            self.nav.on_frame();
        }

        for request in self.nav.surface_mut().take_scroll_requests() {
            let Some(rect) = self.runner.host().layout_of(request.element) else {
                acn_warn!("session: no layout for {:?}", request.element);
                continue;
            };
            acn_debug!(
                "session: page to y={} flashing {:?} for {:?}",
                rect.top,
                request.highlight,
                request.flash_for
            );
            self.runner.host_mut().set_scroll_y(rect.top);
            self.page_scrolled = true;
        }
        if std::mem::take(&mut self.page_scrolled) {
            self.dispatch(Msg::PageScrolled, now);
        }
    }

    pub fn handle(&mut self, command: Command, now: Instant) -> Flow {
        match command {
            Command::Toggle => self.dispatch(Msg::ToggleRequested, now),
            Command::Show => self.dispatch(Msg::VisibilityRequested(true), now),
            Command::Hide => self.dispatch(Msg::VisibilityRequested(false), now),
            Command::Filter(text) => self.nav.search_input(&text, now),
            Command::Open(id) => {
                if self.nav.message(&id).is_none() {
                    self.notes.push(format!("no message with id {id:?}"));
                }
                self.nav.scroll_to_message(&id, self.runner.host());
            }
            Command::Scroll(offset) => {
                self.runner.host_mut().set_scroll_y(offset);
                self.page_scrolled = true;
            }
            Command::List(offset) => {
                self.nav.surface_mut().scroll_list_to(offset);
                self.nav.on_scroll();
            }
            Command::Resize(dx) => {
                self.nav.begin_resize(0.0);
                self.nav.drag_resize(dx);
                self.nav.end_resize();
            }
            Command::Url(url) => self.page_url = url,
            Command::Set(patch) => {
                self.runner.store_mut().set_settings(&patch);
            }
            Command::Status => {
                let line = self.status_line();
                self.notes.push(line);
            }
            Command::Help => self.notes.extend(HELP.lines().map(str::to_string)),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Applies a new snapshot of the page as a body replacement.
    pub fn replace_page(&mut self, html: &str) {
        if let Err(err) = self.runner.host_mut().replace_body(html) {
            acn_warn!("session: cannot apply snapshot: {}", err);
        }
    }

    pub fn next_deadline(&self, now: Instant) -> Instant {
        if self.page_scrolled || self.runner.has_requested_scan() {
            return now;
        }
        let mut deadline = self.next_url_check;
        if self.nav.frame_pending() {
            deadline = deadline.min(now + FRAME_INTERVAL);
        }
        for candidate in [self.runner.next_deadline(), self.nav.next_deadline()]
            .into_iter()
            .flatten()
        {
            deadline = deadline.min(candidate);
        }
        deadline
    }

    /// Lines to print, or nothing when the display is unchanged.
    pub fn take_output(&mut self, now: Instant) -> Vec<String> {
        let mut lines = std::mem::take(&mut self.notes);
        let state_changed = self.state.consume_dirty();
        let panel_changed = self.nav.surface_mut().take_dirty(now);
        if !state_changed && !panel_changed {
            return lines;
        }
        let panel = self.nav.surface().render_lines();
        if panel.is_empty() {
            lines.push(self.status_line());
        } else {
            lines.extend(panel);
        }
        lines
    }

    pub fn view(&self) -> SessionView {
        self.state.view()
    }

    #[cfg(test)]
    pub fn navigator(&self) -> &Navigator<TextSurface> {
        &self.nav
    }

    #[cfg(test)]
    pub fn runner(&self) -> &EffectRunner {
        &self.runner
    }

    fn status_line(&self) -> String {
        let view = self.view();
        let stored = self.runner.store().get_settings();
        format!(
            "[{}] {} messages{}, scanner {:?}, page y={:.0}, width {}px, {}",
            if view.visible { "shown" } else { "hidden" },
            view.message_count,
            if view.loading { " (loading)" } else { "" },
            self.runner.scanner().lifecycle(),
            self.runner.host().scroll_y(),
            stored.sidebar_width,
            view.url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acn_core::{MemorySettingsStore, NodeLiveness, Settings, SettingsPatch, MIN_SIDEBAR_WIDTH};
    use acn_engine::LocatorRegistry;
    use pretty_assertions::assert_eq;

    const URL: &str = "https://chatgpt.com/c/1";

    fn page(count: usize) -> String {
        titled_page("Chat", count)
    }

    fn titled_page(title: &str, count: usize) -> String {
        let turns: String = (0..count)
            .map(|i| {
                let role = if i % 2 == 0 { "user" } else { "assistant" };
                format!(
                    r#"<div data-message-id="m{i}" data-message-author-role="{role}"><div class="markdown">turn {i} text</div></div>"#
                )
            })
            .collect();
        format!("<html><body><h1>{title}</h1><main>{turns}</main></body></html>")
    }

    fn session(html: &str, now: Instant) -> Session {
        let host = HtmlTree::parse("chatgpt.com", html);
        let rules = LocatorRegistry::builtin().for_url(URL);
        let store = Box::new(MemorySettingsStore::new(Settings::default()));
        Session::new(host, rules, store, URL, None, now)
    }

    fn shown(html: &str, now: Instant) -> Session {
        let mut session = session(html, now);
        session.dispatch(Msg::VisibilityRequested(true), now);
        session.tick(now);
        session
    }

    fn ids(session: &Session) -> Vec<String> {
        session
            .navigator()
            .messages()
            .iter()
            .map(|msg| msg.id.clone())
            .collect()
    }

    #[test]
    fn showing_scans_and_fills_the_panel() {
        let t0 = Instant::now();
        let session = shown(&page(3), t0);
        assert_eq!(ids(&session), vec!["m0", "m1", "m2"]);
        assert!(!session.navigator().is_loading());
        assert_eq!(session.navigator().active_id(), Some("m0"));
        assert!(session.view().scanner_active);
    }

    #[test]
    fn hidden_session_does_not_scan() {
        let t0 = Instant::now();
        let mut session = session(&page(3), t0);
        session.tick(t0 + Duration::from_secs(1));
        assert!(session.navigator().messages().is_empty());
        assert!(!session.view().scanner_active);
    }

    #[test]
    fn snapshot_change_rescans_after_debounce() {
        let t0 = Instant::now();
        let mut session = shown(&page(2), t0);
        session.replace_page(&page(4));
        session.tick(t0 + Duration::from_millis(100));
        assert_eq!(ids(&session).len(), 2);
        session.tick(t0 + Duration::from_millis(350));
        assert_eq!(ids(&session), vec!["m0", "m1", "m2", "m3"]);
    }

    #[test]
    fn opening_a_message_scrolls_the_page_and_tracks_it() {
        let t0 = Instant::now();
        let mut session = shown(&page(30), t0);
        assert_eq!(session.handle(Command::Open("m12".into()), t0), Flow::Continue);
        session.tick(t0);
        let top = session
            .runner()
            .host()
            .layout_of(session.navigator().message("m12").unwrap().element)
            .unwrap()
            .top;
        assert_eq!(session.runner().host().scroll_y(), top);
        assert_eq!(session.navigator().active_id(), Some("m12"));
    }

    #[test]
    fn edit_outside_messages_keeps_scroll_targets_live() {
        let t0 = Instant::now();
        let mut session = shown(&titled_page("Before", 30), t0);
        session.replace_page(&titled_page("After", 30));
        session.tick(t0);
        let later = t0 + Duration::from_millis(250);
        session.tick(later);

        let m12 = session.navigator().message("m12").unwrap().element;
        assert!(session.runner().host().is_connected(m12));
        let top = session.runner().host().layout_of(m12).unwrap().top;
        assert_eq!(top, 720.0);

        session.handle(Command::Open("m12".into()), later);
        session.tick(later);
        assert_eq!(session.runner().host().scroll_y(), top);
        assert_eq!(session.navigator().active_id(), Some("m12"));
    }

    #[test]
    fn route_change_is_picked_up_by_polling() {
        let t0 = Instant::now();
        let mut session = shown(&page(2), t0);
        session.handle(Command::Url("https://chatgpt.com/c/2".into()), t0);
        session.tick(t0 + Duration::from_millis(100));
        assert_eq!(session.view().url, URL);

        session.tick(t0 + URL_POLL_INTERVAL);
        assert_eq!(session.view().url, "https://chatgpt.com/c/2");
        // Same page content: the cached outline comes back on the next pass.
        session.tick(t0 + URL_POLL_INTERVAL);
        assert_eq!(ids(&session), vec!["m0", "m1"]);
        assert!(!session.navigator().is_loading());
    }

    #[test]
    fn resize_persists_clamped_width() {
        let t0 = Instant::now();
        let mut session = shown(&page(1), t0);
        session.handle(Command::Resize(500.0), t0);
        session.tick(t0);
        assert_eq!(session.view().settings.sidebar_width, MIN_SIDEBAR_WIDTH);
        assert_eq!(
            session.runner().store().get_settings().sidebar_width,
            MIN_SIDEBAR_WIDTH
        );
    }

    #[test]
    fn settings_command_reaches_the_panel() {
        let t0 = Instant::now();
        let mut session = shown(&page(1), t0);
        session.handle(
            Command::Set(SettingsPatch {
                show_timestamp: Some(true),
                ..SettingsPatch::default()
            }),
            t0,
        );
        session.tick(t0);
        assert!(session.navigator().settings().show_timestamp);
        assert!(session.view().settings.show_timestamp);
    }

    #[test]
    fn hiding_prints_a_status_line() {
        let t0 = Instant::now();
        let mut session = shown(&page(2), t0);
        session.take_output(t0);
        session.handle(Command::Hide, t0);
        let output = session.take_output(t0);
        assert_eq!(output.len(), 1);
        assert!(output[0].starts_with("[hidden] 2 messages"));
        assert_eq!(session.handle(Command::Quit, t0), Flow::Quit);
    }
}
