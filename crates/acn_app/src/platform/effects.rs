use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use acn_core::{pick_active, Effect, Message, Msg, Navigator, SettingsPatch, SettingsStore};
use acn_engine::{
    ChannelUpdateSink, CompiledRules, HtmlTree, ScanOutcome, Scanner, ScannerConfig, StartOptions,
};
use acn_logging::{acn_debug, acn_info, acn_warn};

use super::layout::stack_messages;
use super::surface::TextSurface;

const STORE_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Executes orchestrator effects against the page, scanner, store and panel,
/// and turns their asynchronous output back into messages.
pub struct EffectRunner {
    host: HtmlTree,
    scanner: Scanner,
    scan_rx: mpsc::Receiver<Vec<Message>>,
    store: Box<dyn SettingsStore>,
    settings_rx: mpsc::Receiver<SettingsPatch>,
    /// Last sequence the scanner emitted.
    latest: Vec<Message>,
    scan_requested: bool,
    /// Set by `ClearMessages`; an unchanged rescan then re-delivers `latest`.
    cleared: bool,
    next_store_refresh: Instant,
}

impl EffectRunner {
    pub fn new(
        host: HtmlTree,
        rules: Arc<CompiledRules>,
        config: ScannerConfig,
        mut store: Box<dyn SettingsStore>,
        now: Instant,
    ) -> Self {
        let (scan_tx, scan_rx) = mpsc::channel();
        let scanner = Scanner::new(rules, config, Box::new(ChannelUpdateSink::new(scan_tx)));
        let settings_rx = store.on_settings_changed();
        Self {
            host,
            scanner,
            scan_rx,
            store,
            settings_rx,
            latest: Vec::new(),
            scan_requested: false,
            cleared: false,
            next_store_refresh: now + STORE_REFRESH_INTERVAL,
        }
    }

    pub fn run(&mut self, effects: Vec<Effect>, nav: &mut Navigator<TextSurface>, now: Instant) {
        for effect in effects {
            match effect {
                Effect::ShowPanel(visible) => nav.set_visible(visible),
                Effect::SetLoading(loading) => nav.set_loading(loading),
                Effect::PushMessages => {
                    self.cleared = false;
                    stack_messages(&mut self.host, &self.latest);
                    nav.set_messages(self.latest.clone());
                }
                Effect::ClearMessages => {
                    self.cleared = true;
                    nav.set_messages(Vec::new());
                }
                Effect::StartScanner { immediate } => {
                    self.scanner
                        .start(&mut self.host, StartOptions { immediate }, now);
                }
                Effect::StopScanner => self.scanner.stop(&mut self.host),
                Effect::RequestScan => self.scan_requested = true,
                Effect::ApplySettings(patch) => nav.update_settings(&patch),
                Effect::PersistSettings(patch) => {
                    acn_debug!("effects: persisting {:?}", patch);
                    self.store.set_settings(&patch);
                }
                Effect::RefreshActive => {
                    let active = pick_active(nav.messages(), &self.host).map(str::to_owned);
                    if let Some(id) = active {
                        nav.set_active_message(&id);
                    }
                }
                Effect::Reply { visible } => acn_info!("effects: panel visible={}", visible),
            }
        }
    }

    /// Runs due work and collects the messages it produced. Handles that the
    /// scanner re-resolved under an unchanged sequence go straight to `nav`.
    pub fn poll(&mut self, nav: &mut Navigator<TextSurface>, now: Instant) -> Vec<Msg> {
        let mut redeliver = false;
        if std::mem::take(&mut self.scan_requested) {
            let outcome = self.scanner.scan(&mut self.host);
            redeliver = self.cleared && !matches!(outcome, ScanOutcome::Updated { .. });
        }
        self.scanner.tick(&mut self.host, now);

        let mut msgs = Vec::new();
        loop {
            match self.scan_rx.try_recv() {
                Ok(messages) => {
                    msgs.push(Msg::MessagesScanned {
                        count: messages.len(),
                    });
                    self.latest = messages;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    acn_warn!("effects: scanner feed closed");
                    break;
                }
            }
        }

        if let Some(fresh) = self.scanner.take_rebound() {
            self.latest = fresh;
            if !self.cleared {
                acn_debug!("effects: rebinding {} messages", self.latest.len());
                stack_messages(&mut self.host, &self.latest);
                nav.rebind_messages(self.latest.clone());
            }
        }
        if redeliver && msgs.is_empty() {
            acn_debug!("effects: page unchanged after clear, re-delivering");
            msgs.push(Msg::MessagesScanned {
                count: self.latest.len(),
            });
        }

        if now >= self.next_store_refresh {
            self.next_store_refresh = now + STORE_REFRESH_INTERVAL;
            self.store.refresh();
        }
        while let Ok(patch) = self.settings_rx.try_recv() {
            msgs.push(Msg::SettingsChanged(patch));
        }
        msgs
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        let scanner = self.scanner.next_deadline();
        Some(match scanner {
            Some(deadline) => deadline.min(self.next_store_refresh),
            None => self.next_store_refresh,
        })
    }

    pub fn has_requested_scan(&self) -> bool {
        self.scan_requested
    }

    pub fn host(&self) -> &HtmlTree {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut HtmlTree {
        &mut self.host
    }

    pub fn store(&self) -> &dyn SettingsStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn SettingsStore {
        self.store.as_mut()
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }
}
