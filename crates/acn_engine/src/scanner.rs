use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use acn_core::{hash_string, Debouncer, Message, NodeId};
use acn_logging::{acn_debug, acn_info, acn_warn};

use crate::extract::extract_messages;
use crate::host::{HostTree, MutationSubscription};
use crate::registry::CompiledRules;

/// Receives every changed message sequence.
pub trait UpdateSink {
    fn on_update(&self, messages: Vec<Message>);
}

pub struct ChannelUpdateSink {
    tx: mpsc::Sender<Vec<Message>>,
}

impl ChannelUpdateSink {
    pub fn new(tx: mpsc::Sender<Vec<Message>>) -> Self {
        Self { tx }
    }
}

impl UpdateSink for ChannelUpdateSink {
    fn on_update(&self, messages: Vec<Message>) {
        let count = messages.len();
        if self.tx.send(messages).is_err() {
            acn_warn!("scanner: update receiver gone, dropped {count} messages");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Quiet period after the last mutation before a scan runs.
    pub debounce: Duration,
    /// Retry interval while the document has no body.
    pub body_poll: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            body_poll: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartOptions {
    /// Scan once before observation begins.
    pub immediate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    WaitingForBody,
    Observing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Unchanged,
    Updated { count: usize },
    /// Same ids and content, but the page nodes behind them were re-created.
    /// The fresh sequence is held for [`Scanner::take_rebound`].
    Rebound { count: usize },
}

enum State {
    Idle,
    WaitingForBody { next_poll: Instant, immediate: bool },
    Observing(MutationSubscription),
}

/// Re-derives the message list from the host tree and reports it only when
/// its fingerprint changes.
///
/// Time is driven by the caller: [`Scanner::tick`] drains pending mutation
/// records and fires the debounced scan, [`Scanner::next_deadline`] tells the
/// loop how long it may sleep.
pub struct Scanner {
    rules: Arc<CompiledRules>,
    config: ScannerConfig,
    sink: Box<dyn UpdateSink>,
    state: State,
    debounce: Debouncer,
    last_signature: String,
    /// Element and highlight handles of the last reported sequence.
    last_handles: Vec<(NodeId, NodeId)>,
    last_generation: u64,
    rebound: Option<Vec<Message>>,
}

impl Scanner {
    pub fn new(rules: Arc<CompiledRules>, config: ScannerConfig, sink: Box<dyn UpdateSink>) -> Self {
        Self {
            rules,
            config,
            sink,
            state: State::Idle,
            debounce: Debouncer::new(config.debounce),
            last_signature: String::new(),
            last_handles: Vec::new(),
            last_generation: 0,
            rebound: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.state {
            State::Idle => Lifecycle::Idle,
            State::WaitingForBody { .. } => Lifecycle::WaitingForBody,
            State::Observing(_) => Lifecycle::Observing,
        }
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn last_signature(&self) -> &str {
        &self.last_signature
    }

    /// No-op unless idle. Without a document body, polls until one appears.
    pub fn start<H: HostTree + ?Sized>(&mut self, host: &mut H, options: StartOptions, now: Instant) {
        if !matches!(self.state, State::Idle) {
            return;
        }
        acn_info!(
            "scanner: starting on {} with {} rules",
            host.hostname(),
            self.rules.id
        );
        if host.document().is_none() {
            acn_debug!("scanner: no body yet, polling");
            self.state = State::WaitingForBody {
                next_poll: now + self.config.body_poll,
                immediate: options.immediate,
            };
            return;
        }
        self.begin_observing(host, options.immediate);
    }

    fn begin_observing<H: HostTree + ?Sized>(&mut self, host: &mut H, immediate: bool) {
        if immediate {
            self.scan(host);
        }
        self.state = State::Observing(host.subscribe());
    }

    /// Drops the subscription and any pending scan. The last signature is kept.
    pub fn stop<H: HostTree + ?Sized>(&mut self, host: &mut H) {
        if let State::Observing(subscription) = std::mem::replace(&mut self.state, State::Idle) {
            host.unsubscribe(subscription.id);
        }
        self.debounce.cancel();
        acn_debug!("scanner: stopped");
    }

    pub fn tick<H: HostTree + ?Sized>(&mut self, host: &mut H, now: Instant) {
        match &self.state {
            State::Idle => {}
            State::WaitingForBody {
                next_poll,
                immediate,
            } => {
                if now < *next_poll {
                    return;
                }
                let immediate = *immediate;
                if host.document().is_some() {
                    acn_debug!("scanner: body appeared");
                    self.begin_observing(host, immediate);
                } else {
                    self.state = State::WaitingForBody {
                        next_poll: now + self.config.body_poll,
                        immediate,
                    };
                }
            }
            State::Observing(subscription) => {
                let mut changed = false;
                loop {
                    match subscription.records.try_recv() {
                        Ok(_) => changed = true,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            acn_warn!("scanner: mutation feed closed");
                            break;
                        }
                    }
                }
                if changed {
                    self.debounce.trigger(now);
                }
                if self.debounce.fire(now) {
                    self.scan(host);
                }
            }
        }
    }

    /// Earliest instant at which [`Scanner::tick`] has timer work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            State::WaitingForBody { next_poll, .. } => Some(*next_poll),
            State::Observing(_) => self.debounce.deadline(),
            State::Idle => None,
        }
    }

    pub fn has_pending_scan(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Latest sequence whose page handles changed under an unchanged signature.
    pub fn take_rebound(&mut self) -> Option<Vec<Message>> {
        self.rebound.take()
    }

    /// One synchronous pass. Emits to the sink only when the sequence changed.
    pub fn scan<H: HostTree + ?Sized>(&mut self, host: &mut H) -> ScanOutcome {
        let messages = match host.document() {
            Some(doc) => extract_messages(doc, &self.rules),
            None => Vec::new(),
        };
        for msg in &messages {
            host.mark_processed(msg.element);
        }
        host.prune_marks();

        let signature = signature(&messages);
        let handles: Vec<(NodeId, NodeId)> = messages
            .iter()
            .map(|msg| (msg.element, msg.highlight))
            .collect();
        let generation = host.generation();
        let count = messages.len();
        if signature == self.last_signature {
            let recreated = !handles.is_empty()
                && (handles != self.last_handles || generation != self.last_generation);
            if !recreated {
                acn_debug!("scanner: {count} messages, unchanged");
                return ScanOutcome::Unchanged;
            }
            acn_debug!("scanner: {count} messages, unchanged but re-created");
            self.last_handles = handles;
            self.last_generation = generation;
            self.rebound = Some(messages);
            return ScanOutcome::Rebound { count };
        }
        self.last_signature = signature;
        self.last_handles = handles;
        self.last_generation = generation;
        self.rebound = None;
        acn_debug!("scanner: {count} messages, emitting update");
        self.sink.on_update(messages);
        ScanOutcome::Updated { count }
    }
}

/// Order-sensitive fingerprint of a message sequence.
fn signature(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| format!("{}:{}", msg.id, hash_string(&msg.content)))
        .collect::<Vec<_>>()
        .join("|")
}
