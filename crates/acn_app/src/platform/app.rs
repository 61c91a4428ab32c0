use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use acn_core::{
    create_summary, semantic_search, Localizer, Message, Msg, Navigator, Role, Settings,
    SettingsStore,
};
use acn_engine::{
    decode_snapshot, hostname_of, ChannelUpdateSink, DecodeError, HtmlTree, LocatorRegistry,
    Scanner, ScannerConfig,
};
use acn_logging::{acn_debug, acn_info, acn_warn};
use serde::Serialize;
use thiserror::Error;

use super::input::{parse_command, parse_setting};
use super::persistence::{open_settings_store, RonSettingsStore};
use super::session::{Flow, Session};
use super::surface::{TextSurface, LIST_VIEWPORT_HEIGHT};

const API_KEY_ENV: &str = "ACN_API_KEY";

#[derive(Debug, Error)]
pub enum InitError {
    #[error("cannot read snapshot {path:?}: {source}")]
    Snapshot { path: PathBuf, source: io::Error },
    #[error("cannot decode snapshot {path:?}: {source}")]
    Decode { path: PathBuf, source: DecodeError },
}

/// One outline row as printed by `acn scan --json`.
#[derive(Debug, Serialize)]
struct OutlineEntry<'a> {
    id: &'a str,
    role: Role,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<&'a str>,
    content: &'a str,
}

pub struct ScanRequest {
    pub file: PathBuf,
    pub url: Option<String>,
    pub filter: Option<String>,
    pub semantic: Option<String>,
    pub json: bool,
}

pub struct WatchRequest {
    pub file: PathBuf,
    pub url: Option<String>,
    pub interval: Duration,
    pub hidden: bool,
}

fn load_snapshot(path: &Path) -> Result<String, InitError> {
    let bytes = fs::read(path).map_err(|source| InitError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = decode_snapshot(&bytes, None).map_err(|source| InitError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    acn_debug!("snapshot {:?}: {} ({} bytes)", path, decoded.encoding_label, bytes.len());
    Ok(decoded.html)
}

fn page_url(file: &Path, url: Option<String>) -> String {
    url.unwrap_or_else(|| format!("file://{}", file.display()))
}

/// One-shot outline of a saved page.
pub fn run_scan(request: ScanRequest, settings_dir: &Path) -> anyhow::Result<()> {
    let html = load_snapshot(&request.file)?;
    let url = page_url(&request.file, request.url);
    let rules = LocatorRegistry::builtin().for_url(&url);
    let mut host = HtmlTree::parse(hostname_of(&url).unwrap_or_default(), &html);

    let (tx, rx) = mpsc::channel();
    let mut scanner = Scanner::new(
        rules,
        ScannerConfig::default(),
        Box::new(ChannelUpdateSink::new(tx)),
    );
    scanner.scan(&mut host);
    let messages: Vec<Message> = rx.try_iter().last().unwrap_or_default();
    acn_info!(
        "scan: {} messages from {:?} using {} rules",
        messages.len(),
        request.file,
        scanner.rules().name
    );

    if let Some(query) = request.semantic.as_deref() {
        let api_key = std::env::var(API_KEY_ENV).ok();
        let ids = semantic_search(query, &messages, api_key.as_deref())?;
        acn_info!("scan: semantic search matched {} messages", ids.len());
    }

    let settings = open_settings_store(settings_dir).get_settings();
    let mut nav = Navigator::new(
        TextSurface::new(LIST_VIEWPORT_HEIGHT),
        settings,
        Localizer::new(system_locale()),
        true,
    );
    nav.set_messages(messages);
    if let Some(filter) = request.filter.as_deref() {
        nav.set_filter_text(filter);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if request.json {
        let entries: Vec<OutlineEntry<'_>> = nav
            .filtered_messages()
            .map(|msg| OutlineEntry {
                id: &msg.id,
                role: msg.role,
                summary: create_summary(&msg.content),
                timestamp: Some(msg.timestamp.as_str()).filter(|stamp| !stamp.is_empty()),
                content: &msg.content,
            })
            .collect();
        serde_json::to_writer_pretty(&mut out, &entries)?;
        writeln!(out)?;
    } else {
        for msg in nav.filtered_messages() {
            let stamp = if settings.show_timestamp && !msg.timestamp.is_empty() {
                format!("  [{}]", msg.timestamp)
            } else {
                String::new()
            };
            writeln!(
                out,
                "{:<4} {}  ({}){}",
                msg.role.as_str(),
                create_summary(&msg.content),
                msg.id,
                stamp
            )?;
        }
    }
    Ok(())
}

enum Event {
    Snapshot(String),
    Input(String),
    InputClosed,
}

/// Interactive session over a snapshot file that is re-read when it changes.
pub fn run_watch(request: WatchRequest, settings_dir: &Path) -> anyhow::Result<()> {
    let html = load_snapshot(&request.file)?;
    let url = page_url(&request.file, request.url);
    let rules = LocatorRegistry::builtin().for_url(&url);
    let host = HtmlTree::parse(hostname_of(&url).unwrap_or_default(), &html);
    let store = open_settings_store(settings_dir);

    let now = Instant::now();
    let mut session = Session::new(host, rules, store, &url, system_locale(), now);
    if !request.hidden {
        session.dispatch(Msg::VisibilityRequested(true), now);
    }

    let (tx, rx) = mpsc::channel();
    spawn_snapshot_watcher(request.file.clone(), html, request.interval, tx.clone());
    spawn_input_reader(tx);

    let stdout = io::stdout();
    writeln!(stdout.lock(), "watching {:?}; /help for commands", request.file)?;
    loop {
        let now = Instant::now();
        session.tick(now);
        print_lines(&stdout, session.take_output(now))?;

        let timeout = session.next_deadline(now).saturating_duration_since(now);
        match rx.recv_timeout(timeout) {
            Ok(Event::Snapshot(html)) => session.replace_page(&html),
            Ok(Event::Input(line)) => match parse_command(&line) {
                Ok(Some(command)) => {
                    if session.handle(command, Instant::now()) == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => print_lines(&stdout, vec![err.to_string()])?,
            },
            Ok(Event::InputClosed) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    acn_info!("watch: session ended");
    Ok(())
}

fn print_lines(stdout: &io::Stdout, lines: Vec<String>) -> io::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let mut out = stdout.lock();
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

fn spawn_snapshot_watcher(path: PathBuf, initial: String, interval: Duration, tx: mpsc::Sender<Event>) {
    thread::spawn(move || {
        let mut last_text = initial;
        let mut last_modified = modified(&path);
        loop {
            thread::sleep(interval);
            let stamp = modified(&path);
            if stamp == last_modified {
                continue;
            }
            last_modified = stamp;
            let html = match load_snapshot(&path) {
                Ok(html) => html,
                Err(err) => {
                    acn_warn!("watch: {}", err);
                    continue;
                }
            };
            if html == last_text {
                continue;
            }
            acn_debug!("watch: snapshot changed ({} chars)", html.len());
            last_text = html.clone();
            if tx.send(Event::Snapshot(html)).is_err() {
                break;
            }
        }
    });
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn spawn_input_reader(tx: mpsc::Sender<Event>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(Event::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Event::InputClosed);
    });
}

pub fn run_settings_show(settings_dir: &Path) -> anyhow::Result<()> {
    let store = RonSettingsStore::open(settings_dir)?;
    print_settings(&store.get_settings(), store.path())
}

pub fn run_settings_set(settings_dir: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let patch = parse_setting(key, value)?;
    let mut store = RonSettingsStore::open(settings_dir)?;
    let settings = store.set_settings(&patch);
    print_settings(&settings, store.path())
}

fn print_settings(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    let text = ron::ser::to_string_pretty(settings, ron::ser::PrettyConfig::new())?;
    let mut out = io::stdout().lock();
    writeln!(out, "# {}", path.display())?;
    writeln!(out, "{text}")?;
    Ok(())
}

pub fn run_sites() -> anyhow::Result<()> {
    let registry = LocatorRegistry::builtin();
    let mut out = io::stdout().lock();
    for rules in registry.rule_sets() {
        writeln!(out, "{:<10} {:<10} {}", rules.id, rules.name, rules.hostnames.join(", "))?;
    }
    writeln!(out, "{:<10} {:<10} (any other host)", registry.generic().id, registry.generic().name)?;
    Ok(())
}

fn system_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|value| !value.is_empty()))
}
