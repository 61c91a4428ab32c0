#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver};
use std::sync::Once;

use acn_core::Message;
use acn_engine::{ChannelUpdateSink, HtmlTree, LocatorRegistry, Scanner, ScannerConfig};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(acn_logging::initialize_for_tests);
}

/// Scanner over the rules for `host`'s hostname, reporting into a channel.
pub fn scanner_for(host: &HtmlTree) -> (Scanner, Receiver<Vec<Message>>) {
    use acn_engine::HostTree;
    let (tx, rx) = mpsc::channel();
    let rules = LocatorRegistry::builtin().for_hostname(host.hostname());
    let scanner = Scanner::new(
        rules,
        ScannerConfig::default(),
        Box::new(ChannelUpdateSink::new(tx)),
    );
    (scanner, rx)
}

pub fn ids(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}

pub fn drain(rx: &Receiver<Vec<Message>>) -> Vec<Vec<Message>> {
    rx.try_iter().collect()
}

pub fn thread_page(ids: &[&str]) -> HtmlTree {
    let turns: String = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            format!(
                r#"<div data-message-id="{id}" data-message-author-role="{role}">text of {id}</div>"#
            )
        })
        .collect();
    HtmlTree::parse(
        "example.com",
        &format!(r#"<html><body><main id="thread">{turns}</main></body></html>"#),
    )
}

pub fn node(host: &HtmlTree, css: &str) -> acn_core::NodeId {
    host.select_ids(css)[0]
}
