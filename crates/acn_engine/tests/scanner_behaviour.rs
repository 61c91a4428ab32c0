mod common;

use std::time::{Duration, Instant};

use acn_core::{NodeLiveness, Role};
use acn_engine::{HostTree, HtmlTree, Lifecycle, ScanOutcome, StartOptions};
use common::{drain, ids, init_logging, node, scanner_for, thread_page};
use pretty_assertions::assert_eq;

const SHOW: StartOptions = StartOptions { immediate: true };

#[test]
fn unchanged_tree_emits_once() {
    init_logging();
    let mut host = thread_page(&["m1", "m2"]);
    let (mut scanner, rx) = scanner_for(&host);

    assert_eq!(scanner.scan(&mut host), ScanOutcome::Updated { count: 2 });
    assert_eq!(scanner.scan(&mut host), ScanOutcome::Unchanged);

    let updates = drain(&rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(ids(&updates[0]), vec!["m1", "m2"]);
    assert_eq!(updates[0][0].role, Role::User);
    assert_eq!(updates[0][1].role, Role::Ai);
}

#[test]
fn reordering_changes_the_fingerprint() {
    init_logging();
    let mut host = thread_page(&["m1", "m2", "m3"]);
    let (mut scanner, rx) = scanner_for(&host);
    scanner.scan(&mut host);
    let before = scanner.last_signature().to_string();

    host.move_to_end(node(&host, "[data-message-id='m1']")).unwrap();
    scanner.scan(&mut host);

    assert_ne!(scanner.last_signature(), before);
    let updates = drain(&rx);
    assert_eq!(updates.len(), 2);
    assert_eq!(ids(&updates[1]), vec!["m2", "m3", "m1"]);
}

#[test]
fn appended_message_extends_sequence() {
    init_logging();
    let mut host = thread_page(&["m1", "m2"]);
    let (mut scanner, rx) = scanner_for(&host);
    scanner.scan(&mut host);

    let thread = node(&host, "#thread");
    host.append_html(
        thread,
        r#"<div data-message-id="m3" data-message-author-role="user">third</div>"#,
    )
    .unwrap();
    scanner.scan(&mut host);

    let updates = drain(&rx);
    assert_eq!(ids(&updates[1]), vec!["m1", "m2", "m3"]);
    assert_eq!(updates[1][2].content, "third");
}

#[test]
fn nested_candidates_keep_innermost() {
    init_logging();
    let mut host = HtmlTree::parse(
        "example.com",
        r#"<div data-message-author-role="user"><article id="inner">hello</article></div>"#,
    );
    let (mut scanner, rx) = scanner_for(&host);
    scanner.scan(&mut host);

    let updates = drain(&rx);
    assert_eq!(ids(&updates[0]), vec!["inner"]);
    assert_eq!(updates[0][0].element, node(&host, "#inner"));
}

#[test]
fn empty_messages_are_excluded() {
    init_logging();
    let mut host = HtmlTree::parse(
        "example.com",
        r#"<article id="a">   </article><article id="b">kept</article>"#,
    );
    let (mut scanner, rx) = scanner_for(&host);
    scanner.scan(&mut host);
    assert_eq!(ids(&drain(&rx)[0]), vec!["b"]);
}

#[test]
fn emptied_tree_reports_empty_sequence_once() {
    init_logging();
    let mut host = thread_page(&["m1"]);
    let (mut scanner, rx) = scanner_for(&host);
    scanner.scan(&mut host);

    host.remove(node(&host, "[data-message-id='m1']")).unwrap();
    assert_eq!(scanner.scan(&mut host), ScanOutcome::Updated { count: 0 });
    assert_eq!(scanner.scan(&mut host), ScanOutcome::Unchanged);

    let updates = drain(&rx);
    assert_eq!(updates.len(), 2);
    assert!(updates[1].is_empty());
}

#[test]
fn page_without_messages_starts_silent() {
    init_logging();
    let mut host = HtmlTree::parse("example.com", "<p>nothing here</p>");
    let (mut scanner, rx) = scanner_for(&host);
    assert_eq!(scanner.scan(&mut host), ScanOutcome::Unchanged);
    assert!(drain(&rx).is_empty());
}

#[test]
fn mutation_bursts_collapse_into_one_scan() {
    init_logging();
    let mut host = thread_page(&["m1"]);
    let (mut scanner, rx) = scanner_for(&host);
    let t0 = Instant::now();
    scanner.start(&mut host, StartOptions::default(), t0);
    assert_eq!(scanner.lifecycle(), Lifecycle::Observing);
    assert!(drain(&rx).is_empty());

    let thread = node(&host, "#thread");
    host.append_html(thread, r#"<div data-message-id="m2">two</div>"#)
        .unwrap();
    scanner.tick(&mut host, t0);
    host.append_html(thread, r#"<div data-message-id="m3">three</div>"#)
        .unwrap();
    scanner.tick(&mut host, t0 + Duration::from_millis(100));

    scanner.tick(&mut host, t0 + Duration::from_millis(250));
    assert!(drain(&rx).is_empty());
    assert_eq!(
        scanner.next_deadline(),
        Some(t0 + Duration::from_millis(300))
    );

    scanner.tick(&mut host, t0 + Duration::from_millis(300));
    let updates = drain(&rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(ids(&updates[0]), vec!["m1", "m2", "m3"]);
    assert_eq!(scanner.next_deadline(), None);
}

#[test]
fn text_edits_are_observed() {
    init_logging();
    let mut host = thread_page(&["m1"]);
    let (mut scanner, rx) = scanner_for(&host);
    let t0 = Instant::now();
    scanner.start(&mut host, SHOW, t0);
    drain(&rx);

    host.set_text(node(&host, "[data-message-id='m1']"), "edited <b>")
        .unwrap();
    scanner.tick(&mut host, t0);
    scanner.tick(&mut host, t0 + Duration::from_millis(200));

    let updates = drain(&rx);
    assert_eq!(updates[0][0].content, "edited <b>");
}

#[test]
fn waits_for_body_before_observing() {
    init_logging();
    let mut host = HtmlTree::pending("example.com");
    let (mut scanner, rx) = scanner_for(&host);
    let t0 = Instant::now();

    scanner.start(&mut host, SHOW, t0);
    assert_eq!(scanner.lifecycle(), Lifecycle::WaitingForBody);
    assert_eq!(scanner.next_deadline(), Some(t0 + Duration::from_millis(50)));

    scanner.tick(&mut host, t0 + Duration::from_millis(50));
    assert_eq!(scanner.lifecycle(), Lifecycle::WaitingForBody);

    host.replace_body(r#"<article id="late">arrived</article>"#)
        .unwrap();
    scanner.tick(&mut host, t0 + Duration::from_millis(100));
    assert_eq!(scanner.lifecycle(), Lifecycle::Observing);
    assert_eq!(ids(&drain(&rx)[0]), vec!["late"]);
}

#[test]
fn restart_keeps_signature_and_stop_cancels_pending_scan() {
    init_logging();
    let mut host = thread_page(&["m1"]);
    let (mut scanner, rx) = scanner_for(&host);
    let t0 = Instant::now();
    scanner.start(&mut host, SHOW, t0);
    scanner.start(&mut host, SHOW, t0);
    assert_eq!(drain(&rx).len(), 1);

    host.append_html(node(&host, "#thread"), r#"<div data-id="m2">two</div>"#)
        .unwrap();
    scanner.tick(&mut host, t0);
    assert!(scanner.has_pending_scan());

    scanner.stop(&mut host);
    assert_eq!(scanner.lifecycle(), Lifecycle::Idle);
    assert!(!scanner.has_pending_scan());
    scanner.tick(&mut host, t0 + Duration::from_secs(1));
    assert!(drain(&rx).is_empty());

    host.remove(node(&host, "[data-id='m2']")).unwrap();
    scanner.start(&mut host, SHOW, t0 + Duration::from_secs(2));
    assert!(drain(&rx).is_empty());
}

#[test]
fn scanned_nodes_are_marked_without_notifying() {
    init_logging();
    let mut host = thread_page(&["m1"]);
    let (mut scanner, _rx) = scanner_for(&host);
    let subscription = host.subscribe();
    scanner.scan(&mut host);

    assert!(host.is_marked(node(&host, "[data-message-id='m1']")));
    assert!(subscription.records.try_recv().is_err());
}

#[test]
fn removed_messages_become_detached() {
    init_logging();
    let mut host = thread_page(&["m1", "m2"]);
    let (mut scanner, rx) = scanner_for(&host);
    scanner.scan(&mut host);
    let first = drain(&rx).remove(0).remove(0);

    assert!(host.is_connected(first.element));
    host.remove(first.element).unwrap();
    assert!(!host.is_connected(first.element));
}

#[test]
fn recreated_messages_are_rebound_without_an_update() {
    init_logging();
    let page = |title: &str| {
        format!(
            r#"<html><body><h1>{title}</h1><main id="thread"><div data-message-id="m1" data-message-author-role="user">hello</div></main></body></html>"#
        )
    };
    let mut host = HtmlTree::parse("example.com", &page("Before"));
    let (mut scanner, rx) = scanner_for(&host);
    scanner.scan(&mut host);
    assert_eq!(drain(&rx).len(), 1);
    assert!(scanner.take_rebound().is_none());

    host.replace_body(&page("After")).unwrap();
    assert_eq!(scanner.scan(&mut host), ScanOutcome::Rebound { count: 1 });
    assert!(drain(&rx).is_empty());
    let fresh = scanner.take_rebound().unwrap();
    assert_eq!(ids(&fresh), vec!["m1"]);
    assert!(host.is_connected(fresh[0].element));
    assert!(host.is_marked(fresh[0].element));

    assert_eq!(scanner.scan(&mut host), ScanOutcome::Unchanged);
    assert!(scanner.take_rebound().is_none());
}

#[test]
fn scanning_survives_a_dropped_receiver() {
    init_logging();
    let mut host = thread_page(&["m1"]);
    let (mut scanner, rx) = scanner_for(&host);
    drop(rx);
    assert_eq!(scanner.scan(&mut host), ScanOutcome::Updated { count: 1 });
    assert!(!scanner.last_signature().is_empty());
}
