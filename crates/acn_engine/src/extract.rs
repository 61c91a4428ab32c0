use std::collections::HashSet;

use acn_core::{collapse_whitespace, hash_string, Message, NodeId, Role};
use scraper::{ElementRef, Html, Selector};

use crate::registry::CompiledRules;

/// Attributes that carry a page-provided message id, in priority order.
const ID_ATTRIBUTES: [&str; 3] = ["data-message-id", "data-id", "id"];
/// Role attributes consulted after the rule set's own list.
const GENERIC_ROLE_ATTRIBUTES: [&str; 2] = ["data-role", "data-author-role"];

/// Derives the ordered message list from `doc` using `rules`.
///
/// Candidates are every element matching any message locator (or the fallback
/// query when none match), in document order, with ancestors of other
/// candidates removed. Candidates with no text are skipped but still occupy
/// their index for synthesized ids.
pub fn extract_messages(doc: &Html, rules: &CompiledRules) -> Vec<Message> {
    let root = doc.root_element();
    let mut candidates = matching(root, &rules.message);
    if candidates.is_empty() {
        candidates = matching(root, &rules.fallback);
    }
    let candidates = innermost(candidates);

    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, el)| build_message(el, index, rules))
        .collect()
}

fn build_message(el: ElementRef<'_>, index: usize, rules: &CompiledRules) -> Option<Message> {
    let content = extract_content(el, &rules.content);
    if content.is_empty() {
        return None;
    }
    let role = rules
        .role_resolver
        .and_then(|resolve| resolve(el))
        .unwrap_or_else(|| role_from_attributes(el, rules.role_attributes));

    Some(Message {
        id: message_id(el, index, &content),
        role,
        timestamp: extract_timestamp(el, &rules.timestamp),
        element: el.id(),
        highlight: highlight_target(el, &rules.highlight),
        content,
    })
}

fn matching<'a>(root: ElementRef<'a>, selectors: &[Selector]) -> Vec<ElementRef<'a>> {
    if selectors.is_empty() {
        return Vec::new();
    }
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| selectors.iter().any(|sel| sel.matches(el)))
        .collect()
}

/// Drops every candidate that contains another candidate.
fn innermost(candidates: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids: HashSet<NodeId> = candidates.iter().map(|el| el.id()).collect();
    let mut containers: HashSet<NodeId> = HashSet::new();
    for el in &candidates {
        for ancestor in el.ancestors() {
            if ids.contains(&ancestor.id()) {
                containers.insert(ancestor.id());
            }
        }
    }
    candidates
        .into_iter()
        .filter(|el| !containers.contains(&el.id()))
        .collect()
}

fn first_descendant<'a>(el: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| el.select(sel).next())
}

fn extract_content(el: ElementRef<'_>, selectors: &[Selector]) -> String {
    let target = first_descendant(el, selectors).unwrap_or(el);
    collapse_whitespace(&target.text().collect::<String>())
}

fn extract_timestamp(el: ElementRef<'_>, selectors: &[Selector]) -> String {
    let Some(target) = first_descendant(el, selectors) else {
        return String::new();
    };
    match target.value().attr("datetime") {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => target.text().collect::<String>().trim().to_string(),
    }
}

fn role_from_attributes(el: ElementRef<'_>, attributes: &[&str]) -> Role {
    attributes
        .iter()
        .chain(GENERIC_ROLE_ATTRIBUTES.iter())
        .find_map(|name| el.value().attr(name).filter(|v| !v.is_empty()))
        .map(Role::normalize)
        .unwrap_or_default()
}

/// Per locator, a matching descendant wins over the element itself.
fn highlight_target(el: ElementRef<'_>, selectors: &[Selector]) -> NodeId {
    for sel in selectors {
        if let Some(found) = el.select(sel).next() {
            return found.id();
        }
        if sel.matches(&el) {
            return el.id();
        }
    }
    el.id()
}

fn message_id(el: ElementRef<'_>, index: usize, content: &str) -> String {
    ID_ATTRIBUTES
        .iter()
        .find_map(|name| el.value().attr(name).filter(|v| !v.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("acn-{index}-{}", hash_string(content)))
}
