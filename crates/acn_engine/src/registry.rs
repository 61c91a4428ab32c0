use std::sync::Arc;

use acn_logging::{acn_debug, acn_warn};
use scraper::Selector;
use url::Url;

use crate::platforms::{builtin_rule_sets, RoleResolver, RuleSet, GENERIC_RULES};

/// Secondary query used when none of a rule set's message locators match.
pub const FALLBACK_MESSAGE_QUERY: &str = "div[data-message-author-role], article";

/// A rule set with its locators parsed. Locators that fail to parse are
/// dropped when the set is compiled.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub id: &'static str,
    pub name: &'static str,
    pub message: Vec<Selector>,
    pub content: Vec<Selector>,
    pub highlight: Vec<Selector>,
    pub timestamp: Vec<Selector>,
    pub fallback: Vec<Selector>,
    pub role_attributes: &'static [&'static str],
    pub role_resolver: Option<RoleResolver>,
}

impl CompiledRules {
    pub fn compile(rules: &RuleSet) -> Self {
        Self {
            id: rules.id,
            name: rules.name,
            message: compile_list(rules.id, rules.message),
            content: compile_list(rules.id, rules.content),
            highlight: compile_list(rules.id, rules.highlight),
            timestamp: compile_list(rules.id, rules.timestamp),
            fallback: compile_list(rules.id, &[FALLBACK_MESSAGE_QUERY]),
            role_attributes: rules.role_attributes,
            role_resolver: rules.role_resolver,
        }
    }
}

fn compile_list(owner: &str, raw: &[&str]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(err) => {
                acn_warn!("rules {owner}: dropping invalid locator {css:?}: {err:?}");
                None
            }
        })
        .collect()
}

/// Lowercased host part of `url`, if it parses and has one.
pub fn hostname_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(str::to_ascii_lowercase)
}

struct Entry {
    rules: &'static RuleSet,
    compiled: Arc<CompiledRules>,
}

/// Hostname to rule set lookup. Sites without a row get the generic rules.
pub struct LocatorRegistry {
    entries: Vec<Entry>,
    generic: Arc<CompiledRules>,
}

impl LocatorRegistry {
    pub fn new(generic: &'static RuleSet) -> Self {
        Self {
            entries: Vec::new(),
            generic: Arc::new(CompiledRules::compile(generic)),
        }
    }

    /// Generic rules plus every built-in site row.
    pub fn builtin() -> Self {
        let mut registry = Self::new(&GENERIC_RULES);
        for rules in builtin_rule_sets() {
            registry.register(rules);
        }
        registry
    }

    /// Adds a site row. Rows without an id are ignored; earlier rows win on overlap.
    pub fn register(&mut self, rules: &'static RuleSet) {
        if rules.id.is_empty() {
            return;
        }
        self.entries.push(Entry {
            rules,
            compiled: Arc::new(CompiledRules::compile(rules)),
        });
    }

    pub fn for_hostname(&self, hostname: &str) -> Arc<CompiledRules> {
        let hostname = hostname.trim().to_ascii_lowercase();
        let found = self
            .entries
            .iter()
            .find(|entry| entry.rules.matches_hostname(&hostname));
        match found {
            Some(entry) => Arc::clone(&entry.compiled),
            None => {
                acn_debug!("rules: no site row for {hostname:?}, using generic");
                Arc::clone(&self.generic)
            }
        }
    }

    /// Resolves by the host part of `url`. Unparseable URLs get the generic rules.
    pub fn for_url(&self, url: &str) -> Arc<CompiledRules> {
        match hostname_of(url) {
            Some(hostname) => self.for_hostname(&hostname),
            None => {
                acn_debug!("rules: no hostname in {url:?}, using generic");
                Arc::clone(&self.generic)
            }
        }
    }

    pub fn generic(&self) -> Arc<CompiledRules> {
        Arc::clone(&self.generic)
    }

    pub fn rule_sets(&self) -> impl Iterator<Item = &'static RuleSet> + '_ {
        self.entries.iter().map(|entry| entry.rules)
    }
}

impl Default for LocatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
