use acn_core::Role;
use scraper::ElementRef;

/// Site-specific role detection. `None` defers to the attribute lookup.
pub type RoleResolver = fn(ElementRef<'_>) -> Option<Role>;

/// Extraction rules for one site, as static data.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    pub id: &'static str,
    pub name: &'static str,
    /// Matched exactly or as a parent domain of the page hostname.
    pub hostnames: &'static [&'static str],
    pub message: &'static [&'static str],
    pub content: &'static [&'static str],
    pub highlight: &'static [&'static str],
    pub role_attributes: &'static [&'static str],
    pub timestamp: &'static [&'static str],
    pub role_resolver: Option<RoleResolver>,
}

impl RuleSet {
    pub fn matches_hostname(&self, hostname: &str) -> bool {
        self.hostnames.iter().any(|host| {
            hostname == *host
                || hostname
                    .strip_suffix(host)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

pub static GENERIC_RULES: RuleSet = RuleSet {
    id: "generic",
    name: "Generic",
    hostnames: &[],
    message: &[
        "div[data-message-author-role]",
        "div[data-message-id]",
        "article",
        "div[class*='message']",
    ],
    content: &[".markdown", ".prose"],
    highlight: &[],
    role_attributes: &["data-message-author-role", "data-role", "data-author-role"],
    timestamp: &["time"],
    role_resolver: None,
};

const CHATGPT: RuleSet = RuleSet {
    id: "chatgpt",
    name: "ChatGPT",
    hostnames: &["chat.openai.com", "chatgpt.com"],
    message: &[
        "article[data-testid^='conversation-turn']",
        "article[data-testid='conversation-turn']",
        "div[data-message-id]",
        "div[data-message-author-role]",
    ],
    content: &[".markdown", ".prose"],
    highlight: &[],
    role_attributes: &["data-message-author-role"],
    timestamp: &["time"],
    role_resolver: None,
};

const CLAUDE: RuleSet = RuleSet {
    id: "claude",
    name: "Claude",
    hostnames: &["claude.ai"],
    message: &[
        "div[data-testid='user-message']",
        "div.font-claude-response",
        "div.standard-markdown",
        "div[data-test-id='chat-message']",
        "div[data-testid='chat-message']",
        "div[data-message-id]",
    ],
    content: &[
        "div[data-testid='user-message']",
        ".font-user-message",
        ".font-claude-response-body",
        ".standard-markdown",
        ".progressive-markdown",
        "div[data-test-id='chat-message-text']",
        "div[data-testid='chat-message-text']",
        ".prose",
        ".markdown",
    ],
    highlight: &[
        ".font-claude-response",
        ".standard-markdown",
        ".progressive-markdown",
        "div[data-testid='user-message']",
    ],
    role_attributes: &["data-message-author-role", "data-author-role", "data-is-user"],
    timestamp: &["time", "span[data-test-id='timestamp']"],
    role_resolver: Some(claude_role),
};

const DEEPSEEK: RuleSet = RuleSet {
    id: "deepseek",
    name: "DeepSeek",
    hostnames: &["chat.deepseek.com"],
    message: &["div.ds-message", "div.ds-markdown"],
    content: &[
        "div.ds-markdown",
        "p.ds-markdown-paragraph",
        "div.fbb737a4",
        "div.ds-message",
    ],
    highlight: &["div.ds-markdown", "div.fbb737a4", "div.ds-message"],
    role_attributes: &["data-message-author-role", "data-role"],
    timestamp: &["time"],
    role_resolver: Some(deepseek_role),
};

const DOUBAO: RuleSet = RuleSet {
    id: "doubao",
    name: "Doubao",
    hostnames: &["www.doubao.com", "doubao.com"],
    message: &["div[data-testid='message_text_content']"],
    content: &[".flow-markdown-body", ".paragraph-element", "p", "ol", "li", "div"],
    highlight: &[
        ".flow-markdown-body",
        "div[data-testid='message_text_content']",
        ".paragraph-element",
    ],
    role_attributes: &["data-message-author-role", "data-role"],
    timestamp: &["time"],
    role_resolver: Some(doubao_role),
};

const GEMINI: RuleSet = RuleSet {
    id: "gemini",
    name: "Gemini",
    hostnames: &["gemini.google.com"],
    message: &[
        "div.query-content",
        "div[id^='user-query-content-']",
        "div.response-container-content",
        "div.presented-response-container",
        "message-content",
        "div[data-message-id]",
        "div[data-message-author-role]",
        "div[data-message-text]",
        "article",
    ],
    content: &[
        ".query-text",
        ".query-text-line",
        "message-content .markdown",
        "message-content .markdown-main-panel",
        "message-content",
        ".markdown-main-panel",
        ".markdown",
        ".prose",
        "[data-message-text]",
    ],
    highlight: &[
        ".user-query-bubble-with-background",
        ".query-text-line",
        ".query-text",
        ".markdown-main-panel",
        "message-content",
        ".model-response-text",
        ".response-content",
        ".response-container-content",
    ],
    role_attributes: &["data-message-author-role", "data-role"],
    timestamp: &["time"],
    role_resolver: Some(gemini_role),
};

/// Site rows in match priority order. The generic row is not included.
pub fn builtin_rule_sets() -> &'static [RuleSet] {
    static ALL: [RuleSet; 5] = [CHATGPT, CLAUDE, DEEPSEEK, DOUBAO, GEMINI];
    &ALL
}

fn claude_role(el: ElementRef<'_>) -> Option<Role> {
    if closest(el, |e| is_tag(e, "div") && attr_is(e, "data-testid", "user-message")) {
        return Some(Role::User);
    }
    if closest(el, |e| is_tag(e, "div") && has_class(e, "font-claude-response")) {
        return Some(Role::Ai);
    }
    None
}

fn deepseek_role(el: ElementRef<'_>) -> Option<Role> {
    if has_class(el, "ds-markdown") || has_descendant(el, |e| has_class(e, "ds-markdown")) {
        return Some(Role::Ai);
    }
    if closest(el, |e| has_class(e, "ds-message")) {
        return Some(Role::User);
    }
    None
}

fn doubao_role(el: ElementRef<'_>) -> Option<Role> {
    if closest(el, |e| {
        has_class(e, "flow-markdown-body") || has_class(e, "mdbox-theme-next")
    }) {
        return Some(Role::Ai);
    }
    if has_class(el, "bg-s-color-bg-trans")
        || has_class(el, "text-s-color-text-secondary")
        || closest(el, |e| has_class(e, "justify-end"))
    {
        return Some(Role::User);
    }
    None
}

fn gemini_role(el: ElementRef<'_>) -> Option<Role> {
    let id = el.value().attr("id").unwrap_or_default();
    if id.starts_with("user-query-content-") || has_class(el, "query-content") {
        return Some(Role::User);
    }
    if has_class(el, "response-container-content")
        || has_class(el, "presented-response-container")
        || is_tag(el, "message-content")
    {
        return Some(Role::Ai);
    }
    if closest(el, |e| {
        has_class(e, "presented-response-container")
            || has_class(e, "response-container-content")
            || is_tag(e, "message-content")
    }) {
        return Some(Role::Ai);
    }
    None
}

fn is_tag(el: ElementRef<'_>, name: &str) -> bool {
    el.value().name().eq_ignore_ascii_case(name)
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn attr_is(el: ElementRef<'_>, name: &str, value: &str) -> bool {
    el.value().attr(name) == Some(value)
}

/// The element itself or any ancestor element satisfies `pred`.
fn closest(el: ElementRef<'_>, pred: impl Fn(ElementRef<'_>) -> bool) -> bool {
    if pred(el) {
        return true;
    }
    el.ancestors().filter_map(ElementRef::wrap).any(pred)
}

fn has_descendant(el: ElementRef<'_>, pred: impl Fn(ElementRef<'_>) -> bool) -> bool {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(pred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        let selector = Selector::parse(css).unwrap();
        doc.select(&selector).next().unwrap()
    }

    #[test]
    fn hostname_matching_accepts_subdomains_only() {
        assert!(CLAUDE.matches_hostname("claude.ai"));
        assert!(CLAUDE.matches_hostname("www.claude.ai"));
        assert!(!CLAUDE.matches_hostname("notclaude.ai"));
        assert!(!GENERIC_RULES.matches_hostname("claude.ai"));
    }

    #[test]
    fn claude_resolver_uses_enclosing_blocks() {
        let doc = Html::parse_document(
            r#"<div data-testid="user-message"><p id="u">hi</p></div>
               <div class="font-claude-response"><p id="a">hello</p></div>
               <div id="x">other</div>"#,
        );
        assert_eq!(claude_role(first(&doc, "#u")), Some(Role::User));
        assert_eq!(claude_role(first(&doc, "#a")), Some(Role::Ai));
        assert_eq!(claude_role(first(&doc, "#x")), None);
    }

    #[test]
    fn deepseek_resolver_prefers_markdown_marker() {
        let doc = Html::parse_document(
            r#"<div class="ds-message" id="q">question</div>
               <div class="ds-message" id="r"><div class="ds-markdown">answer</div></div>"#,
        );
        assert_eq!(deepseek_role(first(&doc, "#q")), Some(Role::User));
        assert_eq!(deepseek_role(first(&doc, "#r")), Some(Role::Ai));
    }

    #[test]
    fn doubao_resolver_detects_right_aligned_user_bubbles() {
        let doc = Html::parse_document(
            r#"<div class="justify-end"><div id="u">mine</div></div>
               <div class="flow-markdown-body"><div id="a">theirs</div></div>"#,
        );
        assert_eq!(doubao_role(first(&doc, "#u")), Some(Role::User));
        assert_eq!(doubao_role(first(&doc, "#a")), Some(Role::Ai));
    }

    #[test]
    fn gemini_resolver_reads_ids_tags_and_containers() {
        let doc = Html::parse_document(
            r#"<div id="user-query-content-3">q</div>
               <message-content id="m">a</message-content>
               <div class="response-container-content"><p id="p">a</p></div>
               <div id="plain">?</div>"#,
        );
        assert_eq!(gemini_role(first(&doc, "div[id^='user-query']")), Some(Role::User));
        assert_eq!(gemini_role(first(&doc, "#m")), Some(Role::Ai));
        assert_eq!(gemini_role(first(&doc, "#p")), Some(Role::Ai));
        assert_eq!(gemini_role(first(&doc, "#plain")), None);
    }
}
