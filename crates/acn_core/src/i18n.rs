use crate::settings::Language;

/// Text keys understood by [`Localizer::t`].
pub mod keys {
    pub const SIDEBAR_TITLE: &str = "sidebar_title";
    pub const SEARCH_PLACEHOLDER: &str = "search_placeholder";
    pub const LOADING: &str = "loading";
    pub const STATUS_SHOWN: &str = "status_shown";
    pub const STATUS_HIDDEN: &str = "status_hidden";
    pub const STATUS_UPDATED_TIMESTAMPS: &str = "status_updated_timestamps";
    pub const EMPTY_LIST: &str = "empty_list";
    pub const LANGUAGE_LABEL: &str = "language_label";
    pub const SIDEBAR_POSITION_LABEL: &str = "sidebar_position_label";
    pub const SHOW_TIMESTAMP: &str = "show_timestamp";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    /// Any `zh*` tag maps to Chinese, everything else to English.
    pub fn normalize(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("zh") {
            Locale::Zh
        } else {
            Locale::En
        }
    }

    pub fn resolve(language: Language, system_locale: Option<&str>) -> Self {
        match language {
            Language::En => Locale::En,
            Language::Zh => Locale::Zh,
            Language::Auto => system_locale.map(Locale::normalize).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Localizer {
    locale: Locale,
    system_locale: Option<String>,
}

impl Localizer {
    /// Starts in `auto` mode, resolved against `system_locale`.
    pub fn new(system_locale: Option<String>) -> Self {
        let locale = Locale::resolve(Language::Auto, system_locale.as_deref());
        Self {
            locale,
            system_locale,
        }
    }

    pub fn set_locale(&mut self, language: Language) {
        self.locale = Locale::resolve(language, self.system_locale.as_deref());
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Looks up `key` in the current locale, then English, then returns `fallback`.
    pub fn t(&self, key: &str, fallback: &str) -> String {
        lookup(self.locale, key)
            .or_else(|| lookup(Locale::En, key))
            .unwrap_or(fallback)
            .to_string()
    }
}

fn lookup(locale: Locale, key: &str) -> Option<&'static str> {
    match locale {
        Locale::En => english(key),
        Locale::Zh => chinese(key),
    }
}

fn english(key: &str) -> Option<&'static str> {
    let text = match key {
        keys::SIDEBAR_TITLE => "Navigator",
        keys::SEARCH_PLACEHOLDER => "Search messages...",
        keys::LOADING => "Loading...",
        keys::STATUS_SHOWN => "Sidebar shown",
        keys::STATUS_HIDDEN => "Sidebar hidden",
        keys::STATUS_UPDATED_TIMESTAMPS => "Updated timestamps",
        keys::EMPTY_LIST => "No messages",
        keys::LANGUAGE_LABEL => "Language",
        keys::SIDEBAR_POSITION_LABEL => "Sidebar position",
        keys::SHOW_TIMESTAMP => "Show timestamps in the list",
        _ => return None,
    };
    Some(text)
}

fn chinese(key: &str) -> Option<&'static str> {
    let text = match key {
        keys::SIDEBAR_TITLE => "导航",
        keys::SEARCH_PLACEHOLDER => "搜索消息...",
        keys::LOADING => "加载中...",
        keys::STATUS_SHOWN => "侧边栏已显示",
        keys::STATUS_HIDDEN => "侧边栏已隐藏",
        keys::STATUS_UPDATED_TIMESTAMPS => "已更新时间戳显示",
        keys::LANGUAGE_LABEL => "语言",
        keys::SIDEBAR_POSITION_LABEL => "侧边栏位置",
        keys::SHOW_TIMESTAMP => "列表中显示时间戳",
        _ => return None,
    };
    Some(text)
}
