use acn_core::{Language, SettingsPatch, SidebarPosition};
use thiserror::Error;

/// One line typed into the interactive loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Toggle,
    Show,
    Hide,
    /// Typed into the search box; applied after the search debounce.
    Filter(String),
    /// Activate a row: jump the page to the message.
    Open(String),
    /// Scroll the page to an absolute offset.
    Scroll(f32),
    /// Scroll the navigator list to an absolute offset.
    List(f32),
    /// Drag the resize handle horizontally by this many pixels.
    Resize(f32),
    Url(String),
    Set(SettingsPatch),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command {0:?}, try /help")]
    Unknown(String),
    #[error("/{command} expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("not a number: {0:?}")]
    BadNumber(String),
    #[error("unknown setting {0:?} (timestamps, width, language, position)")]
    UnknownSetting(String),
    #[error("invalid value {value:?} for {key}")]
    BadValue { key: String, value: String },
}

pub const HELP: &str = "\
/toggle | /show | /hide      panel visibility
/filter <text>               search messages (empty clears)
/open <id>                   jump to a message
/scroll <px>                 scroll the page
/list <px>                   scroll the navigator list
/resize <dx>                 drag the panel edge by dx pixels
/url <url>                   simulate navigation
/set <key> <value>           timestamps|width|language|position
/status | /help | /quit";

/// Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let body = line.strip_prefix('/').unwrap_or(line);
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "toggle" => Command::Toggle,
        "show" => Command::Show,
        "hide" => Command::Hide,
        "filter" | "search" => Command::Filter(rest.to_string()),
        "open" => Command::Open(required(rest, "open", "a message id")?.to_string()),
        "scroll" => Command::Scroll(number(required(rest, "scroll", "a pixel offset")?)?),
        "list" => Command::List(number(required(rest, "list", "a pixel offset")?)?),
        "resize" => Command::Resize(number(required(rest, "resize", "a pixel delta")?)?),
        "url" => Command::Url(required(rest, "url", "a url")?.to_string()),
        "set" => {
            let args = required(rest, "set", "a key and a value")?;
            let (key, value) = args
                .split_once(char::is_whitespace)
                .ok_or(CommandError::MissingArgument {
                    command: "set",
                    expected: "a key and a value",
                })?;
            Command::Set(parse_setting(key, value.trim())?)
        }
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(CommandError::Unknown(name.to_string())),
    };
    Ok(Some(command))
}

/// Parses one `key value` pair into a single-key patch.
pub fn parse_setting(key: &str, value: &str) -> Result<SettingsPatch, CommandError> {
    let bad = || CommandError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let mut patch = SettingsPatch::default();
    match key.to_ascii_lowercase().as_str() {
        "timestamps" | "show_timestamp" => {
            patch.show_timestamp = Some(match value.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => true,
                "off" | "false" | "no" | "0" => false,
                _ => return Err(bad()),
            });
        }
        "width" | "sidebar_width" => {
            patch.sidebar_width = Some(value.parse::<u32>().map_err(|_| bad())?);
        }
        "language" => patch.language = Some(value.parse::<Language>().map_err(|_| bad())?),
        "position" | "sidebar_position" => {
            patch.sidebar_position = Some(value.parse::<SidebarPosition>().map_err(|_| bad())?);
        }
        _ => return Err(CommandError::UnknownSetting(key.to_string())),
    }
    Ok(patch)
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    expected: &'static str,
) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, expected })
    } else {
        Ok(rest)
    }
}

fn number(raw: &str) -> Result<f32, CommandError> {
    raw.parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::BadNumber(raw.to_string()))
}
