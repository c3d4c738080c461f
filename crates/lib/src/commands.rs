//! Bot commands: `/start` answers with a fixed greeting, plain text goes to the relay.

/// Reply to `/start`.
pub const GREETING: &str =
    "👋 Hi! I'm a ChatGPT-powered bot.\nJust send me any message and I'll reply.";

/// What to do with an inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`, optionally addressed to this bot (`/start@my_bot`) and with arguments.
    Start,
    /// Any other slash command, or one addressed to another bot. Not answered.
    Unknown(String),
    /// Plain text for the relay dispatcher.
    Relay,
}

fn is_command_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Command {
    /// Classify `text`. A command is `/` followed by at least one of `[A-Za-z0-9_]` at the
    /// very start; anything else (including a bare `/`) is relayed. When `bot_username` is
    /// known, `/cmd@name` only counts as ours if `name` matches it (case-insensitive).
    pub fn parse(text: &str, bot_username: Option<&str>) -> Self {
        let Some(rest) = text.strip_prefix('/') else {
            return Command::Relay;
        };
        let name_len = rest.find(|c: char| !is_command_char(c)).unwrap_or(rest.len());
        if name_len == 0 {
            return Command::Relay;
        }
        let (name, tail) = rest.split_at(name_len);
        if let (Some(target), Some(own)) = (tail.strip_prefix('@'), bot_username) {
            let target_len = target
                .find(|c: char| !is_command_char(c))
                .unwrap_or(target.len());
            if !target[..target_len].eq_ignore_ascii_case(own) {
                return Command::Unknown(format!("{}@{}", name, &target[..target_len]));
            }
        }
        if name == "start" {
            Command::Start
        } else {
            Command::Unknown(name.to_string())
        }
    }
}

pub fn greeting() -> &'static str {
    GREETING
}
