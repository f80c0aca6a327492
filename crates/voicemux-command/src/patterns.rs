use crate::sink::SessionKey;
use regex::{Regex, RegexBuilder};

/// Ordered match tables for spoken commands, English and Norwegian.
///
/// Session patterns search anywhere in the normalized text; key patterns
/// must match the whole string. Within each table the first matching entry
/// wins, so the enumeration order below is part of the contract.
pub struct PatternTables {
    sessions: Vec<(Regex, &'static str)>,
    keys: Vec<(Regex, SessionKey)>,
}

const SESSION_PATTERNS: &[(&str, &str)] = &[
    (r"\bcli\s*(one|1|en)\b", "cli1"),
    (r"\bcli\s*(two|2|to)\b", "cli2"),
    (r"\bcli\s*(three|3|tre)\b", "cli3"),
    (r"\bcli\s*(four|4|fire)\b", "cli4"),
    (r"\bcli\s*(five|5|fem)\b", "cli5"),
];

const KEY_PATTERNS: &[(&str, SessionKey)] = &[
    (r"^(send it|enter|kjør|send|trykk enter)$", SessionKey::Enter),
    (r"^(clear it|clear|avbryt|stopp)$", SessionKey::Interrupt),
    (r"^(tab|tabb)$", SessionKey::Tab),
    (r"^(up|opp|pil opp)$", SessionKey::Up),
    (r"^(down|ned|pil ned)$", SessionKey::Down),
    (r"^(escape|esc)$", SessionKey::Escape),
    (r"^(undo|angre)$", SessionKey::Undo),
    (r"^(save|lagre)$", SessionKey::Save),
    (r"^(delete line|slett linje)$", SessionKey::DeleteLine),
];

impl PatternTables {
    pub fn new() -> Result<Self, regex::Error> {
        let mut sessions = Vec::with_capacity(SESSION_PATTERNS.len());
        for (pattern, session) in SESSION_PATTERNS {
            sessions.push((compile(pattern)?, *session));
        }
        let mut keys = Vec::with_capacity(KEY_PATTERNS.len());
        for (pattern, key) in KEY_PATTERNS {
            keys.push((compile(pattern)?, *key));
        }
        Ok(Self { sessions, keys })
    }

    /// First session pattern found anywhere in `text`.
    pub fn find_session(&self, text: &str) -> Option<&'static str> {
        self.sessions
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, session)| *session)
    }

    /// First key pattern matching the whole of `text`.
    pub fn find_key(&self, text: &str) -> Option<SessionKey> {
        self.keys
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, key)| *key)
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
