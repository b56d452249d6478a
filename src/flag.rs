//! IMAP message flags and flag-based search terms
//!
//! Provides a strongly-typed enum for IMAP flags instead of raw
//! strings, plus [`FlagTerm`] for selecting messages by flag state.

use serde::Serialize;
use std::fmt;

/// An IMAP message flag.
///
/// # Examples
///
/// ```
/// use mailscope::Flag;
///
/// assert_eq!(Flag::Seen.as_imap_str(), "\\Seen");
/// assert_eq!(Flag::from("$Important"), Flag::Keyword("$Important".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Flag {
    /// Message has been read (`\Seen`).
    Seen,
    /// Message has been answered (`\Answered`).
    Answered,
    /// Message is flagged for attention (`\Flagged`).
    Flagged,
    /// Message is marked for deletion (`\Deleted`).
    Deleted,
    /// Message is a draft (`\Draft`).
    Draft,
    /// Message arrived since the last session (`\Recent`).
    Recent,
    /// A user-defined keyword flag (no `\` prefix).
    Keyword(String),
}

impl Flag {
    /// The IMAP wire representation of this flag.
    #[must_use]
    pub fn as_imap_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Keyword(kw) => kw,
        }
    }

    /// SEARCH key matching messages that have (`set`) or lack this flag.
    #[must_use]
    pub fn search_key(&self, set: bool) -> String {
        let key = match (self, set) {
            (Self::Seen, true) => "SEEN",
            (Self::Seen, false) => "UNSEEN",
            (Self::Answered, true) => "ANSWERED",
            (Self::Answered, false) => "UNANSWERED",
            (Self::Flagged, true) => "FLAGGED",
            (Self::Flagged, false) => "UNFLAGGED",
            (Self::Deleted, true) => "DELETED",
            (Self::Deleted, false) => "UNDELETED",
            (Self::Draft, true) => "DRAFT",
            (Self::Draft, false) => "UNDRAFT",
            (Self::Recent, true) => "RECENT",
            (Self::Recent, false) => "OLD",
            (Self::Keyword(kw), true) => return format!("KEYWORD {kw}"),
            (Self::Keyword(kw), false) => return format!("UNKEYWORD {kw}"),
        };
        key.to_string()
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}

impl From<&str> for Flag {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "\\seen" => Self::Seen,
            "\\answered" => Self::Answered,
            "\\flagged" => Self::Flagged,
            "\\deleted" => Self::Deleted,
            "\\draft" => Self::Draft,
            "\\recent" => Self::Recent,
            _ => Self::Keyword(s.to_string()),
        }
    }
}

impl From<&async_imap::types::Flag<'_>> for Flag {
    fn from(flag: &async_imap::types::Flag<'_>) -> Self {
        use async_imap::types::Flag as Wire;
        match flag {
            Wire::Seen => Self::Seen,
            Wire::Answered => Self::Answered,
            Wire::Flagged => Self::Flagged,
            Wire::Deleted => Self::Deleted,
            Wire::Draft => Self::Draft,
            Wire::Recent => Self::Recent,
            Wire::Custom(kw) => Self::Keyword(kw.to_string()),
            // \* in PERMANENTFLAGS: keywords may be created
            _ => Self::Keyword("\\*".to_string()),
        }
    }
}

/// Selects messages by flag state.
///
/// A message matches when every flag in the term is present
/// ([`FlagTerm::set`]) or every flag is absent ([`FlagTerm::unset`]).
/// An empty term matches every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagTerm {
    pub flags: Vec<Flag>,
    pub set: bool,
}

impl FlagTerm {
    /// Match messages carrying all of `flags`.
    #[must_use]
    pub fn set(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self {
            flags: flags.into_iter().collect(),
            set: true,
        }
    }

    /// Match messages carrying none of `flags`.
    #[must_use]
    pub fn unset(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self {
            flags: flags.into_iter().collect(),
            set: false,
        }
    }

    /// Whether a message with `flags` satisfies this term.
    #[must_use]
    pub fn matches(&self, flags: &[Flag]) -> bool {
        self.flags
            .iter()
            .all(|wanted| flags.contains(wanted) == self.set)
    }

    /// The IMAP SEARCH query for this term.
    #[must_use]
    pub fn to_query(&self) -> String {
        if self.flags.is_empty() {
            return "ALL".to_string();
        }
        self.flags
            .iter()
            .map(|f| f.search_key(self.set))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Flag> for FlagTerm {
    fn from(flag: Flag) -> Self {
        Self::set([flag])
    }
}
