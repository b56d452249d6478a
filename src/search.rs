//! Structured search predicates
//!
//! [`SearchTerm`] is rendered into IMAP SEARCH syntax; evaluation is
//! left to the server.

use crate::flag::{Flag, FlagTerm};
use chrono::NaiveDate;

/// A message predicate for [`MailboxClient::for_each_searched_message`].
///
/// [`MailboxClient::for_each_searched_message`]: crate::MailboxClient::for_each_searched_message
///
/// # Examples
///
/// ```
/// use mailscope::{Flag, SearchTerm};
///
/// let term = SearchTerm::sender("alice@example.com").and(SearchTerm::Flag(Flag::Seen, false));
/// assert_eq!(term.to_query(), "FROM \"alice@example.com\" UNSEEN");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    All,
    /// Flag present (`true`) or absent (`false`).
    Flag(Flag, bool),
    From(String),
    To(String),
    Subject(String),
    Body(String),
    /// Internal date on or after the day.
    Since(NaiveDate),
    /// Internal date strictly before the day.
    Before(NaiveDate),
    /// Size in octets greater than.
    Larger(u32),
    /// Size in octets smaller than.
    Smaller(u32),
    And(Vec<SearchTerm>),
    Or(Box<SearchTerm>, Box<SearchTerm>),
    Not(Box<SearchTerm>),
}

impl SearchTerm {
    #[must_use]
    pub fn sender(address: impl Into<String>) -> Self {
        Self::From(address.into())
    }

    #[must_use]
    pub fn recipient(address: impl Into<String>) -> Self {
        Self::To(address.into())
    }

    #[must_use]
    pub fn subject(text: impl Into<String>) -> Self {
        Self::Subject(text.into())
    }

    #[must_use]
    pub fn body(text: impl Into<String>) -> Self {
        Self::Body(text.into())
    }

    /// Conjunction of `self` and `other`, flattening nested ANDs.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut terms) => {
                terms.push(other);
                Self::And(terms)
            }
            first => Self::And(vec![first, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Render as an IMAP SEARCH query.
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::All => "ALL".to_string(),
            Self::Flag(flag, set) => flag.search_key(*set),
            Self::From(s) => format!("FROM {}", quote(s)),
            Self::To(s) => format!("TO {}", quote(s)),
            Self::Subject(s) => format!("SUBJECT {}", quote(s)),
            Self::Body(s) => format!("BODY {}", quote(s)),
            Self::Since(d) => format!("SINCE {}", imap_date(*d)),
            Self::Before(d) => format!("BEFORE {}", imap_date(*d)),
            Self::Larger(n) => format!("LARGER {n}"),
            Self::Smaller(n) => format!("SMALLER {n}"),
            Self::And(terms) if terms.is_empty() => "ALL".to_string(),
            Self::And(terms) => terms
                .iter()
                .map(Self::grouped)
                .collect::<Vec<_>>()
                .join(" "),
            Self::Or(a, b) => format!("OR {} {}", a.grouped(), b.grouped()),
            Self::Not(t) => format!("NOT {}", t.grouped()),
        }
    }

    /// Render so the term parses as a single search key.
    fn grouped(&self) -> String {
        match self {
            Self::And(terms) if terms.len() > 1 => format!("({})", self.to_query()),
            _ => self.to_query(),
        }
    }
}

impl From<FlagTerm> for SearchTerm {
    fn from(term: FlagTerm) -> Self {
        let mut keys: Vec<Self> = term
            .flags
            .into_iter()
            .map(|f| Self::Flag(f, term.set))
            .collect();
        match keys.len() {
            0 => Self::All,
            1 => keys.remove(0),
            _ => Self::And(keys),
        }
    }
}

/// IMAP date format (RFC 3501 `date`): `1-Feb-2024`.
fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
