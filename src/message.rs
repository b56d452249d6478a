//! Messages handed to per-message callbacks

use crate::flag::Flag;
use mail_parser::{HeaderValue, MessageParser};
use serde::Serialize;
use std::borrow::Cow;

/// A message fetched from a folder.
///
/// Carries the raw RFC 5322 bytes. The header and body helpers parse
/// them with mail-parser on each call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// 1-based position in the folder.
    pub seq: u32,
    pub uid: Option<u32>,
    pub flags: Vec<Flag>,
    /// RFC822.SIZE as reported by the server.
    pub size: Option<u32>,
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl Message {
    /// Build a message from an async-imap FETCH response.
    #[must_use]
    pub fn from_fetch(fetch: &async_imap::types::Fetch) -> Self {
        Self {
            seq: fetch.message,
            uid: fetch.uid,
            flags: fetch.flags().map(|f| Flag::from(&f)).collect(),
            size: fetch.size,
            raw: fetch.body().map(<[u8]>::to_vec).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    fn parsed(&self) -> Option<mail_parser::Message<'_>> {
        MessageParser::default().parse(self.raw.as_slice())
    }

    /// First header named `name` (case-insensitive), with encoded
    /// words decoded. Structured headers such as addresses and dates
    /// come back as sent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        let parsed = self.parsed()?;
        match parsed.header(name)? {
            HeaderValue::Text(text) => Some(text.to_string()),
            HeaderValue::TextList(list) => Some(list.join(", ")),
            _ => parsed.header_raw(name).map(|raw| raw.trim().to_string()),
        }
    }

    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.parsed()?.subject().map(str::to_string)
    }

    /// First From address, as `Name <address>` when a display name is
    /// present.
    #[must_use]
    pub fn sender(&self) -> Option<String> {
        let parsed = self.parsed()?;
        let addr = parsed.from()?.first()?;
        match (addr.name(), addr.address()) {
            (Some(name), Some(address)) => Some(format!("{name} <{address}>")),
            (None, Some(address)) => Some(address.to_string()),
            (Some(name), None) => Some(name.to_string()),
            (None, None) => None,
        }
    }

    /// First text body part, transfer-decoded.
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.parsed()?.body_text(0).map(Cow::into_owned)
    }
}
