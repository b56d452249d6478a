//! Scoped IMAP and SMTP clients
//!
//! Every operation opens its own connection, runs one unit of work
//! against it and releases it before returning, whether the work
//! succeeded or not. Nothing is pooled or cached between calls.
//!
//! - [`MailboxClient`] checks, creates, deletes and expunges folders,
//!   counts messages, and iterates messages and child folders through
//!   callbacks.
//! - [`TransportClient`] composes plain-text messages and sends them.
//!
//! Both are configured from a single URL such as
//! `imaps://mail.example.com:993/`; see [`Endpoint::derive`]. A client
//! without a URL is valid and every operation on it is a no-op.

mod config;
mod connection;
mod endpoint;
mod error;
mod flag;
mod folder;
mod mailbox;
mod message;
mod scope;
mod search;
mod store;
mod tls;
mod transport;

pub use config::Identity;
pub use connection::{ImapConnector, ImapSession, ImapStore, ImapStream};
pub use endpoint::{Endpoint, Family, Protocol};
pub use error::{Error, Result};
pub use flag::{Flag, FlagTerm};
pub use folder::FolderInfo;
pub use mailbox::MailboxClient;
pub use message::Message;
pub use scope::{Connector, with_connection};
pub use search::SearchTerm;
pub use store::{AccessMode, Store};
pub use tls::TlsPolicy;
pub use transport::{OutgoingMessage, Outbox, SmtpConnector, SmtpOutbox, TransportClient};
