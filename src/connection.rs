//! IMAP connections over async-imap
//!
//! [`ImapConnector`] opens an authenticated session (plain TCP or
//! implicit TLS, chosen by the endpoint) and [`ImapStore`] implements
//! the [`Store`] primitives on it.

use crate::config::Identity;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::folder::FolderInfo;
use crate::message::Message;
use crate::scope::Connector;
use crate::store::{AccessMode, Store};
use crate::tls::{self, TlsPolicy};
use async_imap::Session;
use async_imap::imap_proto::{Response, Status};
use futures::StreamExt;
use std::fmt;
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, info};

/// Byte stream an IMAP session runs over.
pub trait ImapStream:
    futures::AsyncRead + futures::AsyncWrite + Unpin + Send + fmt::Debug
{
}

impl<T> ImapStream for T where
    T: futures::AsyncRead + futures::AsyncWrite + Unpin + Send + fmt::Debug
{
}

/// An authenticated IMAP session over plain TCP or TLS.
pub type ImapSession = Session<Box<dyn ImapStream>>;

/// Items requested for every fetched message. `BODY.PEEK` leaves
/// `\Seen` untouched.
const FETCH_ITEMS: &str = "(UID FLAGS RFC822.SIZE BODY.PEEK[])";

/// Opens IMAP sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapConnector {
    tls: TlsPolicy,
}

impl ImapConnector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tls: TlsPolicy::Verify,
        }
    }

    #[must_use]
    pub const fn with_tls_policy(tls: TlsPolicy) -> Self {
        Self { tls }
    }
}

impl Connector for ImapConnector {
    type Connection = ImapStore;

    /// Connect, optionally wrap in TLS, and authenticate.
    ///
    /// Logs in when the identity has a username, otherwise uses SASL
    /// ANONYMOUS.
    async fn open(&self, endpoint: &Endpoint, identity: &Identity) -> Result<ImapStore> {
        debug!("Connecting to IMAP server at {endpoint}");

        let tcp = TcpStream::connect((endpoint.host(), endpoint.port()))
            .await
            .map_err(|e| Error::Connection(format!("TCP connect to {endpoint} failed: {e}")))?;

        let stream: Box<dyn ImapStream> = if endpoint.is_secure() {
            let tls_stream = tls::handshake(tcp, endpoint.host(), self.tls).await?;
            Box::new(tls_stream.compat())
        } else {
            Box::new(tcp.compat())
        };

        let mut client = async_imap::Client::new(stream);
        // Consumed here so AUTHENTICATE does not take it for its
        // continuation request.
        match client.read_response().await {
            Ok(None) => {
                return Err(Error::Connection(format!(
                    "{endpoint} closed the connection before greeting"
                )));
            }
            Err(e) => {
                return Err(Error::Connection(format!(
                    "Reading greeting from {endpoint} failed: {e}"
                )));
            }
            Ok(Some(greeting)) => {
                if let Response::Data {
                    status: Status::Bye,
                    information,
                    ..
                } = greeting.parsed()
                {
                    let reason = information.as_deref().unwrap_or("BYE");
                    return Err(Error::Connection(format!(
                        "{endpoint} refused the connection: {reason}"
                    )));
                }
            }
        }

        let session = match identity.username.as_deref() {
            Some(username) => client
                .login(username, identity.password.as_deref().unwrap_or_default())
                .await
                .map_err(|(e, _)| Error::Connection(format!("Login failed for {username}: {e}")))?,
            None => client
                .authenticate("ANONYMOUS", Anonymous)
                .await
                .map_err(|(e, _)| {
                    Error::Connection(format!("Anonymous authentication failed: {e}"))
                })?,
        };

        info!("Connected to IMAP server at {endpoint}");
        Ok(ImapStore::new(session))
    }

    async fn release(&self, mut store: ImapStore) -> Result<()> {
        store
            .session
            .logout()
            .await
            .map_err(|e| Error::Connection(format!("Logout failed: {e}")))?;
        debug!("Logged out of IMAP server");
        Ok(())
    }
}

/// SASL ANONYMOUS (RFC 4505): the single response is a trace token.
struct Anonymous;

impl async_imap::Authenticator for Anonymous {
    type Response = Vec<u8>;

    fn process(&mut self, _challenge: &[u8]) -> Self::Response {
        b"mailscope".to_vec()
    }
}

/// [`Store`] backed by a live IMAP session.
pub struct ImapStore {
    session: ImapSession,
    opened: Option<(String, AccessMode)>,
}

impl ImapStore {
    #[must_use]
    pub const fn new(session: ImapSession) -> Self {
        Self {
            session,
            opened: None,
        }
    }

    fn opened_name(&self) -> Result<&str> {
        self.opened
            .as_ref()
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| Error::Operation("No folder is open".into()))
    }
}

impl fmt::Debug for ImapStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapStore")
            .field("opened", &self.opened)
            .finish_non_exhaustive()
    }
}

impl Store for ImapStore {
    async fn lookup(&mut self, name: &str) -> Result<Option<FolderInfo>> {
        let found = self.list(&quote(name)).await?;
        Ok(found.into_iter().find(|f| same_folder(&f.name, name)))
    }

    async fn create(&mut self, name: &str) -> Result<()> {
        self.session
            .create(name)
            .await
            .map_err(|e| Error::Operation(format!("Failed to create {name}: {e}")))?;
        info!("Created folder {name}");
        Ok(())
    }

    async fn delete(&mut self, name: &str) -> Result<()> {
        self.session
            .delete(name)
            .await
            .map_err(|e| Error::Operation(format!("Failed to delete {name}: {e}")))?;
        info!("Deleted folder {name}");
        Ok(())
    }

    async fn list(&mut self, pattern: &str) -> Result<Vec<FolderInfo>> {
        let pattern = if pattern.starts_with('"') {
            pattern.to_string()
        } else {
            quote(pattern)
        };
        let stream = self
            .session
            .list(Some(""), Some(&pattern))
            .await
            .map_err(|e| Error::Operation(format!("List {pattern} failed: {e}")))?;
        futures::pin_mut!(stream);

        let mut folders = Vec::new();
        while let Some(item) = stream.next().await {
            let name = item.map_err(|e| Error::Operation(format!("List {pattern} failed: {e}")))?;
            folders.push(FolderInfo::from_name(&name));
        }
        Ok(folders)
    }

    async fn open(&mut self, name: &str, mode: AccessMode) -> Result<u32> {
        let mailbox = match mode {
            AccessMode::ReadOnly => self.session.examine(name).await,
            AccessMode::ReadWrite => self.session.select(name).await,
        }
        .map_err(|e| Error::Operation(format!("Failed to open {name}: {e}")))?;

        debug!("Opened {name} ({mode:?}) with {} messages", mailbox.exists);
        self.opened = Some((name.to_string(), mode));
        Ok(mailbox.exists)
    }

    /// CLOSE expunges a SELECTed folder, so a read-write folder that
    /// must not be expunged is re-opened read-only first.
    async fn close(&mut self, expunge: bool) -> Result<()> {
        let Some((name, mode)) = self.opened.take() else {
            return Ok(());
        };
        if mode == AccessMode::ReadWrite && !expunge {
            self.session
                .examine(&name)
                .await
                .map_err(|e| Error::Operation(format!("Failed to close {name}: {e}")))?;
        }
        self.session
            .close()
            .await
            .map_err(|e| Error::Operation(format!("Failed to close {name}: {e}")))?;
        debug!("Closed {name}");
        Ok(())
    }

    async fn expunge(&mut self) -> Result<u32> {
        let name = self.opened_name()?.to_string();
        let stream = self
            .session
            .expunge()
            .await
            .map_err(|e| Error::Operation(format!("Expunge of {name} failed: {e}")))?;
        futures::pin_mut!(stream);

        let mut removed = 0;
        while let Some(seq) = stream.next().await {
            seq.map_err(|e| Error::Operation(format!("Expunge of {name} failed: {e}")))?;
            removed += 1;
        }
        info!("Expunged {removed} messages from {name}");
        Ok(removed)
    }

    async fn status_count(&mut self, name: &str) -> Result<u32> {
        let mailbox = self
            .session
            .status(name, "(MESSAGES)")
            .await
            .map_err(|e| Error::Operation(format!("Status of {name} failed: {e}")))?;
        Ok(mailbox.exists)
    }

    /// FETCH responses come back in ascending sequence order, so each
    /// one is handed over as soon as it is parsed.
    async fn fetch(
        &mut self,
        sequence_set: &str,
        mut on_message: impl FnMut(&Message),
    ) -> Result<u32> {
        let name = self.opened_name()?.to_string();
        let failed = |e: async_imap::error::Error| {
            Error::Operation(format!("Fetch {sequence_set} from {name} failed: {e}"))
        };
        let stream = self
            .session
            .fetch(sequence_set, FETCH_ITEMS)
            .await
            .map_err(failed)?;
        futures::pin_mut!(stream);

        let mut delivered = 0;
        while let Some(item) = stream.next().await {
            let fetch = item.map_err(failed)?;
            on_message(&Message::from_fetch(&fetch));
            delivered += 1;
        }
        debug!("Fetched {delivered} messages from {name}");
        Ok(delivered)
    }

    async fn search(&mut self, query: &str) -> Result<Vec<u32>> {
        let name = self.opened_name()?.to_string();
        let found = self
            .session
            .search(query)
            .await
            .map_err(|e| Error::Operation(format!("Search '{query}' in {name} failed: {e}")))?;

        let mut seqs: Vec<u32> = found.into_iter().collect();
        seqs.sort_unstable();
        info!("Found {} messages matching '{query}' in {name}", seqs.len());
        Ok(seqs)
    }
}

/// INBOX is case-insensitive (RFC 3501 5.1), other names are not.
fn same_folder(listed: &str, wanted: &str) -> bool {
    if wanted.eq_ignore_ascii_case("INBOX") {
        listed.eq_ignore_ascii_case("INBOX")
    } else {
        listed == wanted
    }
}

/// Quote a mailbox name or LIST pattern as an IMAP quoted string.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
