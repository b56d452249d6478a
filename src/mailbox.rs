//! Mailbox client
//!
//! Every method is one unit of work: a connection is opened for the
//! call, the folder operation runs, and the connection is released
//! before the method returns. Callbacks run synchronously, in
//! ascending message order, while the folder is still open.

use crate::config::Identity;
use crate::connection::ImapConnector;
use crate::endpoint::{Endpoint, Family};
use crate::error::Result;
use crate::flag::FlagTerm;
use crate::folder::FolderInfo;
use crate::message::Message;
use crate::scope::{Connector, with_connection};
use crate::search::SearchTerm;
use crate::store::{AccessMode, Store};
use tracing::{debug, info};

/// Folder and message operations against an IMAP server.
///
/// # Examples
///
/// ```no_run
/// # async fn run() -> mailscope::Result<()> {
/// use mailscope::MailboxClient;
///
/// let client = MailboxClient::with_credentials("imaps://mail.example.com:993/", "me", "secret");
/// if client.exists("INBOX").await? {
///     client
///         .for_each_message("INBOX", |m| println!("{:?}", m.subject()))
///         .await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MailboxClient<C = ImapConnector> {
    identity: Identity,
    connector: C,
}

impl MailboxClient {
    /// Client for `imap://localhost:143/` without credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::from_identity(Identity::default_for(Family::Imap))
    }

    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::from_identity(Identity::from_url(url))
    }

    #[must_use]
    pub fn with_credentials(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::from_identity(Identity::with_credentials(url, username, password))
    }

    #[must_use]
    pub fn from_identity(identity: Identity) -> Self {
        Self::with_connector(identity, ImapConnector::new())
    }
}

impl Default for MailboxClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> MailboxClient<C> {
    #[must_use]
    pub const fn with_connector(identity: Identity, connector: C) -> Self {
        Self {
            identity,
            connector,
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The endpoint operations connect to, `None` when no URL is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed.
    pub fn endpoint(&self) -> Result<Option<Endpoint>> {
        self.identity
            .url
            .as_deref()
            .map(|url| Endpoint::derive(url, Family::Imap))
            .transpose()
    }
}

impl<C> MailboxClient<C>
where
    C: Connector,
    C::Connection: Store,
{
    /// Whether `folder` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or LIST fails.
    pub async fn exists(&self, folder: &str) -> Result<bool> {
        self.run(async |store| Ok(store.lookup(folder).await?.is_some()))
            .await
    }

    /// Create `folder` unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, LIST or CREATE fails.
    pub async fn create_folder(&self, folder: &str) -> Result<()> {
        self.run(async |store| {
            if store.lookup(folder).await?.is_some() {
                debug!("Folder {folder} already exists");
                return Ok(());
            }
            store.create(folder).await
        })
        .await
    }

    /// Delete `folder` and everything below it, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, LIST or any DELETE fails.
    pub async fn delete_folder(&self, folder: &str) -> Result<()> {
        self.run(async |store| {
            let Some(info) = store.lookup(folder).await? else {
                debug!("Folder {folder} does not exist");
                return Ok(());
            };

            let mut descendants: Vec<FolderInfo> = store
                .list(&info.child_pattern("*"))
                .await?
                .into_iter()
                .filter(|f| info.is_ancestor_of(f))
                .collect();
            descendants.sort_by_key(|f| std::cmp::Reverse(f.depth()));

            for child in &descendants {
                store.delete(&child.name).await?;
            }
            store.delete(&info.name).await?;
            info!(
                "Deleted {folder} and {} descendant folders",
                descendants.len()
            );
            Ok(())
        })
        .await
    }

    /// Permanently remove messages flagged `\Deleted` from `folder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, SELECT or EXPUNGE fails.
    pub async fn expunge(&self, folder: &str) -> Result<()> {
        self.run(async |store| {
            in_folder(store, folder, AccessMode::ReadWrite, async |store, _count| {
                store.expunge().await
            })
            .await?;
            Ok(())
        })
        .await
    }

    /// Number of messages in `folder`, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, LIST or STATUS fails.
    pub async fn message_count(&self, folder: &str) -> Result<Option<u32>> {
        self.run(async |store| {
            let Some(info) = store.lookup(folder).await? else {
                return Ok(None);
            };
            if !info.selectable {
                return Ok(Some(0));
            }
            Ok(Some(store.status_count(&info.name).await?))
        })
        .await
    }

    /// Call `callback` for every message in `folder`.
    ///
    /// The folder is opened read-only, so flags are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, EXAMINE or FETCH fails.
    pub async fn for_each_message(
        &self,
        folder: &str,
        mut callback: impl FnMut(&Message),
    ) -> Result<()> {
        self.run(async |store| {
            in_folder(store, folder, AccessMode::ReadOnly, async |store, count| {
                if count == 0 {
                    return Ok(0);
                }
                store.fetch("1:*", &mut callback).await
            })
            .await?;
            Ok(())
        })
        .await
    }

    /// Call `callback` for messages `start` through `end` (1-based,
    /// inclusive) of `folder`.
    ///
    /// The bounds are sent to the server as given; how it treats
    /// positions past the end of the folder is up to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, EXAMINE or FETCH fails.
    pub async fn for_each_message_in(
        &self,
        folder: &str,
        start: u32,
        end: u32,
        mut callback: impl FnMut(&Message),
    ) -> Result<()> {
        let range = format!("{start}:{end}");
        self.run(async |store| {
            in_folder(store, folder, AccessMode::ReadOnly, async |store, _count| {
                store.fetch(&range, &mut callback).await
            })
            .await?;
            Ok(())
        })
        .await
    }

    /// Call `callback` for messages of `folder` matching a flag term.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, EXAMINE, SEARCH or FETCH
    /// fails.
    pub async fn for_each_flagged_message(
        &self,
        folder: &str,
        term: &FlagTerm,
        callback: impl FnMut(&Message),
    ) -> Result<()> {
        self.for_each_matching(folder, &term.to_query(), callback)
            .await
    }

    /// Call `callback` for messages of `folder` matching a search term.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, EXAMINE, SEARCH or FETCH
    /// fails.
    pub async fn for_each_searched_message(
        &self,
        folder: &str,
        term: &SearchTerm,
        callback: impl FnMut(&Message),
    ) -> Result<()> {
        self.for_each_matching(folder, &term.to_query(), callback)
            .await
    }

    /// Call `callback` for each child of `folder` whose name matches
    /// the LIST `pattern` (`%` for direct children, `*` for all
    /// descendants).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or LIST fails.
    pub async fn for_each_folder(
        &self,
        folder: &str,
        pattern: &str,
        mut callback: impl FnMut(&FolderInfo),
    ) -> Result<()> {
        self.run(async |store| {
            let Some(info) = store.lookup(folder).await? else {
                return Ok(());
            };
            let children = store.list(&info.child_pattern(pattern)).await?;
            children
                .iter()
                .filter(|f| info.is_ancestor_of(f))
                .for_each(&mut callback);
            Ok(())
        })
        .await
    }

    async fn for_each_matching(
        &self,
        folder: &str,
        query: &str,
        mut callback: impl FnMut(&Message),
    ) -> Result<()> {
        self.run(async |store| {
            in_folder(store, folder, AccessMode::ReadOnly, async |store, count| {
                if count == 0 {
                    return Ok(0);
                }
                let seqs = store.search(query).await?;
                if seqs.is_empty() {
                    return Ok(0);
                }
                store.fetch(&sequence_set(&seqs), &mut callback).await
            })
            .await?;
            Ok(())
        })
        .await
    }

    async fn run<T: Default>(
        &self,
        work: impl AsyncFnOnce(&mut C::Connection) -> Result<T>,
    ) -> Result<T> {
        with_connection(&self.connector, &self.identity, Family::Imap, work).await
    }
}

/// Open `folder`, run `work` with its message count, and close it
/// again without expunging.
///
/// Returns `None` without running `work` when the folder does not
/// exist or cannot hold messages.
async fn in_folder<S, T>(
    store: &mut S,
    folder: &str,
    mode: AccessMode,
    work: impl AsyncFnOnce(&mut S, u32) -> Result<T>,
) -> Result<Option<T>>
where
    S: Store,
{
    match store.lookup(folder).await? {
        Some(info) if info.selectable => {}
        Some(_) => {
            debug!("Folder {folder} holds no messages");
            return Ok(None);
        }
        None => {
            debug!("Folder {folder} does not exist");
            return Ok(None);
        }
    }

    let count = store.open(folder, mode).await?;
    let outcome = work(&mut *store, count).await;
    let closed = store.close(false).await;

    let value = outcome?;
    closed?;
    Ok(Some(value))
}

fn sequence_set(seqs: &[u32]) -> String {
    seqs.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
