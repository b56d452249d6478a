//! Mailbox store primitives
//!
//! [`Store`] is the set of folder and message operations a mailbox
//! unit of work composes. [`ImapStore`](crate::ImapStore) implements
//! it over a live IMAP session.

use crate::error::Result;
use crate::folder::FolderInfo;
use crate::message::Message;

/// How a folder is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// EXAMINE: flags are never changed.
    ReadOnly,
    /// SELECT.
    ReadWrite,
}

/// Folder and message primitives on an authenticated connection.
///
/// At most one folder is open at a time; `expunge`, `fetch` and
/// `search` act on the open folder.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// Look a folder up by its full name; `None` if it does not exist.
    async fn lookup(&mut self, name: &str) -> Result<Option<FolderInfo>>;

    /// Create a folder that holds messages.
    async fn create(&mut self, name: &str) -> Result<()>;

    /// Delete a single folder (not its children).
    async fn delete(&mut self, name: &str) -> Result<()>;

    /// Folders whose full name matches the LIST `pattern`.
    async fn list(&mut self, pattern: &str) -> Result<Vec<FolderInfo>>;

    /// Open a folder; returns its message count.
    async fn open(&mut self, name: &str, mode: AccessMode) -> Result<u32>;

    /// Close the open folder, permanently removing `\Deleted`
    /// messages only when `expunge` is true.
    async fn close(&mut self, expunge: bool) -> Result<()>;

    /// Permanently remove `\Deleted` messages from the open folder;
    /// returns how many were removed.
    async fn expunge(&mut self) -> Result<u32>;

    /// Message count of a folder without opening it.
    async fn status_count(&mut self, name: &str) -> Result<u32>;

    /// Fetch messages of the open folder by sequence set
    /// (`1:*`, `3:7`, `1,4,9`), handing each one to `on_message` as it
    /// arrives. Returns how many were handed over.
    async fn fetch(
        &mut self,
        sequence_set: &str,
        on_message: impl FnMut(&Message),
    ) -> Result<u32>;

    /// Sequence numbers of messages in the open folder matching an
    /// IMAP SEARCH query, ascending.
    async fn search(&mut self, query: &str) -> Result<Vec<u32>>;
}
