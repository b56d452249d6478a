//! Test data model for the fake IMAP server
//!
//! Provides a builder-style API for constructing mailbox state:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .email(1, &["\\Seen"], raw_rfc5322_bytes)
//!         .email(2, &[], raw_rfc5322_bytes)
//!     .placeholder("Archive")
//!     .folder("Archive/2024")
//!     .build();
//! ```
//!
//! Folder names are hierarchical with `/` as the delimiter. The
//! `Mailbox` is shared with the server behind a mutex so tests can
//! inspect the state after the client is done.

pub const DELIMITER: char = '/';

/// A complete mailbox: a collection of named folders, each holding
/// zero or more test emails.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
}

impl Mailbox {
    /// Look up a folder by name. INBOX matches in any case, other
    /// names are case-sensitive.
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| same_name(&f.name, name))
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| same_name(&f.name, name))
    }

    /// Whether any folder lives below `name`.
    pub fn has_children(&self, name: &str) -> bool {
        let prefix = format!("{name}{DELIMITER}");
        self.folders.iter().any(|f| f.name.starts_with(&prefix))
    }

    pub fn folder_names(&self) -> Vec<String> {
        self.folders.iter().map(|f| f.name.clone()).collect()
    }
}

fn same_name(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case("INBOX") {
        b.eq_ignore_ascii_case("INBOX")
    } else {
        a == b
    }
}

/// A single IMAP folder.
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    /// False for `\Noselect` placeholders.
    pub selectable: bool,
    pub emails: Vec<TestEmail>,
}

/// A test email stored in a folder.
///
/// - `uid`: unique-per-folder number that never changes.
/// - `flags`: system flags such as `\Seen` or `\Deleted`, and keywords.
/// - `raw`: the complete RFC 5322 message returned by `BODY[]`.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub uid: u32,
    pub flags: Vec<String>,
    pub raw: Vec<u8>,
}

impl TestEmail {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    /// Unfolded value of the first header called `name`.
    pub fn header(&self, name: &str) -> Option<String> {
        let text = String::from_utf8_lossy(&self.raw);
        text.lines()
            .take_while(|l| !l.is_empty())
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case(name).then(|| value.trim().to_string())
            })
    }
}

/// Builder for constructing a `Mailbox` step by step.
///
/// Call `.folder(name)` to start a new folder, then chain
/// `.email(uid, flags, raw)` calls to add messages to it.
pub struct MailboxBuilder {
    folders: Vec<Folder>,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
        }
    }

    /// Add a new folder. Subsequent `.email()` calls add to this folder.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            selectable: true,
            emails: Vec::new(),
        });
        self
    }

    /// Add a `\Noselect` folder that only exists to hold children.
    pub fn placeholder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            selectable: false,
            emails: Vec::new(),
        });
        self
    }

    /// Add an email to the most recently added folder.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn email(mut self, uid: u32, flags: &[&str], raw: &[u8]) -> Self {
        self.folders
            .last_mut()
            .expect("call .folder() before .email()")
            .emails
            .push(TestEmail {
                uid,
                flags: flags.iter().map(ToString::to_string).collect(),
                raw: raw.to_vec(),
            });
        self
    }

    /// Consume the builder and return the finished `Mailbox`.
    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
        }
    }
}
