//! FETCH command handler.
//!
//! Message bodies are transferred as **counted literals**:
//!
//! ```text
//! * <seq> FETCH (UID <uid> FLAGS (<flags>) RFC822.SIZE <n> BODY[] {<n>}
//! <exactly n bytes of raw RFC 5322 message>
//! )
//! ```
//!
//! The `{n}\r\n` marker tells the client that the next `n` bytes are
//! raw data, not protocol text. Every item is returned whatever the
//! client asked for; `BODY.PEEK[]` is answered as `BODY[]` and never
//! sets `\Seen`.
//!
//! Sequence numbers are 1-based positions within the folder
//! (RFC 3501 Section 2.3.1.2). Singles, ranges and `*` are supported.

use crate::fake_imap::io::{write_bytes, write_line};
use crate::fake_imap::mailbox::Mailbox;
use crate::fake_imap::server::Selected;
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use std::collections::BTreeSet;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Resolve a sequence set against a folder holding `exists` messages.
/// Numbers past the end are dropped.
fn resolve(sequence_set: &SequenceSet, exists: u32) -> BTreeSet<u32> {
    let value = |s: &SeqOrUid| match s {
        SeqOrUid::Value(v) => v.get(),
        SeqOrUid::Asterisk => exists,
    };

    let mut seqs = BTreeSet::new();
    for sequence in sequence_set.0.as_ref() {
        match sequence {
            Sequence::Single(s) => {
                seqs.insert(value(s));
            }
            Sequence::Range(a, b) => {
                let (lo, hi) = (value(a).min(value(b)), value(a).max(value(b)));
                seqs.extend(lo..=hi);
            }
        }
    }
    seqs.retain(|&n| n >= 1 && n <= exists);
    seqs
}

pub async fn handle_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    selected: Option<&Selected>,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) {
    let Some(selected) = selected else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };
    let Some(folder) = mailbox.get_folder(&selected.name) else {
        let resp = format!("{tag} NO Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let exists = u32::try_from(folder.emails.len()).unwrap_or(u32::MAX);
    for seq in resolve(sequence_set, exists) {
        let email = &folder.emails[(seq - 1) as usize];
        let size = email.raw.len();
        let header = format!(
            "* {seq} FETCH (UID {} FLAGS ({}) RFC822.SIZE {size} BODY[] {{{size}}}\r\n",
            email.uid,
            email.flags.join(" "),
        );
        if write_line(stream, &header).await.is_err()
            || write_bytes(stream, &email.raw).await.is_err()
            || write_line(stream, ")\r\n").await.is_err()
        {
            return;
        }
    }

    let resp = format!("{tag} OK FETCH completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::drain;
    use crate::fake_imap::mailbox::MailboxBuilder;

    use imap_codec::CommandCodec;
    use imap_codec::decode::Decoder;
    use imap_codec::imap_types::command::CommandBody;

    /// Parse a sequence set the way the server loop does.
    fn set(text: &str) -> SequenceSet {
        let line: &'static str = Box::leak(format!("A1 FETCH {text} (UID)\r\n").into_boxed_str());
        let (_, command) = CommandCodec::default().decode(line.as_bytes()).unwrap();
        match command.body {
            CommandBody::Fetch { sequence_set, .. } => sequence_set,
            other => panic!("not a FETCH: {other:?}"),
        }
    }

    async fn run(sequence_set: &str, selected: Option<&Selected>, mailbox: &Mailbox) -> String {
        let (client, server) = tokio::io::duplex(8192);
        let mut stream = BufReader::new(server);
        handle_fetch("A1", &set(sequence_set), selected, mailbox, &mut stream).await;
        drop(stream);
        drain(client).await
    }

    fn inbox() -> (Mailbox, Selected) {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(10, &["\\Seen"], b"Subject: one\r\n\r\nA")
            .email(20, &[], b"Subject: two\r\n\r\nB")
            .email(30, &["\\Flagged", "\\Seen"], b"Subject: three\r\n\r\nC")
            .build();
        let selected = Selected {
            name: "INBOX".into(),
            read_only: true,
        };
        (mailbox, selected)
    }

    #[test]
    fn resolves_ranges_and_star() {
        assert_eq!(resolve(&set("1:*"), 3), BTreeSet::from([1, 2, 3]));
        assert_eq!(resolve(&set("3,1"), 3), BTreeSet::from([1, 3]));
        assert_eq!(resolve(&set("2:9"), 3), BTreeSet::from([2, 3]));
        assert_eq!(resolve(&set("*:2"), 3), BTreeSet::from([2, 3]));
        assert!(resolve(&set("1:*"), 0).is_empty());
    }

    #[tokio::test]
    async fn fetch_returns_literal_with_flags() {
        let (mailbox, selected) = inbox();

        let output = run("3", Some(&selected), &mailbox).await;

        assert!(output.starts_with(
            "* 3 FETCH (UID 30 FLAGS (\\Flagged \\Seen) RFC822.SIZE 19 BODY[] {19}\r\n"
        ));
        assert!(output.contains("Subject: three\r\n\r\nC)\r\n"));
        assert!(output.ends_with("A1 OK FETCH completed\r\n"));
    }

    #[tokio::test]
    async fn fetch_range_in_order() {
        let (mailbox, selected) = inbox();

        let output = run("1:2", Some(&selected), &mailbox).await;

        let first = output.find("* 1 FETCH (UID 10").unwrap();
        let second = output.find("* 2 FETCH (UID 20 FLAGS ()").unwrap();
        assert!(first < second);
        assert!(!output.contains("* 3 FETCH"));
    }

    #[tokio::test]
    async fn no_folder_selected_returns_bad() {
        let (mailbox, _) = inbox();
        let output = run("1", None, &mailbox).await;
        assert!(output.contains("A1 BAD No folder selected"));
    }
}
