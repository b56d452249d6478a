//! DELETE command handler.
//!
//! A folder with children cannot be deleted, so recursive deletes
//! must remove the deepest folders first.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_delete<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mutex<Mailbox>,
    stream: &mut BufReader<S>,
) {
    let outcome = {
        let mut mb = mailbox.lock().unwrap();
        if mb.get_folder(folder_name).is_none() {
            Err("no such folder")
        } else if mb.has_children(folder_name) {
            Err("folder has children")
        } else {
            mb.folders.retain(|f| f.name != folder_name);
            Ok(())
        }
    };

    let resp = match outcome {
        Ok(()) => format!("{tag} OK DELETE completed\r\n"),
        Err(reason) => format!("{tag} NO DELETE failed: {reason}\r\n"),
    };
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::drain;
    use crate::fake_imap::mailbox::MailboxBuilder;

    async fn run(name: &str, mailbox: &Mutex<Mailbox>) -> String {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);
        handle_delete("A1", name, mailbox, &mut stream).await;
        drop(stream);
        drain(client).await
    }

    #[tokio::test]
    async fn refuses_parent_with_children() {
        let mailbox = Mutex::new(
            MailboxBuilder::new()
                .folder("Work")
                .folder("Work/Reports")
                .build(),
        );

        assert!(run("Work", &mailbox).await.contains("has children"));
        assert_eq!(run("Work/Reports", &mailbox).await, "A1 OK DELETE completed\r\n");
        assert_eq!(run("Work", &mailbox).await, "A1 OK DELETE completed\r\n");
        assert!(mailbox.lock().unwrap().folders.is_empty());
    }

    #[tokio::test]
    async fn missing_folder_is_no() {
        let mailbox = Mutex::new(MailboxBuilder::new().build());
        assert!(run("Nope", &mailbox).await.contains("no such folder"));
    }
}
