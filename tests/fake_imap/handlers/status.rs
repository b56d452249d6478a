//! STATUS command handler.
//!
//! Only the MESSAGES item is reported (RFC 3501 Section 6.3.10):
//!
//! ```text
//! * STATUS "INBOX" (MESSAGES 3)
//! A0004 OK STATUS completed
//! ```

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_status<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) {
    let Some(folder) = mailbox.get_folder(folder_name).filter(|f| f.selectable) else {
        let resp = format!("{tag} NO STATUS failed: no such folder\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let line = format!(
        "* STATUS \"{}\" (MESSAGES {})\r\n",
        folder.name,
        folder.emails.len()
    );
    let _ = write_line(stream, &line).await;
    let resp = format!("{tag} OK STATUS completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::drain;
    use crate::fake_imap::mailbox::MailboxBuilder;

    #[tokio::test]
    async fn reports_message_count() {
        let mailbox = MailboxBuilder::new()
            .folder("Sent")
            .email(1, &[], b"x")
            .email(2, &[], b"y")
            .build();
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);
        handle_status("A1", "Sent", &mailbox, &mut stream).await;
        drop(stream);

        assert_eq!(
            drain(client).await,
            "* STATUS \"Sent\" (MESSAGES 2)\r\nA1 OK STATUS completed\r\n"
        );
    }
}
