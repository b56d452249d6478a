//! AUTHENTICATE command handler.
//!
//! Only the ANONYMOUS mechanism (RFC 4505) is supported. The exchange
//! is a single round trip:
//!
//! ```text
//! A0001 AUTHENTICATE ANONYMOUS
//! +
//! <base64 trace token>
//! A0001 OK AUTHENTICATE completed
//! ```

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};

/// Handle AUTHENTICATE. Returns false if the connection should end.
pub async fn handle_authenticate<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    mechanism: &str,
    stream: &mut BufReader<S>,
) -> bool {
    if !mechanism.eq_ignore_ascii_case("ANONYMOUS") {
        let resp = format!("{tag} NO Unsupported mechanism {mechanism}\r\n");
        return write_line(stream, &resp).await.is_ok();
    }

    if write_line(stream, "+ \r\n").await.is_err() {
        return false;
    }

    // The trace token carries no credentials; any line is accepted.
    let mut token = String::new();
    match stream.read_line(&mut token).await {
        Ok(0) | Err(_) => return false,
        Ok(_) => {}
    }

    let resp = format!("{tag} OK AUTHENTICATE completed\r\n");
    write_line(stream, &resp).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn anonymous_takes_one_continuation() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"bWFpbHNjb3Bl\r\n").await.unwrap();
        let mut stream = BufReader::new(server);

        assert!(handle_authenticate("A1", "ANONYMOUS", &mut stream).await);
        drop(stream);

        let output = crate::fake_imap::io::drain(client).await;
        assert_eq!(output, "+ \r\nA1 OK AUTHENTICATE completed\r\n");
    }

    #[tokio::test]
    async fn other_mechanisms_are_refused() {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        assert!(handle_authenticate("A1", "PLAIN", &mut stream).await);
        drop(stream);

        let output = crate::fake_imap::io::drain(client).await;
        assert!(output.starts_with("A1 NO"));
    }
}
