//! LOGOUT command handler.
//!
//! The server sends a BYE untagged response (indicating the connection
//! is ending) followed by the tagged OK.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the LOGOUT command. Sends BYE + tagged OK.
pub async fn handle_logout<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    stream: &mut BufReader<S>,
) {
    let _ = write_line(stream, "* BYE\r\n").await;
    let resp = format!("{tag} OK LOGOUT completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::drain;

    #[tokio::test]
    async fn bye_comes_before_ok() {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);
        handle_logout("X1", &mut stream).await;
        drop(stream);

        let output = drain(client).await;
        assert!(output.starts_with("* BYE\r\n"));
        assert!(output.ends_with("X1 OK LOGOUT completed\r\n"));
    }
}
