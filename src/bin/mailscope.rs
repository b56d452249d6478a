#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for scoped IMAP folder operations and SMTP sends
//!
//! Connection settings come from `IMAP_URL`, `IMAP_USERNAME`,
//! `IMAP_PASSWORD` and the matching `SMTP_*` variables (or a `.env`
//! file).

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mailscope::{
    Family, Flag, FolderInfo, Identity, ImapConnector, MailboxClient, Message, OutgoingMessage,
    SearchTerm, SmtpConnector, TlsPolicy, TransportClient,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailscope")]
#[command(about = "Scoped IMAP and SMTP operations, one connection per command")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Accept self-signed or otherwise invalid server certificates
    #[arg(long, global = true)]
    accept_invalid_certs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a folder exists
    Exists { folder: String },

    /// Create a folder (no-op if it exists)
    Create { folder: String },

    /// Delete a folder and its subfolders (no-op if absent)
    Delete { folder: String },

    /// Permanently remove messages marked deleted
    Expunge { folder: String },

    /// Count messages in a folder
    Count { folder: String },

    /// List subfolders of a folder
    Folders {
        /// Parent folder
        #[arg(default_value = "INBOX")]
        folder: String,

        /// LIST pattern: % for direct children, * for all descendants
        #[arg(long, default_value = "*")]
        pattern: String,
    },

    /// List messages in a folder
    Messages {
        #[arg(default_value = "INBOX")]
        folder: String,

        /// First message number (requires --end)
        #[arg(long, requires = "end")]
        start: Option<u32>,

        /// Last message number (requires --start)
        #[arg(long, requires = "start")]
        end: Option<u32>,
    },

    /// Search messages in a folder
    Search {
        #[arg(default_value = "INBOX")]
        folder: String,

        /// Only unseen messages
        #[arg(long, conflicts_with = "seen")]
        unseen: bool,

        /// Only seen messages
        #[arg(long)]
        seen: bool,

        /// Only flagged messages
        #[arg(long)]
        flagged: bool,

        /// Sender contains
        #[arg(long)]
        from: Option<String>,

        /// Subject contains
        #[arg(long)]
        subject: Option<String>,

        /// Messages since this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        since: Option<NaiveDate>,

        /// Messages before this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        before: Option<NaiveDate>,
    },

    /// Send a plain-text message
    Send {
        #[arg(long)]
        subject: String,

        #[arg(long)]
        from: String,

        /// Recipient (repeatable)
        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(long)]
        cc: Vec<String>,

        #[arg(long)]
        bcc: Vec<String>,

        #[arg(long)]
        reply_to: Option<String>,

        #[arg(long)]
        body: String,
    },
}

/// One row of message output.
#[derive(Serialize)]
struct MessageSummary {
    seq: u32,
    uid: Option<u32>,
    flags: Vec<String>,
    size: Option<u32>,
    from: Option<String>,
    subject: Option<String>,
}

impl From<&Message> for MessageSummary {
    fn from(message: &Message) -> Self {
        Self {
            seq: message.seq,
            uid: message.uid,
            flags: message.flags.iter().map(ToString::to_string).collect(),
            size: message.size,
            from: message.sender(),
            subject: message.subject(),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{s}': {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Already installed is fine; the library picks its provider explicitly.
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let tls = if args.accept_invalid_certs {
        TlsPolicy::AcceptInvalid
    } else {
        TlsPolicy::Verify
    };

    let mailbox = || -> anyhow::Result<MailboxClient> {
        let identity = Identity::from_env("IMAP", Family::Imap)?;
        Ok(MailboxClient::with_connector(
            identity,
            ImapConnector::with_tls_policy(tls),
        ))
    };

    match &args.command {
        Command::Exists { folder } => {
            let exists = mailbox()?.exists(folder).await?;
            print_value(&args, &exists, &exists.to_string())?;
        }
        Command::Create { folder } => {
            mailbox()?.create_folder(folder).await?;
            print_value(&args, &folder, &format!("Created {folder}"))?;
        }
        Command::Delete { folder } => {
            mailbox()?.delete_folder(folder).await?;
            print_value(&args, &folder, &format!("Deleted {folder}"))?;
        }
        Command::Expunge { folder } => {
            mailbox()?.expunge(folder).await?;
            print_value(&args, &folder, &format!("Expunged {folder}"))?;
        }
        Command::Count { folder } => {
            let count = mailbox()?.message_count(folder).await?;
            let text = count.map_or_else(|| format!("{folder} does not exist"), |n| n.to_string());
            print_value(&args, &count, &text)?;
        }
        Command::Folders { folder, pattern } => {
            cmd_folders(&mailbox()?, &args, folder, pattern).await?;
        }
        Command::Messages { folder, start, end } => {
            let client = mailbox()?;
            let mut rows = Vec::new();
            let collect = |m: &Message| rows.push(MessageSummary::from(m));
            match (start, end) {
                (Some(start), Some(end)) => {
                    client
                        .for_each_message_in(folder, *start, *end, collect)
                        .await?;
                }
                _ => client.for_each_message(folder, collect).await?,
            }
            print_messages(&args, &rows)?;
        }
        Command::Search {
            folder,
            unseen,
            seen,
            flagged,
            from,
            subject,
            since,
            before,
        } => {
            let mut terms = Vec::new();
            if *unseen {
                terms.push(SearchTerm::Flag(Flag::Seen, false));
            }
            if *seen {
                terms.push(SearchTerm::Flag(Flag::Seen, true));
            }
            if *flagged {
                terms.push(SearchTerm::Flag(Flag::Flagged, true));
            }
            if let Some(from) = from {
                terms.push(SearchTerm::sender(from.as_str()));
            }
            if let Some(subject) = subject {
                terms.push(SearchTerm::subject(subject.as_str()));
            }
            if let Some(since) = since {
                terms.push(SearchTerm::Since(*since));
            }
            if let Some(before) = before {
                terms.push(SearchTerm::Before(*before));
            }
            let term = terms
                .into_iter()
                .reduce(SearchTerm::and)
                .unwrap_or(SearchTerm::All);

            let mut rows = Vec::new();
            mailbox()?
                .for_each_searched_message(folder, &term, |m| rows.push(MessageSummary::from(m)))
                .await?;
            print_messages(&args, &rows)?;
        }
        Command::Send { .. } => {
            let identity = Identity::from_env("SMTP", Family::Smtp)?;
            let client =
                TransportClient::with_connector(identity, SmtpConnector::with_tls_policy(tls));
            cmd_send(&client, &args).await?;
        }
    }

    Ok(())
}

async fn cmd_folders(
    client: &MailboxClient,
    args: &Args,
    folder: &str,
    pattern: &str,
) -> anyhow::Result<()> {
    let mut folders: Vec<FolderInfo> = Vec::new();
    client
        .for_each_folder(folder, pattern, |f| folders.push(f.clone()))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else {
        for f in &folders {
            println!("{f}");
        }
    }

    Ok(())
}

async fn cmd_send(client: &TransportClient, args: &Args) -> anyhow::Result<()> {
    let Command::Send {
        subject,
        from,
        to,
        cc,
        bcc,
        reply_to,
        body,
    } = &args.command
    else {
        return Ok(());
    };

    let message = OutgoingMessage {
        subject: subject.clone(),
        from: from.clone(),
        reply_to: reply_to.clone(),
        to: to.clone(),
        cc: cc.clone(),
        bcc: bcc.clone(),
        body: body.clone(),
    };
    client.send_message(&message).await?;

    let recipients = to.len() + cc.len() + bcc.len();
    print_value(args, &recipients, &format!("Sent to {recipients} recipient(s)"))?;
    Ok(())
}

fn print_value<T: Serialize>(args: &Args, value: &T, text: &str) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

fn print_messages(args: &Args, rows: &[MessageSummary]) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No messages found.");
        return Ok(());
    }

    println!("{:<6} {:<8} {:<30} {}", "SEQ", "UID", "From", "Subject");
    println!("{}", "-".repeat(90));
    for row in rows {
        println!(
            "{:<6} {:<8} {:<30} {}",
            row.seq,
            row.uid.map_or_else(|| "-".to_string(), |u| u.to_string()),
            truncate(row.from.as_deref().unwrap_or("-"), 28),
            truncate(row.subject.as_deref().unwrap_or(""), 50),
        );
    }
    println!("\n{} message(s)", rows.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
