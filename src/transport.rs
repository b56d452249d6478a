//! SMTP transport client
//!
//! Messages are composed with lettre's builder and submitted over a
//! transport opened for the single send.

use crate::config::Identity;
use crate::endpoint::{Endpoint, Family};
use crate::error::{Error, Result};
use crate::scope::{Connector, with_connection};
use crate::tls::TlsPolicy;
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Mailbox, MessageBuilder, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::Deserialize;
use tracing::{debug, info};

/// Something a composed message can be handed to for delivery.
#[allow(async_fn_in_trait)]
pub trait Outbox {
    /// Submit `message`; one attempt, no retry.
    async fn submit(&mut self, message: lettre::Message) -> Result<()>;
}

/// A message to send.
///
/// # Examples
///
/// ```
/// use mailscope::OutgoingMessage;
///
/// let message = OutgoingMessage::new("Report", "me@example.com", "boss@example.com", "Attached.")
///     .with_cc("team@example.com")
///     .with_reply_to("noreply@example.com");
/// assert!(message.compose().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutgoingMessage {
    pub subject: String,
    pub from: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    pub body: String,
}

impl OutgoingMessage {
    /// A message with one sender and one recipient.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            from: from.into(),
            to: vec![to.into()],
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    #[must_use]
    pub fn with_to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    #[must_use]
    pub fn with_cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }

    #[must_use]
    pub fn with_bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Build the MIME message: a `multipart/mixed` holding the body as
    /// a single base64 `text/plain` part, dated now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Send`] if an address does not parse or the
    /// message has no recipients.
    pub fn compose(&self) -> Result<lettre::Message> {
        let text = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .header(ContentTransferEncoding::Base64)
            .body(self.body.clone());
        self.compose_with(MultiPart::mixed().singlepart(text))
    }

    /// Build the MIME message around a caller-built `body`. The text
    /// `body` field is not used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Send`] if an address does not parse or the
    /// message has no recipients.
    pub fn compose_with(&self, body: MultiPart) -> Result<lettre::Message> {
        self.headers()?
            .multipart(body)
            .map_err(|e| Error::Send(format!("Failed to compose message: {e}")))
    }

    fn headers(&self) -> Result<MessageBuilder> {
        let mut builder = lettre::Message::builder()
            .date_now()
            .from(parse_mailbox(&self.from)?)
            .subject(self.subject.clone());

        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }
        for address in &self.to {
            builder = builder.to(parse_mailbox(address)?);
        }
        for address in &self.cc {
            builder = builder.cc(parse_mailbox(address)?);
        }
        for address in &self.bcc {
            builder = builder.bcc(parse_mailbox(address)?);
        }
        Ok(builder)
    }

    const fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| Error::Send(format!("Invalid address {address}: {e}")))
}

/// Opens SMTP transports with lettre.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpConnector {
    tls: TlsPolicy,
}

impl SmtpConnector {
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

impl Connector for SmtpConnector {
    type Connection = SmtpOutbox;

    /// Configure a transport for `endpoint`.
    ///
    /// lettre connects lazily, so TCP, TLS and AUTH failures surface
    /// from [`Outbox::submit`]. Credentials are only attached when a
    /// username is configured.
    async fn open(&self, endpoint: &Endpoint, identity: &Identity) -> Result<SmtpOutbox> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(endpoint.host())
            .port(endpoint.port());

        if endpoint.is_secure() {
            let parameters = TlsParameters::builder(endpoint.host().to_string())
                .dangerous_accept_invalid_certs(self.tls.accepts_invalid())
                .build()
                .map_err(|e| Error::Tls(format!("TLS setup for {endpoint} failed: {e}")))?;
            builder = builder.tls(Tls::Wrapper(parameters));
        }

        if let Some(username) = &identity.username {
            let password = identity.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        debug!("SMTP transport ready for {endpoint}");
        Ok(SmtpOutbox {
            transport: builder.build(),
            endpoint: endpoint.to_string(),
        })
    }

    async fn release(&self, _outbox: SmtpOutbox) -> Result<()> {
        Ok(())
    }
}

/// An unpooled lettre transport; each submission uses its own SMTP
/// session.
pub struct SmtpOutbox {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    endpoint: String,
}

impl Outbox for SmtpOutbox {
    async fn submit(&mut self, message: lettre::Message) -> Result<()> {
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| Error::Send(format!("Send via {} failed: {e}", self.endpoint)))?;
        info!(
            "Message accepted by {}: {}",
            self.endpoint,
            response.code()
        );
        Ok(())
    }
}

/// Sends messages through an SMTP server.
///
/// # Examples
///
/// ```no_run
/// # async fn run() -> mailscope::Result<()> {
/// use mailscope::TransportClient;
///
/// let client = TransportClient::new();
/// client.send("hi", "a@x.com", "b@x.com", "body").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransportClient<C = SmtpConnector> {
    identity: Identity,
    connector: C,
}

impl TransportClient {
    /// Client for `smtp://localhost:25/` without credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::from_identity(Identity::default_for(Family::Smtp))
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
        Self::with_connector(identity, SmtpConnector::new())
    }
}

impl Default for TransportClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TransportClient<C> {
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

    /// The endpoint sends go to, `None` when no URL is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed.
    pub fn endpoint(&self) -> Result<Option<Endpoint>> {
        self.identity
            .url
            .as_deref()
            .map(|url| Endpoint::derive(url, Family::Smtp))
            .transpose()
    }
}

impl<C> TransportClient<C>
where
    C: Connector,
    C::Connection: Outbox,
{
    /// Send a plain-text message from one sender to one recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Send`] if composition or delivery fails.
    pub async fn send(&self, subject: &str, from: &str, to: &str, body: &str) -> Result<()> {
        self.send_message(&OutgoingMessage::new(subject, from, to, body))
            .await
    }

    /// Compose and send `message`.
    ///
    /// Reply-To, Cc and Bcc are only set when present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Send`] if composition or delivery fails.
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        self.deliver(message, message.compose()?).await
    }

    /// Send a caller-built multipart `body` with the headers and
    /// recipients of `message`; its text `body` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Send`] if composition or delivery fails.
    pub async fn send_multipart(&self, message: &OutgoingMessage, body: MultiPart) -> Result<()> {
        self.deliver(message, message.compose_with(body)?).await
    }

    async fn deliver(&self, message: &OutgoingMessage, email: lettre::Message) -> Result<()> {
        debug!(
            "Sending '{}' from {} to {} recipients",
            message.subject,
            message.from,
            message.recipient_count()
        );
        with_connection(
            &self.connector,
            &self.identity,
            Family::Smtp,
            async move |outbox| outbox.submit(email).await,
        )
        .await
    }
}
