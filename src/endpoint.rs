//! Endpoint derivation from `scheme://host:port/` URLs
//!
//! A mail client is configured with a single URL. This module turns
//! that URL into a typed [`Endpoint`]: which protocol to speak, where
//! to connect, and whether the connection starts with TLS.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use url::{Host, Url};

/// Well-known implicit-TLS port for IMAP.
pub const IMAPS_PORT: u16 = 993;

/// Ports treated as implicit-TLS SMTP: 465 is the registered SMTPS
/// port, 995 is accepted for compatibility with older configurations.
pub const SMTPS_PORTS: [u16; 2] = [465, 995];

/// The protocol family a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Imap,
    Smtp,
}

impl Family {
    /// URL used when a client is constructed without one.
    #[must_use]
    pub const fn default_url(self) -> &'static str {
        match self {
            Self::Imap => "imap://localhost:143/",
            Self::Smtp => "smtp://localhost:25/",
        }
    }

    /// Whether `port` is a well-known implicit-TLS port for this family.
    #[must_use]
    pub fn is_secure_port(self, port: u16) -> bool {
        match self {
            Self::Imap => port == IMAPS_PORT,
            Self::Smtp => SMTPS_PORTS.contains(&port),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Smtp => "smtp",
        }
    }
}

/// URL scheme of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Imap,
    Imaps,
    Smtp,
    Smtps,
}

impl Protocol {
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::Imap | Self::Imaps => Family::Imap,
            Self::Smtp | Self::Smtps => Family::Smtp,
        }
    }

    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Imaps => "imaps",
            Self::Smtp => "smtp",
            Self::Smtps => "smtps",
        }
    }

    fn from_scheme(scheme: &str, family: Family) -> Option<Self> {
        let protocol = match scheme.to_ascii_lowercase().as_str() {
            "imap" => Self::Imap,
            "imaps" => Self::Imaps,
            "smtp" => Self::Smtp,
            "smtps" => Self::Smtps,
            _ => return None,
        };
        (protocol.family() == family).then_some(protocol)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A parsed mail server endpoint.
///
/// Immutable once derived. `secure` is true when the scheme ends in
/// `s` (`imaps`, `smtps`) or when the port is the family's well-known
/// implicit-TLS port.
///
/// # Examples
///
/// ```
/// use mailscope::{Endpoint, Family};
///
/// let endpoint = Endpoint::derive("imap://mail.example.com:993/", Family::Imap).unwrap();
/// assert_eq!(endpoint.host(), "mail.example.com");
/// assert!(endpoint.is_secure());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    protocol: Protocol,
    host: String,
    port: u16,
    secure: bool,
}

impl Endpoint {
    /// Parse `url` as an endpoint of the given protocol family.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEndpoint`] if the string is not a URL,
    /// uses a scheme outside `family`, or lacks a host or explicit port.
    pub fn derive(url: &str, family: Family) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::MalformedEndpoint(format!("{url}: {e}")))?;

        let protocol = Protocol::from_scheme(parsed.scheme(), family).ok_or_else(|| {
            Error::MalformedEndpoint(format!(
                "{url}: scheme '{}' is not a {} scheme",
                parsed.scheme(),
                family.name()
            ))
        })?;

        let host = match parsed.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(Error::MalformedEndpoint(format!("{url}: missing host"))),
        };

        let port = parsed
            .port()
            .ok_or_else(|| Error::MalformedEndpoint(format!("{url}: missing port")))?;

        let secure = protocol.scheme().ends_with('s') || family.is_secure_port(port);

        Ok(Self {
            protocol,
            host,
            port,
            secure,
        })
    }

    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether the connection starts with a TLS handshake.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// The endpoint as mail-session properties.
    ///
    /// Mirrors the keys a JavaMail-style session expects. SMTP
    /// endpoints always carry `mail.smtp.auth=false` and
    /// `mail.debug=true`.
    #[must_use]
    pub fn properties(&self) -> BTreeMap<String, String> {
        let family = self.protocol.family().name();
        let mut props = BTreeMap::new();
        if self.protocol.family() == Family::Imap {
            props.insert("mail.store.protocol".to_string(), family.to_string());
        } else {
            props.insert("mail.smtp.auth".to_string(), "false".to_string());
            props.insert("mail.debug".to_string(), "true".to_string());
        }
        props.insert(format!("mail.{family}.host"), self.host.clone());
        props.insert(format!("mail.{family}.port"), self.port.to_string());
        props.insert(format!("mail.{family}.ssl.enable"), self.secure.to_string());
        props
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}/", self.protocol, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}/", self.protocol, self.host, self.port)
        }
    }
}
