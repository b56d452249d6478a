//! Scoped connection execution
//!
//! Every public client operation runs as one unit of work against a
//! connection opened just for it. [`with_connection`] opens the
//! connection, runs the work exactly once and releases the connection
//! afterwards, whether the work succeeded or not.

use crate::config::Identity;
use crate::endpoint::{Endpoint, Family};
use crate::error::Result;
use tracing::{debug, warn};

/// Opens and releases connections of one kind.
///
/// Implemented by [`ImapConnector`](crate::ImapConnector) and
/// [`SmtpConnector`](crate::SmtpConnector); tests substitute fakes.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Connection;

    /// Establish and authenticate a connection to `endpoint`.
    async fn open(&self, endpoint: &Endpoint, identity: &Identity) -> Result<Self::Connection>;

    /// Tear the connection down. Called exactly once per successful
    /// [`open`](Connector::open).
    async fn release(&self, connection: Self::Connection) -> Result<()>;
}

/// Run `work` against a freshly opened connection.
///
/// With no URL configured this returns `T::default()` without
/// touching the network. Otherwise the endpoint is derived, a
/// connection is opened, `work` runs once, and the connection is
/// released. Release failures are logged and never replace the
/// outcome of `work`.
///
/// # Errors
///
/// Returns [`Error::MalformedEndpoint`](crate::Error::MalformedEndpoint)
/// for a bad URL, the connector's error if the connection cannot be
/// opened, or whatever `work` fails with.
pub async fn with_connection<C, T, W>(
    connector: &C,
    identity: &Identity,
    family: Family,
    work: W,
) -> Result<T>
where
    C: Connector,
    T: Default,
    W: AsyncFnOnce(&mut C::Connection) -> Result<T>,
{
    let Some(url) = identity.url.as_deref() else {
        debug!("No URL configured, skipping {family:?} operation");
        return Ok(T::default());
    };

    let endpoint = Endpoint::derive(url, family)?;
    debug!(properties = ?endpoint.properties(), "Opening connection to {endpoint}");

    let mut connection = connector.open(&endpoint, identity).await?;
    let outcome = work(&mut connection).await;

    if let Err(e) = connector.release(connection).await {
        warn!("Failed to release connection to {endpoint}: {e}");
    }

    outcome
}
