//! Thin, typed wrapper around the tonic-generated `EventChannelClient`.
//!
//! Provides ergonomic async methods ([`EventsClient::subscribe`],
//! [`EventsClient::join_table`]) so the feed loop never imports tonic
//! internals directly.

use std::fmt;

use tonic::transport::Channel;

use crate::proto;
use crate::proto::event_channel_client::EventChannelClient;
use crate::session::{BearerInterceptor, Session};

/// Plain (unauthenticated) gRPC client type alias.
type PlainClient = EventChannelClient<Channel>;

/// Authenticated gRPC client with Bearer token interceptor.
type AuthClient =
    EventChannelClient<tonic::service::interceptor::InterceptedService<Channel, BearerInterceptor>>;

/// Internal transport enum supporting both plain and authenticated channels.
enum EventsClientInner {
    /// Unauthenticated channel.
    Plain(PlainClient),
    /// Channel with a [`BearerInterceptor`] injecting an `Authorization` header.
    Auth(AuthClient),
}

/// Typed gRPC client for the order-event push channel.
///
/// Wraps the tonic-generated [`EventChannelClient`] and exposes the two
/// operations the feed needs. Supports both plain and authenticated
/// (session bearer token) transports via an internal enum. Clone is
/// cheap because the tonic channel is an `Arc`'d connection pool.
pub struct EventsClient {
    inner: EventsClientInner,
}

impl Clone for EventsClient {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            EventsClientInner::Plain(c) => EventsClientInner::Plain(c.clone()),
            EventsClientInner::Auth(c) => EventsClientInner::Auth(c.clone()),
        };
        Self { inner }
    }
}

impl fmt::Debug for EventsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self.inner {
            EventsClientInner::Plain(_) => "Plain",
            EventsClientInner::Auth(_) => "Auth",
        };
        f.debug_struct("EventsClient")
            .field("transport", &variant)
            .finish()
    }
}

impl EventsClient {
    /// Connect to the event channel at the given endpoint.
    ///
    /// Creates an unauthenticated (plain) connection. For connections
    /// that should carry the session's bearer token, use
    /// [`connect_with_session`](Self::connect_with_session).
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The URI of the event server (e.g. `"http://127.0.0.1:4650"`).
    ///
    /// # Errors
    ///
    /// Returns [`tonic::transport::Error`] if the channel cannot be established.
    pub async fn connect(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        let client = EventChannelClient::connect(endpoint.to_string()).await?;
        Ok(Self {
            inner: EventsClientInner::Plain(client),
        })
    }

    /// Connect to the event channel, attaching the session's bearer token
    /// to every RPC.
    ///
    /// The token is read from the [`Session`] on each outgoing request,
    /// so a token installed or cleared after connecting takes effect on
    /// the next RPC. With no token set, requests carry no
    /// `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::transport::Error`] if the channel cannot be established.
    pub async fn connect_with_session(
        endpoint: &str,
        session: Session,
    ) -> Result<Self, tonic::transport::Error> {
        let channel = tonic::transport::Endpoint::from_shared(endpoint.to_string())?
            .connect()
            .await?;
        let interceptor = BearerInterceptor { session };
        let client = EventChannelClient::with_interceptor(channel, interceptor);
        Ok(Self {
            inner: EventsClientInner::Auth(client),
        })
    }

    /// Construct an `EventsClient` from a pre-built [`EventChannelClient`].
    ///
    /// Used in tests to create clients with lazy or mock channels.
    #[cfg(test)]
    pub(crate) fn from_inner(inner: EventChannelClient<Channel>) -> Self {
        Self {
            inner: EventsClientInner::Plain(inner),
        }
    }

    /// Check whether this client uses an authenticated transport.
    #[cfg(test)]
    pub(crate) fn is_auth(&self) -> bool {
        matches!(self.inner, EventsClientInner::Auth(_))
    }

    /// Open the long-lived event stream for this client process.
    ///
    /// Returns a streaming response yielding [`EventFrame`](proto::EventFrame)
    /// messages until the server closes the stream or the client drops it.
    /// The feed's reconnect loop is the only caller.
    ///
    /// # Arguments
    ///
    /// * `client_id` - Stable per-process identity correlating this
    ///   stream with later [`join_table`](Self::join_table) calls.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] if the initial RPC handshake fails.
    pub async fn subscribe(
        &mut self,
        client_id: &str,
    ) -> Result<tonic::Streaming<proto::EventFrame>, tonic::Status> {
        let request = proto::SubscribeRequest {
            client_id: client_id.to_string(),
        };
        let response = match &self.inner {
            EventsClientInner::Plain(c) => c.clone().subscribe(request).await?,
            EventsClientInner::Auth(c) => c.clone().subscribe(request).await?,
        };
        Ok(response.into_inner())
    }

    /// Ask the server to scope subsequent pushes to a table.
    ///
    /// Applies to this client's current subscription; a re-established
    /// subscription starts unscoped and the caller re-joins.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn join_table(
        &mut self,
        client_id: &str,
        table_number: &str,
    ) -> Result<(), tonic::Status> {
        let request = proto::JoinTableRequest {
            client_id: client_id.to_string(),
            table_number: table_number.to_string(),
        };
        match &self.inner {
            EventsClientInner::Plain(c) => c.clone().join_table(request).await?,
            EventsClientInner::Auth(c) => c.clone().join_table(request).await?,
        };
        Ok(())
    }
}
