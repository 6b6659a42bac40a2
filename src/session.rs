//! Explicit auth session shared by the REST client and the event feed.
//!
//! The backend authenticates admins with a session cookie; a bearer
//! token is the fallback for deployments where cookies don't stick. The
//! token lives in one [`Session`] object owned by the composition root
//! and handed to both transports at construction — there is no
//! module-level mutable token. Set on login, cleared on logout or any
//! 401.

use std::sync::{Arc, RwLock};

/// Shared, refreshable auth state.
///
/// `Clone` is cheap: clones share the same token cell, so a clear
/// triggered by one client is immediately visible to every other holder.
/// The inner lock is read on every outgoing request.
///
/// # Panics
///
/// Accessors panic if the inner [`RwLock`] is poisoned (a writer
/// panicked while holding the lock). This is treated as an invariant
/// violation.
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    /// Create a session with no bearer token (cookie-only auth).
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a bearer token, typically from a login response.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().expect("session token lock poisoned") = Some(token.into());
    }

    /// Drop the bearer token. Called on logout and on any 401 response.
    pub fn clear_token(&self) {
        *self.token.write().expect("session token lock poisoned") = None;
    }

    /// Snapshot of the current token, if one is set.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .expect("session token lock poisoned")
            .clone()
    }

    /// True when a bearer token is currently installed.
    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .expect("session token lock poisoned")
            .is_some()
    }
}

impl std::fmt::Debug for Session {
    // Never print the token itself.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// gRPC interceptor that injects the session's bearer token into
/// outgoing requests.
///
/// The token is read from the [`Session`] on every intercepted request,
/// so installing or clearing a token takes effect on the next RPC
/// without reconnecting. When no token is set, no `authorization`
/// header is added and the request rides on cookie auth alone.
#[derive(Clone)]
pub(crate) struct BearerInterceptor {
    pub(crate) session: Session,
}

impl tonic::service::Interceptor for BearerInterceptor {
    fn call(&mut self, mut req: tonic::Request<()>) -> Result<tonic::Request<()>, tonic::Status> {
        if let Some(token) = self.session.token() {
            let value = format!("Bearer {token}")
                .parse::<tonic::metadata::MetadataValue<_>>()
                .map_err(|_| tonic::Status::internal("invalid token characters"))?;
            req.metadata_mut().insert("authorization", value);
        }
        Ok(req)
    }
}
