//! Authenticated session lifecycle against the JWT endpoints.

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::{Diagnostics, RemedyConfig};
use crate::endpoints::{LOGIN_PATH, LOGOUT_PATH};
use crate::error::{RemedyError, TokenError};
use crate::token::{self, Credential, LockAttempt, TokenStore};
use crate::transport::{ApiRequest, Method, RequestBody, Transport};

/// Authorization scheme Remedy expects in the bearer header.
const AUTH_SCHEME: &str = "AR-JWT";

/// Builds the `Authorization` header value from whatever the store holds.
///
/// An absent or empty token yields an empty bearer; the server's 401 then
/// drives the normal refresh path. The store stays the single source of
/// truth between retry attempts.
pub(crate) fn bearer_value(store: &TokenStore, user: &str) -> Result<String, TokenError> {
    let token = store
        .read(user)?
        .map(|credential| credential.token.expose_secret().to_string())
        .unwrap_or_default();
    Ok(format!("{AUTH_SCHEME} {token}"))
}

/// Login, logout, and the cross-process token refresh.
pub struct AuthSession {
    transport: Arc<dyn Transport>,
    store: TokenStore,
}

impl AuthSession {
    /// Creates a session over the given transport and token store.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: TokenStore) -> Self {
        Self { transport, store }
    }

    /// The token store this session persists into.
    #[must_use]
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Authenticates and persists the returned token.
    ///
    /// Credentials go form-encoded in the request body. A 200 response
    /// body is the bearer token itself and is written to the store before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns [`RemedyError::Auth`] when the server rejects the
    /// credentials or the request fails in transit, and a token error when
    /// the store write fails.
    pub fn login(&self, config: &RemedyConfig) -> Result<Credential, RemedyError> {
        let request = ApiRequest::new(Method::Post, format!("{}{LOGIN_PATH}", config.api_base))
            .body(RequestBody::Form(vec![
                ("username".to_string(), config.user.clone()),
                (
                    "password".to_string(),
                    config.password.expose_secret().to_string(),
                ),
            ]))
            .timeout(config.request_timeout);

        let response = self
            .transport
            .execute(&request)
            .map_err(|error| RemedyError::Auth {
                status: None,
                detail: error.to_string(),
            })?;
        if response.status != 200 {
            return Err(RemedyError::Auth {
                status: Some(response.status),
                detail: response.text(),
            });
        }

        let token = response.text();
        self.store.write(&config.user, &token)?;
        Ok(Credential {
            token: token.into(),
            issued_to: config.user.clone(),
        })
    }

    /// Invalidates the stored token server-side, best-effort.
    ///
    /// Never fails: a missing token means there is nothing to invalidate,
    /// and any error is logged and recorded in `diagnostics` without
    /// blocking the login that follows.
    pub fn logout(&self, config: &RemedyConfig, diagnostics: &mut Diagnostics) {
        let bearer = match bearer_value(&self.store, &config.user) {
            Ok(bearer) => bearer,
            Err(error) => {
                tracing::debug!(error = %error, "skipping logout: token unavailable");
                diagnostics.record(format!("logout skipped: {error}"));
                return;
            },
        };
        if bearer.trim_end() == AUTH_SCHEME {
            tracing::debug!("skipping logout: no token stored");
            return;
        }

        let request = ApiRequest::new(Method::Post, format!("{}{LOGOUT_PATH}", config.api_base))
            .header("Authorization", bearer)
            .timeout(config.request_timeout);
        match self.transport.execute(&request) {
            Ok(response) if response.status < 400 => {},
            Ok(response) => {
                tracing::debug!(status = response.status, "logout rejected");
                diagnostics.record(format!("logout rejected with status {}", response.status));
            },
            Err(error) => {
                tracing::debug!(error = %error, "logout failed");
                diagnostics.record(format!("logout failed: {error}"));
            },
        }
    }

    /// Refreshes the stored token, coordinating with sibling processes.
    ///
    /// Exactly one of N concurrent refreshers performs the actual login;
    /// the rest observe the lock and return `Ok(false)` so their callers
    /// re-read the store and retry the original operation. The lock marker
    /// is removed on every exit path.
    ///
    /// Returns `Ok(true)` iff this process logged in successfully.
    ///
    /// # Errors
    ///
    /// Returns an error when the credential directory or lock marker
    /// cannot be accessed. A rejected login is not an error here; it is
    /// recorded in `diagnostics` and reported as `Ok(false)`.
    pub fn refresh(
        &self,
        config: &RemedyConfig,
        diagnostics: &mut Diagnostics,
    ) -> Result<bool, RemedyError> {
        self.store.ensure_exists(&config.user)?;
        let lock_path = self.store.lock_path(&config.user);

        match token::acquire(&lock_path, &config.user, config.lock_wait)? {
            LockAttempt::Deferred => {
                tracing::debug!("refresh deferred: another process holds the lock");
                Ok(false)
            },
            LockAttempt::Acquired(_guard) => {
                self.logout(config, diagnostics);
                match self.login(config) {
                    Ok(_) => Ok(true),
                    Err(error) => {
                        tracing::warn!(error = %error, "token refresh login failed");
                        diagnostics.record(format!("refresh login failed: {error}"));
                        Ok(false)
                    },
                }
                // _guard drops here, removing the marker on success and
                // failure alike.
            },
        }
    }
}
