//! Bearer credential cache with proactive refresh.
//!
//! The appliance issues tokens with a fixed one-hour validity; the lifetime
//! is dictated by the protocol, not learned from any response field. The
//! manager caches the credential, renews it once it comes within the
//! configured refresh threshold of expiry, and guarantees at most one login
//! is in flight per instance: callers that arrive while a login is running
//! block on the gate and observe that attempt's outcome instead of issuing
//! their own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::error::ApiError;
use super::transport::PowerApi;

/// Token validity period dictated by the appliance protocol.
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// A cached bearer credential.
#[derive(Debug, Clone)]
pub struct Credential {
    token: String,
    issued_device_id: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    /// Build a credential expiring one token lifetime from `now`.
    pub fn issued_at(token: String, issued_device_id: String, now: DateTime<Utc>) -> Self {
        Self {
            token,
            issued_device_id,
            expires_at: now + chrono::Duration::seconds(TOKEN_LIFETIME_SECS),
        }
    }

    /// The opaque bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Appliance-side identifier the token was issued for.
    pub fn issued_device_id(&self) -> &str {
        &self.issued_device_id
    }

    /// Expiry instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is valid strictly before its expiry.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Due once the remaining validity is within the refresh threshold.
    fn due_for_refresh(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match (self.expires_at - now).to_std() {
            Ok(remaining) => remaining <= threshold,
            // Already expired.
            Err(_) => true,
        }
    }
}

#[derive(Default)]
struct TokenState {
    credential: Option<Credential>,
    /// Bumped once per completed login attempt, success or failure. Lets a
    /// caller that queued behind an in-flight login detect that the attempt
    /// finished while it waited.
    attempt_seq: u64,
    last_failure: Option<ApiError>,
}

impl TokenState {
    fn fresh_credential(&self, threshold: Duration) -> Option<&Credential> {
        self.credential
            .as_ref()
            .filter(|cred| !cred.due_for_refresh(Utc::now(), threshold))
    }
}

/// Owns the cached credential and the refresh policy.
pub struct TokenManager {
    api: Arc<dyn PowerApi>,
    username: String,
    password: String,
    refresh_threshold: Duration,
    state: RwLock<TokenState>,
    login_gate: Mutex<()>,
}

impl TokenManager {
    /// Create a manager around an API transport and login credentials.
    ///
    /// `refresh_threshold` should already be validated to a sane band by the
    /// configuration layer.
    pub fn new(
        api: Arc<dyn PowerApi>,
        username: impl Into<String>,
        password: impl Into<String>,
        refresh_threshold: Duration,
    ) -> Self {
        Self {
            api,
            username: username.into(),
            password: password.into(),
            refresh_threshold,
            state: RwLock::new(TokenState::default()),
            login_gate: Mutex::new(()),
        }
    }

    /// Return a valid bearer token, logging in if the cached credential is
    /// missing or due for refresh.
    ///
    /// # Errors
    /// Propagates the login failure unmodified. A previously cached
    /// credential is left untouched by a failed refresh; only expiry or an
    /// explicit [`invalidate`](Self::invalidate) clears it.
    pub async fn get_token(&self) -> Result<String, ApiError> {
        // Fast path: shared lock, no network.
        {
            let state = self.state.read().await;
            if let Some(cred) = state.fresh_credential(self.refresh_threshold) {
                return Ok(cred.token.clone());
            }
        }

        let observed = self.state.read().await.attempt_seq;
        let _gate = self.login_gate.lock().await;

        // Re-check: a login may have completed while we queued on the gate,
        // and its outcome settles this call too.
        {
            let state = self.state.read().await;
            if let Some(cred) = state.fresh_credential(self.refresh_threshold) {
                return Ok(cred.token.clone());
            }
            if state.attempt_seq != observed {
                if let Some(err) = &state.last_failure {
                    return Err(err.clone());
                }
            }
        }

        tracing::debug!("credential missing or due for refresh, logging in");
        let result = self.api.login(&self.username, &self.password).await;

        let mut state = self.state.write().await;
        state.attempt_seq += 1;
        match result {
            Ok(session) => {
                let credential =
                    Credential::issued_at(session.token, session.issued_device_id, Utc::now());
                let token = credential.token.clone();
                tracing::info!(expires_at = %credential.expires_at, "appliance login succeeded");
                state.credential = Some(credential);
                state.last_failure = None;
                Ok(token)
            }
            Err(err) => {
                // A still-valid cached credential survives a failed refresh.
                tracing::warn!(error = %err, "appliance login failed");
                state.last_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Whether a cached credential exists and has not expired.
    pub async fn is_valid(&self) -> bool {
        let state = self.state.read().await;
        state
            .credential
            .as_ref()
            .is_some_and(|cred| cred.is_valid(Utc::now()))
    }

    /// Expiry of the cached credential, if one exists.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.credential.as_ref().map(Credential::expires_at)
    }

    /// Drop the cached credential so the next [`get_token`](Self::get_token)
    /// performs a fresh login. Called after the appliance rejects a token on
    /// a data call.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        if state.credential.take().is_some() {
            tracing::debug!("cached credential invalidated");
        }
    }

    #[cfg(test)]
    pub(crate) async fn inject_credential(&self, credential: Credential) {
        self.state.write().await.credential = Some(credential);
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("username", &self.username)
            .field("refresh_threshold", &self.refresh_threshold)
            .finish_non_exhaustive()
    }
}
