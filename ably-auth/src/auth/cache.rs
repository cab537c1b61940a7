// Token cache with single-flight renewal
//
// The current token lives in a parking_lot::RwLock so readers never block on
// an acquisition. Acquisitions are serialised by a tokio mutex; a caller that
// waited on it takes the outcome of the acquisition that finished meanwhile
// instead of starting another one.

use super::clock::Clock;
use super::strategy::Acquired;
use super::token::TokenDetails;
use crate::error::{AblyError, AblyResult};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Lifecycle of the cached token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Empty,
    Valid,
    Expired,
}

#[derive(Debug, Clone)]
struct CachedToken {
    details: Arc<TokenDetails>,
    /// None when the lifetime is unknown: valid until the server rejects it
    expires_at: Option<i64>,
}

impl CachedToken {
    fn new(details: TokenDetails, ttl: Option<Duration>) -> Self {
        let expires_at = details.expires.or_else(|| {
            details.issued.zip(ttl).map(|(issued, ttl)| {
                let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                issued.saturating_add(ttl)
            })
        });
        Self {
            details: Arc::new(details),
            expires_at,
        }
    }

    fn is_valid(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<CachedToken>,
    /// Bumped on every install, failed acquisition and clear
    generation: u64,
    /// Outcome of the latest acquisition when it failed
    last_error: Option<AblyError>,
}

/// Per-client token cache
pub struct TokenCache {
    clock: Arc<dyn Clock>,
    slot: RwLock<Slot>,
    renewal: Mutex<()>,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slot: RwLock::new(Slot::default()),
            renewal: Mutex::new(()),
        }
    }

    /// Install a token obtained outside the cache, e.g. a static token
    pub fn seed(&self, details: TokenDetails, ttl: Option<Duration>) -> Arc<TokenDetails> {
        let cached = CachedToken::new(details, ttl);
        let details = cached.details.clone();
        self.install(Ok(cached));
        details
    }

    pub fn state(&self) -> TokenState {
        match self.slot.read().current {
            None => TokenState::Empty,
            Some(ref cached) if cached.is_valid(self.clock.now_millis()) => TokenState::Valid,
            Some(_) => TokenState::Expired,
        }
    }

    /// The cached token, expired or not
    pub fn current(&self) -> Option<Arc<TokenDetails>> {
        self.slot
            .read()
            .current
            .as_ref()
            .map(|cached| cached.details.clone())
    }

    /// The cached token if it has not expired
    pub fn valid_token(&self) -> Option<Arc<TokenDetails>> {
        let now = self.clock.now_millis();
        self.slot
            .read()
            .current
            .as_ref()
            .filter(|cached| cached.is_valid(now))
            .map(|cached| cached.details.clone())
    }

    /// Return a valid token, acquiring one if needed.
    ///
    /// With `force` the cached token is ignored and `acquire` always runs,
    /// still serialised with any other acquisition.
    pub async fn get_token<F, Fut>(&self, force: bool, acquire: F) -> AblyResult<Arc<TokenDetails>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AblyResult<Acquired>>,
    {
        if !force {
            if let Some(token) = self.valid_token() {
                debug!("Token cache hit");
                return Ok(token);
            }
        }

        let seen = self.slot.read().generation;
        let _guard = self.renewal.lock().await;

        if !force {
            if let Some(outcome) = self.outcome_since(seen) {
                return outcome;
            }
            if let Some(token) = self.valid_token() {
                return Ok(token);
            }
        }

        debug!(force, "Token cache miss");
        self.run(acquire).await
    }

    /// Replace a token the server rejected.
    ///
    /// Runs one acquisition unless a concurrent caller already replaced
    /// `stale`, in which case that caller's outcome is returned.
    pub async fn renew_after_rejection<F, Fut>(
        &self,
        stale: &Arc<TokenDetails>,
        acquire: F,
    ) -> AblyResult<Arc<TokenDetails>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AblyResult<Acquired>>,
    {
        let seen = self.slot.read().generation;
        let _guard = self.renewal.lock().await;

        if let Some(outcome) = self.outcome_since(seen) {
            return outcome;
        }

        {
            let now = self.clock.now_millis();
            let mut slot = self.slot.write();
            let replacement = slot
                .current
                .as_ref()
                .filter(|cached| !Arc::ptr_eq(&cached.details, stale) && cached.is_valid(now))
                .map(|cached| cached.details.clone());
            if let Some(token) = replacement {
                debug!("Rejected token already replaced");
                return Ok(token);
            }
            slot.current = None;
        }

        info!("Renewing rejected token");
        self.run(acquire).await
    }

    /// Drop the cached token
    pub fn clear(&self) {
        let mut slot = self.slot.write();
        slot.current = None;
        slot.last_error = None;
        slot.generation += 1;
    }

    /// Outcome of an acquisition that completed after `seen`, if any
    fn outcome_since(&self, seen: u64) -> Option<AblyResult<Arc<TokenDetails>>> {
        let slot = self.slot.read();
        if slot.generation == seen {
            return None;
        }
        if let Some(ref err) = slot.last_error {
            return Some(Err(err.clone()));
        }
        let now = self.clock.now_millis();
        slot.current
            .as_ref()
            .filter(|cached| cached.is_valid(now))
            .map(|cached| Ok(cached.details.clone()))
    }

    async fn run<F, Fut>(&self, acquire: F) -> AblyResult<Arc<TokenDetails>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AblyResult<Acquired>>,
    {
        match acquire().await {
            Ok(acquired) => {
                let cached = CachedToken::new(acquired.details, acquired.ttl);
                let details = cached.details.clone();
                debug!(expires_at = ?cached.expires_at, "Installing new token");
                self.install(Ok(cached));
                Ok(details)
            }
            Err(err) => {
                warn!(code = err.code(), error = %err, "Token acquisition failed");
                self.install(Err(err.clone()));
                Err(err)
            }
        }
    }

    fn install(&self, outcome: Result<CachedToken, AblyError>) {
        let mut slot = self.slot.write();
        slot.generation += 1;
        match outcome {
            Ok(cached) => {
                slot.current = Some(cached);
                slot.last_error = None;
            }
            Err(err) => slot.last_error = Some(err),
        }
    }
}
