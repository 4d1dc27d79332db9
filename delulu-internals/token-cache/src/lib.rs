//! Delulu Token Cache
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! delulu-internals/token-cache
//! A cache for short-lived bearer tokens, refreshed on demand under a single lock

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use secrecy::SecretString;
use tokio::sync::Mutex;

/// Tokens are considered stale this long before their reported expiry
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Lifetime assumed when the issuer omits `expires_in` or reports a non-positive one
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(20 * 60);

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same offset, so a test can hand one clone to the cache
/// and keep another to advance time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// What a successful credential exchange hands back to the cache
#[derive(Debug)]
pub struct IssuedToken {
    pub access_token: SecretString,
    /// Lifetime in seconds as reported by the issuer
    pub expires_in: Option<i64>,
}

#[derive(Debug)]
struct CachedToken {
    token: Arc<SecretString>,
    issued_at: Instant,
    expires_at: Instant,
}

impl CachedToken {
    fn is_usable(&self, now: Instant, margin: Duration) -> bool {
        self.expires_at
            .checked_sub(margin)
            .is_some_and(|deadline| now < deadline)
    }
}

/// Holds at most one bearer token and refreshes it when it gets close to expiry.
///
/// All reads and writes of the cached token happen while holding a single
/// async lock, and the refresh future runs inside that critical section:
/// concurrent callers that find the token stale queue up behind the first one
/// and then observe the token it stored. The slot is only written after the
/// refresh future resolves to `Ok`, so a failed or dropped refresh leaves the
/// previous state untouched.
///
/// # Examples
///
/// ```ignore
/// let cache = TokenCache::default();
/// let token = cache
///     .get_or_refresh(|| async { exchange_credentials().await })
///     .await?;
/// ```
#[derive(Debug)]
pub struct TokenCache<C = SystemClock> {
    clock: C,
    slot: Mutex<Option<CachedToken>>,
    refresh_margin: Duration,
    default_lifetime: Duration,
    exchanges: AtomicU64,
}

impl Default for TokenCache<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> TokenCache<C> {
    /// Create an empty cache driven by `clock`
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            slot: Mutex::new(None),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            default_lifetime: DEFAULT_LIFETIME,
            exchanges: AtomicU64::new(0),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn with_default_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    /// Return the cached token, or run `refresh` to obtain a new one.
    ///
    /// `refresh` is only invoked when there is no cached token or when the
    /// current instant is not earlier than `expiry - refresh_margin`.
    /// Errors from `refresh` are returned as-is and never retried.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<Arc<SecretString>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken, E>>,
    {
        let mut slot = self.slot.lock().await;

        let now = self.clock.now();
        match slot.as_ref() {
            Some(cached) if cached.is_usable(now, self.refresh_margin) => {
                tracing::trace!(
                    "[token-cache] hit, token age {:?}",
                    now.saturating_duration_since(cached.issued_at)
                );
                return Ok(Arc::clone(&cached.token));
            }
            Some(_) => tracing::debug!("[token-cache] token within refresh margin, refreshing"),
            None => tracing::debug!("[token-cache] no token cached, exchanging credentials"),
        }

        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let issued = refresh().await?;

        let issued_at = self.clock.now();
        let lifetime = match issued.expires_in {
            Some(secs) if secs > 0 => Duration::from_secs(secs.unsigned_abs()),
            _ => self.default_lifetime,
        };
        let token = Arc::new(issued.access_token);
        *slot = Some(CachedToken {
            token: Arc::clone(&token),
            issued_at,
            expires_at: issued_at + lifetime,
        });
        tracing::debug!("[token-cache] stored new token, lifetime {:?}", lifetime);

        Ok(token)
    }

    /// Drop the cached token so the next call exchanges credentials again
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    /// Drop the cached token only if it is still `rejected`.
    ///
    /// A token already replaced by another caller is kept. Returns whether
    /// anything was dropped.
    pub async fn invalidate_if_current(&self, rejected: &Arc<SecretString>) -> bool {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(cached) if Arc::ptr_eq(&cached.token, rejected) => {
                slot.take();
                true
            }
            _ => false,
        }
    }

    /// Expiry instant of the cached token, if any
    pub async fn expires_at(&self) -> Option<Instant> {
        self.slot.lock().await.as_ref().map(|cached| cached.expires_at)
    }

    /// Number of times a refresh was started since creation
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }
}
