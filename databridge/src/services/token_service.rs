//! Credential refresh service
//!
//! Maintains the (access token, refresh token, expiry) triple needed by the
//! PIM API. A single owner task holds the state exclusively and answers
//! token requests over a channel, so concurrent callers are serialized and
//! can never observe a half-updated triple or trigger duplicate
//! acquisition calls.
//!
//! Wake cycle: after ensuring validity the task sleeps until the token's
//! expiry (event-driven, not fixed polling). A refresh failure of any kind
//! falls back to full reacquisition rather than surfacing the error.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Refresh this far before the reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Re-check interval while no token has been issued yet
const IDLE_RECHECK: Duration = Duration::from_secs(60);

/// Valid access/refresh pair handed to callers
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Raw result of a credential-exchange or refresh call
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_secs: u64,
}

/// Token service errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Credential acquisition failed: {0}")]
    Acquire(#[source] anyhow::Error),

    #[error("Token service is no longer running")]
    ServiceStopped,

    #[error("Tokens unset after successful ensure-valid cycle")]
    Missing,
}

/// Seam to the vendor's credential endpoints, so tests can count calls
#[async_trait]
pub trait CredentialExchange: Send + Sync + 'static {
    /// Acquire a brand-new token pair
    async fn acquire(&self) -> anyhow::Result<IssuedTokens>;

    /// Exchange a refresh token for a fresh pair
    async fn refresh(&self, refresh_token: &str) -> anyhow::Result<IssuedTokens>;
}

enum Command {
    Get(oneshot::Sender<Result<TokenPair, TokenError>>),
}

/// Handle to the owner task
#[derive(Clone)]
pub struct TokenService {
    tx: mpsc::Sender<Command>,
}

impl TokenService {
    /// Spawn the owner task and return a cloneable handle
    pub fn spawn<E: CredentialExchange>(exchange: E) -> Self {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(run_owner(exchange, rx));
        Self { tx }
    }

    /// Get the current valid token pair, acquiring or refreshing first if
    /// needed. Blocks until the triple is valid.
    pub async fn get_valid_tokens(&self) -> Result<TokenPair, TokenError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Get(reply_tx))
            .await
            .map_err(|_| TokenError::ServiceStopped)?;
        reply_rx.await.map_err(|_| TokenError::ServiceStopped)?
    }
}

#[derive(Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenState {
    fn is_valid(&self) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expiry)) => Instant::now() + EXPIRY_MARGIN < expiry,
            _ => false,
        }
    }

    fn store(&mut self, issued: IssuedTokens) {
        self.access_token = Some(issued.access_token);
        self.refresh_token = Some(issued.refresh_token);
        self.expires_at = Some(Instant::now() + Duration::from_secs(issued.expires_in_secs));
    }

    /// After a successful ensure-valid cycle both tokens must be present
    fn token_pair(&self) -> Result<TokenPair, TokenError> {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), Some(refresh)) => Ok(TokenPair {
                access_token: access.clone(),
                refresh_token: refresh.clone(),
            }),
            _ => Err(TokenError::Missing),
        }
    }
}

async fn run_owner<E: CredentialExchange>(exchange: E, mut rx: mpsc::Receiver<Command>) {
    let mut state = TokenState::default();

    loop {
        let wake = state
            .expires_at
            .map(|expiry| expiry.checked_sub(EXPIRY_MARGIN).unwrap_or_else(Instant::now))
            .unwrap_or_else(|| Instant::now() + IDLE_RECHECK);

        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Get(reply)) => {
                    let result = match ensure_valid(&exchange, &mut state).await {
                        Ok(()) => state.token_pair(),
                        Err(e) => Err(e),
                    };
                    // Caller may have given up waiting
                    let _ = reply.send(result);
                }
                None => {
                    debug!("All token service handles dropped, stopping owner task");
                    break;
                }
            },
            _ = tokio::time::sleep_until(wake) => {
                if let Err(e) = ensure_valid(&exchange, &mut state).await {
                    warn!("Scheduled token renewal failed, will retry: {}", e);
                    // Stale expiry would make the next wake immediate;
                    // fall back to the idle recheck interval instead
                    state.expires_at = None;
                }
            }
        }
    }
}

/// Make the triple valid: refresh when a refresh token is held, fall back
/// to full reacquisition on any refresh failure, acquire from scratch
/// otherwise. Valid state is a no-op.
async fn ensure_valid<E: CredentialExchange>(
    exchange: &E,
    state: &mut TokenState,
) -> Result<(), TokenError> {
    if state.is_valid() {
        return Ok(());
    }

    if let Some(refresh_token) = state.refresh_token.clone() {
        match exchange.refresh(&refresh_token).await {
            Ok(issued) => {
                debug!("Access token refreshed");
                state.store(issued);
                return Ok(());
            }
            Err(e) => {
                warn!("Token refresh failed, falling back to reacquisition: {}", e);
            }
        }
    }

    let issued = exchange.acquire().await.map_err(TokenError::Acquire)?;
    info!("Acquired new credential pair");
    state.store(issued);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingExchange {
        acquires: Arc<AtomicUsize>,
        refreshes: Arc<AtomicUsize>,
        fail_refresh: bool,
    }

    #[async_trait]
    impl CredentialExchange for CountingExchange {
        async fn acquire(&self) -> anyhow::Result<IssuedTokens> {
            // Hold the slot briefly so overlapping callers would double up
            // if anything but the owner task could reach here
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.acquires.fetch_add(1, Ordering::SeqCst);
            Ok(IssuedTokens {
                access_token: "access-1".into(),
                refresh_token: "refresh-1".into(),
                expires_in_secs: 3600,
            })
        }

        async fn refresh(&self, _refresh_token: &str) -> anyhow::Result<IssuedTokens> {
            if self.fail_refresh {
                anyhow::bail!("refresh rejected");
            }
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(IssuedTokens {
                access_token: "access-2".into(),
                refresh_token: "refresh-2".into(),
                expires_in_secs: 3600,
            })
        }
    }

    #[tokio::test]
    async fn concurrent_callers_trigger_one_acquisition() {
        let acquires = Arc::new(AtomicUsize::new(0));
        let service = TokenService::spawn(CountingExchange {
            acquires: acquires.clone(),
            refreshes: Arc::new(AtomicUsize::new(0)),
            fail_refresh: false,
        });

        let a = service.clone();
        let b = service.clone();
        let (ra, rb) = tokio::join!(a.get_valid_tokens(), b.get_valid_tokens());

        assert_eq!(ra.unwrap().access_token, "access-1");
        assert_eq!(rb.unwrap().access_token, "access-1");
        assert_eq!(acquires.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn valid_token_is_served_without_new_calls() {
        let acquires = Arc::new(AtomicUsize::new(0));
        let service = TokenService::spawn(CountingExchange {
            acquires: acquires.clone(),
            refreshes: Arc::new(AtomicUsize::new(0)),
            fail_refresh: false,
        });

        service.get_valid_tokens().await.unwrap();
        service.get_valid_tokens().await.unwrap();
        service.get_valid_tokens().await.unwrap();

        assert_eq!(acquires.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_failure_falls_back_to_reacquisition() {
        struct FailingRefreshExchange {
            acquires: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl CredentialExchange for FailingRefreshExchange {
            async fn acquire(&self) -> anyhow::Result<IssuedTokens> {
                let n = self.acquires.fetch_add(1, Ordering::SeqCst);
                Ok(IssuedTokens {
                    access_token: format!("access-{}", n),
                    refresh_token: format!("refresh-{}", n),
                    // First pair expires immediately so the next request
                    // must go through the refresh path
                    expires_in_secs: if n == 0 { 0 } else { 3600 },
                })
            }

            async fn refresh(&self, _refresh_token: &str) -> anyhow::Result<IssuedTokens> {
                anyhow::bail!("refresh always fails");
            }
        }

        let acquires = Arc::new(AtomicUsize::new(0));
        let service = TokenService::spawn(FailingRefreshExchange {
            acquires: acquires.clone(),
        });

        let first = service.get_valid_tokens().await.unwrap();
        assert_eq!(first.access_token, "access-0");

        // Expired now; refresh fails and reacquisition takes over
        let second = service.get_valid_tokens().await.unwrap();
        assert_eq!(second.access_token, "access-1");
        assert_eq!(acquires.load(Ordering::SeqCst), 2);
    }
}
