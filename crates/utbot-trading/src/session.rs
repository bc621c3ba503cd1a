//! Credential session manager.
//!
//! Caches the brokerage credential for a bounded lifetime and refreshes
//! it on demand. The cache lock is held across the refresh call so
//! concurrent callers never race two authentication requests; late
//! arrivals reuse the credential the first caller obtained.
//!
//! When the brokerage answers with a verification ticket instead of a
//! credential, the session parks in a pending state. Every credential
//! request fails fast with the ticket until an out-of-band code is
//! submitted; no further authentication attempts are made while pending.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::broker::{AuthOutcome, Broker, BrokerErrorKind, Credential, VerificationTicket};
use crate::error::TradingError;

/// Default credential lifetime. Tradovate tokens live ~20 minutes; a
/// slightly shorter TTL refreshes before the server-side expiry.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(18 * 60);

struct CachedCredential {
    credential: Credential,
    issued_at: Instant,
}

struct SessionInner {
    credential: Option<CachedCredential>,
    pending: Option<VerificationTicket>,
}

/// Shared credential cache with single-flight refresh.
pub struct SessionManager {
    broker: Arc<dyn Broker>,
    ttl: Duration,
    inner: Mutex<SessionInner>,
}

impl SessionManager {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self::with_ttl(broker, DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(broker: Arc<dyn Broker>, ttl: Duration) -> Self {
        Self {
            broker,
            ttl,
            inner: Mutex::new(SessionInner {
                credential: None,
                pending: None,
            }),
        }
    }

    /// Return a live credential, refreshing if the cached one has aged
    /// out. Fails with [`TradingError::PendingVerification`] while an
    /// out-of-band code is outstanding.
    pub async fn credential(&self) -> Result<Credential, TradingError> {
        let mut inner = self.inner.lock().await;

        if let Some(cached) = &inner.credential {
            if cached.issued_at.elapsed() < self.ttl {
                return Ok(cached.credential.clone());
            }
        }

        if let Some(ticket) = &inner.pending {
            return Err(TradingError::PendingVerification {
                ticket: ticket.clone(),
            });
        }

        match self.broker.authenticate().await {
            Ok(AuthOutcome::Authenticated(credential)) => {
                info!("session refreshed");
                inner.credential = Some(CachedCredential {
                    credential: credential.clone(),
                    issued_at: Instant::now(),
                });
                Ok(credential)
            }
            Ok(AuthOutcome::PendingVerification(ticket)) => {
                warn!("brokerage requires out-of-band verification");
                inner.credential = None;
                inner.pending = Some(ticket.clone());
                Err(TradingError::PendingVerification { ticket })
            }
            Err(error) if error.kind() == BrokerErrorKind::AuthenticationFailed => {
                Err(TradingError::AuthenticationFailed {
                    message: error.message().to_owned(),
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Pair a pending ticket with its out-of-band code. On success the
    /// returned credential is cached and normal operation resumes.
    pub async fn submit_verification_code(&self, code: &str) -> Result<(), TradingError> {
        let mut inner = self.inner.lock().await;

        let Some(ticket) = inner.pending.clone() else {
            return Err(TradingError::NoPendingVerification);
        };

        match self.broker.complete_verification(&ticket, code).await {
            Ok(credential) => {
                info!("verification completed, session restored");
                inner.pending = None;
                inner.credential = Some(CachedCredential {
                    credential,
                    issued_at: Instant::now(),
                });
                Ok(())
            }
            // A wrong code keeps the ticket pending so it can be retried.
            Err(error) if error.kind() == BrokerErrorKind::AuthenticationFailed => {
                Err(TradingError::AuthenticationFailed {
                    message: error.message().to_owned(),
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Whether the session is parked waiting for a verification code.
    pub async fn is_pending_verification(&self) -> bool {
        self.inner.lock().await.pending.is_some()
    }
}
