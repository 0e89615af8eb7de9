//! Payment confirmation polling.
//!
//! After checkout, the landing URL surfaces an opaque checkout session id.
//! The poller asks the subscription service whether that checkout settled,
//! on a fixed interval with a bounded attempt budget, and flips the user's
//! entitlement in place on success. The loop is an explicit attempt counter
//! rather than chained timers so it can be tested and canceled cleanly.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::types::UserPatch;
use crate::api::BillingApi;
use crate::error::{Error, Result};
use crate::session::SessionManager;

/// Default maximum poll attempts before reporting a timeout.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;
/// Default delay between poll attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Terminal result of a checkout poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Payment settled; the session's user record is now premium.
    Confirmed,
    /// The checkout session expired without payment. Not retried.
    Expired,
    /// The attempt budget ran out without a terminal answer. Distinct
    /// from expiry: the payment may still settle out of band.
    TimedOut,
    /// The owning view navigated away and canceled the poll.
    Canceled,
}

/// Bounded-retry poller for pending checkout settlement.
pub struct EntitlementPoller {
    billing: Arc<dyn BillingApi>,
    session: Arc<SessionManager>,
    interval: Duration,
    max_attempts: u32,
}

impl std::fmt::Debug for EntitlementPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementPoller")
            .field("interval", &self.interval)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl EntitlementPoller {
    /// Create a poller with the default schedule (10 attempts, 2 s apart).
    pub fn new(billing: Arc<dyn BillingApi>, session: Arc<SessionManager>) -> Self {
        Self {
            billing,
            session,
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }

    /// Override the poll schedule.
    pub fn with_schedule(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.interval = interval;
        self.max_attempts = max_attempts;
        self
    }

    /// Poll until the checkout settles, expires, the budget runs out, or
    /// `cancel` fires.
    ///
    /// Transient errors count toward the attempt budget but do not stop
    /// the loop. A credential rejection mid-poll is terminal and
    /// propagates: the bearer token is gone, not the backend.
    pub async fn poll(
        &self,
        checkout_session_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CheckoutOutcome> {
        let Some(token) = self.session.session().token else {
            return Err(Error::CapabilityDenied("signed-in session required"));
        };

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                log::debug!("Checkout poll canceled at attempt {attempt}");
                return Ok(CheckoutOutcome::Canceled);
            }

            match self.billing.checkout_status(&token, checkout_session_id).await {
                Ok(status) if status.is_paid() => {
                    log::info!("Checkout settled on attempt {attempt}, unlocking premium");
                    self.session.update_user(&UserPatch::premium());
                    return Ok(CheckoutOutcome::Confirmed);
                }
                Ok(status) if status.is_expired() => {
                    log::warn!("Checkout session expired on attempt {attempt}");
                    return Ok(CheckoutOutcome::Expired);
                }
                Ok(status) => {
                    log::debug!(
                        "Checkout pending on attempt {attempt}/{}: {}/{}",
                        self.max_attempts,
                        status.status,
                        status.payment_status
                    );
                }
                Err(err) if err.is_transient() => {
                    log::warn!("Checkout poll attempt {attempt} failed (continuing): {err}");
                }
                Err(err) => return Err(err),
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    () = cancel.cancelled() => {
                        log::debug!("Checkout poll canceled while waiting");
                        return Ok(CheckoutOutcome::Canceled);
                    }
                    () = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        log::warn!(
            "Checkout verification timed out after {} attempts",
            self.max_attempts
        );
        Ok(CheckoutOutcome::TimedOut)
    }
}
