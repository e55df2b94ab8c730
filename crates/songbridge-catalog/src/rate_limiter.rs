// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{CatalogError, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep, sleep_until, Duration, Instant};

/// Rate limiter shared by every clone of a catalog client.
///
/// Requests are serialized through a single permit and spaced by a minimum
/// interval. When the catalog answers 429, [`RateLimiter::back_off`] pushes a
/// shared resume instant so concurrent callers wait out the same window
/// instead of each retrying on its own.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    resume_at: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified minimum interval between requests.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            resume_at: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until a request can be made according to the rate limit.
    pub async fn acquire(&self) -> Result<()> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| CatalogError::RateLimiterClosed)?;

        let resume = *self.resume_at.lock().await;
        if let Some(resume) = resume {
            if resume > Instant::now() {
                tracing::debug!(
                    target: "catalog",
                    "backing off: waiting {:?}",
                    resume - Instant::now()
                );
                sleep_until(resume).await;
            }
        }

        let mut last = self.last_request.lock().await;

        if let Some(last_instant) = *last {
            let elapsed = last_instant.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::trace!(
                    target: "catalog",
                    "rate limiting: waiting {:?}",
                    wait_time
                );
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
        Ok(())
    }

    /// Hold every caller back for at least `wait` from now.
    ///
    /// A shorter window never shortens one already in force.
    pub async fn back_off(&self, wait: Duration) {
        let until = Instant::now() + wait;
        let mut resume = self.resume_at.lock().await;
        if (*resume).map_or(true, |current| current < until) {
            *resume = Some(until);
        }
    }
}
