//! Request throttle shared by every outbound call
//!
//! Caps the number of requests in flight and spaces request starts by a
//! minimum interval.

use crate::error::{IngestError, Result};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

#[derive(Debug)]
pub struct RequestThrottle {
    permits: Semaphore,
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RequestThrottle {
    pub fn new(max_in_flight: usize, interval: Duration) -> Self {
        Self {
            permits: Semaphore::new(max_in_flight.max(1)),
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait for a free slot; the request may start once this returns and
    /// counts against the cap until the permit is dropped
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| IngestError::source_unavailable("request throttle", e))?;

        let start_at = {
            let mut next = self.next_slot.lock().await;
            let start_at = (*next).max(Instant::now());
            *next = start_at + self.interval;
            start_at
        };
        tokio::time::sleep_until(start_at).await;

        Ok(permit)
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_spaces_request_starts() {
        let throttle = RequestThrottle::new(4, Duration::from_millis(100));
        let begin = Instant::now();

        for _ in 0..3 {
            let _permit = throttle.acquire().await.unwrap();
        }

        assert!(begin.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_caps_in_flight() {
        let throttle = RequestThrottle::new(2, Duration::ZERO);
        let first = throttle.acquire().await.unwrap();
        let _second = throttle.acquire().await.unwrap();
        assert_eq!(throttle.available(), 0);

        drop(first);
        assert_eq!(throttle.available(), 1);
    }
}
