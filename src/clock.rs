//! Cached `Date` header.
//!
//! Formatting an HTTP date on every response is wasted work when the value
//! only changes once a second. [`ClockCache`] holds the pre-rendered header
//! line and [`ClockService`] refreshes it from a background task.
//!
//! Each refresh builds a fresh immutable [`DateHeader`] and swaps it in with
//! a single pointer store, so readers see either the old value or the new
//! one, never a mix.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::{ArcSwap, Guard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::error::ClockError;

/// How often the background task re-renders the date.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Length of an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub const DATE_VALUE_LEN: usize = 29;

const PREFIX: &[u8] = b"Date: ";
const SUFFIX: &[u8] = b"\r\n";
const EPOCH_LINE: &[u8] = b"Date: Thu, 01 Jan 1970 00:00:00 GMT\r\n";

// 10000-01-01T00:00:00Z; httpdate only renders four-digit years.
const MAX_UNIX_SECS: u64 = 253_402_300_800;

/// One rendered `Date: ...\r\n` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateHeader {
    line: Box<[u8]>,
}

impl DateHeader {
    fn render(time: SystemTime) -> Result<Self, ClockError> {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ClockError::Unrepresentable)?;
        if since_epoch.as_secs() >= MAX_UNIX_SECS {
            return Err(ClockError::Unrepresentable);
        }

        let value = httpdate::fmt_http_date(time);
        let mut line = Vec::with_capacity(PREFIX.len() + value.len() + SUFFIX.len());
        line.extend_from_slice(PREFIX);
        line.extend_from_slice(value.as_bytes());
        line.extend_from_slice(SUFFIX);

        Ok(Self {
            line: line.into_boxed_slice(),
        })
    }

    /// The complete header line including the trailing CRLF.
    pub fn line(&self) -> &[u8] {
        &self.line
    }

    /// Just the date, without the header name or CRLF.
    pub fn value(&self) -> &[u8] {
        &self.line[PREFIX.len()..self.line.len() - SUFFIX.len()]
    }
}

/// Shared, read-mostly slot holding the latest [`DateHeader`].
///
/// Exactly one writer (the refresh timer) and any number of readers.
/// Reads are lock-free.
#[derive(Debug)]
pub struct ClockCache {
    slot: ArcSwap<DateHeader>,
}

impl ClockCache {
    /// Creates a cache already holding the current time.
    pub fn new() -> Self {
        // A host clock before the epoch still needs some valid value.
        let header = DateHeader::render(SystemTime::now()).unwrap_or_else(|_| DateHeader {
            line: EPOCH_LINE.into(),
        });
        Self {
            slot: ArcSwap::from_pointee(header),
        }
    }

    /// Re-renders the date from the system clock.
    ///
    /// On failure the previous value stays published and a warning is
    /// logged; the next tick tries again.
    pub fn refresh(&self) {
        if let Err(e) = self.refresh_at(SystemTime::now()) {
            warn!(error = %e, "Keeping previous Date header");
        }
    }

    /// Renders `time` and publishes it.
    pub fn refresh_at(&self, time: SystemTime) -> Result<(), ClockError> {
        let header = DateHeader::render(time)?;
        self.slot.store(Arc::new(header));
        Ok(())
    }

    /// The latest published header. Does not block.
    ///
    /// Hold the guard only for the duration of one response write.
    #[inline]
    pub fn current(&self) -> Guard<Arc<DateHeader>> {
        self.slot.load()
    }
}

impl Default for ClockCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the periodic refresh task for a [`ClockCache`].
///
/// Started once at process start and stopped at teardown.
pub struct ClockService {
    cache: Arc<ClockCache>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ClockService {
    /// Spawns the refresh timer on the current tokio runtime.
    pub fn start(cache: Arc<ClockCache>, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let timer_cache = Arc::clone(&cache);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        timer_cache.refresh();
                        trace!("Date header refreshed");
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Clock refresh stopped");
        });

        Self {
            cache,
            stop_tx,
            task,
        }
    }

    /// The cache this service keeps fresh.
    pub fn cache(&self) -> &Arc<ClockCache> {
        &self.cache
    }

    /// Stops the timer and waits for the task to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Clock refresh task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_imf_fixdate() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        let header = DateHeader::render(time).unwrap();

        assert_eq!(header.value(), b"Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(header.line(), b"Date: Sun, 06 Nov 1994 08:49:37 GMT\r\n");
        assert_eq!(header.value().len(), DATE_VALUE_LEN);
    }

    #[test]
    fn pre_epoch_time_keeps_previous_value() {
        let cache = ClockCache::new();
        let known = UNIX_EPOCH + Duration::from_secs(1_000_000_000);
        cache.refresh_at(known).unwrap();
        let before = cache.current().line().to_vec();

        let result = cache.refresh_at(UNIX_EPOCH - Duration::from_secs(60));

        assert_eq!(result, Err(ClockError::Unrepresentable));
        assert_eq!(cache.current().line(), &before[..]);
    }

    #[test]
    fn far_future_time_is_rejected() {
        let cache = ClockCache::new();
        let result = cache.refresh_at(UNIX_EPOCH + Duration::from_secs(MAX_UNIX_SECS));
        assert_eq!(result, Err(ClockError::Unrepresentable));
    }
}
