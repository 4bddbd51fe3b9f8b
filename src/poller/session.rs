// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device polling session.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Whether a device's status fetch is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    /// No fetch running.
    #[default]
    Idle,
    /// A fetch is running; further ticks are skipped.
    Fetching,
}

/// Single-flight slot shared by every tick of one device.
#[derive(Debug, Clone, Default)]
pub(crate) struct FetchSlot(Arc<Mutex<FetchState>>);

impl FetchSlot {
    /// Moves the slot to `Fetching`, or returns `None` if it already is.
    pub(crate) fn try_begin(&self) -> Option<FetchGuard> {
        let mut state = self.0.lock();
        match *state {
            FetchState::Fetching => None,
            FetchState::Idle => {
                *state = FetchState::Fetching;
                Some(FetchGuard(Arc::clone(&self.0)))
            }
        }
    }

    pub(crate) fn state(&self) -> FetchState {
        *self.0.lock()
    }
}

/// Returns the slot to `Idle` when dropped, including when the tick is
/// cancelled mid-fetch.
#[derive(Debug)]
pub(crate) struct FetchGuard(Arc<Mutex<FetchState>>);

impl Drop for FetchGuard {
    fn drop(&mut self) {
        *self.0.lock() = FetchState::Idle;
    }
}

/// Timer, counter and fetch slot of one device.
///
/// The session outlives its timer: restarting polling with a new interval
/// replaces the timer but keeps the unreachable counter.
#[derive(Debug, Default)]
pub(crate) struct PollSession {
    timer: Option<JoinHandle<()>>,
    pub(crate) interval: Duration,
    pub(crate) period: Duration,
    pub(crate) unreachable_count: u64,
    pub(crate) rediscovering: bool,
    pub(crate) last_success: Option<DateTime<Utc>>,
    pub(crate) fetch: FetchSlot,
}

impl PollSession {
    /// Installs a new timer, aborting the previous one.
    pub(crate) fn replace_timer(
        &mut self,
        timer: JoinHandle<()>,
        interval: Duration,
        period: Duration,
    ) {
        self.stop();
        self.timer = Some(timer);
        self.interval = interval;
        self.period = period;
    }

    /// Aborts the timer. Returns `true` if one was running.
    pub(crate) fn stop(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_polling(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus {
            polling: self.is_polling(),
            interval: self.interval,
            period: self.period,
            unreachable_count: self.unreachable_count,
            fetch_state: self.fetch.state(),
            rediscovering: self.rediscovering,
            last_success: self.last_success,
        }
    }
}

/// Snapshot of a device's polling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Whether a timer is running.
    pub polling: bool,
    /// Configured interval.
    pub interval: Duration,
    /// Effective period, jitter included.
    pub period: Duration,
    /// Consecutive unreachable ticks.
    pub unreachable_count: u64,
    /// Whether a fetch is in flight.
    pub fetch_state: FetchState,
    /// Whether a rediscovery run is in progress.
    pub rediscovering: bool,
    /// Time of the last successful fetch.
    pub last_success: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_fetch_is_refused() {
        let slot = FetchSlot::default();
        let guard = slot.try_begin();
        assert!(guard.is_some());
        assert!(slot.try_begin().is_none());
        assert_eq!(slot.state(), FetchState::Fetching);

        drop(guard);
        assert_eq!(slot.state(), FetchState::Idle);
        assert!(slot.try_begin().is_some());
    }

    #[test]
    fn clones_share_the_slot() {
        let slot = FetchSlot::default();
        let other = slot.clone();
        let _guard = slot.try_begin().unwrap();
        assert!(other.try_begin().is_none());
    }

    #[tokio::test]
    async fn replacing_the_timer_aborts_the_old_one() {
        let mut session = PollSession::default();
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        let first = tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await;
        });
        session.replace_timer(first, Duration::from_secs(10), Duration::from_secs(12));

        let second = tokio::spawn(std::future::pending::<()>());
        session.replace_timer(second, Duration::from_secs(30), Duration::from_secs(31));

        // The sender is dropped only when the first task is torn down.
        assert!(alive_rx.await.is_err());
        assert!(session.is_polling());
        assert_eq!(session.status().interval, Duration::from_secs(30));

        assert!(session.stop());
        assert!(!session.stop());
    }

    #[test]
    fn counter_survives_stop() {
        let mut session = PollSession {
            unreachable_count: 12,
            ..PollSession::default()
        };
        session.stop();
        assert_eq!(session.status().unreachable_count, 12);
    }
}
