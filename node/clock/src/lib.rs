// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Clock used for all time reads and round scheduling. Injectable so that
/// multi-node tests can drive rounds deterministically with [`TestClock`].
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time of this clock.
    fn now(&self) -> DateTime<Utc>;

    /// Suspends until the clock reaches `deadline`. Returns immediately if
    /// the deadline has already passed.
    async fn sleep_until(&self, deadline: DateTime<Utc>);

    /// Current time as unix seconds.
    fn now_unix(&self) -> i64 {
        self.now().timestamp()
    }

    /// Current time as unix nanoseconds.
    fn now_nanos(&self) -> i64 {
        self.now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

/// Wall clock backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let now = Utc::now();
        if deadline <= now {
            return;
        }
        let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(remaining).await;
    }
}

/// Deterministic clock for tests. Time only moves when [`TestClock::advance`]
/// is called; all pending `sleep_until` futures whose deadline has been
/// reached are woken. Cloning yields a handle to the same logical clock, so
/// one instance can be shared by every node of a test network.
#[derive(Clone)]
pub struct TestClock {
    inner: Arc<TestClockInner>,
}

struct TestClockInner {
    now: Mutex<DateTime<Utc>>,
    tick: Notify,
}

impl TestClock {
    /// A test clock starting at a fixed, arbitrary epoch.
    pub fn new() -> Self {
        Self::at(DateTime::from_timestamp(1_600_000_000, 0).expect("valid timestamp"))
    }

    /// A test clock starting at `start`.
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(TestClockInner {
                now: Mutex::new(start),
                tick: Notify::new(),
            }),
        }
    }

    /// Moves the clock forward and wakes every sleeper whose deadline fell
    /// inside the advanced window.
    pub fn advance(&self, duration: Duration) {
        {
            let mut now = self.inner.now.lock();
            let delta = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
            *now = now
                .checked_add_signed(delta)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
        }
        self.inner.tick.notify_waiters();
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.now.lock()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        loop {
            // Register interest before reading the time so an advance between
            // the check and the await cannot be missed.
            let notified = self.inner.tick.notified();
            if self.now() >= deadline {
                return;
            }
            notified.await;
        }
    }
}
