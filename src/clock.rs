//! Time sources for expiry decisions.
//!
//! Every time-dependent operation takes "now" as an explicit epoch-millisecond
//! value. Handlers obtain it once per request through [`RequestTime`], so the
//! same instant is used for every check within one operation.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;

/// Header carrying an explicit "now" in epoch milliseconds, honored only in
/// test mode.
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_ms(&self) -> i64;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock stuck at a single instant.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

#[cfg(test)]
impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

/// Resolves the current time for a request.
#[derive(Clone)]
pub struct TimeSource {
    clock: Arc<dyn Clock>,
    test_mode: bool,
}

impl TimeSource {
    pub fn new(clock: impl Clock + 'static, test_mode: bool) -> Self {
        Self {
            clock: Arc::new(clock),
            test_mode,
        }
    }

    /// The clock's time, ignoring any request override.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// The request override when test mode is on and the header parses,
    /// otherwise the clock's time.
    pub fn now_for(&self, headers: &HeaderMap) -> i64 {
        if self.test_mode {
            let requested = headers
                .get(TEST_NOW_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok());
            if let Some(now) = requested {
                return now;
            }
        }
        self.clock.now_ms()
    }
}

impl fmt::Debug for TimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSource")
            .field("test_mode", &self.test_mode)
            .finish_non_exhaustive()
    }
}

/// Extracts the current time in epoch milliseconds for this request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTime(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for RequestTime
where
    S: Send + Sync,
    TimeSource: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let time = TimeSource::from_ref(state);
        Ok(RequestTime(time.now_for(&parts.headers)))
    }
}
