// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Outstanding-request bookkeeping (§4.13): every request this client has
//! sent and not yet matched to a response, keyed by the request handle it
//! was sent with. This core has no transport of its own (§E, Non-goals), so
//! this table is the full extent of what "sending a request" means here —
//! a caller that does own a transport allocates a handle, records the
//! request, and later completes or times it out as responses or deadlines
//! arrive.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::Mutex;

use opcua_types::StatusCode;

/// Arbitrary ceiling on in-flight requests, never expected to be reached in
/// practice — a safety net against unbounded growth if something never
/// completes a request it allocated a handle for.
const MAX_INFLIGHT_REQUESTS: usize = 1_000_000;

#[derive(Debug, Clone)]
struct Outstanding {
    sent_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
}

/// Allocates request handles and tracks which ones are still awaiting a
/// response.
pub struct RequestTable {
    next_handle: Mutex<u32>,
    outstanding: Mutex<HashMap<u32, Outstanding>>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self {
            next_handle: Mutex::new(1),
            outstanding: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates the next request handle and records it as outstanding.
    /// Fails with `BadTooManyOperations` if the in-flight ceiling has been
    /// reached, which only happens if a caller leaks handles without ever
    /// completing or timing them out.
    pub fn allocate(&self, now: DateTime<Utc>, timeout: Option<chrono::Duration>) -> Result<u32, StatusCode> {
        let mut outstanding = self.outstanding.lock();
        if outstanding.len() >= MAX_INFLIGHT_REQUESTS {
            return Err(StatusCode::BadTooManyOperations);
        }
        let mut next_handle = self.next_handle.lock();
        let handle = *next_handle;
        *next_handle = next_handle.wrapping_add(1).max(1);
        outstanding.insert(
            handle,
            Outstanding {
                sent_at: now,
                deadline: timeout.map(|d| now + d),
            },
        );
        Ok(handle)
    }

    /// Matches an incoming response to its request, returning how long the
    /// round trip took. `None` if the handle is unknown (already completed,
    /// timed out, or never ours).
    pub fn complete(&self, handle: u32, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let outstanding = self.outstanding.lock().remove(&handle)?;
        Some(now.signed_duration_since(outstanding.sent_at))
    }

    /// Removes and returns every handle whose deadline has passed.
    pub fn expire(&self, now: DateTime<Utc>) -> Vec<u32> {
        let mut outstanding = self.outstanding.lock();
        let expired: Vec<u32> = outstanding
            .iter()
            .filter(|(_, o)| o.deadline.is_some_and(|d| d <= now))
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &expired {
            outstanding.remove(handle);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.outstanding.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.lock().is_empty()
    }
}

impl Default for RequestTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn handles_are_allocated_sequentially_and_are_outstanding_until_completed() {
        let table = RequestTable::new();
        let a = table.allocate(now(), None).unwrap();
        let b = table.allocate(now(), None).unwrap();
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert!(table.complete(a, now()).is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn completing_an_unknown_handle_returns_none() {
        let table = RequestTable::new();
        assert!(table.complete(999, now()).is_none());
    }

    #[test]
    fn expire_removes_only_requests_past_their_deadline() {
        let table = RequestTable::new();
        let short = table.allocate(now(), Some(chrono::Duration::milliseconds(100))).unwrap();
        let long = table.allocate(now(), Some(chrono::Duration::seconds(60))).unwrap();
        let no_deadline = table.allocate(now(), None).unwrap();

        let later = now() + chrono::Duration::milliseconds(200);
        let mut expired = table.expire(later);
        expired.sort_unstable();
        assert_eq!(expired, vec![short]);
        assert!(table.complete(long, later).is_some());
        assert!(table.complete(no_deadline, later).is_some());
    }
}
