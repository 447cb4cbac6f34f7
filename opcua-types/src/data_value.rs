// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! [`DataValue`], the timestamped, statused wrapper around a [`Variant`]
//! returned from every Value attribute read.

use chrono::{DateTime, Utc};

use crate::{status_code::StatusCode, variant::Variant};

/// A `Variant` value plus the quality and timestamp metadata the Read service
/// attaches to it. Each field has an independent "has" flag on the wire; here
/// that is modelled with `Option`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    /// The value itself, or `None` if the value was not requested/available.
    pub value: Option<Variant>,
    /// The status of the value, or `None` meaning implicitly `Good`.
    pub status: Option<StatusCode>,
    /// The timestamp the value was obtained from its source.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Sub-millisecond part of `source_timestamp`, in hundreds of nanoseconds.
    pub source_picoseconds: Option<u16>,
    /// The timestamp the server processed the value.
    pub server_timestamp: Option<DateTime<Utc>>,
    /// Sub-millisecond part of `server_timestamp`, in hundreds of nanoseconds.
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    /// A `DataValue` wrapping a single value with `Good` status, no timestamps set.
    pub fn new_now(value: impl Into<Variant>) -> Self {
        Self {
            value: Some(value.into()),
            status: Some(StatusCode::Good),
            source_timestamp: Some(Utc::now()),
            server_timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// A `DataValue` carrying only a bad status and no value, used for
    /// attribute reads that fail before a value can be produced.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// The effective status, defaulting to `Good` when unset.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::Good)
    }

    /// Apply the Read service's timestamp policy for the requested
    /// `TimestampsToReturn` mode: `0` = Source, `1` = Server, `2` = Both,
    /// `3` = Neither. Source timestamps are cleared unless Source or Both was
    /// asked for; when asked for and missing, they are filled with `now`.
    /// Server timestamp is set iff Server or Both was requested.
    pub fn apply_timestamps(&mut self, timestamps_to_return: TimestampsToReturn, now: DateTime<Utc>) {
        match timestamps_to_return {
            TimestampsToReturn::Source => {
                self.server_timestamp = None;
                self.server_picoseconds = None;
                if self.source_timestamp.is_none() {
                    self.source_timestamp = Some(now);
                }
            }
            TimestampsToReturn::Server => {
                self.source_timestamp = None;
                self.source_picoseconds = None;
                self.server_timestamp = Some(now);
            }
            TimestampsToReturn::Both => {
                self.server_timestamp = Some(now);
                if self.source_timestamp.is_none() {
                    self.source_timestamp = Some(now);
                }
            }
            TimestampsToReturn::Neither => {
                self.source_timestamp = None;
                self.source_picoseconds = None;
                self.server_timestamp = None;
                self.server_picoseconds = None;
            }
        }
    }
}

/// Which timestamps a Read or Publish response should carry, as requested by
/// the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampsToReturn {
    /// Only the source timestamp.
    Source,
    /// Only the server timestamp.
    Server,
    /// Both timestamps.
    Both,
    /// Neither timestamp.
    Neither,
}

impl TimestampsToReturn {
    /// `true` if this mode asks for the server timestamp.
    pub fn wants_server(&self) -> bool {
        matches!(self, TimestampsToReturn::Server | TimestampsToReturn::Both)
    }

    /// `true` if this mode asks for the source timestamp.
    pub fn wants_source(&self) -> bool {
        matches!(self, TimestampsToReturn::Source | TimestampsToReturn::Both)
    }
}
