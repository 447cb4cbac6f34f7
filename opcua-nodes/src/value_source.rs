// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! [`ValueSource`], the two ways a Variable's `Value` attribute can be
//! produced: a plain stored [`DataValue`] with optional on-read/on-write
//! callbacks, or a pair of read/write functions (a "DataSource").

use std::sync::Arc;

use opcua_types::{DataValue, NumericRange, StatusCode, TimestampsToReturn, Variant};

/// Callback invoked after a stored value changes, so that e.g. a
/// MonitoredItem's on-write hook can observe the value the engine just wrote.
pub type OnWriteCallback = Arc<dyn Fn(&Variant) + Send + Sync>;

/// Callback invoked instead of a plain stored read, for attributes backed by
/// live server state (clocks, external sensors, computed properties).
pub type DataSourceRead = Arc<
    dyn Fn(TimestampsToReturn, &NumericRange, f64) -> DataValue + Send + Sync,
>;

/// Callback invoked instead of a plain stored write, for attributes backed by
/// live server state.
pub type DataSourceWrite = Arc<dyn Fn(&DataValue) -> Result<(), StatusCode> + Send + Sync>;

/// How a Variable's `Value` attribute is produced.
#[derive(Clone)]
pub enum ValueSource {
    /// A plain value owned by the node store.
    Value {
        /// The current value.
        value: DataValue,
        /// Invoked after a successful write, with the newly stored value.
        on_write: Option<OnWriteCallback>,
    },
    /// A pair of functions computing the value on demand and validating
    /// writes, for variables backed by live state outside the store.
    DataSource {
        /// Produces the current value.
        read: DataSourceRead,
        /// Validates and applies a write, or `None` if the source is read-only.
        write: Option<DataSourceWrite>,
    },
}

impl std::fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Value { value, .. } => {
                f.debug_struct("ValueSource::Value").field("value", value).finish()
            }
            ValueSource::DataSource { .. } => f.write_str("ValueSource::DataSource(..)"),
        }
    }
}

impl ValueSource {
    /// A plain stored value with no write callback.
    pub fn new(value: DataValue) -> Self {
        ValueSource::Value {
            value,
            on_write: None,
        }
    }

    /// `true` if this source is backed by live callbacks rather than a stored value.
    pub fn is_data_source(&self) -> bool {
        matches!(self, ValueSource::DataSource { .. })
    }

    /// Borrow the stored value, if this is a plain `Value` source.
    pub fn stored_value(&self) -> Option<&DataValue> {
        match self {
            ValueSource::Value { value, .. } => Some(value),
            ValueSource::DataSource { .. } => None,
        }
    }
}
