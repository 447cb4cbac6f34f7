// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! `NumericRange`, the textual sub-range selector used to read or write part
//! of an array-valued attribute without transferring the whole array.

use std::{fmt, str::FromStr};

use crate::status_code::StatusCode;

/// A single dimension's selection: either one index, or an inclusive `min..=max`
/// range of indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericRangeDimension {
    /// Select a single element at this index.
    Index(u32),
    /// Select all elements between `min` and `max`, inclusive.
    Range(u32, u32),
}

impl NumericRangeDimension {
    /// The number of elements selected along this dimension.
    pub fn len(&self) -> u32 {
        match self {
            NumericRangeDimension::Index(_) => 1,
            NumericRangeDimension::Range(min, max) => max.saturating_sub(*min) + 1,
        }
    }
}

/// A parsed numeric range, one `NumericRangeDimension` per array dimension,
/// as carried in the `IndexRange` parameter of Read/Write/HistoryRead/HistoryUpdate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NumericRange {
    dimensions: Vec<NumericRangeDimension>,
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| match d {
                NumericRangeDimension::Index(i) => i.to_string(),
                NumericRangeDimension::Range(min, max) => format!("{min}:{max}"),
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for NumericRange {
    type Err = StatusCode;

    /// Parses a numeric range string such as `"1:2"`, `"0,1:3"`, or `"5"`. Each
    /// dimension is separated by a comma, each range by a colon. A range's `min`
    /// must be strictly less than its `max`, and an empty string is invalid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(StatusCode::BadIndexRangeInvalid);
        }
        let mut dimensions = Vec::new();
        for part in s.split(',') {
            let dim = if let Some((min, max)) = part.split_once(':') {
                let min: u32 = min.parse().map_err(|_| StatusCode::BadIndexRangeInvalid)?;
                let max: u32 = max.parse().map_err(|_| StatusCode::BadIndexRangeInvalid)?;
                if min >= max {
                    return Err(StatusCode::BadIndexRangeInvalid);
                }
                NumericRangeDimension::Range(min, max)
            } else {
                let idx: u32 = part.parse().map_err(|_| StatusCode::BadIndexRangeInvalid)?;
                NumericRangeDimension::Index(idx)
            };
            dimensions.push(dim);
        }
        Ok(NumericRange { dimensions })
    }
}

impl NumericRange {
    /// The dimensions of this range, in order.
    pub fn dimensions(&self) -> &[NumericRangeDimension] {
        &self.dimensions
    }

    /// Slice `values` by this range's first dimension. Multi-dimensional array
    /// slicing is not supported; only the first dimension's bounds are applied,
    /// mirroring a flattened-array representation.
    pub fn slice<'a, T>(&self, values: &'a [T]) -> Result<&'a [T], StatusCode> {
        let dim = self
            .dimensions
            .first()
            .ok_or(StatusCode::BadIndexRangeInvalid)?;
        let (start, end) = match dim {
            NumericRangeDimension::Index(i) => (*i as usize, *i as usize),
            NumericRangeDimension::Range(min, max) => (*min as usize, *max as usize),
        };
        if start >= values.len() {
            return Err(StatusCode::BadIndexRangeNoData);
        }
        let end = end.min(values.len().saturating_sub(1));
        Ok(&values[start..=end])
    }
}
