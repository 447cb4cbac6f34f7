// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the definition of `LocalizedText`.

use std::fmt;

use crate::string::UAString;

/// Human readable text with an optional locale identifier, e.g. `("en", "Temperature")`.
#[derive(PartialEq, Default, Debug, Clone)]
pub struct LocalizedText {
    /// The locale this text is written in, e.g. `"en"`. Null if unspecified.
    pub locale: UAString,
    /// The text itself, in the given locale.
    pub text: UAString,
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        Self {
            locale: UAString::null(),
            text: UAString::from(value),
        }
    }
}

impl From<String> for LocalizedText {
    fn from(value: String) -> Self {
        Self {
            locale: UAString::null(),
            text: UAString::from(value),
        }
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl LocalizedText {
    /// Construct a localized text with an explicit locale.
    pub fn new(locale: &str, text: &str) -> Self {
        Self {
            locale: UAString::from(locale),
            text: UAString::from(text),
        }
    }

    /// `true` if both the locale and the text are null.
    pub fn is_null(&self) -> bool {
        self.locale.is_null() && self.text.is_null()
    }
}
