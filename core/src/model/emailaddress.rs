// FleetDocs
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! The `EmailAddress` data type.

use crate::model::{ModelError, ModelResult};
use regex::Regex;
use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Maximum length of email addresses per the schema.
const MAX_EMAIL_LENGTH: usize = 255;

/// Loose shape of an email address: a local part, an `@`, and a dotted domain, with no
/// whitespace anywhere.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("Hardcoded regex must be valid")
});

/// Represents a correctly-formatted email address.
///
/// According to the standard, the local part of an email address may be case sensitive but the
/// domain part is case insensitive.  Given that we only persist email addresses for contact
/// purposes, this treats them as case sensitive overall.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new email address from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        Self::validate_all(s).map_err(|mut errors| errors.swap_remove(0))
    }

    /// Creates a new email address from an untrusted string `s`, reporting every rule it breaks.
    ///
    /// The returned list of errors is never empty.
    pub fn validate_all<S: Into<String>>(s: S) -> Result<Self, Vec<ModelError>> {
        let s = s.into();
        let mut errors = vec![];

        if s.len() > MAX_EMAIL_LENGTH {
            errors.push(ModelError("Email address is too long".to_owned()));
        }
        if !EMAIL_RE.is_match(&s) {
            errors.push(ModelError("Invalid email".to_owned()));
        }

        if errors.is_empty() { Ok(Self(s)) } else { Err(errors) }
    }

    /// Creates a new email address from an untrusted string `s`, without validation.  Useful for
    /// testing purposes only.
    #[cfg(any(test, feature = "testutils"))]
    pub fn new_invalid<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns a string view of the email address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&str> for EmailAddress {
    fn from(raw_email: &str) -> Self {
        Self::new(raw_email).expect("Hardcoded email addresses for testing must be valid")
    }
}

/// Visitor to deserialize an `EmailAddress` from a string.
struct EmailAddressVisitor;

impl Visitor<'_> for EmailAddressVisitor {
    type Value = EmailAddress;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an email address")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        EmailAddress::new(v).map_err(|e| E::custom(e.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        EmailAddress::new(v).map_err(|e| E::custom(e.to_string()))
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_string(EmailAddressVisitor)
    }
}
