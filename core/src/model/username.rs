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

//! The `Username` data type.

use crate::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize, de::Visitor};

/// Minimum length of a username.
const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum length of a username as specified in the schema.
const MAX_USERNAME_LENGTH: usize = 50;

/// Represents a correctly-formatted (but maybe non-existent) username.
///
/// Usernames are case-sensitive and restricted to ASCII letters, digits and underscores.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Creates a new username from an untrusted string `s`, making sure it is valid.
    ///
    /// Only the first broken rule is reported.  Use `validate_all` to learn about all of them.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        Self::validate_all(s).map_err(|mut errors| errors.swap_remove(0))
    }

    /// Creates a new username from an untrusted string `s`, reporting every rule it breaks.
    ///
    /// The returned list of errors is never empty.
    pub fn validate_all<S: Into<String>>(s: S) -> Result<Self, Vec<ModelError>> {
        let s = s.into();
        let mut errors = vec![];

        let length = s.chars().count();
        if length < MIN_USERNAME_LENGTH {
            errors.push(ModelError(format!(
                "Username must be at least {} characters",
                MIN_USERNAME_LENGTH
            )));
        }
        if length > MAX_USERNAME_LENGTH {
            errors.push(ModelError(format!(
                "Username must be at most {} characters",
                MAX_USERNAME_LENGTH
            )));
        }

        if !s.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            errors.push(ModelError(
                "Username can only contain letters, numbers, and underscores".to_owned(),
            ));
        }

        if errors.is_empty() { Ok(Self(s)) } else { Err(errors) }
    }

    /// Creates a new username from an untrusted string `s`, without validation.  Useful for testing
    /// purposes only.
    #[cfg(any(test, feature = "testutils"))]
    pub fn new_invalid<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns a string view of the username.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&'static str> for Username {
    /// Creates a new username from a hardcoded string, which must be valid.
    fn from(name: &'static str) -> Self {
        Username::new(name).expect("Hardcoded usernames must be valid")
    }
}

/// A deserialization visitor for a `Username`.
struct UsernameVisitor;

impl Visitor<'_> for UsernameVisitor {
    type Value = Username;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Username::new(v).map_err(|e| E::custom(e.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Username::new(v).map_err(|e| E::custom(e.to_string()))
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_string(UsernameVisitor)
    }
}
