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

//! The `Password` and `HashedPassword` data types.

use fleetdocs_core::model::{ModelError, ModelResult};
use std::fmt;

/// Minimum length of a password accepted for new or updated accounts.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum length of a password accepted for new or updated accounts.
const MAX_PASSWORD_LENGTH: usize = 255;

/// An opaque type to hold a password, protecting it from leaking into logs.
#[derive(PartialEq)]
#[cfg_attr(any(test, feature = "testutils"), derive(Clone))]
pub struct Password(String);

impl Password {
    /// Creates a new password from a literal string without applying any policy.
    ///
    /// This is what login attempts use: credentials are checked against the stored hash and any
    /// policy violation simply results in a mismatch.
    pub fn new<S: Into<String>>(s: S) -> Self {
        Password(s.into())
    }

    /// Checks that the password satisfies the length policy for new passwords.
    pub fn validate(self) -> ModelResult<Self> {
        let length = self.0.chars().count();
        if length < MIN_PASSWORD_LENGTH {
            return Err(ModelError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(ModelError(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }
        Ok(self)
    }

    /// Returns a string view of the password.
    #[cfg(any(test, feature = "testutils"))]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hashes the password with the given bcrypt `cost`.  Consumes the password because there is
    /// no context in which keeping the password alive once we have generated its hash is correct.
    ///
    /// This is CPU-bound and should run on a blocking thread.
    pub fn hash(self, cost: u32) -> ModelResult<HashedPassword> {
        let hashed =
            bcrypt::hash(self.0, cost).map_err(|e| ModelError(format!("Password error: {}", e)))?;
        Ok(HashedPassword::new(hashed))
    }

    /// Verifies if this password matches a given `hash`.
    ///
    /// This is CPU-bound and should run on a blocking thread.
    pub fn verify(self, hash: &HashedPassword) -> ModelResult<bool> {
        bcrypt::verify(self.0, hash.as_str())
            .map_err(|e| ModelError(format!("Password error: {}", e)))
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&'static str> for Password {
    /// Creates a new password from a hardcoded string, which must be valid.
    fn from(s: &'static str) -> Self {
        Password::new(s).validate().expect("Hardcoded passwords must be valid")
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed password")
    }
}

/// An opaque type to hold a hashed password, protecting it from leaking into logs.
#[derive(Clone, PartialEq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Creates a new hashed password from a literal string.
    pub fn new<S: Into<String>>(s: S) -> Self {
        HashedPassword(s.into())
    }

    /// Returns a string view of the hash.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed hash")
    }
}
