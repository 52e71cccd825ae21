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

//! Opaque identifiers of the fleet entities.

use crate::model::path_violation;
use fleetdocs_core::model::validation::Violations;
use fleetdocs_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype for an opaque string identifier.
///
/// Identifiers are assigned by the service as random UUIDs but are otherwise treated as opaque:
/// any non-empty string coming from a client or from the database is accepted, and lookups of
/// unknown values simply find nothing.
macro_rules! opaque_id [
    ( $name:ident, $label:literal, $required:literal ) => {
        #[doc = concat!("Identifier of a ", $label, ".")]
        #[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a fresh identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Creates an identifier from an untrusted string `s`, which must not be empty.
            pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
                let s = s.into();
                if s.is_empty() {
                    return Err(ModelError($required.to_owned()));
                }
                Ok(Self(s))
            }

            /// Parses the identifier carried by the path parameter `field`.
            pub fn parse<S: Into<String>>(field: &str, raw: S) -> Result<Self, Violations> {
                Self::new(raw).map_err(|e| path_violation(field, e))
            }

            /// Returns a string view of the identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        #[cfg(test)]
        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw).expect("Hardcoded identifiers for testing must be valid")
            }
        }
    };
];

opaque_id!(BusId, "bus", "Bus ID is required");
opaque_id!(DocumentTypeId, "document type", "Document type ID is required");
opaque_id!(DocumentId, "bus document", "Document ID is required");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let id1 = BusId::generate();
        let id2 = BusId::generate();
        assert_ne!(id1, id2);
        assert_eq!(36, id1.as_str().len());
    }

    #[test]
    fn test_parse_ok() {
        assert_eq!("cl9abc", DocumentId::parse("id", "cl9abc").unwrap().as_str());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(
            Violations::single("busId", "Bus ID is required"),
            BusId::parse("busId", "").unwrap_err()
        );
    }
}
