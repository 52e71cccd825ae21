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

//! The `DocumentType` data type and its validators.

use crate::model::{DocumentCount, DocumentTypeId};
use derive_getters::Getters;
use fleetdocs_core::model::validation::{Fields, Patch, Violations};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Message reported when a document type name is missing or empty.
const NAME_REQUIRED: &str = "Document type name is required";

/// A category of compliance document, such as an insurance policy or a permit.
#[derive(Clone, Debug, Deserialize, Getters, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    /// Identifier of the type.
    id: DocumentTypeId,

    /// Name of the type.  Unique across all types.
    name: String,

    /// Free-form description.
    description: Option<String>,

    /// Time when the type was created.
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,

    /// Time when the type was last modified.
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl DocumentType {
    /// Creates a document type from its validated attributes.
    pub(crate) fn new(
        id: DocumentTypeId,
        attrs: NewDocumentType,
        created_at: OffsetDateTime,
        updated_at: OffsetDateTime,
    ) -> Self {
        Self { id, name: attrs.name, description: attrs.description, created_at, updated_at }
    }

    /// Applies a partial `update` to this type, recording `now` as the modification time.
    pub(crate) fn apply(self, update: DocumentTypeUpdate, now: OffsetDateTime) -> Self {
        Self {
            name: update.name.unwrap_or(self.name),
            description: update.description.apply(self.description),
            updated_at: now,
            ..self
        }
    }
}

/// A document type along with the number of documents that use it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DocumentTypeSummary {
    /// The type itself.
    #[serde(flatten)]
    pub doc_type: DocumentType,

    /// Number of documents of this type.
    #[serde(rename = "_count")]
    pub count: DocumentCount,
}

/// Validated attributes of a new document type.
#[derive(Clone, Debug, PartialEq)]
pub struct NewDocumentType {
    /// Name of the type.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,
}

impl NewDocumentType {
    /// Validates a raw creation payload.
    pub fn from_json(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let name = fields.non_empty("name", NAME_REQUIRED);
        let name = fields.required("name", name, NAME_REQUIRED);
        let description = fields.string("description");
        fields.finish(|| Some(Self { name: name?, description: description.into_option() }))
    }
}

/// Validated details for a partial update of a document type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentTypeUpdate {
    /// New name, if it should change.
    pub name: Option<String>,

    /// Change to apply to the description.
    pub description: Patch<String>,
}

impl DocumentTypeUpdate {
    /// Validates a raw update payload.
    pub fn from_json(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let name = fields.non_empty("name", NAME_REQUIRED);
        let name = fields.not_null("name", name);
        let description = fields.string("description");
        fields.finish(|| Some(Self { name, description }))
    }
}
