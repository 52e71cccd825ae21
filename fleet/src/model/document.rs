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

//! The `Document` data type and the validators for document-related requests.

use crate::model::{Bus, BusId, DocumentId, DocumentType, DocumentTypeId};
use derive_getters::Getters;
use fleetdocs_core::model::validation::{Fields, Patch, Violations};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Message reported when the document file URL is missing.
const FILE_URL_REQUIRED: &str = "File URL is required";

/// Message reported when the document file URL is malformed.
const FILE_URL_INVALID: &str = "File URL must be a valid URL";

/// A compliance document attached to a bus.
///
/// The file itself lives elsewhere and is only referenced by its URL.
#[derive(Clone, Debug, Deserialize, Getters, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Identifier of the document.
    id: DocumentId,

    /// Bus this document belongs to.
    bus_id: BusId,

    /// Type of the document.
    doc_type_id: DocumentTypeId,

    /// Number printed on the document by its issuer.
    document_number: Option<String>,

    /// Time when the document was issued.
    #[serde(with = "time::serde::rfc3339::option")]
    issue_date: Option<OffsetDateTime>,

    /// Time when the document stops being valid.  Documents without one never expire.
    #[serde(with = "time::serde::rfc3339::option")]
    expiry_date: Option<OffsetDateTime>,

    /// Location of the scanned document.
    file_url: String,

    /// Free-form notes.
    remarks: Option<String>,

    /// Time when the document was uploaded.
    #[serde(with = "time::serde::rfc3339")]
    uploaded_at: OffsetDateTime,
}

impl Document {
    /// Creates a document from its validated attributes.
    pub(crate) fn new(
        id: DocumentId,
        bus_id: BusId,
        attrs: NewDocument,
        uploaded_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            bus_id,
            doc_type_id: attrs.doc_type_id,
            document_number: attrs.document_number,
            issue_date: attrs.issue_date,
            expiry_date: attrs.expiry_date,
            file_url: attrs.file_url,
            remarks: attrs.remarks,
            uploaded_at,
        }
    }

    /// Applies a partial `update` to this document.
    pub(crate) fn apply(self, update: DocumentUpdate) -> Self {
        Self {
            doc_type_id: update.doc_type_id.unwrap_or(self.doc_type_id),
            document_number: update.document_number.apply(self.document_number),
            issue_date: update.issue_date.apply(self.issue_date),
            expiry_date: update.expiry_date.apply(self.expiry_date),
            file_url: update.file_url.unwrap_or(self.file_url),
            remarks: update.remarks.apply(self.remarks),
            ..self
        }
    }
}

/// A document along with its type.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentWithType {
    /// The document itself.
    #[serde(flatten)]
    pub document: Document,

    /// Type of the document.
    pub doc_type: DocumentType,
}

/// A document along with the bus it belongs to and its type.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetails {
    /// The document itself.
    #[serde(flatten)]
    pub document: Document,

    /// Bus the document belongs to.
    pub bus: Bus,

    /// Type of the document.
    pub doc_type: DocumentType,
}

/// Validated attributes of a new document.  The owning bus comes from the request path.
#[derive(Clone, Debug, PartialEq)]
pub struct NewDocument {
    /// Type of the document.
    pub doc_type_id: DocumentTypeId,

    /// Number printed on the document.
    pub document_number: Option<String>,

    /// Time when the document was issued.
    pub issue_date: Option<OffsetDateTime>,

    /// Time when the document stops being valid.
    pub expiry_date: Option<OffsetDateTime>,

    /// Location of the scanned document.
    pub file_url: String,

    /// Free-form notes.
    pub remarks: Option<String>,
}

impl NewDocument {
    /// Validates a raw creation payload.
    pub fn from_json(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let doc_type_id = fields.parsed("docTypeId", DocumentTypeId::new);
        let doc_type_id =
            fields.required("docTypeId", doc_type_id, "Document type ID is required");
        let document_number = fields.string("documentNumber");
        let issue_date = fields.datetime("issueDate");
        let expiry_date = fields.datetime("expiryDate");
        let file_url = fields.url("fileUrl", FILE_URL_INVALID);
        let file_url = fields.required("fileUrl", file_url, FILE_URL_REQUIRED);
        let remarks = fields.string("remarks");
        fields.finish(|| {
            Some(Self {
                doc_type_id: doc_type_id?,
                document_number: document_number.into_option(),
                issue_date: issue_date.into_option(),
                expiry_date: expiry_date.into_option(),
                file_url: file_url?,
                remarks: remarks.into_option(),
            })
        })
    }
}

/// Validated details for a partial update of a document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentUpdate {
    /// New type for the document, if it should change.
    pub doc_type_id: Option<DocumentTypeId>,

    /// Change to apply to the document number.
    pub document_number: Patch<String>,

    /// Change to apply to the issue date.
    pub issue_date: Patch<OffsetDateTime>,

    /// Change to apply to the expiry date.
    pub expiry_date: Patch<OffsetDateTime>,

    /// New file URL, if it should change.
    pub file_url: Option<String>,

    /// Change to apply to the remarks.
    pub remarks: Patch<String>,
}

impl DocumentUpdate {
    /// Validates a raw update payload.
    pub fn from_json(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let doc_type_id = fields.parsed("docTypeId", DocumentTypeId::new);
        let doc_type_id = fields.not_null("docTypeId", doc_type_id);
        let document_number = fields.string("documentNumber");
        let issue_date = fields.datetime("issueDate");
        let expiry_date = fields.datetime("expiryDate");
        let file_url = match fields.url("fileUrl", FILE_URL_INVALID) {
            Patch::Set(url) if url.is_empty() => {
                fields.reject("fileUrl", FILE_URL_REQUIRED);
                Patch::Keep
            }
            other => other,
        };
        let file_url = fields.not_null("fileUrl", file_url);
        let remarks = fields.string("remarks");
        fields.finish(|| {
            Some(Self { doc_type_id, document_number, issue_date, expiry_date, file_url, remarks })
        })
    }
}
