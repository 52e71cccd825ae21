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

//! Reports about the compliance status of the fleet.

use crate::model::{Bus, DocumentWithType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use time::OffsetDateTime;

/// A bus that lacks at least one of the required document types.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusCompliance {
    /// The bus itself.
    #[serde(flatten)]
    pub bus: Bus,

    /// Documents of the bus that have not expired yet.
    pub documents: Vec<DocumentWithType>,

    /// Names of the required document types that none of `documents` provides.
    pub missing_types: Vec<String>,
}

impl BusCompliance {
    /// Checks which of the `required` type names are not covered by the non-expired `documents`
    /// of `bus`.
    ///
    /// Returns none if the bus holds every required type.  Otherwise, the missing types are
    /// reported in the same order as in `required`.
    pub fn evaluate(
        bus: Bus,
        documents: Vec<DocumentWithType>,
        required: &[String],
    ) -> Option<Self> {
        let present: HashSet<&str> =
            documents.iter().map(|doc| doc.doc_type.name().as_str()).collect();
        let missing_types: Vec<String> =
            required.iter().filter(|name| !present.contains(name.as_str())).cloned().collect();
        if missing_types.is_empty() {
            return None;
        }
        Some(Self { bus, documents, missing_types })
    }
}

/// Buses that lack required documents.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingRequiredReport {
    /// Non-compliant buses.
    pub buses: Vec<BusCompliance>,

    /// Names of the document types that were checked.
    pub required_types: Vec<String>,

    /// Number of non-compliant buses.
    pub total: u64,
}

/// Aggregate figures for the dashboard.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Number of buses in the fleet.
    pub total_buses: u64,

    /// Number of active user accounts of the voice app.
    pub total_voice_app_users: u64,

    /// Number of documents across all buses.
    pub total_documents: u64,

    /// Number of documents that expire within the next 30 days, including those that already
    /// expired.
    pub expiring_documents: u64,

    /// Number of documents that already expired.
    pub expired_documents: u64,

    /// Number of document types.
    pub total_document_types: u64,

    /// Time when these figures were computed.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BusId, Document, DocumentId, DocumentType, DocumentTypeId, NewBus, NewDocument,
        NewDocumentType,
    };
    use fleetdocs_core::clocks::testutils::utc_datetime;

    /// Creates a bus for testing purposes.
    fn bus(id: &str) -> Bus {
        let ts = utc_datetime(2024, 1, 1, 0, 0, 0);
        let attrs = NewBus {
            registration_no: format!("REG-{}", id),
            model: None,
            manufacturer: None,
            year_of_make: None,
            owner_name: None,
        };
        Bus::new(BusId::from(id), attrs, ts, ts)
    }

    /// Creates a document of the type named `type_name` for testing purposes.
    fn document(type_name: &str) -> DocumentWithType {
        let ts = utc_datetime(2024, 1, 1, 0, 0, 0);
        let doc_type = DocumentType::new(
            DocumentTypeId::from(type_name),
            NewDocumentType { name: type_name.to_owned(), description: None },
            ts,
            ts,
        );
        let document = Document::new(
            DocumentId::generate(),
            BusId::from("b"),
            NewDocument {
                doc_type_id: doc_type.id().clone(),
                document_number: None,
                issue_date: None,
                expiry_date: None,
                file_url: "https://example.com/f".to_owned(),
                remarks: None,
            },
            ts,
        );
        DocumentWithType { document, doc_type }
    }

    #[test]
    fn test_evaluate_compliant() {
        let required = vec!["Insurance".to_owned(), "Permit".to_owned()];
        let docs = vec![document("Permit"), document("Insurance"), document("Other")];
        assert_eq!(None, BusCompliance::evaluate(bus("b"), docs, &required));
    }

    #[test]
    fn test_evaluate_missing_keeps_required_order() {
        let required = vec!["Permit".to_owned(), "Fitness".to_owned(), "Insurance".to_owned()];
        let docs = vec![document("Fitness")];
        let compliance = BusCompliance::evaluate(bus("b"), docs.clone(), &required).unwrap();
        assert_eq!(vec!["Permit".to_owned(), "Insurance".to_owned()], compliance.missing_types);
        assert_eq!(docs, compliance.documents);
    }

    #[test]
    fn test_evaluate_nothing_required() {
        assert_eq!(None, BusCompliance::evaluate(bus("b"), vec![], &[]));
    }
}
