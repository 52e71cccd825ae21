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

//! Data types for the fleet and its compliance documents.
//!
//! Every type that is returned to clients serializes to the camelCase JSON shape of the public
//! API, with timestamps rendered as RFC 3339 strings.

use fleetdocs_core::model::ModelError;
use fleetdocs_core::model::validation::Violations;

mod bus;
pub use bus::{Bus, BusDetails, BusPage, BusSummary, BusUpdate, DocumentCount, NewBus};
mod compliance;
pub use compliance::{BusCompliance, DashboardStats, MissingRequiredReport};
mod doctype;
pub use doctype::{DocumentType, DocumentTypeSummary, DocumentTypeUpdate, NewDocumentType};
mod document;
pub use document::{Document, DocumentDetails, DocumentUpdate, DocumentWithType, NewDocument};
mod ids;
pub use ids::{BusId, DocumentId, DocumentTypeId};
mod query;
pub use query::{BusQuery, ExpiringQuery, MissingRequiredQuery, Pagination};

/// Converts a `ModelError` raised while parsing a path parameter into a violation of `field`.
fn path_violation(field: &str, e: ModelError) -> Violations {
    Violations::single(field, e.0)
}
