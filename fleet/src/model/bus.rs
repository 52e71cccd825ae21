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

//! The `Bus` data type and the validators for bus-related requests.

use crate::model::{BusId, DocumentWithType, Pagination};
use derive_getters::Getters;
use fleetdocs_core::model::validation::{Fields, Patch, Violations};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Oldest year of make that we accept for a bus.
const MIN_YEAR_OF_MAKE: i32 = 1900;

/// A bus in the fleet.
#[derive(Clone, Debug, Deserialize, Getters, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    /// Identifier of the bus.
    id: BusId,

    /// Registration number shown on the plates.  Unique across the fleet.
    registration_no: String,

    /// Commercial model name.
    model: Option<String>,

    /// Name of the manufacturer.
    manufacturer: Option<String>,

    /// Year in which the bus was built.
    year_of_make: Option<i32>,

    /// Name of the registered owner.
    owner_name: Option<String>,

    /// Time when the bus was registered in the system.
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,

    /// Time when the bus was last modified.
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl Bus {
    /// Creates a bus from its validated attributes.
    pub(crate) fn new(
        id: BusId,
        attrs: NewBus,
        created_at: OffsetDateTime,
        updated_at: OffsetDateTime,
    ) -> Self {
        let NewBus { registration_no, model, manufacturer, year_of_make, owner_name } = attrs;
        Self {
            id,
            registration_no,
            model,
            manufacturer,
            year_of_make,
            owner_name,
            created_at,
            updated_at,
        }
    }

    /// Applies a partial `update` to this bus, recording `now` as the modification time.
    pub(crate) fn apply(self, update: BusUpdate, now: OffsetDateTime) -> Self {
        Self {
            registration_no: update.registration_no.unwrap_or(self.registration_no),
            model: update.model.apply(self.model),
            manufacturer: update.manufacturer.apply(self.manufacturer),
            year_of_make: update.year_of_make.apply(self.year_of_make),
            owner_name: update.owner_name.apply(self.owner_name),
            updated_at: now,
            ..self
        }
    }
}

/// Number of documents attached to an entity.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct DocumentCount {
    /// Quantity of documents.
    pub documents: u64,
}

/// A bus along with the number of documents it owns, as shown in listings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BusSummary {
    /// The bus itself.
    #[serde(flatten)]
    pub bus: Bus,

    /// Number of documents attached to the bus.
    #[serde(rename = "_count")]
    pub count: DocumentCount,
}

/// A bus along with all of its documents, newest first.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BusDetails {
    /// The bus itself.
    #[serde(flatten)]
    pub bus: Bus,

    /// Documents attached to the bus.
    pub documents: Vec<DocumentWithType>,
}

/// One page of the bus listing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BusPage {
    /// Buses in this page.
    pub buses: Vec<BusSummary>,

    /// Position of this page within the whole listing.
    pub pagination: Pagination,
}

/// Extracts and validates the year of make of a bus, which must be an integer within
/// `[MIN_YEAR_OF_MAKE, now.year() + 1]`.
fn year_of_make(fields: &mut Fields<'_>, now: OffsetDateTime) -> Patch<i32> {
    let max_year = now.year() + 1;
    match fields.integer("yearOfMake") {
        Patch::Set(year) => match i32::try_from(year) {
            Ok(year) if (MIN_YEAR_OF_MAKE..=max_year).contains(&year) => Patch::Set(year),
            _ => {
                fields.reject(
                    "yearOfMake",
                    format!("Year of make must be between {} and {}", MIN_YEAR_OF_MAKE, max_year),
                );
                Patch::Keep
            }
        },
        other => other.map(|_| 0),
    }
}

/// Validated attributes of a new bus.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBus {
    /// Registration number of the bus.
    pub registration_no: String,

    /// Commercial model name.
    pub model: Option<String>,

    /// Name of the manufacturer.
    pub manufacturer: Option<String>,

    /// Year in which the bus was built.
    pub year_of_make: Option<i32>,

    /// Name of the registered owner.
    pub owner_name: Option<String>,
}

impl NewBus {
    /// Validates a raw creation payload.  `now` bounds the acceptable years of make.
    pub fn from_json(input: &Value, now: OffsetDateTime) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let registration_no = fields.non_empty("registrationNo", "Registration number is required");
        let registration_no =
            fields.required("registrationNo", registration_no, "Registration number is required");
        let model = fields.string("model");
        let manufacturer = fields.string("manufacturer");
        let year_of_make = year_of_make(&mut fields, now);
        let owner_name = fields.string("ownerName");
        fields.finish(|| {
            Some(Self {
                registration_no: registration_no?,
                model: model.into_option(),
                manufacturer: manufacturer.into_option(),
                year_of_make: year_of_make.into_option(),
                owner_name: owner_name.into_option(),
            })
        })
    }
}

/// Validated details for a partial update of a bus.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BusUpdate {
    /// New registration number, if it should change.
    pub registration_no: Option<String>,

    /// Change to apply to the model name.
    pub model: Patch<String>,

    /// Change to apply to the manufacturer.
    pub manufacturer: Patch<String>,

    /// Change to apply to the year of make.
    pub year_of_make: Patch<i32>,

    /// Change to apply to the owner name.
    pub owner_name: Patch<String>,
}

impl BusUpdate {
    /// Validates a raw update payload.  Absent fields are left untouched and explicit nulls clear
    /// the optional attributes.
    pub fn from_json(input: &Value, now: OffsetDateTime) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let registration_no = fields.non_empty("registrationNo", "Registration number is required");
        let registration_no = fields.not_null("registrationNo", registration_no);
        let model = fields.string("model");
        let manufacturer = fields.string("manufacturer");
        let year_of_make = year_of_make(&mut fields, now);
        let owner_name = fields.string("ownerName");
        fields.finish(|| {
            Some(Self { registration_no, model, manufacturer, year_of_make, owner_name })
        })
    }
}
