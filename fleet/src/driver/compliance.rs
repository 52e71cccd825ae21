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

//! Extends the driver with the compliance reports.

use crate::db;
use crate::driver::FleetDriver;
use crate::model::{
    BusCompliance, DocumentDetails, DocumentWithType, ExpiringQuery, MissingRequiredQuery,
    MissingRequiredReport,
};
use fleetdocs_core::driver::DriverResult;
use std::collections::HashMap;

impl FleetDriver {
    /// Gets the documents that expire within the window described by `query`, soonest first.
    ///
    /// Documents that already expired are part of the result.
    pub async fn expiring_documents(
        self,
        query: ExpiringQuery,
    ) -> DriverResult<Vec<DocumentDetails>> {
        let cutoff = query.cutoff(self.clock.now_utc());
        let mut tx = self.db.begin().await?;
        let documents = db::list_expiring_documents(tx.ex(), cutoff).await?;
        tx.commit().await?;
        Ok(documents)
    }

    /// Gets the buses that lack a non-expired document of any of the required types.
    ///
    /// If `query` does not name any type, every known document type is required.
    pub async fn missing_required(
        self,
        query: MissingRequiredQuery,
    ) -> DriverResult<MissingRequiredReport> {
        let now = self.clock.now_utc();
        let mut tx = self.db.begin().await?;
        let required_types = match query.types {
            Some(types) => types,
            None => db::list_doc_type_names(tx.ex()).await?,
        };
        let buses = db::list_all_buses(tx.ex()).await?;
        let documents = db::list_unexpired_documents(tx.ex(), now).await?;
        tx.commit().await?;

        let mut by_bus: HashMap<String, Vec<DocumentWithType>> = HashMap::new();
        for document in documents {
            let bus_id = document.document.bus_id().as_str().to_owned();
            by_bus.entry(bus_id).or_default().push(document);
        }

        let buses: Vec<BusCompliance> = buses
            .into_iter()
            .filter_map(|bus| {
                let documents = by_bus.remove(bus.id().as_str()).unwrap_or_default();
                BusCompliance::evaluate(bus, documents, &required_types)
            })
            .collect();
        let total = u64::try_from(buses.len()).unwrap_or(u64::MAX);
        Ok(MissingRequiredReport { buses, required_types, total })
    }
}
