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

//! Extends the driver with the bus management operations.

use crate::db;
use crate::driver::FleetDriver;
use crate::model::{Bus, BusDetails, BusId, BusPage, BusQuery, BusUpdate, NewBus, Pagination};
use fleetdocs_core::db::DbError;
use fleetdocs_core::driver::{DriverError, DriverResult};
use log::info;

/// Converts a missing-row error into the bus-specific not found error.
pub(super) fn bus_not_found(e: DbError) -> DriverError {
    match e {
        DbError::NotFound => DriverError::NotFound("Bus not found".to_owned()),
        e => e.into(),
    }
}

/// Converts a unique violation into the bus-specific conflict error.
fn bus_conflict(e: DbError) -> DriverError {
    match e {
        DbError::AlreadyExists => registration_taken(),
        e => e.into(),
    }
}

/// Error returned when a registration number is already taken.
fn registration_taken() -> DriverError {
    DriverError::AlreadyExists("Bus with this registration number already exists".to_owned())
}

/// Error returned when deleting a bus that still owns documents.
fn bus_in_use() -> DriverError {
    DriverError::InUse("Cannot delete bus with existing documents".to_owned())
}

impl FleetDriver {
    /// Gets one page of buses, optionally filtered by a search term.
    pub async fn list_buses(self, query: BusQuery) -> DriverResult<BusPage> {
        let search = query.search.as_deref();
        let mut tx = self.db.begin().await?;
        let buses = db::list_buses(tx.ex(), search, query.offset(), query.limit).await?;
        let total = db::count_buses(tx.ex(), search).await?;
        tx.commit().await?;
        Ok(BusPage { buses, pagination: Pagination::new(&query, total) })
    }

    /// Gets the bus identified by `id` along with all of its documents.
    pub async fn get_bus(self, id: BusId) -> DriverResult<BusDetails> {
        let mut tx = self.db.begin().await?;
        let bus = db::get_bus(tx.ex(), &id).await.map_err(bus_not_found)?;
        let documents = db::list_bus_documents(tx.ex(), &id).await?;
        tx.commit().await?;
        Ok(BusDetails { bus, documents })
    }

    /// Registers a new bus.
    pub async fn create_bus(self, new: NewBus) -> DriverResult<Bus> {
        let mut tx = self.db.begin().await?;
        if db::bus_registration_taken(tx.ex(), &new.registration_no, None).await? {
            return Err(registration_taken());
        }
        let now = self.clock.now_utc();
        let bus = Bus::new(BusId::generate(), new, now, now);
        db::create_bus(tx.ex(), &bus).await.map_err(bus_conflict)?;
        tx.commit().await.map_err(bus_conflict)?;

        info!("Bus created: id={} registration_no={}", bus.id().as_str(), bus.registration_no());
        Ok(bus)
    }

    /// Applies a partial `update` to the bus identified by `id`.
    pub async fn update_bus(self, id: BusId, update: BusUpdate) -> DriverResult<Bus> {
        let mut tx = self.db.begin().await?;
        let bus = db::get_bus(tx.ex(), &id).await.map_err(bus_not_found)?;

        if let Some(registration_no) = update.registration_no.as_deref() {
            if registration_no != bus.registration_no()
                && db::bus_registration_taken(tx.ex(), registration_no, Some(&id)).await?
            {
                return Err(registration_taken());
            }
        }

        let bus = bus.apply(update, self.clock.now_utc());
        db::update_bus(tx.ex(), &bus).await.map_err(|e| match e {
            DbError::NotFound => bus_not_found(e),
            e => bus_conflict(e),
        })?;
        tx.commit().await.map_err(bus_conflict)?;

        info!("Bus updated: id={} registration_no={}", bus.id().as_str(), bus.registration_no());
        Ok(bus)
    }

    /// Deletes the bus identified by `id`, which must not own any document.
    pub async fn delete_bus(self, id: BusId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        db::get_bus(tx.ex(), &id).await.map_err(bus_not_found)?;
        if db::count_bus_documents(tx.ex(), &id).await? > 0 {
            return Err(bus_in_use());
        }
        db::delete_bus(tx.ex(), &id).await.map_err(|e| match e {
            DbError::InUse => bus_in_use(),
            e => bus_not_found(e),
        })?;
        tx.commit().await?;

        info!("Bus deleted: id={}", id.as_str());
        Ok(())
    }
}
