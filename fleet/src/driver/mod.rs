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

//! Business logic for the fleet.

use derivative::Derivative;
use fleetdocs_core::clocks::Clock;
use fleetdocs_core::db::Db;
use std::sync::Arc;
use time::OffsetDateTime;

mod buses;
mod compliance;
mod dashboard;
mod doctypes;
mod documents;
#[cfg(test)]
pub(crate) mod testutils;

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct FleetDriver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,
}

impl FleetDriver {
    /// Creates a new driver backed by the given dependencies.
    pub fn new(db: Arc<dyn Db + Send + Sync>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { db, clock }
    }

    /// Returns the current time as seen by the driver.
    ///
    /// Validators that depend on the current date must use this so that they agree with the
    /// timestamps the driver records.
    pub fn now_utc(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }
}
