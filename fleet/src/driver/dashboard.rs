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

//! Extends the driver with the dashboard figures.

use crate::db;
use crate::driver::FleetDriver;
use crate::model::{DashboardStats, ExpiringQuery};
use fleetdocs_core::driver::DriverResult;

impl FleetDriver {
    /// Computes the aggregate figures shown in the dashboard.
    ///
    /// Expiring documents are counted over the default look-ahead window.
    pub async fn dashboard_stats(self) -> DriverResult<DashboardStats> {
        let now = self.clock.now_utc();
        let cutoff = ExpiringQuery::default().cutoff(now);

        let mut tx = self.db.begin().await?;
        let total_buses = db::count_buses(tx.ex(), None).await?;
        let total_voice_app_users = fleetdocs_authn::db::count_active_users(tx.ex()).await?;
        let total_documents = db::count_documents(tx.ex()).await?;
        let expiring_documents = db::count_expiring_documents(tx.ex(), cutoff).await?;
        let expired_documents = db::count_expired_documents(tx.ex(), now).await?;
        let total_document_types = db::count_doc_types(tx.ex()).await?;
        tx.commit().await?;

        Ok(DashboardStats {
            total_buses,
            total_voice_app_users,
            total_documents,
            expiring_documents,
            expired_documents,
            total_document_types,
            last_updated: now,
        })
    }
}
