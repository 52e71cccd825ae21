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

//! Utilities to help testing the fleet business logic.

use crate::db;
use crate::driver::FleetDriver;
use crate::model::{Bus, BusId, Document, DocumentType, NewBus, NewDocument, NewDocumentType};
use fleetdocs_authn::driver::testutils::TestContext as UsersTestContext;
use fleetdocs_core::clocks::Clock;
use fleetdocs_core::clocks::testutils::{SettableClock, utc_datetime};
use fleetdocs_core::db::{Db, Executor};
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock used by the driver, which tests can move at will.
    clock: Arc<SettableClock>,

    /// The driver to handle fleet operations.
    driver: FleetDriver,

    /// Context of the user accounts that share the database with the fleet.
    users: UsersTestContext,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and a settable clock.
    pub(crate) async fn setup() -> Self {
        Self::setup_with(Arc::new(fleetdocs_core::db::sqlite::testutils::setup().await)).await
    }

    /// Initializes the driver using a database stored in `dir` that serves concurrent
    /// connections.
    pub(crate) async fn setup_file(dir: &Path) -> Self {
        Self::setup_with(Arc::new(fleetdocs_core::db::sqlite::testutils::setup_file(dir).await))
            .await
    }

    /// Initializes the driver using the given database and a settable clock.
    async fn setup_with(db: Arc<dyn Db + Send + Sync>) -> Self {
        let users = UsersTestContext::setup_with(db.clone()).await;
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::new(SettableClock::new(utc_datetime(2024, 1, 15, 9, 0, 0)));
        let driver = FleetDriver::new(db.clone(), clock.clone());
        TestContext { db, clock, driver, users }
    }

    /// Gets a direct executor against the database.
    ///
    /// The test database has a single connection, so the executor must be dropped before
    /// issuing any driver operation.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Gets the clock used by the driver.
    pub(crate) fn clock(&self) -> &SettableClock {
        &self.clock
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> FleetDriver {
        self.driver.clone()
    }

    /// Gets the context of the user accounts.
    pub(crate) fn users(&self) -> &UsersTestContext {
        &self.users
    }

    /// Syntactic sugar to create a bus with only its registration number.
    pub(crate) async fn create_bus(&self, registration_no: &'static str) -> Bus {
        let new = NewBus {
            registration_no: registration_no.to_owned(),
            model: None,
            manufacturer: None,
            year_of_make: None,
            owner_name: None,
        };
        self.driver().create_bus(new).await.unwrap()
    }

    /// Syntactic sugar to create a document type with only its name.
    pub(crate) async fn create_doc_type(&self, name: &'static str) -> DocumentType {
        let new = NewDocumentType { name: name.to_owned(), description: None };
        self.driver().create_doc_type(new).await.unwrap()
    }

    /// Syntactic sugar to attach a document of `doc_type` to `bus_id` with an optional expiry
    /// date.
    pub(crate) async fn create_document(
        &self,
        bus_id: &BusId,
        doc_type: &DocumentType,
        expiry_date: Option<OffsetDateTime>,
    ) -> Document {
        let new = NewDocument {
            doc_type_id: doc_type.id().clone(),
            document_number: None,
            issue_date: None,
            expiry_date,
            file_url: "https://files.example.com/doc.pdf".to_owned(),
            remarks: None,
        };
        self.driver().create_document(bus_id.clone(), new).await.unwrap().document
    }

    /// Returns the time that is `days` away from the current time of the test clock.
    pub(crate) fn days_from_now(&self, days: i64) -> OffsetDateTime {
        self.clock.now_utc() + time::Duration::days(days)
    }
}
