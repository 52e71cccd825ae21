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

//! Test utilities for the REST API.

use crate::driver::testutils::TestContext as DriverTestContext;
use crate::model::{Bus, BusId, Document, DocumentType};
use crate::rest::{app, dashboard_app};
use axum::Router;
use fleetdocs_core::clocks::testutils::SettableClock;
use fleetdocs_core::db::Executor;
use time::OffsetDateTime;

/// State of a running test.
pub(crate) struct TestContext {
    /// Context of the driver backing the app.
    inner: DriverTestContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory database.
    ///
    /// The app serves both the fleet and the dashboard endpoints without any gate.
    pub(crate) async fn setup() -> Self {
        let inner = DriverTestContext::setup().await;
        let app = app(inner.driver()).merge(dashboard_app(inner.driver()));
        Self { inner, app }
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and transforms it into the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.inner.ex().await
    }

    /// Gets the clock used by the driver.
    pub(crate) fn clock(&self) -> &SettableClock {
        self.inner.clock()
    }

    /// Gets the driver test context, which gives access to the user accounts.
    pub(crate) fn inner(&self) -> &DriverTestContext {
        &self.inner
    }

    /// Creates a bus with only its registration number via the driver.
    pub(crate) async fn create_bus(&self, registration_no: &'static str) -> Bus {
        self.inner.create_bus(registration_no).await
    }

    /// Creates a document type with only its name via the driver.
    pub(crate) async fn create_doc_type(&self, name: &'static str) -> DocumentType {
        self.inner.create_doc_type(name).await
    }

    /// Attaches a document to a bus via the driver.
    pub(crate) async fn create_document(
        &self,
        bus_id: &BusId,
        doc_type: &DocumentType,
        expiry_date: Option<OffsetDateTime>,
    ) -> Document {
        self.inner.create_document(bus_id, doc_type, expiry_date).await
    }

    /// Returns the time that is `days` away from the current time of the test clock.
    pub(crate) fn days_from_now(&self, days: i64) -> OffsetDateTime {
        self.inner.days_from_now(days)
    }
}
