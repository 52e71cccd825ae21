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
use crate::model::User;
use crate::rest::app;
use axum::Router;
use fleetdocs_core::db::Executor;

/// State of a running test.
pub(crate) struct TestContext {
    /// Context of the driver backing the app.
    inner: DriverTestContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory database.
    pub(crate) async fn setup() -> Self {
        let inner = DriverTestContext::setup().await;
        let app = app(inner.driver());
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

    /// Creates a user with `username` and `password` via the driver.
    pub(crate) async fn create_user(&self, username: &'static str, password: &'static str) -> User {
        self.inner.create_user(username, password).await
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.inner.ex().await
    }
}
