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

//! Utilities to help testing services that integrate with the user accounts.

use crate::db;
use crate::driver::{UsersDriver, UsersOptions};
use crate::model::{NewUser, Password, User};
use fleetdocs_core::clocks::testutils::{SettableClock, utc_datetime};
use fleetdocs_core::db::Db;
#[cfg(test)]
use fleetdocs_core::db::Executor;
use fleetdocs_core::model::{EmailAddress, Username};
use std::sync::Arc;

/// Cheapest bcrypt cost, to keep tests fast.
const TEST_BCRYPT_COST: u32 = 4;

/// State of a running test.
pub struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock used by the driver, which tests can move at will.
    clock: Arc<SettableClock>,

    /// The driver to handle user operations.
    driver: UsersDriver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and a settable clock.
    #[cfg(test)]
    pub(crate) async fn setup() -> Self {
        let db = Arc::from(fleetdocs_core::db::sqlite::testutils::setup().await);
        Self::setup_with(db).await
    }

    /// Initializes the driver using a database stored in `dir` that serves concurrent
    /// connections.
    #[cfg(test)]
    pub(crate) async fn setup_file(dir: &std::path::Path) -> Self {
        let db = Arc::from(fleetdocs_core::db::sqlite::testutils::setup_file(dir).await);
        Self::setup_with(db).await
    }

    /// Initializes the test context using the given already-initialized database.
    pub async fn setup_with(db: Arc<dyn Db + Send + Sync>) -> Self {
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::new(SettableClock::new(utc_datetime(2024, 1, 15, 9, 0, 0)));
        let opts = UsersOptions { bcrypt_cost: TEST_BCRYPT_COST };
        let driver = UsersDriver::new(db.clone(), clock.clone(), opts);
        TestContext { db, clock, driver }
    }

    /// Syntactic sugar to create a user with a derived email address for testing purposes.
    pub async fn create_user(&self, username: &'static str, password: &'static str) -> User {
        let new = NewUser {
            username: Username::from(username),
            password: Password::from(password),
            email: Some(EmailAddress::new(format!("{}@example.com", username)).unwrap()),
        };
        self.driver.clone().create_user(new).await.unwrap()
    }

    /// Gets access to the database used by this test context.
    pub fn db(&self) -> Arc<dyn Db + Send + Sync> {
        self.db.clone()
    }

    /// Gets a direct executor against the database.
    #[cfg(test)]
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Gets the clock used by the driver.
    pub fn clock(&self) -> &SettableClock {
        &self.clock
    }

    /// Gets a copy of the driver in this test context.
    pub fn driver(&self) -> UsersDriver {
        self.driver.clone()
    }
}
