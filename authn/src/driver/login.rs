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

//! Extends the driver with the `login` method.

use crate::db;
use crate::driver::{UsersDriver, run_blocking};
use crate::model::{Login, User};
use fleetdocs_core::db::DbError;
use fleetdocs_core::driver::{DriverError, DriverResult};
use log::info;

/// Message returned for any failed login, regardless of the reason.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

impl UsersDriver {
    /// Checks the credentials in `login` against the active users.
    ///
    /// An unknown username and a wrong password are indistinguishable to the caller: both return
    /// the same error, and both pay for one bcrypt operation.
    pub async fn login(self, login: Login) -> DriverResult<User> {
        let Login { username, password } = login;

        let user = {
            let mut tx = self.db.begin().await?;
            let user = db::get_user_by_username(tx.ex(), &username).await;
            tx.commit().await?;
            user
        };

        match user {
            Ok(user) => {
                let hash = user.password().clone();
                if !run_blocking(move || password.verify(&hash)).await? {
                    return Err(DriverError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
                }
                info!("User logged in: id={} username={}", user.id().as_i64(), username);
                Ok(user)
            }
            Err(DbError::NotFound) => {
                let _discarded = self.hash_password(password).await?;
                Err(DriverError::Unauthorized(INVALID_CREDENTIALS.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
