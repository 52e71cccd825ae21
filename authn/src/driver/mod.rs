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

//! Business logic for user accounts.

use crate::model::{HashedPassword, Password};
use derivative::Derivative;
use fleetdocs_core::clocks::Clock;
use fleetdocs_core::db::Db;
use fleetdocs_core::driver::{DriverError, DriverResult};
use fleetdocs_core::env::get_optional_var;
use fleetdocs_core::model::ModelResult;
use std::sync::Arc;

mod login;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
mod users;

/// Default bcrypt cost when `BCRYPT_COST` is not specified.
const DEFAULT_BCRYPT_COST: u32 = 12;

/// Range of bcrypt costs accepted by the hashing library.
const VALID_BCRYPT_COSTS: std::ops::RangeInclusive<u32> = 4..=31;

/// Configuration options for the users driver.
#[derive(Clone, Debug, PartialEq)]
pub struct UsersOptions {
    /// Work factor to use when hashing new passwords.
    pub bcrypt_cost: u32,
}

impl Default for UsersOptions {
    fn default() -> Self {
        Self { bcrypt_cost: DEFAULT_BCRYPT_COST }
    }
}

impl UsersOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with
    /// `prefix`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let bcrypt_cost =
            get_optional_var::<u32>(prefix, "BCRYPT_COST")?.unwrap_or(DEFAULT_BCRYPT_COST);
        if !VALID_BCRYPT_COSTS.contains(&bcrypt_cost) {
            return Err(format!(
                "Invalid bcrypt cost {}: must be between {} and {}",
                bcrypt_cost,
                VALID_BCRYPT_COSTS.start(),
                VALID_BCRYPT_COSTS.end()
            ));
        }
        Ok(Self { bcrypt_cost })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct UsersDriver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Options for the users driver.
    opts: UsersOptions,
}

impl UsersDriver {
    /// Creates a new driver backed by the given dependencies.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        opts: UsersOptions,
    ) -> Self {
        Self { db, clock, opts }
    }

    /// Hashes `password` on the blocking thread pool.
    async fn hash_password(&self, password: Password) -> DriverResult<HashedPassword> {
        let cost = self.opts.bcrypt_cost;
        run_blocking(move || password.hash(cost)).await
    }
}

/// Runs the CPU-bound password operation `op` outside of the async workers.
///
/// Failures here are never the caller's fault: the inputs were already validated, so anything
/// that goes wrong is reported as a backend error.
async fn run_blocking<T, F>(op: F) -> DriverResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ModelResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DriverError::BackendError(e.to_string())),
        Err(e) => Err(DriverError::BackendError(format!("Password task failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_options_from_env_default() {
        temp_env::with_var_unset("TEST_BCRYPT_COST", || {
            assert_eq!(UsersOptions::default(), UsersOptions::from_env("TEST").unwrap());
        });
    }

    #[test]
    fn test_users_options_from_env_override() {
        temp_env::with_var("TEST_BCRYPT_COST", Some("8"), || {
            assert_eq!(UsersOptions { bcrypt_cost: 8 }, UsersOptions::from_env("TEST").unwrap());
        });
    }

    #[test]
    fn test_users_options_from_env_out_of_range() {
        for raw in ["3", "32"] {
            temp_env::with_var("TEST_BCRYPT_COST", Some(raw), || {
                let err = UsersOptions::from_env("TEST").unwrap_err();
                assert!(err.contains("must be between 4 and 31"), "Unexpected error: {}", err);
            });
        }
    }

    #[test]
    fn test_users_options_from_env_bad_type() {
        temp_env::with_var("TEST_BCRYPT_COST", Some("twelve"), || {
            let err = UsersOptions::from_env("TEST").unwrap_err();
            assert!(err.contains("TEST_BCRYPT_COST"), "Unexpected error: {}", err);
        });
    }
}
