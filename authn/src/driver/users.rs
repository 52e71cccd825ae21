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

//! Extends the driver with the user management operations.

use crate::db;
use crate::driver::UsersDriver;
use crate::model::{NewUser, User, UserId, UserUpdate};
use fleetdocs_core::db::DbError;
use fleetdocs_core::driver::{DriverError, DriverResult};
use fleetdocs_core::model::validation::Patch;
use log::info;

/// Converts a missing-row error into the user-specific not found error.
fn user_not_found(e: DbError) -> DriverError {
    match e {
        DbError::NotFound => DriverError::NotFound("User not found".to_owned()),
        e => e.into(),
    }
}

/// Error returned when a username or email is already taken.
fn user_conflict() -> DriverError {
    DriverError::AlreadyExists("Username or email already exists".to_owned())
}

impl UsersDriver {
    /// Gets all active users.
    pub async fn list_users(self) -> DriverResult<Vec<User>> {
        let mut tx = self.db.begin().await?;
        let users = db::get_users(tx.ex()).await?;
        tx.commit().await?;
        Ok(users)
    }

    /// Gets the active user identified by `id`.
    pub async fn get_user(self, id: UserId) -> DriverResult<User> {
        let mut tx = self.db.begin().await?;
        let user = db::get_user(tx.ex(), id).await.map_err(user_not_found)?;
        tx.commit().await?;
        Ok(user)
    }

    /// Registers a new user.
    pub async fn create_user(self, new: NewUser) -> DriverResult<User> {
        let NewUser { username, password, email } = new;

        // Hash before opening the transaction so that the connection is not held while bcrypt
        // runs.
        let hashed = self.hash_password(password).await?;

        let mut tx = self.db.begin().await?;
        if db::user_conflicts(tx.ex(), Some(&username), email.as_ref(), None).await? {
            return Err(user_conflict());
        }
        let now = self.clock.now_utc();
        let user = db::create_user(tx.ex(), &username, email.as_ref(), &hashed, now).await?;
        tx.commit().await?;

        info!("User created: id={} username={}", user.id().as_i64(), user.username().as_str());
        Ok(user)
    }

    /// Applies a partial `update` to the active user identified by `id`.
    pub async fn update_user(self, id: UserId, update: UserUpdate) -> DriverResult<User> {
        let UserUpdate { username, password, email } = update;

        let hashed = match password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };

        let mut tx = self.db.begin().await?;
        let mut user = db::get_user(tx.ex(), id).await.map_err(user_not_found)?;

        let new_email = match &email {
            Patch::Set(email) => Some(email),
            Patch::Keep | Patch::Clear => None,
        };
        if (username.is_some() || new_email.is_some())
            && db::user_conflicts(tx.ex(), username.as_ref(), new_email, Some(id)).await?
        {
            return Err(user_conflict());
        }

        if let Some(username) = username {
            user = user.with_username(username);
        }
        if !email.is_keep() {
            let current = user.email().cloned();
            user = user.with_email(email.apply(current));
        }
        if let Some(hashed) = hashed {
            user = user.with_password(hashed);
        }
        user = user.with_updated_at(self.clock.now_utc());

        db::update_user(tx.ex(), &user).await.map_err(user_not_found)?;
        tx.commit().await?;

        info!("User updated: id={} username={}", user.id().as_i64(), user.username().as_str());
        Ok(user)
    }

    /// Soft-deletes the active user identified by `id`.
    pub async fn delete_user(self, id: UserId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();
        db::deactivate_user(tx.ex(), id, now).await.map_err(user_not_found)?;
        tx.commit().await?;

        info!("User deleted: id={}", id.as_i64());
        Ok(())
    }
}
