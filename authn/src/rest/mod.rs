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

//! REST interface for user accounts.

use crate::driver::UsersDriver;
use crate::model::{User, UserId};
use axum::Router;
use fleetdocs_core::model::{EmailAddress, Username};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

mod gates;
mod httputils;
#[cfg(test)]
mod testutils;
mod user_delete;
mod user_get;
mod user_put;
mod users_get;
mod users_login_post;
mod users_post;

pub use gates::{ApiKeyGate, BasicAuthGate, Gate, GateKind, GateOptions, protect};
pub use httputils::get_basic_auth;

/// Public representation of a user.  Never includes the password hash.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserView {
    /// Identifier of the user.
    pub(crate) id: UserId,
    /// Name of the user.
    pub(crate) username: Username,
    /// Email of the user, if known.
    pub(crate) email: Option<EmailAddress>,
    /// Time when the user was created.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
    /// Time when the user was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) updated_at: OffsetDateTime,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id(),
            username: user.username().clone(),
            email: user.email().cloned(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

/// Creates the router for the user endpoints.
///
/// These routes are meant to be served without any gate: registration and login are public.
pub fn app(driver: UsersDriver) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/users", get(users_get::handler).post(users_post::handler))
        .route("/api/users/login", post(users_login_post::handler))
        .route(
            "/api/users/:id",
            get(user_get::handler).put(user_put::handler).delete(user_delete::handler),
        )
        .with_state(driver)
}
