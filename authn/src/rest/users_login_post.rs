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

//! API to check a user's credentials.
//!
//! There are no sessions: a successful login only confirms that the credentials are valid.

use crate::driver::UsersDriver;
use crate::model::{Login, UserId};
use axum::Json;
use axum::extract::State;
use fleetdocs_core::model::{EmailAddress, Username};
use fleetdocs_core::rest::{JsonBody, RestResult};
use serde::{Deserialize, Serialize};

/// Projection of the user that logged in.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct LoggedInUser {
    /// Identifier of the user.
    pub(crate) id: UserId,
    /// Always true for successful logins.
    pub(crate) login: bool,
    /// Name of the user.
    pub(crate) username: Username,
    /// Email of the user, if known.
    pub(crate) email: Option<EmailAddress>,
}

/// Message returned by the server after a successful login attempt.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct LoginResponse {
    /// Human-readable outcome of the operation.
    pub(crate) message: String,
    /// The affected user.
    pub(crate) user: LoggedInUser,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    JsonBody(body): JsonBody,
) -> RestResult<Json<LoginResponse>> {
    let login = Login::from_json(&body)?;
    let user = driver.login(login).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_owned(),
        user: LoggedInUser {
            id: user.id(),
            login: true,
            username: user.username().clone(),
            email: user.email().cloned(),
        },
    }))
}
