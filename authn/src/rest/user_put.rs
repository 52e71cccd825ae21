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

//! API to update an existing user.

use crate::driver::UsersDriver;
use crate::model::{UserId, UserUpdate};
use axum::Json;
use axum::extract::{Path, State};
use fleetdocs_core::model::{EmailAddress, Username};
use fleetdocs_core::rest::{JsonBody, RestResult};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Projection of the updated user.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdatedUser {
    /// Identifier of the user.
    pub(crate) id: UserId,
    /// Name of the user.
    pub(crate) username: Username,
    /// Email of the user, if known.
    pub(crate) email: Option<EmailAddress>,
    /// Time when the user was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) updated_at: OffsetDateTime,
}

/// Message returned by the server after updating a user.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct UpdateUserResponse {
    /// Human-readable outcome of the operation.
    pub(crate) message: String,
    /// The affected user.
    pub(crate) user: UpdatedUser,
}

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<UsersDriver>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> RestResult<Json<UpdateUserResponse>> {
    let id = UserId::parse(&id)?;
    let update = UserUpdate::from_json(&body)?;
    let user = driver.update_user(id, update).await?;

    Ok(Json(UpdateUserResponse {
        message: "User updated successfully".to_owned(),
        user: UpdatedUser {
            id: user.id(),
            username: user.username().clone(),
            email: user.email().cloned(),
            updated_at: user.updated_at(),
        },
    }))
}
