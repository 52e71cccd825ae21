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

//! API to list all active users.

use crate::driver::UsersDriver;
use crate::rest::UserView;
use axum::Json;
use axum::extract::State;
use fleetdocs_core::rest::RestResult;
use serde::{Deserialize, Serialize};

/// Message returned by the server when listing users.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct UsersResponse {
    /// Human-readable outcome of the operation.
    pub(crate) message: String,
    /// All active users sorted by identifier.
    pub(crate) users: Vec<UserView>,
}

/// GET handler for this API.
pub(crate) async fn handler(State(driver): State<UsersDriver>) -> RestResult<Json<UsersResponse>> {
    let users = driver.list_users().await?;
    Ok(Json(UsersResponse {
        message: "Users fetched successfully".to_owned(),
        users: users.into_iter().map(UserView::from).collect(),
    }))
}
