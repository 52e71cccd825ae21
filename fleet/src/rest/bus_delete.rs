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

//! API to delete a bus without documents.

use crate::driver::FleetDriver;
use crate::model::BusId;
use axum::extract::{Path, State};
use fleetdocs_core::rest::RestResult;
use http::StatusCode;

/// DELETE handler for this API.
pub(crate) async fn handler(
    State(driver): State<FleetDriver>,
    Path(id): Path<String>,
) -> RestResult<StatusCode> {
    let id = BusId::parse("id", id)?;
    driver.delete_bus(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
