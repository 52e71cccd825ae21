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

//! API to register a new bus.

use crate::driver::FleetDriver;
use crate::model::{Bus, NewBus};
use axum::Json;
use axum::extract::State;
use fleetdocs_core::rest::{JsonBody, RestResult};
use http::StatusCode;

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<FleetDriver>,
    JsonBody(body): JsonBody,
) -> RestResult<(StatusCode, Json<Bus>)> {
    let new = NewBus::from_json(&body, driver.now_utc())?;
    let bus = driver.create_bus(new).await?;
    Ok((StatusCode::CREATED, Json(bus)))
}
