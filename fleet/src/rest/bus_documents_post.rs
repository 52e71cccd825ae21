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


//! API to attach a new document to a bus.

use crate::driver::FleetDriver;
use crate::model::{BusId, DocumentDetails, NewDocument};
use axum::Json;
use axum::extract::{Path, State};
use fleetdocs_core::rest::{JsonBody, RestResult};
use http::StatusCode;

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<FleetDriver>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> RestResult<(StatusCode, Json<DocumentDetails>)> {
    let bus_id = BusId::parse("id", id)?;
    let new = NewDocument::from_json(&body)?;
    let details = driver.create_document(bus_id, new).await?;
    Ok((StatusCode::CREATED, Json(details)))
}
