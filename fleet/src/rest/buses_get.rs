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

//! API to list buses one page at a time.

use crate::driver::FleetDriver;
use crate::model::{BusPage, BusQuery};
use axum::Json;
use axum::extract::State;
use fleetdocs_core::rest::{QueryObject, RestResult};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<FleetDriver>,
    QueryObject(query): QueryObject,
) -> RestResult<Json<BusPage>> {
    let query = BusQuery::from_query(&query)?;
    let page = driver.list_buses(query).await?;
    Ok(Json(page))
}
