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


//! API to report the liveness of the service along with some process diagnostics.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use fleetdocs_core::clocks::Clock;
use fleetdocs_core::rest::Environment;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::System;
use time::OffsetDateTime;

/// State shared by the health handler.
#[derive(Clone)]
pub struct HealthState {
    /// Moment the service started, used to compute its uptime.
    started: Instant,

    /// Environment the service runs in.
    environment: Environment,

    /// Clock to report the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Process table used to sample the memory usage of the service.
    system: Arc<Mutex<System>>,
}

impl HealthState {
    /// Creates the health state for a service that starts now.
    pub fn new(environment: Environment, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            started: Instant::now(),
            environment,
            clock,
            system: Arc::new(Mutex::new(System::new())),
        }
    }
}

/// Message returned by the health API.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HealthResponse {
    /// Always "OK" when the service can answer at all.
    status: String,

    /// Time when the response was generated.
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,

    /// Number of whole seconds since the service started.
    uptime_seconds: u64,

    /// Environment the service runs in.
    environment: String,

    /// Version of the service.
    version: String,

    /// Identifier of the service process.
    pid: u32,

    /// Resident set size of the process in bytes, if the platform exposes it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    memory: Option<u64>,
}

/// Samples the resident set size of the current process in bytes.
fn resident_memory(system: &Mutex<System>) -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = system.lock().ok()?;
    if !system.refresh_process(pid) {
        return None;
    }
    system.process(pid).map(|process| process.memory())
}

/// GET handler for this API.
async fn handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    let system = state.system.clone();
    let memory = tokio::task::spawn_blocking(move || resident_memory(&system)).await.ok().flatten();
    Json(HealthResponse {
        status: "OK".to_owned(),
        timestamp: state.clock.now_utc(),
        uptime_seconds: state.started.elapsed().as_secs(),
        environment: state.environment.to_string(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        pid: std::process::id(),
        memory,
    })
}

/// Creates the router for the health API.
pub fn health_app(state: HealthState) -> Router {
    Router::new().route("/health", get(handler)).with_state(state)
}
