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


//! Bus fleet compliance documents service.
//!
//! This crate owns the buses, the document types and the documents attached to buses, along
//! with the compliance reports built on top of them.  It also composes the full HTTP service:
//! the user accounts from `fleetdocs_authn`, the gates in front of each route group, CORS, error
//! mapping and the process lifecycle.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use axum::Router;
use axum::middleware::from_fn_with_state;
use fleetdocs_authn::driver::UsersDriver;
use fleetdocs_authn::rest::{GateKind, GateOptions, protect};
use fleetdocs_core::db::Db;
use fleetdocs_core::env::get_optional_var;
use fleetdocs_core::rest::{Environment, map_errors, method_not_allowed, route_not_found};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Method};
use log::{error, info, warn};
use std::future::IntoFuture;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod db;
pub mod driver;
use driver::FleetDriver;
pub mod model;
pub mod rest;
use rest::{HealthState, health_app};

/// Port to listen on when none is configured.
const DEFAULT_PORT: u16 = 3000;

/// Seconds to wait for in-flight requests during shutdown when none is configured.
const DEFAULT_SHUTDOWN_GRACE_SECONDS: u64 = 30;

/// Origins allowed to issue cross-origin requests when none are configured.
const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
    "http://127.0.0.1:5173",
];

/// Gets the optional variable `<prefix>_<suffix>` and parses it with `FromStr`.
fn get_parsed_var<T>(prefix: &str, suffix: &str) -> Result<Option<T>, String>
where
    T: FromStr<Err = String>,
{
    match get_optional_var::<String>(prefix, suffix)? {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                Err(format!("Invalid value in environment variable {}_{}: {}", prefix, suffix, e))
            }
        },
        None => Ok(None),
    }
}

/// Configuration of the HTTP service.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerOptions {
    /// Port to listen on, across all interfaces.
    pub port: u16,

    /// Deployment environment, which controls how much detail error responses carry.
    pub environment: Environment,

    /// Origins allowed to issue cross-origin requests.
    pub allowed_origins: Vec<String>,

    /// Maximum time to wait for in-flight requests once shutdown starts.
    pub shutdown_grace: Duration,

    /// Gate protecting the bus, document type and document APIs.
    pub fleet_gate: GateKind,

    /// Gate protecting the dashboard API.
    pub dashboard_gate: GateKind,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: Environment::default(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| (*o).to_owned()).collect(),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECONDS),
            fleet_gate: GateKind::ApiKey,
            dashboard_gate: GateKind::Basic,
        }
    }
}

impl ServerOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with
    /// `prefix`.
    ///
    /// This will use variables such as `<prefix>_PORT`, `<prefix>_ENVIRONMENT`,
    /// `<prefix>_ALLOWED_ORIGINS`, `<prefix>_SHUTDOWN_GRACE_SECONDS`, `<prefix>_FLEET_GATE` and
    /// `<prefix>_DASHBOARD_GATE`.  Absent variables take their default values.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let defaults = Self::default();
        let shutdown_grace = match get_optional_var::<u64>(prefix, "SHUTDOWN_GRACE_SECONDS")? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.shutdown_grace,
        };
        Ok(Self {
            port: get_optional_var::<u16>(prefix, "PORT")?.unwrap_or(defaults.port),
            environment: get_parsed_var(prefix, "ENVIRONMENT")?.unwrap_or(defaults.environment),
            allowed_origins: get_optional_var::<Vec<String>>(prefix, "ALLOWED_ORIGINS")?
                .unwrap_or(defaults.allowed_origins),
            shutdown_grace,
            fleet_gate: get_parsed_var(prefix, "FLEET_GATE")?.unwrap_or(defaults.fleet_gate),
            dashboard_gate: get_parsed_var(prefix, "DASHBOARD_GATE")?
                .unwrap_or(defaults.dashboard_gate),
        })
    }
}

/// Builds the CORS policy that admits requests from `origins`, credentials included.
fn cors_layer(origins: &[String]) -> Result<CorsLayer, String> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| format!("Invalid allowed origin '{}': {}", origin, e))
        })
        .collect::<Result<Vec<HeaderValue>, String>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, HeaderName::from_static("x-api-key")])
        .allow_credentials(true))
}

/// Composes the router for the whole service.
///
/// The users API and the health API are open.  The fleet APIs and the dashboard API sit behind
/// the gates selected in `opts`, which fail to build if `gates` lacks their credentials.
pub fn app(
    opts: &ServerOptions,
    gates: &GateOptions,
    users: UsersDriver,
    fleet: FleetDriver,
    health: HealthState,
) -> Result<Router, String> {
    let fleet_gate = gates.build(opts.fleet_gate)?;
    let dashboard_gate = gates.build(opts.dashboard_gate)?;
    let cors = cors_layer(&opts.allowed_origins)?;

    Ok(Router::new()
        .merge(fleetdocs_authn::rest::app(users))
        .merge(protect(rest::app(fleet.clone()), fleet_gate))
        .merge(protect(rest::dashboard_app(fleet), dashboard_gate))
        .merge(health_app(health))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .layer(from_fn_with_state(opts.environment, map_errors))
        .layer(cors))
}

/// Waits for a termination request and returns the name of the signal that arrived.
async fn shutdown_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|()| "Ctrl+C")
    }
}

/// Flattens the outcome of the server task into a single error message.
fn server_outcome(result: Result<io::Result<()>, JoinError>) -> Result<(), String> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("HTTP server failed: {}", e)),
        Err(e) => Err(format!("HTTP server task failed: {}", e)),
    }
}

/// Serves `app` on the port configured in `opts` until a termination signal arrives.
///
/// Once the signal arrives, new connections are refused and in-flight requests get up to
/// `opts.shutdown_grace` to complete before they are dropped.  The database is closed in all
/// cases before returning.
pub async fn serve(
    opts: &ServerOptions,
    app: Router,
    db: Arc<dyn Db + Send + Sync>,
) -> Result<(), String> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, opts.port));
    let listener =
        TcpListener::bind(addr).await.map_err(|e| format!("Cannot bind to {}: {}", addr, e))?;
    info!("Listening on {} in {} mode", addr, opts.environment);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        });
    let mut server = tokio::spawn(server.into_future());

    let result = tokio::select! {
        result = &mut server => server_outcome(result),

        signal = shutdown_signal() => {
            match signal {
                Ok(name) => info!("Received {}; starting graceful shutdown", name),
                Err(e) => error!("Cannot wait for signals ({}); shutting down", e),
            }
            let _ = stop_tx.send(());
            match tokio::time::timeout(opts.shutdown_grace, &mut server).await {
                Ok(result) => {
                    let result = server_outcome(result);
                    if result.is_ok() {
                        info!("HTTP server closed");
                    }
                    result
                }
                Err(_) => {
                    server.abort();
                    warn!("Forced shutdown after {} seconds", opts.shutdown_grace.as_secs());
                    Err("Forced shutdown after timeout".to_owned())
                }
            }
        }
    };

    db.close().await;
    info!("Database connection closed");
    result
}
