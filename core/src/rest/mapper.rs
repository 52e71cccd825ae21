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

//! Central translation point between handler failures and what clients get to see.

use crate::rest::RestError;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use log::{debug, error, warn};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Deployment environment of the service, which controls how much detail errors expose.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Environment {
    /// Local or test deployments.  Error responses carry a debug rendering of the error.
    #[default]
    Development,

    /// Public deployments.  Error responses never expose internals.
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            _ => Err(format!("Unknown environment '{}'", s)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Middleware that logs every request and every error response, and that attaches debugging
/// details to error responses outside of production.
///
/// Handlers and gates report errors by returning a `RestError`, which leaves a copy of itself in
/// the response extensions.  This is what allows this middleware to recognize them.
pub async fn map_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let client = match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => "unknown".to_owned(),
    };
    debug!("{} {} from {}", method, path, client);

    let response = next.run(request).await;
    let error = match response.extensions().get::<RestError>() {
        Some(error) => error.clone(),
        None => return response,
    };

    if error.status().is_server_error() {
        error!("{} {} from {} failed: {:?}", method, path, client, error);
    } else {
        warn!("{} {} from {} rejected: {}", method, path, client, error);
    }

    match environment {
        Environment::Development => error.render(Some(format!("{:?}", error))),
        Environment::Production => response,
    }
}

/// Fallback handler for requests that do not match any route.
pub async fn route_not_found() -> RestError {
    RestError::NotFound("Route not found".to_owned())
}

/// Fallback handler for requests to a known path with a method the path does not serve.
pub async fn method_not_allowed() -> RestError {
    RestError::MethodNotAllowed("Method not allowed".to_owned())
}
