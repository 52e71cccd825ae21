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

//! Admission checks that run before the handlers of a route group.
//!
//! A gate inspects the request headers and either lets the request through or short-circuits it
//! with an authentication error.  The handlers behind a gate never run for rejected requests.

use crate::rest::httputils::get_basic_auth;
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use derivative::Derivative;
use fleetdocs_core::env::get_optional_var;
use fleetdocs_core::rest::{RestError, RestResult, get_unique_header};
use http::HeaderMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Name of the header that carries the shared secret.
const API_KEY_HEADER: &str = "x-api-key";

/// Default realm advertised by the basic authentication challenge.
const DEFAULT_BASIC_REALM: &str = "fleetdocs";

/// Compares two secrets without leaking where they differ.
fn secrets_match(actual: &str, expected: &str) -> bool {
    bool::from(actual.as_bytes().ct_eq(expected.as_bytes()))
}

/// A request admission policy.
pub trait Gate: Send + Sync {
    /// Decides whether a request with `headers` may proceed.
    fn admit(&self, headers: &HeaderMap) -> RestResult<()>;
}

/// Gate that requires a shared secret in the `x-api-key` header.
pub struct ApiKeyGate {
    /// The expected secret.
    key: String,
}

impl ApiKeyGate {
    /// Creates a new gate that accepts requests carrying `key`.
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self { key: key.into() }
    }
}

impl Gate for ApiKeyGate {
    fn admit(&self, headers: &HeaderMap) -> RestResult<()> {
        let value = match get_unique_header(headers, API_KEY_HEADER)? {
            Some(value) if !value.is_empty() => value,
            _ => {
                return Err(RestError::Unauthorized {
                    challenge: None,
                    message: "API key is required".to_owned(),
                });
            }
        };

        match value.to_str() {
            Ok(key) if secrets_match(key, &self.key) => Ok(()),
            _ => Err(RestError::Forbidden("Invalid API key".to_owned())),
        }
    }
}

/// Gate that requires HTTP basic credentials matching a single configured pair.
pub struct BasicAuthGate {
    /// The expected username.
    username: String,

    /// The expected password.
    password: String,

    /// Value of the `WWW-Authenticate` header sent on rejections.
    challenge: String,
}

impl BasicAuthGate {
    /// Creates a new gate that accepts `username`/`password` and advertises `realm`.
    pub fn new<U, P>(username: U, password: P, realm: &str) -> Self
    where
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            username: username.into(),
            password: password.into(),
            challenge: format!("Basic realm=\"{}\"", realm),
        }
    }
}

impl Gate for BasicAuthGate {
    fn admit(&self, headers: &HeaderMap) -> RestResult<()> {
        let (username, password) = get_basic_auth(headers, &self.challenge)?;

        // Evaluate both comparisons so that the timing does not reveal which one failed.
        let username_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        if bool::from(username_ok & password_ok) {
            Ok(())
        } else {
            Err(RestError::Unauthorized {
                challenge: Some(self.challenge.clone()),
                message: "Invalid credentials".to_owned(),
            })
        }
    }
}

/// The kinds of gates that can protect a route group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateKind {
    /// Shared secret in the `x-api-key` header.
    ApiKey,

    /// HTTP basic authentication against a single credential pair.
    Basic,
}

impl FromStr for GateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api-key" => Ok(GateKind::ApiKey),
            "basic" => Ok(GateKind::Basic),
            _ => Err(format!("Unknown gate kind '{}'; must be api-key or basic", s)),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateKind::ApiKey => f.write_str("api-key"),
            GateKind::Basic => f.write_str("basic"),
        }
    }
}

/// Credentials available to the gates.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct GateOptions {
    /// Shared secret for the API key gate.
    #[derivative(Debug = "ignore")]
    pub api_key: Option<String>,

    /// Username accepted by the basic authentication gate.
    pub basic_username: Option<String>,

    /// Password accepted by the basic authentication gate.
    #[derivative(Debug = "ignore")]
    pub basic_password: Option<String>,

    /// Realm advertised by the basic authentication gate.
    pub basic_realm: String,
}

impl GateOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with
    /// `prefix`.
    ///
    /// All credentials are optional here.  Whether they are needed depends on which gates are
    /// built later on.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            api_key: get_optional_var::<String>(prefix, "API_KEY")?,
            basic_username: get_optional_var::<String>(prefix, "BASIC_USERNAME")?,
            basic_password: get_optional_var::<String>(prefix, "BASIC_PASSWORD")?,
            basic_realm: get_optional_var::<String>(prefix, "BASIC_REALM")?
                .unwrap_or_else(|| DEFAULT_BASIC_REALM.to_owned()),
        })
    }

    /// Instantiates a gate of the given `kind`, failing if its credentials are not configured.
    pub fn build(&self, kind: GateKind) -> Result<Arc<dyn Gate>, String> {
        match kind {
            GateKind::ApiKey => match self.api_key.as_deref() {
                Some(key) if !key.is_empty() => Ok(Arc::new(ApiKeyGate::new(key))),
                _ => Err("The api-key gate requires an API key".to_owned()),
            },
            GateKind::Basic => {
                let username = self.basic_username.as_deref();
                let password = self.basic_password.as_deref();
                match (username, password) {
                    (Some(username), Some(password)) if !username.is_empty() => {
                        Ok(Arc::new(BasicAuthGate::new(username, password, &self.basic_realm)))
                    }
                    _ => Err("The basic gate requires a username and a password".to_owned()),
                }
            }
        }
    }
}

/// Middleware that runs `gate` on every request and only forwards the admitted ones.
pub async fn admit(State(gate): State<Arc<dyn Gate>>, request: Request, next: Next) -> Response {
    match gate.admit(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Places all routes of `router` behind `gate`.
///
/// Requests that do not match any route in `router` are not affected.
pub fn protect(router: Router, gate: Arc<dyn Gate>) -> Router {
    router.route_layer(from_fn_with_state(gate, admit))
}
