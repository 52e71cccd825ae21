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

//! Generic code for REST handlers.
//!
//! All services should implement an `app` function in this module that returns the `Router` for the
//! application.
//!
//! Every API should be put in its own `.rs` file, using a name like `<entity>_<method>.rs`.  This
//! may seem overkill, but putting every API in its own file makes it easy to ensure all the
//! integration tests for the given API truly belong to that API.
//!
//! More specifically, the `tests` module within an API should define a `route` method that
//! returns the HTTP method and the API path under test.  All integration tests within the module
//! then rely on `route` to obtain this information, ensuring that they all test the desired API.
//!
//! Handlers never render errors themselves: they return a `RestError` and the error mapper
//! installed by `map_errors` decides what the client gets to see based on the `Environment`.

use crate::driver::DriverError;
use crate::model::ModelError;
use crate::model::validation::{FieldViolation, Violations, query_object};
use async_trait::async_trait;
use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AsHeaderName;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

mod mapper;
pub use mapper::{Environment, map_errors, method_not_allowed, route_not_found};

/// Message returned to clients for any error that is not their fault.
const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Frontend errors.  These are the errors that are visible to the user on failed requests.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// Indicates that the request collides with the current state of a resource.
    #[error("{0}")]
    Conflict(String),

    /// Indicates that the provided credentials are well-formed but not acceptable.
    #[error("{0}")]
    Forbidden(String),

    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request that prevented parsing it.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that the requested path exists but does not support the request method.
    #[error("{0}")]
    MethodNotAllowed(String),

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates an authentication problem.
    #[error("{message}")]
    Unauthorized {
        /// Value for the `WWW-Authenticate` header, if the client should be challenged.
        challenge: Option<String>,

        /// Descriptive message explaining the nature of the problem.
        message: String,
    },

    /// Indicates that one or more fields in the request did not pass validation.
    #[error("{0}")]
    ValidationFailed(Violations),
}

impl RestError {
    /// Returns the HTTP status code that represents this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::Conflict(_) => StatusCode::CONFLICT,
            RestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RestError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RestError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RestError::NotFound(_) => StatusCode::NOT_FOUND,
            RestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RestError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Renders the error into a response.  The `stack` is only attached when requested by the
    /// caller, which must only do so in non-production environments.
    pub(crate) fn render(&self, stack: Option<String>) -> Response {
        let message = match self {
            RestError::InternalError(_) => INTERNAL_ERROR_MESSAGE.to_owned(),
            e => e.to_string(),
        };
        let details = match self {
            RestError::ValidationFailed(violations) => Some(violations.as_slice().to_vec()),
            _ => None,
        };

        let mut headers = HeaderMap::new();
        if let RestError::Unauthorized { challenge: Some(challenge), .. } = self {
            match HeaderValue::from_str(challenge) {
                Ok(value) => {
                    headers.insert(http::header::WWW_AUTHENTICATE, value);
                }
                Err(e) => log::warn!("Cannot encode authentication challenge {}: {}", challenge, e),
            }
        }

        let body = ErrorResponse { message, details, stack };
        let mut response = (self.status(), headers, Json(body)).into_response();
        response.extensions_mut().insert(self.clone());
        response
    }
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(msg) => RestError::Conflict(msg),
            DriverError::BackendError(msg) => RestError::InternalError(msg),
            DriverError::InUse(msg) => RestError::Conflict(msg),
            DriverError::InvalidInput(msg) => RestError::InvalidRequest(msg),
            DriverError::NotFound(msg) => RestError::NotFound(msg),
            DriverError::Unauthorized(message) => {
                RestError::Unauthorized { challenge: None, message }
            }
        }
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        RestError::InvalidRequest(e.to_string())
    }
}

impl From<Violations> for RestError {
    fn from(e: Violations) -> Self {
        RestError::ValidationFailed(e)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        self.render(None)
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Textual representation of the error message.
    pub message: String,

    /// Per-field violations for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,

    /// Debug rendering of the error, only present outside of production.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// A request body extractor for JSON payloads that are validated later on.
///
/// Payloads are kept as raw JSON values so that validation can report every offending field at
/// once instead of stopping at the first deserialization error.  Malformed payloads are reported
/// as a `RestError` so that they flow through the error mapper like everything else.
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(e) => Err(RestError::InvalidRequest(e.body_text())),
        }
    }
}

/// A query string extractor that exposes the parameters as a JSON object of strings.
///
/// Like `JsonBody`, this defers all checks to the validators in the model layer.
pub struct QueryObject(pub Value);

#[async_trait]
impl<S> FromRequestParts<S> for QueryObject
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<HashMap<String, String>>::from_request_parts(parts, state).await {
            Ok(Query(params)) => Ok(QueryObject(query_object(params))),
            Err(e) => Err(RestError::InvalidRequest(e.body_text())),
        }
    }
}

/// Extracts the header `name` from `headers` and ensures it has at most one value.
pub fn get_unique_header<K: AsHeaderName + Copy>(
    headers: &HeaderMap,
    name: K,
) -> RestResult<Option<&HeaderValue>> {
    let mut iter = headers.get_all(name).iter();
    let value = iter.next();
    if iter.next().is_some() {
        return Err(RestError::InvalidRequest(format!(
            "Header {} cannot have more than one value",
            name.as_str()
        )));
    }
    Ok(value)
}

/// Common test code for the REST server.
#[cfg(feature = "testutils")]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::http::{self, HeaderName};
    use base64::Engine;
    use base64::engine::general_purpose;
    use serde::de::DeserializeOwned;
    use std::fmt;
    use tower::util::ServiceExt;

    /// Maximum body size for testing purposes.  Large enough for paginated listings.
    const MAX_BODY_SIZE: usize = 1024 * 1024;

    /// Builder for a single request to the API server.
    #[must_use]
    pub struct OneShotBuilder {
        /// The router for the app being tested.
        app: Router,

        /// Builder for the request that will be sent to the app.
        builder: axum::http::request::Builder,
    }

    impl OneShotBuilder {
        /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
            let builder = Request::builder().method(method).uri(uri.as_ref());
            Self { app, builder }
        }

        /// Extends the URI in the request with a `query`.
        pub fn with_query<Q: Serialize>(mut self, query: Q) -> Self {
            let uri = self.builder.uri_ref().unwrap().to_string();
            assert!(!uri.contains('?'), "URI already contains a query: {}", uri);
            self.builder = self.builder.uri(format!(
                "{}?{}",
                uri,
                serde_urlencoded::to_string(query).unwrap()
            ));
            self
        }

        /// Adds basic authentication to the request.
        pub fn with_basic_auth<U, P>(mut self, username: U, password: P) -> Self
        where
            U: fmt::Display,
            P: fmt::Display,
        {
            let value = format!(
                "Basic {}",
                general_purpose::STANDARD.encode(format!("{}:{}", username, password))
            );
            self.builder = self.builder.header(http::header::AUTHORIZATION, value);
            self
        }

        /// Sets the header `name` to `value` in the outgoing request.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.builder = self.builder.header(name, value);
            self
        }

        /// Finishes building the request and sends it with an empty payload.
        pub async fn send_empty(self) -> ResponseChecker {
            let request = self.builder.body(axum::body::Body::empty()).unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a text payload.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())
                .body(axum::body::Body::from(text.into()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a JSON payload.
        pub async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }
    }

    /// Type alias for the complex type returned by the `oneshot` function.
    type HttpResponse = hyper::Response<axum::body::Body>;

    /// Validator for the outcome of a request sent by a `OneShotBuilder`.
    #[must_use]
    pub struct ResponseChecker {
        /// Actual response that we received from the app.
        response: HttpResponse,

        /// Expected HTTP status code in the response above.
        exp_status: http::StatusCode,
    }

    impl From<HttpResponse> for ResponseChecker {
        fn from(response: HttpResponse) -> Self {
            Self { response, exp_status: http::StatusCode::OK }
        }
    }

    impl ResponseChecker {
        /// Sets the expected exit HTTP status to `status`.
        pub fn expect_status(mut self, status: http::StatusCode) -> Self {
            self.exp_status = status;
            self
        }

        /// Performs common validation operations on the response.
        pub fn verify(&self) {
            assert_eq!(self.exp_status, self.response.status());
        }

        /// Reads the whole body of the response.
        async fn take_body(self) -> Vec<u8> {
            axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap().to_vec()
        }

        /// Finishes checking the response and expects it to contain an empty body.
        pub async fn expect_empty(self) {
            self.verify();

            let body = String::from_utf8(self.take_body().await).unwrap();
            assert!(body.is_empty(), "Body not empty; got {}", body);
        }

        /// Finishes checking the response and returns its body as an `ErrorResponse`.
        pub async fn take_error(self) -> ErrorResponse {
            self.verify();

            let body = self.take_body().await;
            match serde_json::from_slice(&body) {
                Ok(response) => response,
                Err(e) => {
                    let body = String::from_utf8(body).unwrap();
                    panic!("Invalid error response due to {}; content was {}", e, body);
                }
            }
        }

        /// Finishes checking the response and expects its body to be an `ErrorResponse` that
        /// matches `exp_re`.
        pub async fn expect_error(self, exp_re: &str) {
            let response = self.take_error().await;
            let re = regex::Regex::new(exp_re).unwrap();
            assert!(
                re.is_match(&response.message),
                "Response content '{:?}' does not match re '{}'",
                response,
                exp_re
            );
        }

        /// Finishes checking the response and expects it to be a validation failure that
        /// reports exactly the `exp` pairs of field names and messages.
        pub async fn expect_violations(self, exp: &[(&str, &str)]) {
            let response = self.expect_status(http::StatusCode::BAD_REQUEST).take_error().await;
            assert_eq!("Validation error", response.message);
            let details = response.details.expect("Validation errors must carry details");
            let details = details
                .iter()
                .map(|v| (v.field.as_str(), v.message.as_str()))
                .collect::<Vec<(&str, &str)>>();
            assert_eq!(exp, details.as_slice());
        }

        /// Finishes checking the response and expects it to contain a valid JSON object of
        /// type `T`.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            self.verify();

            let body = self.take_body().await;
            match serde_json::from_slice::<T>(&body) {
                Ok(value) => value,
                Err(e) => {
                    let body = String::from_utf8(body).unwrap();
                    panic!("Invalid JSON response due to {}; content was {}", e, body);
                }
            }
        }

        /// Finishes checking the response and returns the response itself for out of band
        /// validation of properties not supported by the `ResponseChecker`.
        pub async fn take_response(self) -> HttpResponse {
            self.verify();

            self.response
        }
    }

    /// Generates a test to verify that an API that expects JSON fails when it gets something else.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr $(, $query:expr)? ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    $( .with_query($query) )?
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("Content-Type")
                    .await;

                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    $( .with_query($query) )?
                    .with_header(axum::http::header::CONTENT_TYPE, "application/json")
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("expected ident")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_json;
}
